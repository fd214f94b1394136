//! RAG server binary
//!
//! Run with: cargo run -p grounded-rag --bin grounded-rag-server

use grounded_rag::{config::RagConfig, server::RagServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "grounded_rag=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!(
        r#"
╔═══════════════════════════════════════════════════════════╗
║                    Grounded RAG System                    ║
║        Document Q&A with Hallucination Defense            ║
╚═══════════════════════════════════════════════════════════╝
"#
    );

    // Load configuration: TOML file when given, env-overridden defaults otherwise
    let config = match std::env::var("GROUNDED_RAG_CONFIG") {
        Ok(path) => {
            tracing::info!("Loading configuration from {}", path);
            let mut config = RagConfig::from_file(&path)?;
            config.apply_env();
            config
        }
        Err(_) => RagConfig::from_env(),
    };

    config.validate()?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - LLM model: {}", config.llm.model);
    tracing::info!("  - Search service: {}", config.search.base_url);
    tracing::info!("  - Retrieval k: {}", config.retrieval.retrieval_k);
    tracing::info!(
        "  - Fusion weights: vector={}, lexical={}",
        config.retrieval.vector_weight,
        config.retrieval.lexical_weight
    );
    tracing::info!(
        "  - Hallucination check: {}",
        config.validation.check_hallucinations
    );

    // Create and start server
    let server = RagServer::new(config).await?;

    println!("\nServer starting...");
    println!("  API: http://{}", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("\nEndpoints:");
    println!("  POST /api/query         - Ask questions");
    println!("  POST /api/corpus/reload - Rebuild the lexical index");
    println!("  GET  /api/cache/stats   - Response cache statistics");
    println!("  GET  /api/metrics       - Metrics snapshot");
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
