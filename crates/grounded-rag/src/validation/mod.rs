//! Response validation: hallucination checking, citation scanning, fallback

pub mod validator;

pub use validator::ResponseValidator;
