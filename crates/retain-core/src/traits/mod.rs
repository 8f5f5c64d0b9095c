//! Core traits for retain providers.

mod llm;

pub use llm::*;
