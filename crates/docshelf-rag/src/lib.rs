#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod engine;
pub mod ollama;
pub mod prompt;

pub use engine::{extract_sources, RagEngine};
pub use ollama::OllamaGenerator;
