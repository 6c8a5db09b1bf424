pub mod ollama;

pub use ollama::{OllamaConfig, OllamaProvider};
