//! webagent library
//!
//! Exposes modules for integration testing

pub mod browser;
pub mod cli;
pub mod config;
pub mod crawler;
pub mod knowledge;
pub mod llm;
pub mod report;

// Re-export commonly used types for external use
pub use browser::{HttpBrowser, HttpBrowserConfig};
pub use config::Settings;
pub use crawler::{CrawledPage, Crawler, CrawlerConfig};
pub use knowledge::KnowledgeBase;
pub use llm::{OllamaConfig, OllamaProvider};
