//! Knowledge retriever collaborator contract.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by a retriever implementation.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("retrieval failed: {0}")]
    Search(String),
}

impl RetrievalError {
    pub fn search(message: impl Into<String>) -> Self {
        Self::Search(message.into())
    }
}

/// One context snippet returned by semantic search over crawled content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextSnippet {
    pub content: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    /// Lower is closer.
    pub distance: f64,
}

impl ContextSnippet {
    pub fn new(content: impl Into<String>, distance: f64) -> Self {
        Self {
            content: content.into(),
            metadata: BTreeMap::new(),
            distance,
        }
    }
}

/// Search over previously crawled page content, used once per task to seed
/// the planner's context.
#[async_trait]
pub trait ContextRetriever: Send + Sync {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<ContextSnippet>, RetrievalError>;
}

/// Retriever that always returns nothing; used when no knowledge base has
/// been built.
#[derive(Debug, Default, Clone)]
pub struct NullRetriever;

#[async_trait]
impl ContextRetriever for NullRetriever {
    async fn search(&self, _query: &str, _k: usize) -> Result<Vec<ContextSnippet>, RetrievalError> {
        Ok(Vec::new())
    }
}
