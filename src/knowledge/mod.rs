//! Knowledge base over crawled page content.
//!
//! Chunked lexical retrieval: deterministic term-overlap scoring stands in
//! for vector search, which keeps the retriever dependency-free and the
//! ranking reproducible across runs.

pub mod chunk;

use std::collections::{BTreeMap, HashSet};

use agent_core::{ContextRetriever, ContextSnippet, RetrievalError};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use tracing::{debug, info};

use crate::crawler::CrawledPage;
use chunk::{chunk_text, CHUNK_OVERLAP, CHUNK_SIZE};

static STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "the", "a", "an", "and", "or", "of", "to", "in", "is", "for", "on", "with", "at", "by",
    ]
    .into_iter()
    .collect()
});

/// One indexed chunk of crawled content.
#[derive(Debug, Clone)]
pub struct DocumentChunk {
    pub id: String,
    pub content: String,
    pub metadata: BTreeMap<String, String>,
}

/// In-memory index of crawled pages.
#[derive(Debug, Default)]
pub struct KnowledgeBase {
    chunks: Vec<DocumentChunk>,
}

impl KnowledgeBase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index successfully crawled pages into overlapping chunks with
    /// source metadata.
    pub fn build_from_pages(pages: &[CrawledPage]) -> Self {
        let mut chunks = Vec::new();

        for page in pages {
            for (chunk_index, content) in
                chunk_text(&page.html, CHUNK_SIZE, CHUNK_OVERLAP).into_iter().enumerate()
            {
                let id = format!("{}_{}", page.url.replace('/', "_"), chunk_index);
                let mut metadata = BTreeMap::new();
                metadata.insert("id".to_string(), id.clone());
                metadata.insert("source_url".to_string(), page.url.clone());
                metadata.insert("page_title".to_string(), page.title.clone());
                metadata.insert("chunk_index".to_string(), chunk_index.to_string());
                metadata.insert("has_forms".to_string(), (!page.forms.is_empty()).to_string());
                metadata.insert("form_count".to_string(), page.forms.len().to_string());

                chunks.push(DocumentChunk {
                    id,
                    content,
                    metadata,
                });
            }
        }

        info!(pages = pages.len(), chunks = chunks.len(), "knowledge base built");
        Self { chunks }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Rank chunks by term overlap with the query; lower distance is
    /// closer. Ties break on chunk id so results are stable.
    pub fn rank(&self, query: &str, k: usize) -> Vec<(f64, &DocumentChunk)> {
        let query_terms = tokenize(query);
        if query_terms.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(f64, &DocumentChunk)> = self
            .chunks
            .iter()
            .map(|chunk| {
                let content_terms = tokenize(&chunk.content);
                let hits = query_terms
                    .iter()
                    .filter(|term| content_terms.contains(*term))
                    .count();
                let distance = 1.0 - hits as f64 / query_terms.len() as f64;
                (distance, chunk)
            })
            .collect();

        scored.sort_by(|(da, ca), (db, cb)| {
            da.partial_cmp(db)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| ca.id.cmp(&cb.id))
        });
        scored.truncate(k);
        scored
    }
}

fn tokenize(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| word.len() >= 2 && !STOPWORDS.contains(word))
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl ContextRetriever for KnowledgeBase {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<ContextSnippet>, RetrievalError> {
        let ranked = self.rank(query, k);
        debug!(query, results = ranked.len(), "knowledge base search");
        Ok(ranked
            .into_iter()
            .map(|(distance, chunk)| ContextSnippet {
                content: chunk.content.clone(),
                metadata: chunk.metadata.clone(),
                distance,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(url: &str, html: &str) -> CrawledPage {
        CrawledPage {
            url: url.to_string(),
            title: "Page".to_string(),
            html: html.to_string(),
            forms: Vec::new(),
        }
    }

    fn sample_kb() -> KnowledgeBase {
        KnowledgeBase::build_from_pages(&[
            page(
                "https://lms.example/login",
                "<form><input name=\"username\"><input name=\"password\"></form>",
            ),
            page("https://lms.example/about", "<p>About our campus and history</p>"),
        ])
    }

    #[test]
    fn login_page_ranks_first_for_login_query() {
        let kb = sample_kb();
        let ranked = kb.rank("login form username password", 2);
        assert_eq!(ranked.len(), 2);
        assert!(ranked[0].1.metadata["source_url"].contains("/login"));
        assert!(ranked[0].0 < ranked[1].0);
    }

    #[test]
    fn ranking_is_deterministic() {
        let kb = sample_kb();
        let first: Vec<String> = kb.rank("username", 5).iter().map(|(_, c)| c.id.clone()).collect();
        let second: Vec<String> = kb.rank("username", 5).iter().map(|(_, c)| c.id.clone()).collect();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn retriever_caps_results_at_k() {
        let kb = sample_kb();
        let snippets = kb.search("username password", 1).await.unwrap();
        assert_eq!(snippets.len(), 1);
        assert!(snippets[0].distance < 1.0);
        assert_eq!(
            snippets[0].metadata.get("has_forms").map(String::as_str),
            Some("false")
        );
    }

    #[test]
    fn empty_query_returns_nothing() {
        let kb = sample_kb();
        assert!(kb.rank("", 5).is_empty());
        assert!(kb.rank("a", 5).is_empty());
    }

    #[test]
    fn metadata_records_chunk_provenance() {
        let kb = sample_kb();
        let ranked = kb.rank("campus history", 1);
        let chunk = ranked[0].1;
        assert_eq!(chunk.metadata["chunk_index"], "0");
        assert!(chunk.metadata["source_url"].contains("about"));
    }
}
