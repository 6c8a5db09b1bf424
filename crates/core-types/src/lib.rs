//! Shared primitives for the webagent execution core.
//!
//! Identifier newtypes and the page snapshot record exchanged between the
//! control loop and its collaborators live here so that every other crate
//! agrees on one definition.

use std::fmt;

use uuid::Uuid;

/// Identifier assigned to one task execution, stable for its whole lifetime.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ExecutionId(pub String);

impl ExecutionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Short prefix used when naming on-disk artifacts.
    pub fn short(&self) -> &str {
        let end = self.0.len().min(8);
        &self.0[..end]
    }
}

impl Default for ExecutionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Maximum HTML retained in a [`PageState`] snapshot.
pub const PAGE_HTML_LIMIT: usize = 30_000;

/// Last observed page snapshot: url, title, and truncated HTML.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PageState {
    pub url: String,
    pub title: String,
    pub html: String,
}

impl PageState {
    /// Build a snapshot, truncating the HTML to [`PAGE_HTML_LIMIT`] on a
    /// char boundary.
    pub fn new(url: impl Into<String>, title: impl Into<String>, html: &str) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            html: truncate_on_char_boundary(html, PAGE_HTML_LIMIT),
        }
    }

    /// True when no page has been observed yet.
    pub fn is_empty(&self) -> bool {
        self.url.is_empty() && self.html.is_empty()
    }
}

fn truncate_on_char_boundary(value: &str, limit: usize) -> String {
    if value.len() <= limit {
        return value.to_string();
    }
    let mut end = limit;
    while end > 0 && !value.is_char_boundary(end) {
        end -= 1;
    }
    value[..end].to_string()
}
