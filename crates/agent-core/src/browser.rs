//! Browser action collaborator contract.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;
use webagent_core_types::PageState;

/// Errors raised by a browser driver implementation.
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("session error: {0}")]
    Session(String),

    #[error("action failed: {0}")]
    Action(String),

    #[error("element not found: {0}")]
    NotFound(String),
}

impl BrowserError {
    pub fn session(message: impl Into<String>) -> Self {
        Self::Session(message.into())
    }

    pub fn action(message: impl Into<String>) -> Self {
        Self::Action(message.into())
    }

    pub fn not_found(locator: impl Into<String>) -> Self {
        Self::NotFound(locator.into())
    }
}

/// Capability set the step executor dispatches against.
///
/// One driver instance owns one live page session for the duration of a
/// task execution; the orchestrator opens it before the loop and closes it
/// on every exit path.
#[async_trait]
pub trait BrowserDriver: Send {
    /// Initialize the session. Must be called before any other capability.
    async fn open(&mut self) -> Result<(), BrowserError>;

    async fn navigate(&mut self, url: &str) -> Result<PageState, BrowserError>;

    async fn fill(&mut self, locator: &str, value: &str) -> Result<(), BrowserError>;

    async fn fill_fields(&mut self, fields: &BTreeMap<String, String>) -> Result<(), BrowserError>;

    async fn click(&mut self, locator: &str) -> Result<(), BrowserError>;

    async fn select_option(&mut self, locator: &str, value: &str) -> Result<(), BrowserError>;

    async fn submit_form(&mut self, locator: &str) -> Result<(), BrowserError>;

    async fn wait_for(&mut self, locator: &str, timeout_ms: u64) -> Result<(), BrowserError>;

    async fn extract_text(&mut self, locator: &str) -> Result<String, BrowserError>;

    /// Capture an artifact of the current page at `path`, returning the
    /// saved path.
    async fn screenshot(&mut self, path: &Path) -> Result<String, BrowserError>;

    /// Freshly observed snapshot of the current page.
    async fn page_state(&mut self) -> Result<PageState, BrowserError>;

    /// Tear the session down. Idempotent.
    async fn close(&mut self) -> Result<(), BrowserError>;
}

/// Scripted driver used for tests and offline development.
///
/// Page-changing actions (`navigate`, `click`, `submit_form`) consume the
/// next scripted [`PageState`]; everything else leaves the current page in
/// place. Every call is recorded for assertions.
#[derive(Debug, Default)]
pub struct MockBrowser {
    script: VecDeque<PageState>,
    current: PageState,
    failing: BTreeSet<String>,
    pub calls: Vec<String>,
    pub opened: bool,
    pub closed: bool,
    pub fail_open: bool,
}

impl MockBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Driver that serves the given snapshots, in order, on page-changing
    /// actions.
    pub fn with_script<I>(pages: I) -> Self
    where
        I: IntoIterator<Item = PageState>,
    {
        Self {
            script: pages.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Make every call of the named capability fail.
    pub fn fail_on(mut self, capability: &str) -> Self {
        self.failing.insert(capability.to_string());
        self
    }

    pub fn current_page(&self) -> &PageState {
        &self.current
    }

    fn record(&mut self, call: String) {
        self.calls.push(call);
    }

    fn check(&self, capability: &str) -> Result<(), BrowserError> {
        if self.failing.contains(capability) {
            return Err(BrowserError::action(format!("{capability} failed (scripted)")));
        }
        Ok(())
    }

    fn advance(&mut self, url: &str) {
        self.current = self.script.pop_front().unwrap_or_else(|| {
            PageState::new(url, "Mock Page", "<html><body>mock</body></html>")
        });
    }
}

#[async_trait]
impl BrowserDriver for MockBrowser {
    async fn open(&mut self) -> Result<(), BrowserError> {
        if self.fail_open {
            return Err(BrowserError::session("scripted open failure"));
        }
        self.opened = true;
        Ok(())
    }

    async fn navigate(&mut self, url: &str) -> Result<PageState, BrowserError> {
        self.check("navigate")?;
        self.record(format!("navigate {url}"));
        self.advance(url);
        Ok(self.current.clone())
    }

    async fn fill(&mut self, locator: &str, value: &str) -> Result<(), BrowserError> {
        self.check("fill")?;
        self.record(format!("fill {locator}={value}"));
        Ok(())
    }

    async fn fill_fields(&mut self, fields: &BTreeMap<String, String>) -> Result<(), BrowserError> {
        self.check("fill")?;
        self.record(format!("fill_fields {}", fields.len()));
        Ok(())
    }

    async fn click(&mut self, locator: &str) -> Result<(), BrowserError> {
        self.check("click")?;
        self.record(format!("click {locator}"));
        let url = self.current.url.clone();
        self.advance(&url);
        Ok(())
    }

    async fn select_option(&mut self, locator: &str, value: &str) -> Result<(), BrowserError> {
        self.check("select")?;
        self.record(format!("select {locator}={value}"));
        Ok(())
    }

    async fn submit_form(&mut self, locator: &str) -> Result<(), BrowserError> {
        self.check("submit")?;
        self.record(format!("submit {locator}"));
        let url = self.current.url.clone();
        self.advance(&url);
        Ok(())
    }

    async fn wait_for(&mut self, locator: &str, timeout_ms: u64) -> Result<(), BrowserError> {
        self.check("wait")?;
        self.record(format!("wait {locator} {timeout_ms}"));
        Ok(())
    }

    async fn extract_text(&mut self, locator: &str) -> Result<String, BrowserError> {
        self.check("extract")?;
        self.record(format!("extract {locator}"));
        Ok(format!("text of {locator}"))
    }

    async fn screenshot(&mut self, path: &Path) -> Result<String, BrowserError> {
        self.check("screenshot")?;
        let saved = path.display().to_string();
        self.record(format!("screenshot {saved}"));
        Ok(saved)
    }

    async fn page_state(&mut self) -> Result<PageState, BrowserError> {
        self.check("page_state")?;
        Ok(self.current.clone())
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        self.closed = true;
        Ok(())
    }
}
