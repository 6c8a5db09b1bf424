//! Fetch-based browser driver.
//!
//! Models a page session over plain HTTP GET/POST with HTML parsing:
//! fills are tracked as pending form values, a click or submit posts the
//! page's form with those values, and screenshots persist the current HTML.
//! Enough surface for form-login flows without a real browser engine.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use agent_core::{BrowserDriver, BrowserError};
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::{debug, info};
use url::Url;
use webagent_core_types::PageState;

/// Driver settings.
#[derive(Debug, Clone)]
pub struct HttpBrowserConfig {
    pub timeout_ms: u64,
    pub user_agent: String,
}

impl Default for HttpBrowserConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            user_agent: format!("webagent/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// One HTTP page session: current document plus pending form values.
pub struct HttpBrowser {
    config: HttpBrowserConfig,
    client: Option<Client>,
    current_url: String,
    current_title: String,
    current_html: String,
    form_values: BTreeMap<String, String>,
}

impl HttpBrowser {
    pub fn new(config: HttpBrowserConfig) -> Self {
        Self {
            config,
            client: None,
            current_url: String::new(),
            current_title: String::new(),
            current_html: String::new(),
            form_values: BTreeMap::new(),
        }
    }

    fn client(&self) -> Result<&Client, BrowserError> {
        self.client
            .as_ref()
            .ok_or_else(|| BrowserError::session("browser session not initialized"))
    }

    fn snapshot(&self) -> PageState {
        PageState::new(&self.current_url, &self.current_title, &self.current_html)
    }

    fn adopt_page(&mut self, url: String, html: String) {
        self.current_title = extract_title(&html);
        self.current_url = url;
        self.current_html = html;
        self.form_values.clear();
    }

    async fn fetch(&mut self, url: &str) -> Result<(), BrowserError> {
        let response = self
            .client()?
            .get(url)
            .send()
            .await
            .map_err(|err| BrowserError::action(format!("GET {url} failed: {err}")))?;

        let final_url = response.url().to_string();
        let html = response
            .text()
            .await
            .map_err(|err| BrowserError::action(format!("read of {url} failed: {err}")))?;

        debug!(url = %final_url, bytes = html.len(), "page fetched");
        self.adopt_page(final_url, html);
        Ok(())
    }

    /// Submit the page's form with the pending values overlaid on the
    /// document's own defaults (hidden tokens and prefills survive).
    async fn submit_current_form(&mut self) -> Result<(), BrowserError> {
        let submission = build_submission(&self.current_html, &self.current_url, &self.form_values)?;
        info!(
            url = %submission.url,
            method = %submission.method,
            fields = submission.fields.len(),
            "submitting form"
        );

        let client = self.client()?;
        let request = if submission.method == "post" {
            client.post(&submission.url).form(&submission.fields)
        } else {
            let pairs: Vec<(&String, &String)> = submission.fields.iter().collect();
            client.get(&submission.url).query(&pairs)
        };

        let response = request
            .send()
            .await
            .map_err(|err| BrowserError::action(format!("form submission failed: {err}")))?;

        let final_url = response.url().to_string();
        let html = response
            .text()
            .await
            .map_err(|err| BrowserError::action(format!("submission read failed: {err}")))?;
        self.adopt_page(final_url, html);
        Ok(())
    }

    #[cfg(test)]
    fn set_page(&mut self, url: &str, html: &str) {
        self.current_url = url.to_string();
        self.current_title = extract_title(html);
        self.current_html = html.to_string();
    }

    #[cfg(test)]
    fn pending_values(&self) -> &BTreeMap<String, String> {
        &self.form_values
    }
}

#[async_trait]
impl BrowserDriver for HttpBrowser {
    async fn open(&mut self) -> Result<(), BrowserError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(self.config.timeout_ms))
            .user_agent(self.config.user_agent.clone())
            .cookie_store(true)
            .build()
            .map_err(|err| BrowserError::session(format!("failed to build client: {err}")))?;
        self.client = Some(client);
        info!("browser session initialized");
        Ok(())
    }

    async fn navigate(&mut self, url: &str) -> Result<PageState, BrowserError> {
        self.fetch(url).await?;
        Ok(self.snapshot())
    }

    async fn fill(&mut self, locator: &str, value: &str) -> Result<(), BrowserError> {
        let name = resolve_field_name(&self.current_html, locator)
            .ok_or_else(|| BrowserError::not_found(locator.to_string()))?;
        debug!(field = %name, "fill recorded");
        self.form_values.insert(name, value.to_string());
        Ok(())
    }

    async fn fill_fields(&mut self, fields: &BTreeMap<String, String>) -> Result<(), BrowserError> {
        for (name, value) in fields {
            self.form_values.insert(name.clone(), value.clone());
        }
        Ok(())
    }

    async fn click(&mut self, locator: &str) -> Result<(), BrowserError> {
        if let Some(href) = find_link_href(&self.current_html, locator) {
            let resolved = resolve_url(&self.current_url, &href)?;
            self.fetch(&resolved).await?;
            return Ok(());
        }
        if locator_matches(&self.current_html, locator) {
            return self.submit_current_form().await;
        }
        Err(BrowserError::not_found(locator.to_string()))
    }

    async fn select_option(&mut self, locator: &str, value: &str) -> Result<(), BrowserError> {
        let name = resolve_field_name(&self.current_html, locator)
            .ok_or_else(|| BrowserError::not_found(locator.to_string()))?;
        self.form_values.insert(name, value.to_string());
        Ok(())
    }

    async fn submit_form(&mut self, _locator: &str) -> Result<(), BrowserError> {
        self.submit_current_form().await
    }

    async fn wait_for(&mut self, locator: &str, timeout_ms: u64) -> Result<(), BrowserError> {
        if locator_matches(&self.current_html, locator) {
            return Ok(());
        }
        // One bounded re-fetch: a fetch driver has no rendering to await.
        let url = self.current_url.clone();
        let response = self
            .client()?
            .get(&url)
            .timeout(Duration::from_millis(timeout_ms))
            .send()
            .await
            .map_err(|err| BrowserError::action(format!("wait refetch failed: {err}")))?;
        let final_url = response.url().to_string();
        let html = response
            .text()
            .await
            .map_err(|err| BrowserError::action(format!("wait read failed: {err}")))?;
        self.adopt_page(final_url, html);

        if locator_matches(&self.current_html, locator) {
            Ok(())
        } else {
            Err(BrowserError::not_found(locator.to_string()))
        }
    }

    async fn extract_text(&mut self, locator: &str) -> Result<String, BrowserError> {
        extract_element_text(&self.current_html, locator)
            .ok_or_else(|| BrowserError::not_found(locator.to_string()))
    }

    async fn screenshot(&mut self, path: &Path) -> Result<String, BrowserError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| BrowserError::action(format!("artifact dir failed: {err}")))?;
        }
        tokio::fs::write(path, self.current_html.as_bytes())
            .await
            .map_err(|err| BrowserError::action(format!("artifact write failed: {err}")))?;
        info!(path = %path.display(), "page snapshot saved");
        Ok(path.display().to_string())
    }

    async fn page_state(&mut self) -> Result<PageState, BrowserError> {
        Ok(self.snapshot())
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        self.client = None;
        self.form_values.clear();
        info!("browser session closed");
        Ok(())
    }
}

/// A form submission derived from the current document.
#[derive(Debug, Clone, PartialEq, Eq)]
struct FormSubmission {
    url: String,
    method: String,
    fields: BTreeMap<String, String>,
}

/// Split a locator into its comma-joined fallback candidates.
fn locator_candidates(locator: &str) -> Vec<&str> {
    locator
        .split(',')
        .map(str::trim)
        .filter(|candidate| !candidate.is_empty())
        .collect()
}

/// First candidate that parses as CSS and matches an element. Candidates
/// in non-CSS dialects (e.g. `:has-text(...)`) are skipped.
fn first_match<'a>(
    document: &'a Html,
    locator: &str,
) -> Option<scraper::ElementRef<'a>> {
    for candidate in locator_candidates(locator) {
        if let Ok(selector) = Selector::parse(candidate) {
            if let Some(element) = document.select(&selector).next() {
                return Some(element);
            }
        }
    }
    None
}

fn locator_matches(html: &str, locator: &str) -> bool {
    let document = Html::parse_document(html);
    first_match(&document, locator).is_some()
}

/// Resolve a locator to the form-field name the submission should carry:
/// the element's `name` attribute, falling back to its `id`.
fn resolve_field_name(html: &str, locator: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let element = first_match(&document, locator)?;
    element
        .value()
        .attr("name")
        .or_else(|| element.value().attr("id"))
        .map(str::to_string)
}

fn find_link_href(html: &str, locator: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let element = first_match(&document, locator)?;
    if element.value().name() == "a" {
        return element.value().attr("href").map(str::to_string);
    }
    None
}

fn extract_element_text(html: &str, locator: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let element = first_match(&document, locator)?;
    Some(element.text().collect::<String>().trim().to_string())
}

fn extract_title(html: &str) -> String {
    crate::crawler::extract_title(html)
}

fn resolve_url(base: &str, href: &str) -> Result<String, BrowserError> {
    let base_url = Url::parse(base)
        .map_err(|err| BrowserError::action(format!("invalid base url {base}: {err}")))?;
    base_url
        .join(href)
        .map(|joined| joined.to_string())
        .map_err(|err| BrowserError::action(format!("invalid link target {href}: {err}")))
}

/// Build the submission for the page's first form: document defaults
/// (hidden tokens, prefills) overlaid with the tracked values.
fn build_submission(
    html: &str,
    base_url: &str,
    overrides: &BTreeMap<String, String>,
) -> Result<FormSubmission, BrowserError> {
    let document = Html::parse_document(html);
    let form_selector = Selector::parse("form").expect("static selector");
    let input_selector = Selector::parse("input[name], textarea[name], select[name]")
        .expect("static selector");

    let form = document
        .select(&form_selector)
        .next()
        .ok_or_else(|| BrowserError::action("no form on current page"))?;

    let mut fields = BTreeMap::new();
    for input in form.select(&input_selector) {
        let Some(name) = input.value().attr("name") else {
            continue;
        };
        let value = input.value().attr("value").unwrap_or_default().to_string();
        fields.insert(name.to_string(), value);
    }
    for (name, value) in overrides {
        fields.insert(name.clone(), value.clone());
    }

    let action = form.value().attr("action").unwrap_or_default();
    let url = if action.is_empty() {
        base_url.to_string()
    } else {
        resolve_url(base_url, action)?
    };
    let method = form
        .value()
        .attr("method")
        .unwrap_or("get")
        .to_lowercase();

    Ok(FormSubmission {
        url,
        method,
        fields,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const HN_LOGIN: &str = r#"
        <html><head><title>Login | Hacker News</title></head><body>
        <form action="login" method="post">
            <input type="hidden" name="goto" value="news">
            <input type="text" name="acct">
            <input type="password" name="pw">
            <input type="submit" value="login">
        </form>
        <a href="forgot?id=">Forgot your password?</a>
        </body></html>"#;

    #[test]
    fn resolves_field_name_through_fallback_list() {
        let locator = "input[name='acct'], input[name='username'], #username, #email";
        assert_eq!(
            resolve_field_name(HN_LOGIN, locator),
            Some("acct".to_string())
        );
    }

    #[test]
    fn field_name_falls_back_to_id() {
        let html = "<input id=\"username\" type=\"text\">";
        assert_eq!(
            resolve_field_name(html, "#username"),
            Some("username".to_string())
        );
    }

    #[test]
    fn non_css_candidates_are_skipped() {
        let locator = "button:has-text('Log in'), input[type='submit']";
        assert!(locator_matches(HN_LOGIN, locator));
        assert!(!locator_matches("<p>empty</p>", locator));
    }

    #[test]
    fn submission_overlays_tracked_values_on_defaults() {
        let mut overrides = BTreeMap::new();
        overrides.insert("acct".to_string(), "bob".to_string());
        overrides.insert("pw".to_string(), "secret".to_string());

        let submission =
            build_submission(HN_LOGIN, "https://news.ycombinator.com/login", &overrides).unwrap();

        assert_eq!(submission.url, "https://news.ycombinator.com/login");
        assert_eq!(submission.method, "post");
        assert_eq!(submission.fields.get("acct").map(String::as_str), Some("bob"));
        assert_eq!(submission.fields.get("pw").map(String::as_str), Some("secret"));
        // Hidden default survives untouched.
        assert_eq!(submission.fields.get("goto").map(String::as_str), Some("news"));
    }

    #[test]
    fn submission_requires_a_form() {
        let err = build_submission("<p>no forms</p>", "https://a.example", &BTreeMap::new())
            .unwrap_err();
        assert!(err.to_string().contains("no form"));
    }

    #[test]
    fn link_href_is_detected() {
        assert_eq!(
            find_link_href(HN_LOGIN, "a"),
            Some("forgot?id=".to_string())
        );
        assert!(find_link_href(HN_LOGIN, "input[name='acct']").is_none());
    }

    #[tokio::test]
    async fn fill_tracks_pending_value() {
        let mut browser = HttpBrowser::new(HttpBrowserConfig::default());
        browser.set_page("https://news.ycombinator.com/login", HN_LOGIN);

        browser.fill("input[name='acct'], #username", "bob").await.unwrap();

        assert_eq!(
            browser.pending_values().get("acct").map(String::as_str),
            Some("bob")
        );
    }

    #[tokio::test]
    async fn fill_of_missing_field_errors() {
        let mut browser = HttpBrowser::new(HttpBrowserConfig::default());
        browser.set_page("https://a.example", "<p>no inputs</p>");

        let err = browser.fill("#username", "bob").await.unwrap_err();
        assert!(matches!(err, BrowserError::NotFound(_)));
    }

    #[tokio::test]
    async fn screenshot_persists_current_html() {
        let dir = tempfile::tempdir().unwrap();
        let mut browser = HttpBrowser::new(HttpBrowserConfig::default());
        browser.set_page("https://a.example", "<html><body>hi</body></html>");

        let path = dir.path().join("nested").join("step-1.html");
        let saved = browser.screenshot(&path).await.unwrap();

        assert_eq!(saved, path.display().to_string());
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("hi"));
    }

    #[tokio::test]
    async fn network_calls_require_open_session() {
        let mut browser = HttpBrowser::new(HttpBrowserConfig::default());
        let err = browser.navigate("https://a.example").await.unwrap_err();
        assert!(matches!(err, BrowserError::Session(_)));
    }

    #[tokio::test]
    async fn extract_text_reads_element() {
        let mut browser = HttpBrowser::new(HttpBrowserConfig::default());
        browser.set_page("https://a.example", "<h1> Welcome back </h1>");

        assert_eq!(browser.extract_text("h1").await.unwrap(), "Welcome back");
        assert!(browser.extract_text("h2").await.is_err());
    }
}
