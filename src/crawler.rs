//! Same-domain crawler that seeds the knowledge base before a task runs.
//!
//! Breadth-first with a depth limit, a per-level page budget, and a capped
//! frontier, so a crawl over an unfamiliar site always terminates quickly.

use std::collections::HashSet;
use std::time::Duration;

use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;
use webagent_core_types::PAGE_HTML_LIMIT;

static FORM_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("form").expect("static selector"));
static FIELD_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("input, textarea, select").expect("static selector"));
static LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("static selector"));
static TITLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("title").expect("static selector"));

/// Errors raised while crawling.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("crawler client error: {0}")]
    Client(String),

    #[error("fetch failed for {url}: {message}")]
    Fetch { url: String, message: String },
}

/// One named field of an inventoried form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    pub required: bool,
}

/// Form inventory entry extracted from a crawled page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormInfo {
    pub id: String,
    pub action: String,
    pub method: String,
    pub fields: Vec<FieldInfo>,
}

/// One successfully crawled page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawledPage {
    pub url: String,
    pub title: String,
    /// Truncated to the shared snapshot limit.
    pub html: String,
    pub forms: Vec<FormInfo>,
}

/// Crawl budget knobs.
#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    /// Link-following depth from the start URL.
    pub depth: usize,
    /// Pages fetched per depth level.
    pub pages_per_level: usize,
    /// Maximum frontier carried to the next level.
    pub frontier_limit: usize,
    pub timeout_ms: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            depth: 2,
            pages_per_level: 5,
            frontier_limit: 10,
            timeout_ms: 15_000,
        }
    }
}

/// Breadth-first same-domain crawler.
pub struct Crawler {
    client: Client,
    config: CrawlerConfig,
    domain: String,
}

impl Crawler {
    pub fn new(domain: impl Into<String>, config: CrawlerConfig) -> Result<Self, CrawlError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|err| CrawlError::Client(err.to_string()))?;
        Ok(Self {
            client,
            config,
            domain: domain.into(),
        })
    }

    /// Crawl starting from the domain root URL. Per-page failures are
    /// logged and skipped; the crawl itself never fails.
    pub async fn crawl(&self) -> Vec<CrawledPage> {
        let mut visited: HashSet<String> = HashSet::new();
        let mut pages = Vec::new();
        let mut to_visit = vec![self.domain.clone()];

        for depth in 0..self.config.depth {
            let mut next_level = Vec::new();

            for url in to_visit.iter().take(self.config.pages_per_level) {
                if !visited.insert(url.clone()) {
                    continue;
                }
                match self.fetch_page(url).await {
                    Ok(page) => {
                        debug!(url = %page.url, forms = page.forms.len(), "crawled page");
                        for link in extract_links(&page.url, &page.html) {
                            if same_domain(&self.domain, &link) && !visited.contains(&link) {
                                next_level.push(link);
                            }
                        }
                        pages.push(page);
                    }
                    Err(err) => warn!(url = %url, error = %err, "skipping page"),
                }
            }

            next_level.sort();
            next_level.dedup();
            next_level.truncate(self.config.frontier_limit);
            to_visit = next_level;
            if to_visit.is_empty() {
                debug!(depth = depth + 1, "frontier exhausted");
                break;
            }
        }

        info!(pages = pages.len(), "crawl complete");
        pages
    }

    async fn fetch_page(&self, url: &str) -> Result<CrawledPage, CrawlError> {
        let response = self.client.get(url).send().await.map_err(|err| {
            CrawlError::Fetch {
                url: url.to_string(),
                message: err.to_string(),
            }
        })?;

        let final_url = response.url().to_string();
        let html = response.text().await.map_err(|err| CrawlError::Fetch {
            url: url.to_string(),
            message: err.to_string(),
        })?;

        if html.len() < 100 {
            return Err(CrawlError::Fetch {
                url: url.to_string(),
                message: "empty page content".to_string(),
            });
        }

        let mut truncated = html;
        truncated.truncate(floor_char_boundary(&truncated, PAGE_HTML_LIMIT));

        Ok(CrawledPage {
            title: extract_title(&truncated),
            forms: extract_forms(&truncated),
            url: final_url,
            html: truncated,
        })
    }
}

fn floor_char_boundary(value: &str, limit: usize) -> usize {
    if value.len() <= limit {
        return value.len();
    }
    let mut end = limit;
    while end > 0 && !value.is_char_boundary(end) {
        end -= 1;
    }
    end
}

/// True when `candidate` shares the start URL's host.
pub fn same_domain(domain: &str, candidate: &str) -> bool {
    match (Url::parse(domain), Url::parse(candidate)) {
        (Ok(base), Ok(other)) => base.host_str() == other.host_str(),
        _ => false,
    }
}

pub fn extract_title(html: &str) -> String {
    let document = Html::parse_document(html);
    document
        .select(&TITLE_SELECTOR)
        .next()
        .map(|title| title.text().collect::<String>().trim().to_string())
        .unwrap_or_else(|| "No title".to_string())
}

/// Inventory the named form fields of a page; forms without named fields
/// are dropped.
pub fn extract_forms(html: &str) -> Vec<FormInfo> {
    let document = Html::parse_document(html);
    let mut forms = Vec::new();

    for form in document.select(&FORM_SELECTOR) {
        let mut info = FormInfo {
            id: form
                .value()
                .attr("id")
                .unwrap_or("form-unknown")
                .to_string(),
            action: form.value().attr("action").unwrap_or_default().to_string(),
            method: form
                .value()
                .attr("method")
                .unwrap_or("GET")
                .to_uppercase(),
            fields: Vec::new(),
        };

        for field in form.select(&FIELD_SELECTOR) {
            if let Some(name) = field.value().attr("name") {
                info.fields.push(FieldInfo {
                    name: name.to_string(),
                    field_type: field.value().attr("type").unwrap_or("text").to_string(),
                    required: field.value().attr("required").is_some(),
                });
            }
        }

        if !info.fields.is_empty() {
            forms.push(info);
        }
    }
    forms
}

/// Absolute same-page links resolved against `base`.
pub fn extract_links(base: &str, html: &str) -> Vec<String> {
    let Ok(base_url) = Url::parse(base) else {
        return Vec::new();
    };
    let document = Html::parse_document(html);
    let mut links = Vec::new();

    for anchor in document.select(&LINK_SELECTOR) {
        if let Some(href) = anchor.value().attr("href") {
            if let Ok(resolved) = base_url.join(href) {
                links.push(resolved.to_string());
            }
        }
    }
    links
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOGIN_HTML: &str = r#"
        <html><head><title>LMS Login</title></head><body>
        <form id="login" action="/login/index.php" method="post">
            <input type="text" name="username" required>
            <input type="password" name="password" required>
            <input type="hidden" name="token" value="abc">
            <input type="submit" value="Log in">
        </form>
        <form id="search"><button>go</button></form>
        <a href="/help">Help</a>
        <a href="https://other.example/away">Away</a>
        </body></html>"#;

    #[test]
    fn same_domain_compares_hosts() {
        assert!(same_domain(
            "https://lms.example/login",
            "https://lms.example/help"
        ));
        assert!(!same_domain(
            "https://lms.example/login",
            "https://other.example/x"
        ));
        assert!(!same_domain("not a url", "https://lms.example"));
    }

    #[test]
    fn title_extraction_falls_back() {
        assert_eq!(extract_title(LOGIN_HTML), "LMS Login");
        assert_eq!(extract_title("<p>untitled</p>"), "No title");
    }

    #[test]
    fn forms_without_named_fields_are_dropped() {
        let forms = extract_forms(LOGIN_HTML);
        assert_eq!(forms.len(), 1);
        assert_eq!(forms[0].id, "login");
        assert_eq!(forms[0].method, "POST");
        let names: Vec<&str> = forms[0].fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["username", "password", "token"]);
        assert!(forms[0].fields[0].required);
        assert!(!forms[0].fields[2].required);
    }

    #[test]
    fn links_resolve_against_base() {
        let links = extract_links("https://lms.example/login", LOGIN_HTML);
        assert!(links.contains(&"https://lms.example/help".to_string()));
        assert!(links.contains(&"https://other.example/away".to_string()));
    }

    #[test]
    fn char_boundary_floor_is_safe() {
        let text = "aé".repeat(10);
        let end = floor_char_boundary(&text, 3);
        assert!(text.is_char_boundary(end));
        assert!(end <= 3);
    }
}
