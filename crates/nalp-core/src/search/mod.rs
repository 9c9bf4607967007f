//! Web search enrichment.
//!
//! Search is best-effort context for the plan prompt, never a hard
//! dependency. Providers return an explicit `Result`; [`search_digest`]
//! collapses any failure into [`FALLBACK_DIGEST`] and is the only place that
//! policy lives. There are no retries.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Digest used whenever search produced nothing usable.
pub const FALLBACK_DIGEST: &str = "No live search results available. Rely on internal knowledge.";

/// One search result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub title: String,
    pub body: String,
}

/// Errors from a search provider.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("search returned status {0}")]
    Status(u16),

    #[error("malformed search page: {0}")]
    Malformed(String),

    #[error("search returned no results")]
    Empty,
}

/// A web search backend.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Return up to `max_results` hits for `query`.
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchError>;
}

/// Flatten hits into the prompt digest, one `- {title}: {body}` line each.
pub fn format_digest(hits: &[SearchHit]) -> String {
    hits.iter()
        .map(|h| format!("- {}: {}", h.title, h.body))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Run a search and return its digest, or [`FALLBACK_DIGEST`] on any failure.
///
/// `None` means search is disabled; the fallback is returned without a call.
pub async fn search_digest(
    provider: Option<&dyn SearchProvider>,
    query: &str,
    max_results: usize,
) -> String {
    let Some(provider) = provider else {
        debug!("search disabled, using fallback digest");
        return FALLBACK_DIGEST.to_string();
    };

    debug!(%query, max_results, "searching");
    match provider.search(query, max_results).await {
        Ok(hits) if !hits.is_empty() => format_digest(&hits),
        Ok(_) => {
            warn!(%query, "search returned no results, using fallback digest");
            FALLBACK_DIGEST.to_string()
        }
        Err(e) => {
            warn!(%query, error = %e, "search failed, using fallback digest");
            FALLBACK_DIGEST.to_string()
        }
    }
}

// ---------------------------------------------------------------------------
// DuckDuckGo
// ---------------------------------------------------------------------------

/// Search configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchConfig {
    /// Disable to skip the network call and always use the fallback digest.
    pub enabled: bool,
    /// URL of the HTML results page; the query is sent as `q`.
    pub base_url: String,
    /// Hits folded into the digest.
    pub max_results: usize,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "https://html.duckduckgo.com/html/".to_string(),
            max_results: 3,
            timeout_secs: 10,
        }
    }
}

/// The HTML endpoint serves an anomaly page to clients without a browser
/// user agent.
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";

/// DuckDuckGo web results, scraped from the HTML endpoint.
pub struct DuckDuckGoSearch {
    base_url: String,
    http: Client,
}

impl DuckDuckGoSearch {
    pub fn from_config(config: &SearchConfig) -> Result<Self, SearchError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            base_url: config.base_url.clone(),
            http,
        })
    }
}

fn selector(css: &str) -> Result<Selector, SearchError> {
    Selector::parse(css).map_err(|e| SearchError::Malformed(format!("selector {css:?}: {e:?}")))
}

/// Text content with inline markup removed and whitespace collapsed.
fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Extract up to `max_results` organic hits from a results page.
///
/// Ads and blocks without a title link are skipped. A page without the
/// results container (a captcha or an error page) is malformed; a results
/// page with no hits yields an empty list.
fn parse_results(html: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchError> {
    let container = selector("#links, .no-results")?;
    let block = selector("div.result")?;
    let title_link = selector("a.result__a")?;
    let snippet = selector(".result__snippet")?;

    let document = Html::parse_document(html);
    if document.select(&container).next().is_none() {
        return Err(SearchError::Malformed(
            "page has no results container".to_string(),
        ));
    }

    let hits = document
        .select(&block)
        .filter(|b| !b.value().classes().any(|c| c == "result--ad"))
        .filter_map(|b| {
            let title = b.select(&title_link).next().map(element_text)?;
            if title.is_empty() {
                return None;
            }
            let body = b.select(&snippet).next().map(element_text).unwrap_or_default();
            Some(SearchHit { title, body })
        })
        .take(max_results)
        .collect();
    Ok(hits)
}

#[async_trait]
impl SearchProvider for DuckDuckGoSearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchError> {
        let response = self
            .http
            .get(&self.base_url)
            .query(&[("q", query)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::Status(status.as_u16()));
        }

        let page = response.text().await?;
        let hits = parse_results(&page, max_results)?;
        debug!(count = hits.len(), "parsed search results");
        if hits.is_empty() {
            return Err(SearchError::Empty);
        }
        Ok(hits)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::response::Html as HtmlBody;
    use axum::routing::get;
    use std::collections::HashMap;

    const RESULTS_PAGE: &str = include_str!("fixtures/duckduckgo_html.html");

    struct FixedSearch(Result<Vec<SearchHit>, fn() -> SearchError>);

    #[async_trait]
    impl SearchProvider for FixedSearch {
        async fn search(&self, _query: &str, _max: usize) -> Result<Vec<SearchHit>, SearchError> {
            match &self.0 {
                Ok(hits) => Ok(hits.clone()),
                Err(make) => Err(make()),
            }
        }
    }

    fn hit(title: &str, body: &str) -> SearchHit {
        SearchHit {
            title: title.to_string(),
            body: body.to_string(),
        }
    }

    #[test]
    fn digest_is_one_line_per_hit() {
        let digest = format_digest(&[hit("Supabase", "Postgres as a service"), hit("Clerk", "Auth")]);
        assert_eq!(digest, "- Supabase: Postgres as a service\n- Clerk: Auth");
    }

    #[tokio::test]
    async fn digest_falls_back_on_error() {
        let provider = FixedSearch(Err(|| SearchError::Status(502)));
        let digest = search_digest(Some(&provider), "q", 3).await;
        assert_eq!(digest, FALLBACK_DIGEST);
    }

    #[tokio::test]
    async fn digest_falls_back_on_empty() {
        let provider = FixedSearch(Ok(vec![]));
        assert_eq!(search_digest(Some(&provider), "q", 3).await, FALLBACK_DIGEST);
    }

    #[tokio::test]
    async fn digest_falls_back_when_disabled() {
        assert_eq!(search_digest(None, "q", 3).await, FALLBACK_DIGEST);
    }

    #[tokio::test]
    async fn digest_uses_hits() {
        let provider = FixedSearch(Ok(vec![hit("A", "b")]));
        assert_eq!(search_digest(Some(&provider), "q", 3).await, "- A: b");
    }

    #[test]
    fn results_page_yields_organic_hits_in_order() {
        let hits = parse_results(RESULTS_PAGE, 3).unwrap();
        assert_eq!(
            hits,
            vec![
                hit(
                    "The best no-code app builders in 2026 | Zapier",
                    "We tested dozens of no-code app builders. Bubble and FlutterFlow came out on top for fitness and tracking apps."
                ),
                hit(
                    "How to build a fitness tracking app without code - FlutterFlow",
                    "Use Firebase for auth and workout logs, then publish to iOS and Android from one project."
                ),
                hit("Supabase Docs", ""),
            ]
        );
    }

    #[test]
    fn results_page_skips_ads_and_honors_limit() {
        let hits = parse_results(RESULTS_PAGE, 10).unwrap();
        assert_eq!(hits.len(), 4);
        assert!(hits.iter().all(|h| !h.title.contains("Sponsored")));
        assert_eq!(hits[3].title, "Which no-code tool for a workout tracker? : r/nocode");
        assert!(parse_results(RESULTS_PAGE, 0).unwrap().is_empty());
    }

    #[test]
    fn no_results_page_is_empty_not_malformed() {
        let page = r#"<html><body><div id="links" class="results">
            <div class="no-results">No results.</div></div></body></html>"#;
        assert!(parse_results(page, 3).unwrap().is_empty());
    }

    #[test]
    fn page_without_results_container_is_malformed() {
        let page = "<html><body><form id=\"challenge-form\">Are you a robot?</form></body></html>";
        assert!(matches!(parse_results(page, 3), Err(SearchError::Malformed(_))));
    }

    async fn spawn_server(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn config_for(base: &str) -> SearchConfig {
        SearchConfig {
            base_url: format!("{base}/html/"),
            ..SearchConfig::default()
        }
    }

    #[tokio::test]
    async fn duckduckgo_sends_query_and_parses_hits() {
        let app = Router::new().route(
            "/html/",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                if params.get("q").map(String::as_str) == Some("todo apps") {
                    (StatusCode::OK, HtmlBody(RESULTS_PAGE))
                } else {
                    (StatusCode::BAD_REQUEST, HtmlBody("missing query"))
                }
            }),
        );
        let base = spawn_server(app).await;
        let search = DuckDuckGoSearch::from_config(&config_for(&base)).unwrap();

        let hits = search.search("todo apps", 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[1].title, "How to build a fitness tracking app without code - FlutterFlow");
    }

    #[tokio::test]
    async fn duckduckgo_no_results_is_an_error() {
        let app = Router::new().route(
            "/html/",
            get(|| async { HtmlBody(r#"<div id="links"><div class="no-results">No results.</div></div>"#) }),
        );
        let base = spawn_server(app).await;
        let search = DuckDuckGoSearch::from_config(&config_for(&base)).unwrap();

        assert!(matches!(search.search("x", 3).await, Err(SearchError::Empty)));
    }

    #[tokio::test]
    async fn duckduckgo_error_status_is_an_error() {
        let app = Router::new().route(
            "/html/",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "busy") }),
        );
        let base = spawn_server(app).await;
        let search = DuckDuckGoSearch::from_config(&config_for(&base)).unwrap();

        assert!(matches!(search.search("x", 3).await, Err(SearchError::Status(503))));
    }
}
