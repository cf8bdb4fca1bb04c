use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{SearchBackend, SearchError, SourceResult};
use crate::config::{DEFAULT_FIRECRAWL_URL, DEFAULT_SEARCH_TIMEOUT_SECS};

/// Firecrawl search client.
///
/// Uses `/v1/search` with markdown scraping, so every hit comes back with
/// the page content attached.
pub struct FirecrawlClient {
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
    client: Client,
}

impl FirecrawlClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            timeout: Duration::from_secs(DEFAULT_SEARCH_TIMEOUT_SECS),
            client: Client::new(),
        }
    }

    /// Client for the hosted API.
    pub fn hosted(api_key: impl Into<String>) -> Self {
        Self::new(DEFAULT_FIRECRAWL_URL, Some(api_key.into()))
    }

    /// Server-side scrape timeout sent with each request.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl SearchBackend for FirecrawlClient {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SourceResult>, SearchError> {
        let url = format!("{}/v1/search", self.base_url);
        let body = SearchRequest {
            query,
            limit: max_results,
            timeout: self.timeout.as_millis() as u64,
            scrape_options: ScrapeOptions {
                formats: vec!["markdown"],
            },
        };

        let mut req = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        debug!(url = %url, query = %query, limit = max_results, "Sending Firecrawl search");
        let response = req.send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SearchError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| SearchError::ParseError(e.to_string()))?;

        if !parsed.success {
            return Err(SearchError::ApiError {
                status: status.as_u16(),
                message: parsed.error.unwrap_or_else(|| "search unsuccessful".to_string()),
            });
        }

        // Hits without a URL or scraped content are useless downstream.
        let results = parsed
            .data
            .into_iter()
            .filter_map(|item| {
                let url = item.url.filter(|u| !u.is_empty())?;
                let content = item.markdown.filter(|c| !c.trim().is_empty())?;
                Some(SourceResult { url, content })
            })
            .collect();

        Ok(results)
    }
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    limit: usize,
    timeout: u64,
    #[serde(rename = "scrapeOptions")]
    scrape_options: ScrapeOptions,
}

#[derive(Debug, Serialize)]
struct ScrapeOptions {
    formats: Vec<&'static str>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Vec<SearchItem>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    url: Option<String>,
    markdown: Option<String>,
}
