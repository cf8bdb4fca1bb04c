//! Web search and content retrieval.

mod firecrawl;

pub use firecrawl::FirecrawlClient;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::budget::PromptBudgeter;
use crate::config::SearchConfig;
use crate::research::{Retriever, SearchQuery};

/// A retrieved document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceResult {
    pub url: String,
    pub content: String,
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Missing API key for search provider '{0}'")]
    MissingApiKey(String),

    #[error("Unknown search provider: {0}")]
    UnknownProvider(String),

    #[error("Search API returned error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Failed to parse search response: {0}")]
    ParseError(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Search timed out after {0}s")]
    Timeout(u64),
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        SearchError::Network(err.to_string())
    }
}

/// A web search API that returns page content alongside URLs.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SourceResult>, SearchError>;
}

/// Builds the search backend named in the configuration.
pub fn backend_from_config(config: &SearchConfig) -> Result<Arc<dyn SearchBackend>, SearchError> {
    match config.provider.as_str() {
        "firecrawl" => {
            let key = config.api_key.clone().filter(|k| !k.is_empty());
            let base_url = config.base_url_or_default();
            // Self-hosted instances may run without auth.
            if key.is_none() && base_url == crate::config::DEFAULT_FIRECRAWL_URL {
                return Err(SearchError::MissingApiKey("firecrawl".to_string()));
            }
            Ok(Arc::new(
                FirecrawlClient::new(base_url, key).with_timeout(config.timeout()),
            ))
        }
        other => Err(SearchError::UnknownProvider(other.to_string())),
    }
}

/// Runs one search per query, bounded by a timeout, and fits each
/// document's content into the content token budget.
pub struct ContentRetriever {
    backend: Arc<dyn SearchBackend>,
    budgeter: PromptBudgeter,
    max_results: usize,
    timeout_secs: u64,
    content_token_budget: usize,
}

impl ContentRetriever {
    pub fn new(backend: Arc<dyn SearchBackend>, budgeter: PromptBudgeter) -> Self {
        Self {
            backend,
            budgeter,
            max_results: crate::config::DEFAULT_SEARCH_MAX_RESULTS,
            timeout_secs: crate::config::DEFAULT_SEARCH_TIMEOUT_SECS,
            content_token_budget: crate::config::DEFAULT_CONTENT_TOKEN_BUDGET,
        }
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_content_token_budget(mut self, budget: usize) -> Self {
        self.content_token_budget = budget;
        self
    }
}

#[async_trait]
impl Retriever for ContentRetriever {
    async fn retrieve(&self, query: &SearchQuery) -> Result<Vec<SourceResult>, SearchError> {
        let search = self.backend.search(&query.query, self.max_results);
        let results = tokio::time::timeout(std::time::Duration::from_secs(self.timeout_secs), search)
            .await
            .map_err(|_| {
                warn!(query = %query.query, timeout_secs = self.timeout_secs, "Search timed out");
                SearchError::Timeout(self.timeout_secs)
            })??;

        debug!(query = %query.query, count = results.len(), "Search returned");

        Ok(results
            .into_iter()
            .take(self.max_results)
            .map(|r| SourceResult {
                content: self.budgeter.trim(&r.content, self.content_token_budget),
                url: r.url,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    struct SlowBackend;

    #[async_trait]
    impl SearchBackend for SlowBackend {
        async fn search(&self, _query: &str, _max: usize) -> Result<Vec<SourceResult>, SearchError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(vec![])
        }
    }

    struct StaticBackend(Vec<SourceResult>);

    #[async_trait]
    impl SearchBackend for StaticBackend {
        async fn search(&self, _query: &str, _max: usize) -> Result<Vec<SourceResult>, SearchError> {
            Ok(self.0.clone())
        }
    }

    fn query() -> SearchQuery {
        SearchQuery {
            query: "capital of france".into(),
            research_goal: "find it".into(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout() {
        let retriever = ContentRetriever::new(Arc::new(SlowBackend), PromptBudgeter::approximate())
            .with_timeout_secs(1);
        let result = retriever.retrieve(&query()).await;
        assert!(matches!(result, Err(SearchError::Timeout(1))));
    }

    #[tokio::test]
    async fn test_content_is_budgeted() {
        let long = "word ".repeat(2000);
        let backend = StaticBackend(vec![SourceResult {
            url: "https://example.com".into(),
            content: long.clone(),
        }]);
        let retriever = ContentRetriever::new(Arc::new(backend), PromptBudgeter::approximate())
            .with_content_token_budget(100);
        let results = retriever.retrieve(&query()).await.unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].content.len() < long.len());
    }

    #[tokio::test]
    async fn test_max_results_enforced() {
        let docs = (0..8)
            .map(|i| SourceResult {
                url: format!("https://example.com/{}", i),
                content: "text".into(),
            })
            .collect();
        let retriever = ContentRetriever::new(Arc::new(StaticBackend(docs)), PromptBudgeter::approximate())
            .with_max_results(3);
        assert_eq!(retriever.retrieve(&query()).await.unwrap().len(), 3);
    }

    #[test]
    fn test_backend_requires_key_for_hosted() {
        let config = SearchConfig::default();
        assert!(matches!(
            backend_from_config(&config),
            Err(SearchError::MissingApiKey(_))
        ));
    }

    #[test]
    fn test_unknown_backend() {
        let config = SearchConfig {
            provider: "bing".into(),
            ..SearchConfig::default()
        };
        assert!(matches!(
            backend_from_config(&config),
            Err(SearchError::UnknownProvider(_))
        ));
    }
}
