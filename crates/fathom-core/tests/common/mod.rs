//! Scripted collaborators shared by the integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use fathom_core::completion::CompletionError;
use fathom_core::llm::{LLMError, StructuredRequest, LLM};
use fathom_core::research::{Extractor, LearningBatch, Planner, Retriever, SearchQuery, SourceResult};
use fathom_core::search::{SearchBackend, SearchError};

/// Model stub answering structured calls by schema name and free-form
/// calls with a fixed text.
pub struct ScriptedLLM {
    pub structured: HashMap<String, String>,
    pub text: String,
    pub calls: AtomicUsize,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedLLM {
    pub fn new(text: &str) -> Self {
        Self {
            structured: HashMap::new(),
            text: text.to_string(),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn respond(mut self, schema_name: &str, json: serde_json::Value) -> Self {
        self.structured.insert(schema_name.to_string(), json.to_string());
        self
    }
}

#[async_trait]
impl LLM for ScriptedLLM {
    async fn complete(&self, prompt: &str) -> Result<String, LLMError> {
        self.complete_with_system("", prompt).await
    }

    async fn complete_with_system(&self, _system: &str, prompt: &str) -> Result<String, LLMError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.text.clone())
    }

    async fn complete_structured(&self, request: StructuredRequest<'_>) -> Result<String, LLMError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(request.prompt.to_string());
        self.structured
            .get(request.schema_name)
            .cloned()
            .ok_or_else(|| LLMError::ParseError(format!("no script for {}", request.schema_name)))
    }
}

/// Model stub that always fails with the given error factory.
pub struct FailingLLM(pub fn() -> LLMError);

#[async_trait]
impl LLM for FailingLLM {
    async fn complete(&self, _prompt: &str) -> Result<String, LLMError> {
        Err((self.0)())
    }

    async fn complete_with_system(&self, _system: &str, _prompt: &str) -> Result<String, LLMError> {
        Err((self.0)())
    }
}

/// Search backend returning fixed documents for every query.
pub struct StaticSearch(pub Vec<SourceResult>);

#[async_trait]
impl SearchBackend for StaticSearch {
    async fn search(&self, _query: &str, _max_results: usize) -> Result<Vec<SourceResult>, SearchError> {
        Ok(self.0.clone())
    }
}

/// Planner returning `breadth` distinct queries and recording each call.
#[derive(Default)]
pub struct FanPlanner {
    pub calls: Mutex<Vec<(String, usize, usize)>>,
}

#[async_trait]
impl Planner for FanPlanner {
    async fn plan(
        &self,
        query: &str,
        prior_learnings: &[String],
        breadth: usize,
    ) -> Result<Vec<SearchQuery>, CompletionError> {
        let index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push((query.to_string(), prior_learnings.len(), breadth));
            calls.len()
        };
        Ok((0..breadth)
            .map(|i| SearchQuery {
                query: format!("q{}-{}", index, i),
                research_goal: format!("goal {}-{}", index, i),
            })
            .collect())
    }
}

/// Planner returning a fixed list of queries.
pub struct ListPlanner(pub Vec<&'static str>);

#[async_trait]
impl Planner for ListPlanner {
    async fn plan(
        &self,
        _query: &str,
        _prior_learnings: &[String],
        breadth: usize,
    ) -> Result<Vec<SearchQuery>, CompletionError> {
        Ok(self
            .0
            .iter()
            .take(breadth)
            .map(|q| SearchQuery {
                query: q.to_string(),
                research_goal: format!("goal for {}", q),
            })
            .collect())
    }
}

/// Planner that always fails.
pub struct BrokenPlanner(pub fn() -> CompletionError);

#[async_trait]
impl Planner for BrokenPlanner {
    async fn plan(
        &self,
        _query: &str,
        _prior_learnings: &[String],
        _breadth: usize,
    ) -> Result<Vec<SearchQuery>, CompletionError> {
        Err((self.0)())
    }
}

/// Retriever returning one document per query, optionally failing for
/// queries listed in `fail`, and tracking peak concurrency.
#[derive(Default)]
pub struct EchoRetriever {
    pub fail: Vec<&'static str>,
    pub shared_url: Option<&'static str>,
    pub delay: Option<Duration>,
    pub in_flight: AtomicUsize,
    pub peak: AtomicUsize,
    pub calls: AtomicUsize,
}

#[async_trait]
impl Retriever for EchoRetriever {
    async fn retrieve(&self, query: &SearchQuery) -> Result<Vec<SourceResult>, SearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail.contains(&query.query.as_str()) {
            return Err(SearchError::Timeout(15));
        }
        let url = match self.shared_url {
            Some(url) => url.to_string(),
            None => format!("https://example.com/{}", query.query),
        };
        Ok(vec![SourceResult {
            url,
            content: format!("content about {}", query.query),
        }])
    }
}

/// Extractor producing one learning and one follow-up per query, or a
/// shared learning when `shared_learning` is set.
#[derive(Default)]
pub struct EchoExtractor {
    pub shared_learning: Option<&'static str>,
    pub fatal_on: Option<&'static str>,
    pub violation_on: Option<&'static str>,
}

#[async_trait]
impl Extractor for EchoExtractor {
    async fn extract(
        &self,
        query: &SearchQuery,
        _sources: &[SourceResult],
    ) -> Result<LearningBatch, CompletionError> {
        if self.fatal_on == Some(query.query.as_str()) {
            return Err(CompletionError::Llm(LLMError::ApiError {
                status: 401,
                message: "invalid key".into(),
            }));
        }
        if self.violation_on == Some(query.query.as_str()) {
            return Err(CompletionError::SchemaViolation(format!(
                "missing learnings for {}",
                query.query
            )));
        }
        let learning = match self.shared_learning {
            Some(l) => l.to_string(),
            None => format!("learning from {}", query.query),
        };
        Ok(LearningBatch {
            learnings: vec![learning],
            follow_up_questions: vec![format!("more about {}?", query.query)],
        })
    }
}
