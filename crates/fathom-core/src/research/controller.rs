use std::sync::Arc;

use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use tokio::sync::{mpsc, Semaphore, SemaphorePermit};
use tracing::{debug, info, warn};

use super::prompts::build_follow_up_query;
use super::{
    DedupPolicy, Extractor, LearningBatch, Planner, ResearchBudget, ResearchError, ResearchResult,
    Retriever, SearchQuery,
};

/// Progress events emitted during research.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResearchProgress {
    /// A recursion level began.
    LevelStarted { depth: u32, breadth: u32 },
    /// The planner returned `count` queries.
    QueriesPlanned { depth: u32, count: usize },
    /// A query produced learnings.
    QueryCompleted {
        depth: u32,
        query: String,
        learnings: usize,
        urls: usize,
    },
    /// Retrieval or extraction failed for a query; the run continues.
    QueryFailed {
        depth: u32,
        query: String,
        reason: String,
    },
}

/// What one planned query contributed at its level.
struct BranchOutcome {
    query: SearchQuery,
    urls: Vec<String>,
    batch: Option<LearningBatch>,
}

/// Drives the plan, retrieve, extract, recurse loop.
///
/// At each level up to `breadth` queries run concurrently; children run with
/// `depth - 1` and half the breadth rounded up, so a run performs at most
/// `b * ceil(b/2) * ceil(b/4) * ...` retrievals over `depth` levels.
pub struct ResearchController {
    planner: Arc<dyn Planner>,
    retriever: Arc<dyn Retriever>,
    extractor: Arc<dyn Extractor>,
    dedup: DedupPolicy,
    limiter: Option<Arc<Semaphore>>,
    progress: Option<mpsc::UnboundedSender<ResearchProgress>>,
}

impl ResearchController {
    pub fn new(
        planner: Arc<dyn Planner>,
        retriever: Arc<dyn Retriever>,
        extractor: Arc<dyn Extractor>,
    ) -> Self {
        Self {
            planner,
            retriever,
            extractor,
            dedup: DedupPolicy::default(),
            limiter: None,
            progress: None,
        }
    }

    pub fn with_dedup(mut self, dedup: DedupPolicy) -> Self {
        self.dedup = dedup;
        self
    }

    /// Caps retrieval and extraction calls in flight across the whole tree.
    /// Zero means unbounded.
    pub fn with_concurrency(mut self, limit: usize) -> Self {
        self.limiter = (limit > 0).then(|| Arc::new(Semaphore::new(limit)));
        self
    }

    pub fn with_progress(mut self, sender: mpsc::UnboundedSender<ResearchProgress>) -> Self {
        self.progress = Some(sender);
        self
    }

    /// Researches `query` within `budget`, starting from `accumulated`.
    ///
    /// Only configuration errors from the model client abort the run.
    pub async fn research(
        &self,
        query: &str,
        budget: ResearchBudget,
        accumulated: ResearchResult,
    ) -> Result<ResearchResult, ResearchError> {
        info!(depth = budget.depth(), breadth = budget.breadth(), "Starting research");
        let result = self.research_level(query.to_string(), budget, accumulated).await?;
        info!(
            learnings = result.learnings.len(),
            urls = result.visited_urls.len(),
            "Research finished"
        );
        Ok(result)
    }

    fn research_level(
        &self,
        query: String,
        budget: ResearchBudget,
        accumulated: ResearchResult,
    ) -> BoxFuture<'_, Result<ResearchResult, ResearchError>> {
        async move {
            if budget.is_terminal() {
                return Ok(accumulated);
            }

            let depth = budget.depth();
            let breadth = budget.breadth() as usize;
            self.emit(ResearchProgress::LevelStarted {
                depth,
                breadth: budget.breadth(),
            });

            let queries = match self.planner.plan(&query, &accumulated.learnings, breadth).await {
                Ok(queries) => queries,
                Err(e) => {
                    let e = e.recoverable().map_err(ResearchError::Configuration)?;
                    warn!(depth, error = %e, "Planning failed");
                    Vec::new()
                }
            };
            let queries: Vec<SearchQuery> = queries.into_iter().take(breadth).collect();

            debug!(depth, count = queries.len(), "Planned queries");
            self.emit(ResearchProgress::QueriesPlanned {
                depth,
                count: queries.len(),
            });

            if queries.is_empty() {
                return Ok(accumulated);
            }

            let branches = join_all(queries.into_iter().map(|q| self.run_branch(depth, q))).await;

            let mut level = accumulated;
            let mut outcomes = Vec::with_capacity(branches.len());
            for branch in branches {
                let outcome = branch?;
                level.add_urls(outcome.urls.iter().cloned());
                if let Some(batch) = &outcome.batch {
                    level.add_learnings(batch.learnings.iter().cloned(), self.dedup);
                }
                outcomes.push(outcome);
            }

            let next = budget.next();
            if next.is_terminal() {
                return Ok(level);
            }

            let children: Vec<String> = outcomes
                .into_iter()
                .filter_map(|o| {
                    o.batch
                        .map(|b| build_follow_up_query(&o.query.research_goal, &b.follow_up_questions))
                })
                .collect();

            debug!(
                depth,
                children = children.len(),
                next_breadth = next.breadth(),
                "Recursing"
            );

            let results = join_all(
                children
                    .into_iter()
                    .map(|child| self.research_level(child, next, level.clone())),
            )
            .await;

            let mut merged = level;
            for result in results {
                merged.merge(result?, self.dedup);
            }
            Ok(merged)
        }
        .boxed()
    }

    async fn run_branch(&self, depth: u32, query: SearchQuery) -> Result<BranchOutcome, ResearchError> {
        let retrieved = {
            let _permit = self.acquire().await;
            self.retriever.retrieve(&query).await
        };

        let sources = match retrieved {
            Ok(sources) => sources,
            Err(e) => {
                warn!(query = %query.query, error = %e, "Retrieval failed");
                self.emit(ResearchProgress::QueryFailed {
                    depth,
                    query: query.query.clone(),
                    reason: e.to_string(),
                });
                Vec::new()
            }
        };

        if sources.is_empty() {
            return Ok(BranchOutcome {
                query,
                urls: Vec::new(),
                batch: None,
            });
        }

        let urls: Vec<String> = sources.iter().map(|s| s.url.clone()).collect();

        let extracted = {
            let _permit = self.acquire().await;
            self.extractor.extract(&query, &sources).await
        };

        let batch = match extracted {
            Ok(batch) => {
                self.emit(ResearchProgress::QueryCompleted {
                    depth,
                    query: query.query.clone(),
                    learnings: batch.learnings.len(),
                    urls: urls.len(),
                });
                Some(batch)
            }
            Err(e) => {
                let e = e.recoverable().map_err(ResearchError::Configuration)?;
                warn!(query = %query.query, error = %e, "Extraction failed");
                self.emit(ResearchProgress::QueryFailed {
                    depth,
                    query: query.query.clone(),
                    reason: e.to_string(),
                });
                None
            }
        };

        Ok(BranchOutcome { query, urls, batch })
    }

    async fn acquire(&self) -> Option<SemaphorePermit<'_>> {
        match &self.limiter {
            Some(limiter) => limiter.acquire().await.ok(),
            None => None,
        }
    }

    fn emit(&self, event: ResearchProgress) {
        if let Some(tx) = &self.progress {
            // Receiver may have gone away.
            let _ = tx.send(event);
        }
    }
}
