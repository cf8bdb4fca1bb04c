use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::ResearchError;

/// Depth and breadth remaining for a research branch.
///
/// Breadth is at least 1; depth 0 means stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchBudget {
    depth: u32,
    breadth: u32,
}

impl ResearchBudget {
    pub fn new(depth: u32, breadth: u32) -> Result<Self, ResearchError> {
        if breadth == 0 {
            return Err(ResearchError::InvalidBudget(
                "breadth must be at least 1".to_string(),
            ));
        }
        Ok(Self { depth, breadth })
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn breadth(&self) -> u32 {
        self.breadth
    }

    pub fn is_terminal(&self) -> bool {
        self.depth == 0
    }

    /// Budget for the next level: one less depth, half the breadth rounded up.
    pub fn next(&self) -> Self {
        Self {
            depth: self.depth.saturating_sub(1),
            breadth: self.breadth.div_ceil(2).max(1),
        }
    }
}

/// A planned sub-query with the reason it was chosen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub query: String,
    #[serde(rename = "researchGoal")]
    pub research_goal: String,
}

/// Learnings and follow-up questions extracted from one query's sources.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearningBatch {
    pub learnings: Vec<String>,
    #[serde(rename = "followUpQuestions")]
    pub follow_up_questions: Vec<String>,
}

/// How two learnings are compared when deduplicating.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupPolicy {
    /// Byte-for-byte equality.
    #[default]
    Exact,
    /// Equal after trimming and collapsing runs of whitespace.
    Whitespace,
    /// Like `Whitespace`, ignoring case.
    CaseInsensitive,
}

impl DedupPolicy {
    /// Comparison key for a learning under this policy.
    pub fn key(&self, text: &str) -> String {
        match self {
            DedupPolicy::Exact => text.to_string(),
            DedupPolicy::Whitespace => collapse_whitespace(text),
            DedupPolicy::CaseInsensitive => collapse_whitespace(text).to_lowercase(),
        }
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Accumulated outcome of a research run.
///
/// Both lists keep first-occurrence order and hold no duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchResult {
    pub learnings: Vec<String>,
    #[serde(rename = "visitedUrls")]
    pub visited_urls: Vec<String>,
}

impl ResearchResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.learnings.is_empty() && self.visited_urls.is_empty()
    }

    pub fn add_learnings<I>(&mut self, learnings: I, policy: DedupPolicy)
    where
        I: IntoIterator<Item = String>,
    {
        let mut seen: HashSet<String> = self.learnings.iter().map(|l| policy.key(l)).collect();
        for learning in learnings {
            if seen.insert(policy.key(&learning)) {
                self.learnings.push(learning);
            }
        }
    }

    pub fn add_urls<I>(&mut self, urls: I)
    where
        I: IntoIterator<Item = String>,
    {
        let mut seen: HashSet<String> = self.visited_urls.iter().cloned().collect();
        for url in urls {
            if seen.insert(url.clone()) {
                self.visited_urls.push(url);
            }
        }
    }

    /// Union with `other`, keeping this result's entries first.
    pub fn merge(&mut self, other: ResearchResult, policy: DedupPolicy) {
        self.add_learnings(other.learnings, policy);
        self.add_urls(other.visited_urls);
    }
}

/// Report template.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Standard,
    Threat,
}

impl ReportFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "standard" => Some(Self::Standard),
            "threat" => Some(Self::Threat),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Threat => "threat",
        }
    }
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the synthesizer needs to write a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRequest {
    pub prompt: String,
    pub learnings: Vec<String>,
    pub visited_urls: Vec<String>,
    pub format: ReportFormat,
}
