use std::sync::Arc;

use tracing::{debug, info};

use super::prompts::{build_answer_prompt, build_report_prompt, render_learnings};
use super::ReportRequest;
use crate::budget::PromptBudgeter;
use crate::config::DEFAULT_REPORT_TOKEN_BUDGET;
use crate::llm::{LLMError, LLM};

/// Writes the final answer or report from collected learnings.
pub struct Synthesizer {
    llm: Arc<dyn LLM>,
    budgeter: PromptBudgeter,
    system_prompt: String,
    token_budget: usize,
}

impl Synthesizer {
    pub fn new(llm: Arc<dyn LLM>, budgeter: PromptBudgeter, system_prompt: impl Into<String>) -> Self {
        Self {
            llm,
            budgeter,
            system_prompt: system_prompt.into(),
            token_budget: DEFAULT_REPORT_TOKEN_BUDGET,
        }
    }

    /// Token budget for the learnings block.
    pub fn with_token_budget(mut self, budget: usize) -> Self {
        self.token_budget = budget;
        self
    }

    /// A short, direct answer to `prompt`.
    pub async fn write_answer(&self, prompt: &str, learnings: &[String]) -> Result<String, LLMError> {
        let block = self.learnings_block(learnings);
        let answer = self
            .llm
            .complete_with_system(&self.system_prompt, &build_answer_prompt(prompt, &block))
            .await?;
        Ok(answer.trim().to_string())
    }

    /// A markdown report with a trailing sources section.
    pub async fn write_report(&self, request: &ReportRequest) -> Result<String, LLMError> {
        info!(
            format = %request.format,
            learnings = request.learnings.len(),
            urls = request.visited_urls.len(),
            "Writing report"
        );
        let block = self.learnings_block(&request.learnings);
        let body = self
            .llm
            .complete_with_system(
                &self.system_prompt,
                &build_report_prompt(&request.prompt, &block, request.format),
            )
            .await?;

        let sources = request
            .visited_urls
            .iter()
            .map(|url| format!("- {}", url))
            .collect::<Vec<_>>()
            .join("\n");

        Ok(format!("{}\n\n## Sources\n\n{}", body.trim(), sources))
    }

    /// Renders learnings, each trimmed to the budget, then drops items from
    /// the end until the block fits.
    fn learnings_block(&self, learnings: &[String]) -> String {
        let items: Vec<String> = learnings
            .iter()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .map(|l| self.budgeter.trim(l, self.token_budget))
            .collect();

        let full = render_learnings(&items);
        if self.budgeter.count(&full) <= self.token_budget {
            return full;
        }

        // Largest prefix that fits.
        let (mut lo, mut hi) = (0usize, items.len());
        while lo < hi {
            let mid = (lo + hi + 1) / 2;
            if self.budgeter.count(&render_learnings(&items[..mid])) <= self.token_budget {
                lo = mid;
            } else {
                hi = mid - 1;
            }
        }

        debug!(kept = lo, total = items.len(), "Dropped learnings to fit budget");

        if lo == 0 {
            return match items.first() {
                Some(first) => self
                    .budgeter
                    .trim(&render_learnings(std::slice::from_ref(first)), self.token_budget),
                None => String::new(),
            };
        }
        render_learnings(&items[..lo])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::ApproxTokenizer;
    use crate::research::ReportFormat;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct RecordingLLM {
        prompts: Mutex<Vec<String>>,
        response: String,
    }

    #[async_trait]
    impl LLM for RecordingLLM {
        async fn complete(&self, prompt: &str) -> Result<String, LLMError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.response.clone())
        }

        async fn complete_with_system(&self, _system: &str, prompt: &str) -> Result<String, LLMError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.response.clone())
        }
    }

    fn recording(response: &str) -> Arc<RecordingLLM> {
        Arc::new(RecordingLLM {
            prompts: Mutex::new(Vec::new()),
            response: response.to_string(),
        })
    }

    fn budgeter() -> PromptBudgeter {
        PromptBudgeter::new(Arc::new(ApproxTokenizer::new(1.0)))
    }

    #[tokio::test]
    async fn test_answer_is_trimmed() {
        let llm = recording("  Paris\n");
        let synth = Synthesizer::new(llm.clone(), budgeter(), "sys");
        let answer = synth
            .write_answer("What is the capital of France?", &["Paris is the capital of France.".into()])
            .await
            .unwrap();
        assert_eq!(answer, "Paris");
        let prompts = llm.prompts.lock().unwrap();
        assert!(prompts[0].contains("<learning>\nParis is the capital of France.\n</learning>"));
    }

    #[tokio::test]
    async fn test_report_appends_sources() {
        let llm = recording("# Report\n\nBody");
        let synth = Synthesizer::new(llm, budgeter(), "sys");
        let report = synth
            .write_report(&ReportRequest {
                prompt: "France".into(),
                learnings: vec!["l1".into()],
                visited_urls: vec!["https://a.example".into(), "https://b.example".into()],
                format: ReportFormat::Standard,
            })
            .await
            .unwrap();
        assert_eq!(
            report,
            "# Report\n\nBody\n\n## Sources\n\n- https://a.example\n- https://b.example"
        );
    }

    #[test]
    fn test_learnings_dropped_from_end() {
        let synth = Synthesizer::new(recording(""), budgeter(), "sys").with_token_budget(60);
        let learnings: Vec<String> = vec!["a".repeat(20), "b".repeat(20), "c".repeat(20)];
        let block = synth.learnings_block(&learnings);
        assert!(block.contains(&"a".repeat(20)));
        assert!(!block.contains(&"c".repeat(20)));
        assert!(block.chars().count() <= 60);
    }
}
