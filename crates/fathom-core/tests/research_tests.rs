mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use common::{
    BrokenPlanner, EchoExtractor, EchoRetriever, FanPlanner, ListPlanner, ScriptedLLM, StaticSearch,
};
use fathom_core::budget::PromptBudgeter;
use fathom_core::completion::{CompletionError, StructuredClient};
use fathom_core::llm::LLMError;
use fathom_core::research::{
    DedupPolicy, LearningExtractor, QueryPlanner, ResearchBudget, ResearchController, ResearchError,
    ResearchProgress, ResearchResult, SourceResult, Synthesizer,
};
use fathom_core::search::ContentRetriever;
use serde_json::json;
use tokio::sync::mpsc;

fn budget(depth: u32, breadth: u32) -> ResearchBudget {
    ResearchBudget::new(depth, breadth).unwrap()
}

#[tokio::test]
async fn test_capital_of_france_end_to_end() {
    let llm = Arc::new(
        ScriptedLLM::new("Paris")
            .respond(
                "search_queries",
                json!({ "queries": [{ "query": "capital of France", "researchGoal": "Identify the capital city" }] }),
            )
            .respond(
                "learnings",
                json!({
                    "learnings": ["Paris is the capital of France."],
                    "followUpQuestions": ["When did Paris become the capital?"]
                }),
            ),
    );
    let client = StructuredClient::new(llm.clone());
    let budgeter = PromptBudgeter::approximate();

    let search = StaticSearch(vec![SourceResult {
        url: "https://en.wikipedia.org/wiki/Paris".into(),
        content: "Paris is the capital and most populous city of France.".into(),
    }]);

    let controller = ResearchController::new(
        Arc::new(QueryPlanner::new(client.clone(), budgeter.clone(), "sys")),
        Arc::new(ContentRetriever::new(Arc::new(search), budgeter.clone())),
        Arc::new(LearningExtractor::new(client, "sys")),
    );

    let result = controller
        .research("What is the capital of France?", budget(1, 1), ResearchResult::new())
        .await
        .unwrap();

    assert_eq!(result.learnings, vec!["Paris is the capital of France."]);
    assert_eq!(result.visited_urls, vec!["https://en.wikipedia.org/wiki/Paris"]);
    // One planning call and one extraction call; depth 1 never recurses.
    assert_eq!(llm.calls.load(Ordering::SeqCst), 2);

    let synthesizer = Synthesizer::new(llm.clone(), budgeter, "sys");
    let answer = synthesizer
        .write_answer("What is the capital of France?", &result.learnings)
        .await
        .unwrap();
    assert_eq!(answer, "Paris");
}

#[tokio::test]
async fn test_breadth_halves_each_level() {
    let planner = Arc::new(FanPlanner::default());
    let controller = ResearchController::new(
        planner.clone(),
        Arc::new(EchoRetriever::default()),
        Arc::new(EchoExtractor::default()),
    );

    let result = controller
        .research("root", budget(3, 4), ResearchResult::new())
        .await
        .unwrap();

    let calls = planner.calls.lock().unwrap();
    let count = |b: usize| calls.iter().filter(|(_, _, breadth)| *breadth == b).count();
    assert_eq!(count(4), 1);
    assert_eq!(count(2), 4);
    assert_eq!(count(1), 8);
    assert_eq!(calls.len(), 13);

    // 4 + 8 + 8 queries, one distinct learning and URL each.
    assert_eq!(result.learnings.len(), 20);
    assert_eq!(result.visited_urls.len(), 20);
}

#[tokio::test]
async fn test_children_receive_follow_up_query_and_learnings() {
    let planner = Arc::new(FanPlanner::default());
    let controller = ResearchController::new(
        planner.clone(),
        Arc::new(EchoRetriever::default()),
        Arc::new(EchoExtractor::default()),
    );

    controller
        .research("root", budget(2, 1), ResearchResult::new())
        .await
        .unwrap();

    let calls = planner.calls.lock().unwrap();
    assert_eq!(calls.len(), 2);
    let (child_query, prior, breadth) = &calls[1];
    assert_eq!(
        child_query,
        "Previous research goal: goal 1-0\nFollow-up research directions:\nmore about q1-0?"
    );
    assert_eq!(*prior, 1);
    assert_eq!(*breadth, 1);
}

#[tokio::test]
async fn test_failed_retrieval_is_isolated() {
    let retriever = Arc::new(EchoRetriever {
        fail: vec!["b"],
        ..EchoRetriever::default()
    });
    let (tx, mut rx) = mpsc::unbounded_channel();
    let controller = ResearchController::new(
        Arc::new(ListPlanner(vec!["a", "b", "c"])),
        retriever,
        Arc::new(EchoExtractor::default()),
    )
    .with_progress(tx);

    let result = controller
        .research("root", budget(1, 3), ResearchResult::new())
        .await
        .unwrap();

    assert_eq!(result.learnings, vec!["learning from a", "learning from c"]);
    assert_eq!(
        result.visited_urls,
        vec!["https://example.com/a", "https://example.com/c"]
    );

    let mut failed = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let ResearchProgress::QueryFailed { query, .. } = event {
            failed.push(query);
        }
    }
    assert_eq!(failed, vec!["b"]);
}

#[tokio::test]
async fn test_failed_extraction_is_isolated() {
    let planner = Arc::new(FanPlanner::default());
    let controller = ResearchController::new(
        planner.clone(),
        Arc::new(EchoRetriever::default()),
        Arc::new(EchoExtractor {
            violation_on: Some("q1-1"),
            ..EchoExtractor::default()
        }),
    );

    let result = controller
        .research("root", budget(2, 3), ResearchResult::new())
        .await
        .unwrap();

    assert!(result.learnings.contains(&"learning from q1-0".to_string()));
    assert!(result.learnings.contains(&"learning from q1-2".to_string()));
    assert!(!result.learnings.contains(&"learning from q1-1".to_string()));
    // Sources were fetched before extraction failed.
    assert!(result
        .visited_urls
        .contains(&"https://example.com/q1-1".to_string()));

    let calls = planner.calls.lock().unwrap();
    assert_eq!(calls.len(), 3);
    assert!(calls.iter().all(|(query, _, _)| !query.contains("goal 1-1")));
    assert!(calls.iter().any(|(query, _, _)| query.contains("goal 1-0")));
    assert!(calls.iter().any(|(query, _, _)| query.contains("goal 1-2")));
}

#[tokio::test]
async fn test_duplicates_across_branches_collapse() {
    let controller = ResearchController::new(
        Arc::new(ListPlanner(vec!["a", "b"])),
        Arc::new(EchoRetriever {
            shared_url: Some("https://example.com/same"),
            ..EchoRetriever::default()
        }),
        Arc::new(EchoExtractor {
            shared_learning: Some("The same fact."),
            ..EchoExtractor::default()
        }),
    );

    let result = controller
        .research("root", budget(2, 2), ResearchResult::new())
        .await
        .unwrap();

    assert_eq!(result.learnings, vec!["The same fact."]);
    assert_eq!(result.visited_urls, vec!["https://example.com/same"]);
}

#[tokio::test]
async fn test_case_insensitive_dedup_policy() {
    struct CaseExtractor;

    #[async_trait::async_trait]
    impl fathom_core::research::Extractor for CaseExtractor {
        async fn extract(
            &self,
            query: &fathom_core::research::SearchQuery,
            _sources: &[SourceResult],
        ) -> Result<fathom_core::research::LearningBatch, CompletionError> {
            let learning = if query.query == "a" { "Paris is big" } else { "PARIS IS BIG" };
            Ok(fathom_core::research::LearningBatch {
                learnings: vec![learning.to_string()],
                follow_up_questions: vec![],
            })
        }
    }

    let controller = ResearchController::new(
        Arc::new(ListPlanner(vec!["a", "b"])),
        Arc::new(EchoRetriever::default()),
        Arc::new(CaseExtractor),
    )
    .with_dedup(DedupPolicy::CaseInsensitive);

    let result = controller
        .research("root", budget(1, 2), ResearchResult::new())
        .await
        .unwrap();
    assert_eq!(result.learnings, vec!["Paris is big"]);
}

#[tokio::test]
async fn test_configuration_error_propagates() {
    let controller = ResearchController::new(
        Arc::new(BrokenPlanner(|| {
            CompletionError::Llm(LLMError::MissingApiKey("openai".into()))
        })),
        Arc::new(EchoRetriever::default()),
        Arc::new(EchoExtractor::default()),
    );

    let result = controller
        .research("root", budget(2, 2), ResearchResult::new())
        .await;
    assert!(matches!(
        result,
        Err(ResearchError::Configuration(LLMError::MissingApiKey(_)))
    ));
}

#[tokio::test]
async fn test_fatal_extraction_propagates() {
    let controller = ResearchController::new(
        Arc::new(ListPlanner(vec!["a", "b"])),
        Arc::new(EchoRetriever::default()),
        Arc::new(EchoExtractor {
            fatal_on: Some("b"),
            ..EchoExtractor::default()
        }),
    );

    let result = controller
        .research("root", budget(1, 2), ResearchResult::new())
        .await;
    assert!(matches!(result, Err(ResearchError::Configuration(_))));
}

#[tokio::test]
async fn test_planner_violation_ends_branch_quietly() {
    let accumulated = ResearchResult {
        learnings: vec!["earlier".into()],
        visited_urls: vec!["https://earlier.example".into()],
    };
    let controller = ResearchController::new(
        Arc::new(BrokenPlanner(|| CompletionError::SchemaViolation("bad".into()))),
        Arc::new(EchoRetriever::default()),
        Arc::new(EchoExtractor::default()),
    );

    let result = controller
        .research("root", budget(2, 2), accumulated.clone())
        .await
        .unwrap();
    assert_eq!(result, accumulated);
}

#[tokio::test]
async fn test_global_concurrency_ceiling() {
    let retriever = Arc::new(EchoRetriever {
        delay: Some(Duration::from_millis(20)),
        ..EchoRetriever::default()
    });
    let controller = ResearchController::new(
        Arc::new(FanPlanner::default()),
        retriever.clone(),
        Arc::new(EchoExtractor::default()),
    )
    .with_concurrency(2);

    controller
        .research("root", budget(2, 4), ResearchResult::new())
        .await
        .unwrap();

    assert_eq!(retriever.calls.load(Ordering::SeqCst), 12);
    assert!(retriever.peak.load(Ordering::SeqCst) <= 2);
}

#[tokio::test]
async fn test_unbounded_runs_branches_concurrently() {
    let retriever = Arc::new(EchoRetriever {
        delay: Some(Duration::from_millis(50)),
        ..EchoRetriever::default()
    });
    let controller = ResearchController::new(
        Arc::new(FanPlanner::default()),
        retriever.clone(),
        Arc::new(EchoExtractor::default()),
    );

    controller
        .research("root", budget(1, 4), ResearchResult::new())
        .await
        .unwrap();

    assert_eq!(retriever.peak.load(Ordering::SeqCst), 4);
}
