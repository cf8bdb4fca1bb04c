//! Terminal progress for research runs.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc::UnboundedReceiver;

use fathom_core::ResearchProgress;

pub fn spinner() -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.enable_steady_tick(Duration::from_millis(120));
    bar.set_message("Researching");
    bar
}

/// Mirrors controller events onto `bar` until the sender goes away.
pub async fn follow(bar: ProgressBar, mut events: UnboundedReceiver<ResearchProgress>) {
    while let Some(event) = events.recv().await {
        let line = describe(&event);
        match event {
            ResearchProgress::QueryCompleted { .. } | ResearchProgress::QueryFailed { .. } => {
                bar.println(line)
            }
            _ => bar.set_message(line),
        }
    }
}

fn describe(event: &ResearchProgress) -> String {
    match event {
        ResearchProgress::LevelStarted { depth, breadth } => {
            format!("Depth {}: planning up to {} queries", depth, breadth)
        }
        ResearchProgress::QueriesPlanned { depth, count } => {
            format!("Depth {}: searching {} queries", depth, count)
        }
        ResearchProgress::QueryCompleted {
            query,
            learnings,
            urls,
            ..
        } => format!("  done  {} ({} learnings, {} sources)", query, learnings, urls),
        ResearchProgress::QueryFailed { query, reason, .. } => {
            format!("  skip  {} ({})", query, reason)
        }
    }
}
