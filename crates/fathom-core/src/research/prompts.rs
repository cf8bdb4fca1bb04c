use chrono::Utc;

use super::types::{ReportFormat, SearchQuery};
use crate::search::SourceResult;

/// Builds the system prompt shared by every research call.
///
/// Carries today's date so the model accepts facts newer than its training.
pub fn system_prompt() -> String {
    let today = Utc::now().format("%Y-%m-%d");
    format!(
        r#"You are an expert researcher. Today is {today}. Follow these instructions when responding:
- You may be asked about events after your knowledge cutoff. When the provided material reports them, assume it is right.
- The reader is an experienced analyst. Do not simplify; be detailed and precise.
- Be highly organized.
- Suggest angles and solutions the reader may not have considered.
- Accuracy matters more than fluency. Do not invent facts.
- Weigh arguments on their merits rather than on the authority of the source.
- Consider new technologies and contrarian ideas, not only the conventional view.
- Speculation and prediction are allowed when clearly flagged as such."#
    )
}

/// Prompt asking for the next batch of search queries.
pub fn build_plan_prompt(query: &str, breadth: usize, learnings_block: Option<&str>) -> String {
    let mut prompt = format!(
        r#"Given the following prompt from the user, generate a list of web search queries to research the topic. Return at most {breadth} queries, fewer if the prompt is narrow. Every query must be distinct from the others.

<prompt>{query}</prompt>"#
    );

    if let Some(learnings) = learnings_block.filter(|l| !l.is_empty()) {
        prompt.push_str(
            "\n\nHere are learnings from earlier research. Use them to make the queries more specific:\n",
        );
        prompt.push_str(learnings);
    }

    prompt
}

/// Prompt asking for learnings and follow-up questions from search results.
pub fn build_extract_prompt(
    query: &SearchQuery,
    sources: &[SourceResult],
    num_learnings: usize,
) -> String {
    let contents = sources
        .iter()
        .map(|s| format!("<content>\n{}\n</content>", s.content))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"Given the following contents from a web search for the query <query>{q}</query>, extract a list of learnings. Return at most {num_learnings} learnings, fewer if the contents are thin. Each learning must be unique, concise and information dense. Include entities such as people, places, companies and products, and exact metrics, numbers and dates where present. The learnings will be used to research the topic further.

<contents>
{contents}
</contents>"#,
        q = query.query,
    )
}

/// Prompt asking for clarifying questions about a research query.
pub fn build_feedback_prompt(query: &str, num_questions: usize) -> String {
    format!(
        "Given the following query from the user, ask follow-up questions to clarify the research direction. \
         Return at most {num_questions} questions, fewer if the query is already clear: <query>{query}</query>"
    )
}

/// Renders learnings for inclusion in a prompt.
pub fn render_learnings(learnings: &[String]) -> String {
    learnings
        .iter()
        .map(|l| format!("<learning>\n{}\n</learning>", l))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prompt for a short, direct answer.
pub fn build_answer_prompt(prompt: &str, learnings_block: &str) -> String {
    format!(
        r#"Given the following prompt from the user, write a final answer using the learnings from research. Follow any answer format the prompt asks for. Output only the answer, with no preamble or commentary. Keep it as short as possible: usually a few words, at most one sentence.

<prompt>{prompt}</prompt>

Here are all the learnings from research:

<learnings>
{learnings_block}
</learnings>"#
    )
}

/// Prompt for a long-form markdown report in the given format.
pub fn build_report_prompt(prompt: &str, learnings_block: &str, format: ReportFormat) -> String {
    match format {
        ReportFormat::Standard => format!(
            r#"Given the following prompt from the user, write a final report on the topic using the learnings from research. Make it as detailed as possible, aim for three or more pages, and include ALL the learnings. Write it in Markdown.

<prompt>{prompt}</prompt>

Here are all the learnings from research:

<learnings>
{learnings_block}
</learnings>"#
        ),
        ReportFormat::Threat => format!(
            r#"Given the following prompt from the user, write a threat intelligence report using the learnings from research. Include ALL relevant learnings and write it in Markdown with these sections:

## Executive Summary
## Threat Actors
## Tactics, Techniques and Procedures (map to MITRE ATT&CK IDs where possible)
## Indicators of Compromise
## Affected Systems and Sectors
## Impact Assessment
## Mitigations and Recommendations
## Intelligence Gaps

State confidence levels for attributions and flag anything speculative.

<prompt>{prompt}</prompt>

Here are all the learnings from research:

<learnings>
{learnings_block}
</learnings>"#
        ),
    }
}

/// Builds the query for a child branch from its parent's goal and follow-ups.
pub fn build_follow_up_query(research_goal: &str, follow_up_questions: &[String]) -> String {
    format!(
        "Previous research goal: {}\nFollow-up research directions:\n{}",
        research_goal,
        follow_up_questions.join("\n")
    )
}

/// Folds clarification answers into the query researched.
pub fn build_clarified_query(query: &str, answered: &[(String, String)]) -> String {
    if answered.is_empty() {
        return query.to_string();
    }
    let qa = answered
        .iter()
        .map(|(q, a)| format!("Q: {}\nA: {}", q, a))
        .collect::<Vec<_>>()
        .join("\n");
    format!("Initial Query: {}\nFollow-up Questions and Answers:\n{}", query, qa)
}
