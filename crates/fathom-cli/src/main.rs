//! `fathom` - recursive web research from the command line.

mod progress;
mod serve;

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{eyre, Result, WrapErr};
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use fathom_core::completion::StructuredClient;
use fathom_core::config::DEFAULT_FEEDBACK_QUESTIONS;
use fathom_core::llm::Provider;
use fathom_core::research::{prompts, FeedbackGenerator};
use fathom_core::{
    Config, FileReportStore, ReportFormat, ReportRequest, ReportStatus, ReportStore,
    ResearchOutcome, ResearchRequest, ResearchService,
};

#[derive(Parser)]
#[command(name = "fathom")]
#[command(about = "Recursive web research with LLMs", long_about = None)]
struct Cli {
    /// Config file (defaults to ./fathom.toml, then ~/.config/fathom/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Research a question and print an answer or a report
    Research(ResearchArgs),
    /// Ask clarifying questions about a query
    Feedback {
        #[arg(required = true)]
        query: Vec<String>,

        /// Maximum number of questions
        #[arg(short = 'n', long, default_value_t = DEFAULT_FEEDBACK_QUESTIONS)]
        count: usize,
    },
    /// Start the HTTP API
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Interface to bind
        #[arg(long)]
        host: Option<String>,
    },
    /// Inspect stored reports
    Reports {
        #[command(subcommand)]
        command: ReportCommands,
    },
}

#[derive(Args)]
struct ResearchArgs {
    #[arg(required = true)]
    query: Vec<String>,

    /// Recursion levels
    #[arg(short, long)]
    depth: Option<u32>,

    /// Parallel queries at the first level
    #[arg(short, long)]
    breadth: Option<u32>,

    /// Write a long-form report instead of a short answer
    #[arg(long)]
    report: bool,

    /// Report template: standard or threat
    #[arg(long, default_value = "standard", value_parser = parse_format)]
    format: ReportFormat,

    /// Write the result to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Ask up to N clarifying questions first
    #[arg(long, value_name = "N")]
    clarify: Option<usize>,
}

#[derive(Subcommand)]
enum ReportCommands {
    /// List reports, newest first
    List,
    /// Print a report
    Show { id: String },
}

fn parse_format(value: &str) -> Result<ReportFormat, String> {
    ReportFormat::parse(value).ok_or_else(|| format!("unknown format '{}' (expected standard or threat)", value))
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Research(args) => research(config, args).await,
        Commands::Feedback { query, count } => feedback(&config, &query.join(" "), count).await,
        Commands::Serve { port, host } => {
            let mut server = config.server.clone();
            if let Some(port) = port {
                server.port = port;
            }
            if let Some(host) = host {
                server.host = host;
            }
            let service = ResearchService::from_config(&config)?;
            serve::start_server(Arc::new(service), &server).await
        }
        Commands::Reports { command } => reports(&config, command),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "fathom=debug,fathom_core=debug"
    } else {
        "fathom=info,fathom_core=warn"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(path)
            .wrap_err_with(|| format!("Failed to load config from {}", path.display())),
        None => Config::load().wrap_err("Failed to load configuration"),
    }
}

async fn research(config: Config, args: ResearchArgs) -> Result<()> {
    let query = args.query.join(" ");
    let (tx, rx) = mpsc::unbounded_channel();
    let service = ResearchService::from_config(&config)?.with_progress(tx);

    let query = match args.clarify {
        Some(n) if n > 0 => clarify(&service, &query, n).await?,
        _ => query,
    };

    let request = ResearchRequest::new(query.clone()).with_budget(
        args.depth.unwrap_or(config.research.depth),
        args.breadth.unwrap_or(config.research.breadth),
    );

    let bar = progress::spinner();
    let watcher = tokio::spawn(progress::follow(bar.clone(), rx));

    let output = if args.report {
        let result = service.research(&request).await;
        bar.set_message("Writing report");
        match result {
            Ok(result) => {
                service
                    .write_report(&ReportRequest {
                        prompt: query,
                        learnings: result.learnings,
                        visited_urls: result.visited_urls,
                        format: args.format,
                    })
                    .await
            }
            Err(e) => Err(e),
        }
    } else {
        service.run(request).await.map(render_answer)
    };

    bar.finish_and_clear();
    watcher.abort();

    let output = output?;
    match args.output {
        Some(path) => {
            std::fs::write(&path, &output)
                .wrap_err_with(|| format!("Failed to write {}", path.display()))?;
            println!("Saved to {}", path.display());
        }
        None => println!("{}", output),
    }
    Ok(())
}

fn render_answer(outcome: ResearchOutcome) -> String {
    match outcome {
        ResearchOutcome::Answer {
            answer,
            learnings,
            visited_urls,
        } => {
            let mut out = answer;
            if !learnings.is_empty() {
                out.push_str("\n\n## Learnings\n");
                for learning in &learnings {
                    out.push_str(&format!("\n- {}", learning));
                }
            }
            if !visited_urls.is_empty() {
                out.push_str(&format!("\n\n## Sources ({})\n", visited_urls.len()));
                for url in &visited_urls {
                    out.push_str(&format!("\n- {}", url));
                }
            }
            out
        }
        ResearchOutcome::ReportStarted { report_id } => format!("Report {} started", report_id),
    }
}

/// Asks the clarifying questions on the terminal and folds the answers in.
async fn clarify(service: &ResearchService, query: &str, count: usize) -> Result<String> {
    let questions = service.feedback(query, count).await?;
    if questions.is_empty() {
        return Ok(query.to_string());
    }

    println!("To better understand your research needs, please answer these follow-up questions:");
    let stdin = io::stdin();
    let mut answered = Vec::with_capacity(questions.len());
    for question in questions {
        print!("\n{}\nYour answer: ", question);
        io::stdout().flush()?;
        let mut line = String::new();
        stdin.lock().read_line(&mut line)?;
        answered.push((question, line.trim().to_string()));
    }

    Ok(prompts::build_clarified_query(query, &answered))
}

/// Only needs a model, so search credentials are not required.
async fn feedback(config: &Config, query: &str, count: usize) -> Result<()> {
    let llm = Provider::from_config(&config.llm)?.build()?;
    let system = config
        .research
        .system_prompt
        .clone()
        .unwrap_or_else(prompts::system_prompt);
    let client = StructuredClient::new(Arc::from(llm)).with_reasoning(config.llm.reasoning());
    let questions = FeedbackGenerator::new(client, system)
        .generate(query, count)
        .await?;

    if questions.is_empty() {
        println!("No clarifying questions; the query is clear enough.");
    }
    for (i, question) in questions.iter().enumerate() {
        println!("{}. {}", i + 1, question);
    }
    Ok(())
}

fn reports(config: &Config, command: ReportCommands) -> Result<()> {
    let store = FileReportStore::with_config(&config.storage);

    match command {
        ReportCommands::List => {
            let reports = store.list_reports()?;
            if reports.is_empty() {
                println!("No reports in {}", store.reports_dir().display());
            }
            for report in reports {
                println!(
                    "{}  {:<10}  {}  {}",
                    report.id,
                    report.status.display_name(),
                    report.created_at.format("%Y-%m-%d %H:%M"),
                    report.query
                );
            }
        }
        ReportCommands::Show { id } => {
            let report = store
                .get_report(&id)?
                .ok_or_else(|| eyre!("Report not found: {}", id))?;
            match (report.status, report.content, report.error) {
                (ReportStatus::Completed, Some(content), _) => println!("{}", content),
                (ReportStatus::Failed, _, error) => {
                    println!("Report failed: {}", error.unwrap_or_default())
                }
                (status, _, _) => println!("Report is {}", status.display_name()),
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_research_args() {
        let cli = Cli::try_parse_from([
            "fathom", "research", "solid", "state", "batteries", "-d", "1", "-b", "2", "--report",
            "--format", "threat",
        ])
        .unwrap();
        let Commands::Research(args) = cli.command else {
            panic!("expected research");
        };
        assert_eq!(args.query.join(" "), "solid state batteries");
        assert_eq!((args.depth, args.breadth), (Some(1), Some(2)));
        assert!(args.report);
        assert_eq!(args.format, ReportFormat::Threat);
    }

    #[test]
    fn test_unknown_format_rejected() {
        assert!(Cli::try_parse_from(["fathom", "research", "q", "--format", "essay"]).is_err());
    }

    #[test]
    fn test_render_answer() {
        let text = render_answer(ResearchOutcome::Answer {
            answer: "Paris".into(),
            learnings: vec!["Paris is the capital.".into()],
            visited_urls: vec!["https://a".into()],
        });
        assert_eq!(
            text,
            "Paris\n\n## Learnings\n\n- Paris is the capital.\n\n## Sources (1)\n\n- https://a"
        );
    }
}
