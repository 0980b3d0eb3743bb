mod config;
mod error;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use chrono::{Local, TimeZone};
use clap::{Parser, Subcommand};
use runtime::tools::parse_month;
use runtime::{Answer, Embedder, GeminiBackend, MonthlyAnalysis, Orchestrator, Reply, ToolRegistry};
use storage::{MetricStore, Report, ReportId, ReportStore, seed};
use tracing_subscriber::EnvFilter;

use config::{API_KEY_ENV, Config};
use error::{Error, Result};

const CONFIG_FILE: &str = "analyst.toml";

#[derive(Parser)]
#[command(name = "analyst")]
#[command(about = "Answer business questions from regional metrics with Gemini", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a question and print the JSON reply
    Ask {
        prompt: String,
        /// Do not record the answer as a report
        #[arg(long)]
        no_save: bool,
    },
    /// Load demonstration metrics and knowledge base articles
    Seed {
        /// Skip embedding the knowledge base (no API key needed)
        #[arg(long)]
        skip_documents: bool,
        /// Overwrite March to May 2024 revenue with the forecasting series
        #[arg(long)]
        forecast_fixture: bool,
    },
    /// Compare a region's month with the month before
    Compare {
        #[arg(short, long)]
        region: String,
        #[arg(short, long)]
        month: String,
    },
    /// List recent reports
    Reports {
        /// Show only the last N reports
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
    /// Show a single report
    Report {
        /// Report ID (prefix match supported)
        id: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,runtime=info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = Config::load_or_default(&cli.config)?;

    match cli.command {
        Commands::Ask { prompt, no_save } => cmd_ask(&config, &prompt, !no_save).await,
        Commands::Seed {
            skip_documents,
            forecast_fixture,
        } => cmd_seed(&config, skip_documents, forecast_fixture).await,
        Commands::Compare { region, month } => cmd_compare(&config, &region, &month),
        Commands::Reports { limit } => cmd_reports(&config, limit),
        Commands::Report { id } => cmd_report(&config, &id),
    }
}

fn build_backend(config: &Config, env_key: Option<String>) -> runtime::Result<GeminiBackend> {
    let api_key = config
        .api_key(env_key)
        .map_err(|e| runtime::Error::Config(e.to_string()))?;
    GeminiBackend::builder(api_key)
        .model(&config.backend.model)
        .base_url(&config.backend.base_url)
        .embedding_model(&config.backend.embedding_model)
        .embedding_dimensions(config.backend.embedding_dimensions)
        .temperature(config.backend.temperature)
        .timeout(config.timeout())
        .build()
        .map_err(|e| runtime::Error::Config(format!("cannot build Gemini client: {e}")))
}

async fn cmd_ask(config: &Config, prompt: &str, save: bool) -> Result<ExitCode> {
    let reply = ask(config, prompt, save).await;
    println!("{}", reply.to_json());
    Ok(if reply.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Run one analysis and shape every outcome, including setup failures, as a reply.
async fn ask(config: &Config, prompt: &str, save: bool) -> Reply {
    let result = answer(config, prompt).await;

    if let (Ok(answer), true) = (&result, save) {
        let report = answer.to_report(prompt);
        match ReportStore::open(&config.storage.database).and_then(|store| store.append(&report)) {
            Ok(()) => tracing::info!(report = %report.id, turns = answer.turns, "report saved"),
            Err(e) => tracing::error!(error = %e, "failed to save report"),
        }
    }

    Reply::from_result(&result)
}

async fn answer(config: &Config, prompt: &str) -> runtime::Result<Answer> {
    let backend = build_backend(config, std::env::var(API_KEY_ENV).ok())?;
    let store = Arc::new(MetricStore::open(&config.storage.database)?);
    let tools =
        ToolRegistry::new(store, backend.clone()).with_search_limit(config.agent.search_limit);
    let orchestrator = Orchestrator::new(backend)
        .with_max_turns(config.agent.max_turns)
        .with_call_timeout(config.timeout());

    let answer = orchestrator
        .run(prompt, &tools, Some(config.agent.system_instruction.as_str()))
        .await?;
    Ok(answer)
}

async fn cmd_seed(
    config: &Config,
    skip_documents: bool,
    forecast_fixture: bool,
) -> Result<ExitCode> {
    let store = MetricStore::open(&config.storage.database)?;
    let rows = seed::seed_metrics(&store)?;
    println!("Seeded {rows} months of metrics per table.");

    if forecast_fixture {
        seed::seed_forecast_fixture(&store)?;
        println!("Applied forecasting revenue fixture (March to May 2024).");
    }

    if skip_documents {
        return Ok(ExitCode::SUCCESS);
    }

    let backend = build_backend(config, std::env::var(API_KEY_ENV).ok())?;
    store.clear_documents()?;
    for article in seed::KNOWLEDGE_BASE {
        let embedding = backend.embed(article.content).await?;
        store.insert_document(article.title, article.content, &embedding)?;
        tracing::info!(title = article.title, dimensions = backend.dimensions(), "embedded article");
    }
    println!("Embedded {} knowledge base articles.", store.document_count()?);
    Ok(ExitCode::SUCCESS)
}

fn cmd_compare(config: &Config, region: &str, month: &str) -> Result<ExitCode> {
    let today = Local::now().date_naive();
    let month = parse_month(month, today).ok_or_else(|| Error::InvalidMonth(month.to_string()))?;

    let store = MetricStore::open(&config.storage.database)?;
    let analysis = MonthlyAnalysis::compute(&store, region, month)?;
    println!("{}", serde_json::to_string_pretty(&analysis)?);
    Ok(ExitCode::SUCCESS)
}

fn cmd_reports(config: &Config, limit: usize) -> Result<ExitCode> {
    let store = ReportStore::open(&config.storage.database)?;
    let reports = store.list_recent(limit)?;

    if reports.is_empty() {
        println!("No reports found.");
        return Ok(ExitCode::SUCCESS);
    }

    println!("{:<36}  {:<16}  {:>7}  PROMPT", "REPORT ID", "CREATED", "TOKENS");
    println!("{}", "-".repeat(100));

    for report in reports {
        let created = Local
            .from_utc_datetime(&report.created_at.naive_utc())
            .format("%Y-%m-%d %H:%M");
        println!(
            "{:<36}  {:<16}  {:>7}  {}",
            report.id,
            created,
            report.tokens.total,
            truncate(&report.prompt, 40)
        );
    }

    Ok(ExitCode::SUCCESS)
}

fn cmd_report(config: &Config, prefix: &str) -> Result<ExitCode> {
    let store = ReportStore::open(&config.storage.database)?;
    let id = find_report(&store.list_ids()?, prefix)?;
    print_report(&store.load(id)?);
    Ok(ExitCode::SUCCESS)
}

fn find_report(ids: &[ReportId], prefix: &str) -> Result<ReportId> {
    let matching: Vec<_> = ids
        .iter()
        .filter(|id| id.to_string().starts_with(prefix))
        .collect();

    match matching.as_slice() {
        [] => Err(Error::ReportNotFound {
            prefix: prefix.to_string(),
        }),
        [id] => Ok(**id),
        _ => Err(Error::AmbiguousReport {
            prefix: prefix.to_string(),
            matches: matching.iter().map(|id| id.to_string()).collect(),
        }),
    }
}

fn print_report(report: &Report) {
    let created = Local
        .from_utc_datetime(&report.created_at.naive_utc())
        .format("%Y-%m-%d %H:%M:%S");

    println!("Report:  {}", report.id);
    println!("Created: {created}");
    println!("Model:   {}", report.model);
    println!(
        "Tokens:  {} prompt, {} completion, {} total",
        report.tokens.prompt, report.tokens.completion, report.tokens.total
    );
    println!("\nPROMPT\n{}\n\nRESPONSE\n{}", report.prompt, report.response);
}

fn truncate(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}
