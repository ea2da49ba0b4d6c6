use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;

mod config_file;
mod output;

use output::ColorMode;

/// salted - a concurrent link and DOI validator for documentation corpora.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// File or directory to check.
    searchpath: Option<PathBuf>,

    /// Path to an INI config file (sections BEHAVIOR, CACHE, FILES, TEMPLATE).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Which file types to descend into.
    #[arg(long, value_enum)]
    file_types: Option<CliFileTypes>,

    /// Worker count for the URL probe pool, or "automatic".
    #[arg(long)]
    num_workers: Option<String>,

    /// Per-request timeout in seconds.
    #[arg(long)]
    timeout: Option<u64>,

    /// Exit with a non-zero status if any dead links were found.
    #[arg(long)]
    raise_for_dead_links: bool,

    /// User-Agent sent on URL probes (never on DOI probes).
    #[arg(long)]
    user_agent: Option<String>,

    /// Contact (mailto) included in the polite User-Agent sent to CrossRef.
    #[arg(long)]
    crossref_contact: Option<String>,

    /// Path to the on-disk cache file.
    #[arg(long)]
    cache_file: Option<PathBuf>,

    /// Skip re-checking a URL within this many hours of its last success.
    #[arg(long)]
    dont_check_again_within_hours: Option<u64>,

    /// Report output format.
    #[arg(long, value_enum)]
    format: Option<CliReportFormat>,

    /// Write the report to this path instead of stdout.
    #[arg(long)]
    write_to: Option<PathBuf>,

    /// Disable colored terminal output.
    #[arg(long)]
    no_color: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliFileTypes {
    Supported,
    Html,
    Tex,
    Markdown,
}

impl From<CliFileTypes> for salted_ingest::FileTypes {
    fn from(v: CliFileTypes) -> Self {
        match v {
            CliFileTypes::Supported => salted_ingest::FileTypes::Supported,
            CliFileTypes::Html => salted_ingest::FileTypes::Html,
            CliFileTypes::Tex => salted_ingest::FileTypes::Tex,
            CliFileTypes::Markdown => salted_ingest::FileTypes::Markdown,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliReportFormat {
    Text,
    Json,
    Csv,
    Markdown,
    Html,
}

impl From<CliReportFormat> for salted_reporting::ReportFormat {
    fn from(v: CliReportFormat) -> Self {
        match v {
            CliReportFormat::Text => salted_reporting::ReportFormat::Text,
            CliReportFormat::Json => salted_reporting::ReportFormat::Json,
            CliReportFormat::Csv => salted_reporting::ReportFormat::Csv,
            CliReportFormat::Markdown => salted_reporting::ReportFormat::Markdown,
            CliReportFormat::Html => salted_reporting::ReportFormat::Html,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    run(cli).await
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Resolve configuration: CLI flags > config file > defaults (§6).
    let from_file = match &cli.config {
        Some(path) => config_file::load(path)?,
        None => config_file::ConfigFile::default(),
    };

    let searchpath = cli
        .searchpath
        .clone()
        .or_else(|| from_file.searchpath.clone().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."));

    let file_types: salted_ingest::FileTypes = cli
        .file_types
        .map(Into::into)
        .or_else(|| {
            from_file
                .file_types
                .as_deref()
                .and_then(|s| s.parse().ok())
        })
        .unwrap_or(salted_ingest::FileTypes::Supported);

    let num_workers_str = cli
        .num_workers
        .clone()
        .or_else(|| from_file.num_workers.clone());
    let num_workers = match num_workers_str.as_deref() {
        None | Some("automatic") => salted_core::NumWorkers::Automatic,
        Some(n) => salted_core::NumWorkers::Fixed(n.parse::<usize>().unwrap_or(1).max(1)),
    };

    let timeout_secs = cli.timeout.or(from_file.timeout).unwrap_or(5);
    let raise_for_dead_links = cli.raise_for_dead_links || from_file.raise_for_dead_links.unwrap_or(false);
    let user_agent = cli
        .user_agent
        .clone()
        .or_else(|| from_file.user_agent.clone())
        .unwrap_or_else(|| format!("salted/{}", env!("CARGO_PKG_VERSION")));
    let crossref_contact = cli.crossref_contact.clone().or_else(|| from_file.crossref_contact.clone());
    let cache_file = cli
        .cache_file
        .clone()
        .or_else(|| from_file.cache_file.clone().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("salted-cache.sqlite3"));
    let dont_check_again_within_hours = cli
        .dont_check_again_within_hours
        .or(from_file.dont_check_again_within_hours)
        .unwrap_or(24);

    salted_core::cache::check_cache_file_path(&cache_file)?;

    let config = salted_core::Config {
        num_workers,
        timeout: std::time::Duration::from_secs(timeout_secs),
        raise_for_dead_links,
        user_agent,
        crossref_contact,
        cache_file,
        dont_check_again_within_hours,
    };

    let color = ColorMode(!cli.no_color && cli.write_to.is_none());

    salted_core::Engine::validate_path(&searchpath)?;
    let ingested = salted_ingest::ingest(&searchpath, file_types)?;

    // Progress goes to stderr when the report is redirected to a file, so a
    // shell redirect of stdout captures only the report.
    let reporter = Arc::new(output::ProgressReporter::new(cli.write_to.is_some()));
    let progress_cb: salted_core::ProgressSink = {
        let reporter = Arc::clone(&reporter);
        Arc::new(move |event| reporter.report(event))
    };

    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_clone.cancel();
        }
    });

    let engine = salted_core::Engine::new(config).with_progress(progress_cb);
    let store = engine
        .check(ingested.links, ingested.dois, cancel)
        .await?;

    {
        let mut guard = store.lock().await;
        for (file_path, reason) in &ingested.file_access_errors {
            guard.log_file_access_error(file_path.clone(), reason.clone());
        }
    }

    let guard = store.lock().await;

    let mut out: Box<dyn Write> = match &cli.write_to {
        Some(path) => Box::new(std::fs::File::create(path)?),
        None => Box::new(std::io::stdout()),
    };
    let format = cli.format.unwrap_or(CliReportFormat::Text);
    let report = salted_reporting::render(&guard.views, &guard.errors, format.into());
    writeln!(out, "{report}")?;

    let mut summary_out: Box<dyn Write> = if cli.write_to.is_some() {
        Box::new(std::io::stderr())
    } else {
        Box::new(std::io::stdout())
    };
    output::print_summary(&mut summary_out, &guard, color)?;

    let gate = engine.dead_links_gate(&guard);
    drop(guard);

    gate.map_err(anyhow::Error::from)
}
