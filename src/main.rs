use anyhow::{Context, Result};
use chrono::Local;
use clap::{ArgAction, Parser};
use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use xiv::config::{is_category, Config, MAX_TIME_RESULTS};
use xiv::models::{SearchQuery, SortKey};
use xiv::ui::Diagnostics;
use xiv::utils::{
    looks_like_index_spec, write_papers, HttpClient, IndexSelection, OutputStyle, SignalSleeper,
};
use xiv::{ArxivSource, Downloader, VERSION};

const EXIT_FAILURE: u8 = 1;
const EXIT_SIGINT: u8 = 130;

/// xiv - Search and download papers from arXiv
#[derive(Parser, Debug)]
#[command(name = "xiv")]
#[command(version = VERSION)]
#[command(about = "Search and download papers from arXiv", long_about = None)]
#[command(disable_version_flag = true)]
struct Cli {
    /// Search query
    #[arg(default_value = "all")]
    query: String,

    /// Max results (default: 10, env: XIV_MAX_RESULTS)
    #[arg(short = 'n', value_name = "N", value_parser = clap::value_parser!(u32).range(1..=2000))]
    max_results: Option<u32>,

    /// Categories (default: cs.RO, env: XIV_CATEGORY)
    #[arg(short = 'c', value_name = "CAT", num_args = 1.., value_parser = parse_category)]
    categories: Vec<String>,

    /// Papers from the last N days (max results 1000, use -n to limit further)
    #[arg(short = 't', value_name = "DAYS", value_parser = clap::value_parser!(u32).range(1..))]
    days: Option<u32>,

    /// Sort by: date, updated, relevance (default: date, env: XIV_SORT)
    #[arg(short = 's', value_name = "SORT", value_parser = parse_sort)]
    sort: Option<SortKey>,

    /// Download PDFs to DIR, optionally only INDICES such as 1,3-5 (default dir: papers, env: XIV_PDF_DIR)
    #[arg(short = 'd', value_name = "DIR|INDICES", num_args = 0..=2)]
    download: Option<Vec<String>>,

    /// Output as JSON
    #[arg(short = 'j')]
    json: bool,

    /// Compact list output
    #[arg(short = 'l')]
    compact: bool,

    /// Colored output (env: XIV_COLOR, applies on terminals only)
    #[arg(long)]
    color: bool,

    /// Show configuration and exit
    #[arg(long = "config")]
    show_config: bool,

    /// Enable verbose logging (repeat for more)
    #[arg(long, action = ArgAction::Count)]
    verbose: u8,

    /// Show version
    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    version: Option<bool>,
}

fn parse_sort(value: &str) -> Result<SortKey, String> {
    value.parse()
}

fn parse_category(value: &str) -> Result<String, String> {
    if is_category(value) {
        Ok(value.to_string())
    } else {
        Err(format!("'{}' is not an arXiv category such as cs.RO", value))
    }
}

/// What `-d` was given, before defaults are applied
#[derive(Debug, Clone, PartialEq, Eq)]
enum DownloadArg {
    Default,
    Dir(PathBuf),
    Indices(String),
    DirAndIndices(PathBuf, String),
}

impl DownloadArg {
    /// A single value shaped like `1,3-5` is an index spec, anything else
    /// is a directory
    fn from_values(values: &[String]) -> Self {
        match values {
            [] => DownloadArg::Default,
            [one] if looks_like_index_spec(one) => DownloadArg::Indices(one.clone()),
            [one] => DownloadArg::Dir(PathBuf::from(one)),
            [dir, spec, ..] => DownloadArg::DirAndIndices(PathBuf::from(dir), spec.clone()),
        }
    }

    /// Target directory and optional index spec
    fn resolve(self, default_dir: &Path) -> (PathBuf, Option<String>) {
        match self {
            DownloadArg::Default => (default_dir.to_path_buf(), None),
            DownloadArg::Dir(dir) => (dir, None),
            DownloadArg::Indices(spec) => (default_dir.to_path_buf(), Some(spec)),
            DownloadArg::DirAndIndices(dir, spec) => (dir, Some(spec)),
        }
    }
}

fn init_tracing(verbose: u8) {
    let log_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("xiv={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn print_config(config: &Config) -> std::io::Result<()> {
    let mut out = std::io::stdout().lock();
    writeln!(out, "xiv {} configuration", VERSION)?;
    writeln!(out)?;
    for row in config.describe() {
        writeln!(
            out,
            "  {:<20} {:<12} (default: {})",
            row.var, row.value, row.default
        )?;
    }
    Ok(())
}

fn is_broken_pipe(err: &anyhow::Error) -> bool {
    err.downcast_ref::<std::io::Error>()
        .is_some_and(|e| e.kind() == std::io::ErrorKind::BrokenPipe)
}

async fn run(cli: Cli, sleeper: Arc<SignalSleeper>, diag: Diagnostics) -> Result<ExitCode> {
    let config = match Config::from_env() {
        Ok((config, warnings)) => {
            for warning in warnings {
                writeln!(diag, "Warning: {}", warning);
            }
            config
        }
        Err(e) => {
            writeln!(diag, "Warning: cannot read configuration ({}), using defaults", e);
            Config::default()
        }
    };

    if cli.show_config {
        print_config(&config)?;
        return Ok(ExitCode::SUCCESS);
    }

    let since = cli.days.map(|days| {
        let cutoff = Local::now().date_naive() - chrono::Duration::days(i64::from(days));
        cutoff.format("%Y-%m-%d").to_string()
    });
    let max_results = match (cli.max_results, &since) {
        (Some(n), _) => n as usize,
        (None, Some(_)) => MAX_TIME_RESULTS,
        (None, None) => config.max_results,
    };

    let mut query = SearchQuery::new(&cli.query)
        .max_results(max_results)
        .sort(cli.sort.unwrap_or(config.sort));
    for category in &cli.categories {
        query = query.category(category);
    }
    if let Some(since) = since {
        query = query.since(since);
    }

    let transport = Arc::new(HttpClient::new().context("Failed to set up HTTP client")?);
    let source = ArxivSource::new(transport.clone(), sleeper.clone(), diag.clone())
        .retry(config.retry_config())
        .default_category(&config.category)
        .max_authors(config.max_authors);

    let papers = source.search(&query).await?;
    if papers.is_empty() {
        writeln!(diag, "No papers found matching your query.");
        return Ok(ExitCode::from(EXIT_FAILURE));
    }

    let download = cli
        .download
        .as_deref()
        .map(|values| DownloadArg::from_values(values).resolve(&config.pdf_dir));
    let selection = match &download {
        Some((_, Some(spec))) => match IndexSelection::parse(spec, papers.len()) {
            Some(selection) => Some(selection),
            None => {
                writeln!(
                    diag,
                    "Error: invalid index spec '{}' (results are numbered 1-{})",
                    spec,
                    papers.len()
                );
                return Ok(ExitCode::from(EXIT_FAILURE));
            }
        },
        _ => None,
    };

    let style = if cli.json {
        OutputStyle::Json
    } else if cli.compact {
        OutputStyle::Compact
    } else {
        OutputStyle::Detailed
    };
    let stdout = std::io::stdout();
    let color = cli.color || (config.color && stdout.is_terminal());

    if let Err(e) = write_papers(&mut stdout.lock(), &papers, style, color) {
        if e.kind() == std::io::ErrorKind::BrokenPipe {
            return Ok(ExitCode::SUCCESS);
        }
        return Err(e.into());
    }

    if let Some((dir, _)) = download {
        let downloader = Downloader::new(transport, sleeper, diag)
            .retry(config.retry_config())
            .delay(config.download_delay);
        let report = downloader
            .download_all(&papers, &dir, selection.as_ref())
            .await;
        tracing::debug!("Download finished: {:?}", report);

        if report.cancelled {
            return Ok(ExitCode::from(EXIT_SIGINT));
        }
    }

    Ok(ExitCode::SUCCESS)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(EXIT_FAILURE)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    init_tracing(cli.verbose);

    let diag = Diagnostics::stderr();
    let sleeper = Arc::new(SignalSleeper::install());

    tokio::select! {
        result = run(cli, Arc::clone(&sleeper), diag.clone()) => match result {
            Ok(code) => code,
            Err(e) if is_broken_pipe(&e) => ExitCode::SUCCESS,
            Err(e) => {
                writeln!(diag, "Error: {:#}", e);
                ExitCode::from(EXIT_FAILURE)
            }
        },
        _ = sleeper.interrupted() => {
            writeln!(diag, "\n\nInterrupted.");
            ExitCode::from(EXIT_SIGINT)
        }
    }
}
