// src/main.rs
mod config;
mod download;
mod edgar;
mod storage;
mod utils;

#[cfg(test)]
mod testing;

use clap::Parser;
use config::{parse_extensions, Config, DEFAULT_USER_AGENT};
use download::Downloader;
use edgar::client::{EdgarClient, RetryPolicy};
use edgar::pacing::{IntervalLimiter, RateLimiter, Unlimited};
use edgar::tickers::resolve_tickers;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use storage::StorageManager;
use utils::AppError;

/// Mirror recent 10-K / 20-F annual reports and their exhibits from SEC EDGAR
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Ticker symbols of the companies (e.g. AAPL BRK.B)
    tickers: Vec<String>,

    /// File with one ticker per line ('#' starts a comment)
    #[arg(long)]
    tickers_file: Option<PathBuf>,

    /// Output directory for the mirrored filings
    #[arg(short, long, default_value = "./annual_reports")]
    output_dir: PathBuf,

    /// Number of most recent annual filings per company
    #[arg(short = 'n', long, default_value_t = 5)]
    count: usize,

    /// Skip amended filings (10-K/A, 20-F/A)
    #[arg(long)]
    no_amendments: bool,

    /// Skip foreign-issuer annual reports (20-F, 20-F/A)
    #[arg(long)]
    no_foreign: bool,

    /// Do not download exhibits and other filing files
    #[arg(long)]
    no_exhibits: bool,

    /// Comma separated extensions of filing files to download
    #[arg(long, default_value = "htm,html,txt,pdf")]
    exhibit_ext: String,

    /// Earliest filing year (optional)
    #[arg(long)]
    start_year: Option<i32>,

    /// Latest filing year (optional)
    #[arg(long)]
    end_year: Option<i32>,

    /// Descriptive User-Agent with contact details, as SEC requires
    #[arg(long, env = "EDGAR_USER_AGENT", default_value = DEFAULT_USER_AGENT)]
    user_agent: String,

    /// Where to write the ticker -> CIK mapping
    #[arg(long, default_value = "ticker_cik_mapping.json")]
    mapping_file: PathBuf,

    /// Minimum delay between requests in milliseconds
    #[arg(long, default_value_t = 300)]
    request_delay_ms: u64,

    /// Delay between companies in milliseconds
    #[arg(long, default_value_t = 1000)]
    company_delay_ms: u64,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,

    /// Attempts for the ticker table and filing history requests
    #[arg(long, default_value_t = 3)]
    max_retries: u32,

    /// Base backoff between retries in milliseconds (grows linearly)
    #[arg(long, default_value_t = 1000)]
    retry_backoff_ms: u64,

    /// Start downloading without asking for confirmation
    #[arg(short, long)]
    yes: bool,

    /// Debug logging unless RUST_LOG says otherwise
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn to_config(&self) -> Result<Config, AppError> {
        if self.count == 0 {
            return Err(AppError::Config("--count must be at least 1".to_string()));
        }
        if let (Some(start), Some(end)) = (self.start_year, self.end_year) {
            if start > end {
                return Err(AppError::Config(format!(
                    "--start-year {} is after --end-year {}",
                    start, end
                )));
            }
        }
        let exhibit_extensions = parse_extensions(&self.exhibit_ext);
        if exhibit_extensions.is_empty() && !self.no_exhibits {
            return Err(AppError::Config("--exhibit-ext lists no extensions".to_string()));
        }

        Ok(Config {
            user_agent: self.user_agent.trim().to_string(),
            request_timeout: Duration::from_secs(self.timeout_secs),
            request_interval: Duration::from_millis(self.request_delay_ms),
            company_interval: Duration::from_millis(self.company_delay_ms),
            max_retries: self.max_retries,
            retry_backoff: Duration::from_millis(self.retry_backoff_ms),
            filings_per_company: self.count,
            include_amendments: !self.no_amendments,
            include_foreign: !self.no_foreign,
            start_year: self.start_year,
            end_year: self.end_year,
            download_exhibits: !self.no_exhibits,
            exhibit_extensions,
            output_dir: self.output_dir.clone(),
            mapping_file: self.mapping_file.clone(),
        })
    }

    /// Positional tickers followed by the file's, without repeats.
    fn collect_tickers(&self) -> Result<Vec<String>, AppError> {
        let mut tickers: Vec<String> = Vec::new();
        let from_file = match &self.tickers_file {
            Some(path) => parse_ticker_lines(&std::fs::read_to_string(path)?),
            None => Vec::new(),
        };
        for ticker in self.tickers.iter().map(|t| t.trim().to_string()).chain(from_file) {
            if !ticker.is_empty() && !tickers.contains(&ticker) {
                tickers.push(ticker);
            }
        }
        Ok(tickers)
    }
}

/// One ticker per line; blank lines and `#` comments are ignored.
fn parse_ticker_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(|line| line.split('#').next().unwrap_or("").trim())
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Yes/no gate before the bulk download.
fn confirm<R: BufRead, W: Write>(prompt: &str, input: &mut R, output: &mut W) -> io::Result<bool> {
    write!(output, "{} (y/n): ", prompt)?;
    output.flush()?;
    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Parse CLI Arguments and setup logging (reads RUST_LOG env var)
    let args = Args::parse();
    utils::logging::setup_logging(args.verbose);
    tracing::debug!("Starting with args: {:?}", args);

    let config = args.to_config()?;
    let tickers = args.collect_tickers()?;
    if tickers.is_empty() {
        return Err(AppError::Config(
            "No tickers given; pass them as arguments or with --tickers-file".to_string(),
        ));
    }
    if config.uses_default_user_agent() {
        tracing::warn!(
            "Using the placeholder User-Agent; set --user-agent or EDGAR_USER_AGENT to your name and email"
        );
    }

    // 2. Build the paced EDGAR client
    let limiter: Arc<dyn RateLimiter> = if config.request_interval.is_zero() {
        Arc::new(Unlimited)
    } else {
        Arc::new(IntervalLimiter::new(config.request_interval))
    };
    let client = EdgarClient::new(&config, limiter)?;

    // 3. Tickers -> CIKs, recorded before anything is downloaded
    let resolution = resolve_tickers(&client, &RetryPolicy::from_config(&config), &tickers).await;
    if let Err(e) = storage::save_ticker_mapping(&config.mapping_file, &resolution) {
        tracing::error!("Failed to save ticker mapping: {}", e);
    }
    if !resolution.unresolved.is_empty() {
        tracing::warn!("Failed tickers: {}", resolution.unresolved.join(", "));
    }
    if resolution.resolved.is_empty() {
        tracing::warn!("No valid CIKs found. Cannot proceed with download.");
        return Ok(());
    }

    // 4. Confirmation gate
    if !args.yes {
        let prompt = format!(
            "Download filings for {} companies?",
            resolution.resolved.len()
        );
        let proceed = confirm(&prompt, &mut io::stdin().lock(), &mut io::stdout())?;
        if !proceed {
            tracing::info!("Download cancelled.");
            return Ok(());
        }
    }

    // 5. Mirror filings
    let storage = StorageManager::new(&config.output_dir)?;
    let summary = Downloader::new(&client, &config, &storage)
        .run(&resolution.resolved)
        .await;

    tracing::info!("DOWNLOAD COMPLETE");
    tracing::info!("Successful companies: {}", summary.successful_companies);
    tracing::info!("Failed companies: {}", summary.failed_companies.len());
    if !summary.failed_companies.is_empty() {
        tracing::info!("  {}", summary.failed_companies.join(", "));
    }
    tracing::info!("Unresolved tickers: {}", resolution.unresolved.len());
    tracing::info!("Filings without a document: {}", summary.failed_candidates);
    tracing::info!("Annual HTML files saved: {}", summary.documents_saved);
    tracing::info!("Exhibit files downloaded: {}", summary.exhibits_downloaded);
    tracing::info!("All files saved to: {}", config.output_dir.display());

    Ok(())
}
