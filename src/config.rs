// src/config.rs
use std::path::PathBuf;
use std::time::Duration;

use crate::edgar::catalog::{CatalogQuery, FormFilter};

/// SEC asks for a descriptive User-Agent with contact details.
pub const DEFAULT_USER_AGENT: &str = "annual_mirror/0.1 (contact@example.com)";

/// Run-wide settings, built once in `main` and handed to each component.
#[derive(Debug, Clone)]
pub struct Config {
    pub user_agent: String,
    pub request_timeout: Duration,
    /// Minimum spacing between two outbound requests.
    pub request_interval: Duration,
    /// Pause after each company.
    pub company_interval: Duration,
    pub max_retries: u32,
    /// Base of the linear backoff: attempt `n` sleeps `n * retry_backoff`.
    pub retry_backoff: Duration,
    pub filings_per_company: usize,
    pub include_amendments: bool,
    pub include_foreign: bool,
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
    pub download_exhibits: bool,
    /// Lowercase, without the leading dot.
    pub exhibit_extensions: Vec<String>,
    pub output_dir: PathBuf,
    pub mapping_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout: Duration::from_secs(30),
            request_interval: Duration::from_millis(300),
            company_interval: Duration::from_millis(1000),
            max_retries: 3,
            retry_backoff: Duration::from_millis(1000),
            filings_per_company: 5,
            include_amendments: true,
            include_foreign: true,
            start_year: None,
            end_year: None,
            download_exhibits: true,
            exhibit_extensions: ["htm", "html", "txt", "pdf"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            output_dir: PathBuf::from("./annual_reports"),
            mapping_file: PathBuf::from("ticker_cik_mapping.json"),
        }
    }
}

impl Config {
    pub fn catalog_query(&self) -> CatalogQuery {
        CatalogQuery {
            count: self.filings_per_company,
            forms: FormFilter {
                include_amendments: self.include_amendments,
                include_foreign: self.include_foreign,
            },
            start_year: self.start_year,
            end_year: self.end_year,
        }
    }

    pub fn uses_default_user_agent(&self) -> bool {
        self.user_agent == DEFAULT_USER_AGENT
    }
}

/// Case-insensitive extension match; `exts` are given without the dot.
pub fn extension_allowed(name: &str, exts: &[String]) -> bool {
    let lower = name.to_ascii_lowercase();
    exts.iter().any(|ext| {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        lower.len() > ext.len() + 1 && lower.ends_with(&format!(".{}", ext))
    })
}

/// Normalizes a comma separated extension list such as ".htm, PDF".
pub fn parse_extensions(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}
