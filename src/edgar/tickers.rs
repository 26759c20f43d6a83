// src/edgar/tickers.rs
use crate::edgar::client::{get_json_with_retry, Fetch, RetryPolicy};
use crate::edgar::models::{pad_cik, CompanyRef, CompanyTickerEntry};
use crate::utils::error::EdgarError;
use std::collections::HashMap;

pub const TICKER_TABLE_URL: &str = "https://www.sec.gov/files/company_tickers.json";

/// Uppercases and drops punctuation, so "BRK.B", "BRK-B" and "brkb" coincide.
pub fn normalize_ticker(ticker: &str) -> String {
    ticker
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Ticker -> (CIK, company name), keyed by normalized ticker.
#[derive(Debug, Default)]
pub struct TickerTable {
    by_ticker: HashMap<String, (String, String)>,
}

/// Outcome of a batch lookup, in input order.
#[derive(Debug, Default)]
pub struct TickerResolution {
    pub resolved: Vec<CompanyRef>,
    pub unresolved: Vec<String>,
}

impl TickerTable {
    /// Builds the table; when two records normalize to the same ticker the first one wins.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = CompanyTickerEntry>,
    {
        let mut by_ticker = HashMap::new();
        for entry in entries {
            let key = normalize_ticker(&entry.ticker);
            if key.is_empty() {
                continue;
            }
            by_ticker
                .entry(key)
                .or_insert_with(|| (pad_cik(entry.cik_str), entry.title));
        }
        Self { by_ticker }
    }

    /// Builds the table from the raw `company_tickers.json` object, keeping its numeric key order.
    pub fn from_raw(raw: HashMap<String, CompanyTickerEntry>) -> Self {
        let mut records: Vec<(String, CompanyTickerEntry)> = raw.into_iter().collect();
        records.sort_by(|(a, _), (b, _)| match (a.parse::<u64>(), b.parse::<u64>()) {
            (Ok(x), Ok(y)) => x.cmp(&y),
            _ => a.cmp(b),
        });
        Self::from_entries(records.into_iter().map(|(_, entry)| entry))
    }

    /// Downloads the full identifier table once.
    pub async fn fetch(fetch: &dyn Fetch, policy: &RetryPolicy) -> Result<Self, EdgarError> {
        let raw: HashMap<String, CompanyTickerEntry> =
            get_json_with_retry(fetch, TICKER_TABLE_URL, policy).await?;
        let table = Self::from_raw(raw);
        tracing::info!("Loaded {} tickers from identifier table", table.len());
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.by_ticker.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_ticker.is_empty()
    }

    /// Absence is a normal outcome, not an error.
    pub fn lookup(&self, ticker: &str) -> Option<CompanyRef> {
        let key = normalize_ticker(ticker);
        if key.is_empty() {
            return None;
        }
        self.by_ticker.get(&key).map(|(cik, name)| CompanyRef {
            ticker: ticker.trim().to_string(),
            cik: cik.clone(),
            name: name.clone(),
        })
    }

    pub fn resolve_batch<S: AsRef<str>>(&self, tickers: &[S]) -> TickerResolution {
        let mut resolution = TickerResolution::default();
        for ticker in tickers {
            let ticker = ticker.as_ref();
            match self.lookup(ticker) {
                Some(company) => {
                    tracing::info!("{} -> CIK: {} ({})", ticker, company.cik, company.name);
                    resolution.resolved.push(company);
                }
                None => {
                    tracing::warn!("{}: not found in SEC ticker table", ticker);
                    resolution.unresolved.push(ticker.to_string());
                }
            }
        }
        resolution
    }
}

/// Fetches the table and partitions `tickers`. A failed fetch leaves every ticker unresolved.
pub async fn resolve_tickers<S: AsRef<str>>(
    fetch: &dyn Fetch,
    policy: &RetryPolicy,
    tickers: &[S],
) -> TickerResolution {
    tracing::info!("Converting {} tickers to CIK numbers...", tickers.len());
    let table = match TickerTable::fetch(fetch, policy).await {
        Ok(table) => table,
        Err(e) => {
            tracing::error!("Could not load identifier table: {}", e);
            TickerTable::default()
        }
    };
    if table.is_empty() {
        tracing::warn!("Identifier table is empty; no ticker can be resolved");
    }
    let resolution = table.resolve_batch(tickers);
    tracing::info!(
        "Converted: {}/{}, failed: {}",
        resolution.resolved.len(),
        tickers.len(),
        resolution.unresolved.len()
    );
    resolution
}
