// src/edgar/catalog.rs
use crate::edgar::client::{get_json_with_retry, Fetch, RetryPolicy};
use crate::edgar::models::{CompanyRef, FilingCandidate, FormType, SubmissionsFeed};
use chrono::{Datelike, NaiveDate};

/// Which annual forms to keep besides plain 10-K.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormFilter {
    pub include_amendments: bool,
    pub include_foreign: bool,
}

impl Default for FormFilter {
    fn default() -> Self {
        Self {
            include_amendments: true,
            include_foreign: true,
        }
    }
}

impl FormFilter {
    pub fn accepts(&self, form: FormType) -> bool {
        (self.include_amendments || !form.is_amendment())
            && (self.include_foreign || !form.is_foreign())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogQuery {
    /// Keep at most this many of the most recent filings.
    pub count: usize,
    pub forms: FormFilter,
    /// Inclusive filing-year bounds.
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
}

impl Default for CatalogQuery {
    fn default() -> Self {
        Self {
            count: 5,
            forms: FormFilter::default(),
            start_year: None,
            end_year: None,
        }
    }
}

impl CatalogQuery {
    fn in_year_window(&self, date: NaiveDate) -> bool {
        let year = date.year();
        self.start_year.map_or(true, |start| year >= start)
            && self.end_year.map_or(true, |end| year <= end)
    }
}

pub fn submissions_url(cik: &str) -> String {
    format!("https://data.sec.gov/submissions/CIK{}.json", cik)
}

/// Filters the feed to the requested forms, newest first, truncated to `query.count`.
/// Equal filing dates keep feed order.
pub fn select_candidates(cik: &str, feed: &SubmissionsFeed, query: &CatalogQuery) -> Vec<FilingCandidate> {
    let recent = &feed.filings.recent;
    let mut candidates = Vec::new();

    for (i, label) in recent.form.iter().enumerate() {
        let Some(form) = FormType::parse(label) else {
            continue;
        };
        if !query.forms.accepts(form) {
            continue;
        }

        let (Some(accession), Some(date)) = (recent.accession_number.get(i), recent.filing_date.get(i))
        else {
            tracing::warn!("Feed entry {} for CIK {} is missing accession or date", i, cik);
            continue;
        };
        let filing_date = match NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d") {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!("Skipping {} with unparseable filing date {:?}: {}", accession, date, e);
                continue;
            }
        };
        if !query.in_year_window(filing_date) {
            continue;
        }

        let primary_document = recent
            .primary_document
            .get(i)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        candidates.push(FilingCandidate {
            cik: cik.to_string(),
            accession: accession.trim().to_string(),
            filing_date,
            form,
            primary_document,
        });
    }

    // sort_by is stable, so ties keep feed order
    candidates.sort_by(|a, b| b.filing_date.cmp(&a.filing_date));
    candidates.truncate(query.count);
    candidates
}

/// Fetches the company's filing history and selects annual filings.
/// A failed fetch is logged and yields no candidates.
pub async fn recent_annual_filings(
    fetch: &dyn Fetch,
    policy: &RetryPolicy,
    company: &CompanyRef,
    query: &CatalogQuery,
) -> Vec<FilingCandidate> {
    let url = submissions_url(&company.cik);
    let feed: SubmissionsFeed = match get_json_with_retry(fetch, &url, policy).await {
        Ok(feed) => feed,
        Err(e) => {
            tracing::error!("Could not load filings for CIK {}: {}", company.cik, e);
            return Vec::new();
        }
    };

    let candidates = select_candidates(&company.cik, &feed, query);
    tracing::debug!(
        "{} annual filing(s) selected for {} ({})",
        candidates.len(),
        company.ticker,
        feed.name
    );
    candidates
}
