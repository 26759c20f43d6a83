// src/edgar/models.rs
use chrono::NaiveDate;
use serde::Deserialize;
use std::fmt;

/// Root of every filing folder on the public archive.
pub const ARCHIVE_BASE_URL: &str = "https://www.sec.gov/Archives/edgar/data";

/// Name of the structured listing inside each filing folder.
pub const LISTING_FILE: &str = "index.json";

// --- Domain types ---

/// The annual-report forms this tool mirrors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormType {
    Primary,               // 10-K
    PrimaryAmended,        // 10-K/A
    ForeignPrimary,        // 20-F
    ForeignPrimaryAmended, // 20-F/A
}

impl FormType {
    pub const ALL: [FormType; 4] = [
        FormType::Primary,
        FormType::PrimaryAmended,
        FormType::ForeignPrimary,
        FormType::ForeignPrimaryAmended,
    ];

    /// Parses the literal form label used by the feed and inside bundles.
    pub fn parse(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|form| form.as_str().eq_ignore_ascii_case(label))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FormType::Primary => "10-K",
            FormType::PrimaryAmended => "10-K/A",
            FormType::ForeignPrimary => "20-F",
            FormType::ForeignPrimaryAmended => "20-F/A",
        }
    }

    pub fn is_amendment(&self) -> bool {
        matches!(self, FormType::PrimaryAmended | FormType::ForeignPrimaryAmended)
    }

    pub fn is_foreign(&self) -> bool {
        matches!(self, FormType::ForeignPrimary | FormType::ForeignPrimaryAmended)
    }

    /// Form label safe for file names ("10-K/A" -> "10-KA").
    pub fn folder_tag(&self) -> String {
        self.as_str().replace('/', "")
    }
}

impl fmt::Display for FormType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A ticker resolved against the identifier table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyRef {
    /// Ticker as the user supplied it.
    pub ticker: String,
    /// Zero-padded 10-digit CIK.
    pub cik: String,
    pub name: String,
}

/// One annual filing selected from the submissions feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilingCandidate {
    pub cik: String,
    /// Dash-separated canonical form, e.g. `0000320193-23-000106`.
    pub accession: String,
    pub filing_date: NaiveDate,
    pub form: FormType,
    pub primary_document: Option<String>,
}

impl FilingCandidate {
    pub fn accession_no_dashes(&self) -> String {
        self.accession.replace('-', "")
    }

    pub fn archive_cik(&self) -> String {
        archive_cik(&self.cik)
    }

    /// URL of a file inside this filing's folder.
    pub fn file_url(&self, name: &str) -> String {
        archive_file_url(&self.archive_cik(), &self.accession_no_dashes(), name)
    }

    pub fn listing_url(&self) -> String {
        self.file_url(LISTING_FILE)
    }

    /// URL of the single-file legacy bundle (`<accession>.txt`).
    pub fn bundle_url(&self) -> String {
        self.file_url(&self.bundle_file_name())
    }

    pub fn bundle_file_name(&self) -> String {
        format!("{}.txt", self.accession_no_dashes())
    }

    /// `{FORMTAG}_{date}_{accession}`, shared by the filing folder and document.
    pub fn local_stem(&self) -> String {
        format!(
            "{}_{}_{}",
            self.form.folder_tag(),
            self.filing_date.format("%Y-%m-%d"),
            self.accession
        )
    }
}

/// Which resolution strategy produced a document URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceTier {
    DeclaredName,
    DirectoryListing,
    LegacyBundleParse,
}

impl SourceTier {
    /// Strict attempt order; the first tier yielding a URL wins.
    pub const ORDER: [SourceTier; 3] = [
        SourceTier::DeclaredName,
        SourceTier::DirectoryListing,
        SourceTier::LegacyBundleParse,
    ];
}

impl fmt::Display for SourceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SourceTier::DeclaredName => "declared name",
            SourceTier::DirectoryListing => "directory listing",
            SourceTier::LegacyBundleParse => "legacy bundle",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDocument {
    pub candidate: FilingCandidate,
    pub url: String,
    pub tier: SourceTier,
}

/// One entry of a filing folder, as shown in the local index page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetItem {
    pub name: String,
    pub url: String,
    pub local_exists: bool,
}

// --- Archive URL helpers ---

/// The archive paths use the CIK without zero padding.
pub fn archive_cik(cik: &str) -> String {
    match cik.parse::<u64>() {
        Ok(n) => n.to_string(),
        Err(_) => cik.trim_start_matches('0').to_string(),
    }
}

pub fn archive_file_url(archive_cik: &str, accession_no_dashes: &str, name: &str) -> String {
    format!(
        "{}/{}/{}/{}",
        ARCHIVE_BASE_URL, archive_cik, accession_no_dashes, name
    )
}

/// `.htm` / `.html`, any case.
pub fn is_html_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.ends_with(".htm") || lower.ends_with(".html")
}

/// Zero-pads a numeric CIK to the canonical 10 digits.
pub fn pad_cik(cik: u64) -> String {
    format!("{:010}", cik)
}

// --- Wire models ---

/// One record of `company_tickers.json`:
/// `{"0": {"cik_str": 320193, "ticker": "AAPL", "title": "Apple Inc."}, ...}`
#[derive(Debug, Clone, Deserialize)]
pub struct CompanyTickerEntry {
    pub cik_str: u64,
    pub ticker: String,
    pub title: String,
}

/// Subset of `https://data.sec.gov/submissions/CIK##########.json`.
#[derive(Debug, Default, Deserialize)]
pub struct SubmissionsFeed {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub filings: Filings,
}

#[derive(Debug, Default, Deserialize)]
pub struct Filings {
    #[serde(default)]
    pub recent: RecentFilings,
}

/// Parallel arrays, one index per filing.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentFilings {
    #[serde(default)]
    pub form: Vec<String>,
    #[serde(default)]
    pub accession_number: Vec<String>,
    #[serde(default)]
    pub filing_date: Vec<String>,
    #[serde(default)]
    pub primary_document: Vec<String>,
}

/// `index.json` of a filing folder.
#[derive(Debug, Default, Deserialize)]
pub struct DirectoryListing {
    #[serde(default)]
    pub directory: Directory,
}

#[derive(Debug, Default, Deserialize)]
pub struct Directory {
    #[serde(default)]
    pub item: Vec<DirectoryItem>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DirectoryItem {
    #[serde(default)]
    pub name: String,
}

impl DirectoryListing {
    /// Non-empty file names in listing order.
    pub fn names(&self) -> Vec<String> {
        self.directory
            .item
            .iter()
            .filter(|item| !item.name.is_empty())
            .map(|item| item.name.clone())
            .collect()
    }
}
