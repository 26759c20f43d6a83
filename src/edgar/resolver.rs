// src/edgar/resolver.rs
use crate::edgar::bundle;
use crate::edgar::client::{get_json, get_text, Fetch};
use crate::edgar::models::{
    is_html_name, DirectoryListing, FilingCandidate, ResolvedDocument, SourceTier,
};
use crate::utils::error::EdgarError;
use once_cell::sync::Lazy;
use regex::Regex;

/// Generic landing page of a filing folder.
pub const INDEX_PAGE: &str = "index.html";

/// Filing-type tokens that mark an annual report file name.
const ANNUAL_TOKENS: [&str; 4] = ["10-k", "10k", "20-f", "20f"];

static EXHIBIT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bex[-_ ]?\d").expect("Failed to compile EXHIBIT_RE"));

/// Heuristic rank of a file name as the annual report; higher is better.
///
/// Domestic tokens +10, foreign tokens +9, "form" +2, a bare `index.html` -10,
/// exhibit numbering or "exhibit" -5, and `len / 10` (capped at 3) to favour
/// longer, more descriptive names.
pub fn score_filename(name: &str) -> i32 {
    let n = name.to_lowercase();
    let mut score = 0;
    if n.contains("10-k") || n.contains("10k") {
        score += 10;
    }
    if n.contains("20-f") || n.contains("20f") {
        score += 9;
    }
    if n.contains("form") {
        score += 2;
    }
    if n == INDEX_PAGE {
        score -= 10;
    }
    if EXHIBIT_RE.is_match(&n) || n.contains("exhibit") {
        score -= 5;
    }
    score + (n.chars().count() / 10).min(3) as i32
}

/// Highest scoring HTML name; the earliest one wins a tie.
pub fn best_listed_html(names: &[String]) -> Option<&str> {
    let mut best: Option<(&str, i32)> = None;
    for name in names.iter().filter(|n| is_html_name(n)) {
        let score = score_filename(name);
        if best.map_or(true, |(_, top)| score > top) {
            best = Some((name.as_str(), score));
        }
    }
    best.map(|(name, _)| name)
}

/// Tier 1: trust the feed's declared primary document when it is HTML and
/// carries a filing-type token.
pub fn from_declared_name(candidate: &FilingCandidate) -> Option<String> {
    let declared = candidate.primary_document.as_deref()?;
    let lower = declared.to_lowercase();
    if is_html_name(declared) && ANNUAL_TOKENS.iter().any(|t| lower.contains(t)) {
        Some(candidate.file_url(declared))
    } else {
        None
    }
}

/// Tier 2: best scoring HTML file from the folder listing, unless it is the index page.
pub fn from_listing(candidate: &FilingCandidate, names: &[String]) -> Option<String> {
    match best_listed_html(names) {
        Some(best) if best != INDEX_PAGE => Some(candidate.file_url(best)),
        _ => None,
    }
}

/// Tier 3: the annual-report document embedded in the legacy bundle.
pub fn from_bundle(candidate: &FilingCandidate, bundle_text: &str) -> Option<String> {
    bundle::annual_report_filename(bundle_text).map(|name| candidate.file_url(&name))
}

/// File names of the filing folder, in listing order.
pub async fn directory_listing(
    fetch: &dyn Fetch,
    candidate: &FilingCandidate,
) -> Result<Vec<String>, EdgarError> {
    let listing: DirectoryListing = get_json(fetch, &candidate.listing_url()).await?;
    Ok(listing.names())
}

/// Runs the tiers in [`SourceTier::ORDER`]. Each tier's input (nothing, the
/// folder listing, the legacy bundle) is fetched only when that tier is reached.
pub struct DocumentResolver<'a> {
    fetch: &'a dyn Fetch,
}

impl<'a> DocumentResolver<'a> {
    pub fn new(fetch: &'a dyn Fetch) -> Self {
        Self { fetch }
    }

    /// Runs the tiers in order and stops at the first URL.
    /// `None` means no document could be found; the caller skips the candidate.
    pub async fn resolve(&self, candidate: &FilingCandidate) -> Option<ResolvedDocument> {
        for tier in SourceTier::ORDER {
            if let Some(url) = self.attempt(tier, candidate).await {
                tracing::debug!("{} resolved via {}: {}", candidate.accession, tier, url);
                return Some(ResolvedDocument {
                    candidate: candidate.clone(),
                    url,
                    tier,
                });
            }
        }
        tracing::warn!(
            "No annual report document found for {} {} ({})",
            candidate.form,
            candidate.accession,
            candidate.filing_date
        );
        None
    }

    async fn attempt(&self, tier: SourceTier, candidate: &FilingCandidate) -> Option<String> {
        match tier {
            SourceTier::DeclaredName => from_declared_name(candidate),
            SourceTier::DirectoryListing => match directory_listing(self.fetch, candidate).await {
                Ok(names) => from_listing(candidate, &names),
                Err(e) => {
                    tracing::debug!("Listing unavailable for {}: {}", candidate.accession, e);
                    None
                }
            },
            SourceTier::LegacyBundleParse => {
                match get_text(self.fetch, &candidate.bundle_url()).await {
                    Ok(text) => from_bundle(candidate, &text),
                    Err(e) => {
                        tracing::debug!("Bundle unavailable for {}: {}", candidate.accession, e);
                        None
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edgar::models::FormType;
    use crate::testing::FakeArchive;
    use chrono::NaiveDate;
    use serde_json::json;

    const FOLDER: &str = "https://www.sec.gov/Archives/edgar/data/320193/000032019323000106";

    fn candidate(primary: Option<&str>) -> FilingCandidate {
        FilingCandidate {
            cik: "0000320193".to_string(),
            accession: "0000320193-23-000106".to_string(),
            filing_date: NaiveDate::from_ymd_opt(2023, 11, 3).unwrap(),
            form: FormType::Primary,
            primary_document: primary.map(str::to_string),
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn listing(list: &[&str]) -> serde_json::Value {
        let items: Vec<serde_json::Value> = list.iter().map(|n| json!({"name": n})).collect();
        json!({"directory": {"item": items}})
    }

    fn url(name: &str) -> String {
        format!("{}/{}", FOLDER, name)
    }

    #[test]
    fn scores_follow_the_table() {
        assert_eq!(score_filename("index.html"), -10 + 1);
        assert_eq!(score_filename("form10-k_2023.htm"), 10 + 2 + 1);
        assert_eq!(score_filename("ex-10_1.htm"), -5 + 1);
        assert_eq!(score_filename("d20f.htm"), 9);
        assert_eq!(score_filename("exhibit99.htm"), -5 + 1);
        assert_eq!(score_filename("a"), 0);
        // length bonus caps at 3
        assert_eq!(score_filename(&"z".repeat(80)), 3);
    }

    #[test]
    fn exhibit_pattern_needs_a_word_boundary() {
        assert!(score_filename("ex99.htm") < 0);
        assert!(score_filename("ex_31.htm") < 0);
        // "annex1" has "ex1" inside a word
        assert_eq!(score_filename("annex1.htm"), 1);
    }

    #[test]
    fn token_names_outrank_the_index_page() {
        let tokens = [
            "10-K.htm", "10k.htm", "20-F.HTM", "20f.html", "a10-k.htm", "exhibit-10k.htm",
            "ex-1_10k.htm", "x.10K.htm",
        ];
        for name in tokens {
            assert!(
                score_filename(name) > score_filename("index.html"),
                "{} should beat index.html",
                name
            );
        }
    }

    #[test]
    fn every_token_name_outranks_the_index_page() {
        let index = score_filename(INDEX_PAGE);
        let tokens = ["10-k", "10K", "10-K", "20-f", "20F", "20-F"];
        let prefixes = [
            "", "a", "x.", "ex-1_", "ex99", "ex_31-", "exhibit", "exhibit-99.1_", "EX-10.1 ", "index",
            "index.html", "d123456d",
        ];
        let long = "z".repeat(40);
        let suffixes: [&str; 7] = ["", "a", "_2023", "-exhibit", "_ex-21", ".index", long.as_str()];
        let extensions = [".htm", ".html", ".HTM", ".txt", ".pdf", ""];

        let mut checked = 0;
        for token in tokens {
            for prefix in prefixes {
                for suffix in suffixes {
                    for ext in extensions {
                        let name = format!("{}{}{}{}", prefix, token, suffix, ext);
                        assert_ne!(name, INDEX_PAGE);
                        assert!(
                            score_filename(&name) > index,
                            "{} scored {} against {}",
                            name,
                            score_filename(&name),
                            index
                        );
                        checked += 1;
                    }
                }
            }
        }
        assert_eq!(checked, tokens.len() * prefixes.len() * suffixes.len() * extensions.len());
    }

    #[test]
    fn synthetic_listing_picks_the_form_document() {
        let c = candidate(None);
        let listed = names(&["index.html", "form10-k_2023.htm", "ex-10_1.htm"]);
        assert_eq!(from_listing(&c, &listed), Some(url("form10-k_2023.htm")));
    }

    #[test]
    fn listing_ignores_non_html_and_prefers_the_first_tie() {
        let listed = names(&["form10k.txt", "aaaa.htm", "bbbb.htm", "R1.xml"]);
        assert_eq!(best_listed_html(&listed), Some("aaaa.htm"));
        assert_eq!(best_listed_html(&names(&["a.pdf"])), None);
        assert_eq!(best_listed_html(&[]), None);
    }

    #[test]
    fn index_page_alone_does_not_resolve() {
        let c = candidate(None);
        assert_eq!(from_listing(&c, &names(&["index.html", "data.xml"])), None);
    }

    #[test]
    fn declared_name_needs_html_and_a_token() {
        assert_eq!(
            from_declared_name(&candidate(Some("aapl-10k_2023.htm"))),
            Some(url("aapl-10k_2023.htm"))
        );
        assert_eq!(
            from_declared_name(&candidate(Some("D20F.HTML"))),
            Some(url("D20F.HTML"))
        );
        assert_eq!(from_declared_name(&candidate(Some("aapl-20230930.htm"))), None);
        assert_eq!(from_declared_name(&candidate(Some("form10k.txt"))), None);
        assert_eq!(from_declared_name(&candidate(None)), None);
    }

    #[tokio::test]
    async fn declared_name_short_circuits_the_other_tiers() {
        let c = candidate(Some("aapl-10k_2023.htm"));
        let archive = FakeArchive::new()
            .with_json(&c.listing_url(), listing(&["other10k.htm"]))
            .with_body(&c.bundle_url(), "<DOCUMENT>\n<TYPE>10-K\n<FILENAME>b.htm\n</DOCUMENT>");

        let resolved = DocumentResolver::new(&archive).resolve(&c).await.unwrap();
        assert_eq!(resolved.tier, SourceTier::DeclaredName);
        assert_eq!(resolved.url, url("aapl-10k_2023.htm"));
        assert_eq!(archive.total_calls(), 0);
    }

    #[tokio::test]
    async fn generic_declared_name_falls_back_to_the_listing() {
        let c = candidate(Some("aapl-20230930.htm"));
        let archive = FakeArchive::new()
            .with_json(
                &c.listing_url(),
                listing(&["index.html", "aapl-20230930.htm", "a10-k2023.htm", "R1.htm"]),
            )
            .with_body(&c.bundle_url(), "unused");

        let resolved = DocumentResolver::new(&archive).resolve(&c).await.unwrap();
        assert_eq!(resolved.tier, SourceTier::DirectoryListing);
        assert_eq!(resolved.url, url("a10-k2023.htm"));
        assert_eq!(archive.calls(&c.listing_url()), 1);
        assert_eq!(archive.calls(&c.bundle_url()), 0);
    }

    #[tokio::test]
    async fn bundle_is_parsed_when_the_listing_only_has_the_index_page() {
        let c = candidate(None);
        let bundle_text = "<DOCUMENT>\n<TYPE>EX-10.1\n<FILENAME>ex10.htm\n</DOCUMENT>\n\
                           <DOCUMENT>\n<TYPE>10-K\n<FILENAME>annual.htm\n</DOCUMENT>";
        let archive = FakeArchive::new()
            .with_json(&c.listing_url(), listing(&["index.html"]))
            .with_body(&c.bundle_url(), bundle_text);

        let resolved = DocumentResolver::new(&archive).resolve(&c).await.unwrap();
        assert_eq!(resolved.tier, SourceTier::LegacyBundleParse);
        assert_eq!(resolved.url, url("annual.htm"));
        assert_eq!(
            archive.requested(),
            vec![c.listing_url(), c.bundle_url()],
            "listing must be consulted before the bundle"
        );
    }

    #[tokio::test]
    async fn missing_listing_falls_through_to_the_bundle() {
        let c = candidate(None);
        let archive = FakeArchive::new().with_body(
            &c.bundle_url(),
            "<DOCUMENT>\n<TYPE>10-K/A\n<FILENAME>amend.htm\n</DOCUMENT>",
        );
        let resolved = DocumentResolver::new(&archive).resolve(&c).await.unwrap();
        assert_eq!(resolved.tier, SourceTier::LegacyBundleParse);
        assert_eq!(resolved.url, url("amend.htm"));
    }

    #[tokio::test]
    async fn empty_listing_and_empty_bundle_resolve_to_nothing() {
        let c = candidate(Some("cover.htm"));
        let archive = FakeArchive::new()
            .with_json(&c.listing_url(), listing(&[]))
            .with_body(&c.bundle_url(), "<DOCUMENT>\n<TYPE>EX-99\n<FILENAME>ex99.htm\n</DOCUMENT>");

        assert!(DocumentResolver::new(&archive).resolve(&c).await.is_none());
        assert_eq!(archive.calls(&c.listing_url()), 1);
        assert_eq!(archive.calls(&c.bundle_url()), 1);
    }

    #[tokio::test]
    async fn garbled_listing_is_treated_as_absent() {
        let c = candidate(None);
        let archive = FakeArchive::new()
            .with_body(&c.listing_url(), "<html>Rate limited</html>")
            .with_body(&c.bundle_url(), "<DOCUMENT>\n<TYPE>20-F\n<FILENAME>f.htm\n</DOCUMENT>");
        let resolved = DocumentResolver::new(&archive).resolve(&c).await.unwrap();
        assert_eq!(resolved.url, url("f.htm"));
    }
}
