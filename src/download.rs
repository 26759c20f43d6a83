// src/download.rs
use crate::config::Config;
use crate::edgar::bundle;
use crate::edgar::catalog::recent_annual_filings;
use crate::edgar::client::{Fetch, RetryPolicy};
use crate::edgar::models::{CompanyRef, FilingCandidate, ResolvedDocument};
use crate::edgar::pacing;
use crate::edgar::resolver::DocumentResolver;
use crate::storage::assets::{refresh_index, AssetFetcher};
use crate::storage::{write_atomic, StorageManager};
use crate::utils::error::EdgarError;
use std::path::Path;

/// Totals reported at the end of a run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DownloadSummary {
    pub successful_companies: usize,
    pub failed_companies: Vec<String>,
    pub documents_saved: usize,
    pub exhibits_downloaded: usize,
    pub failed_candidates: usize,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CompanyOutcome {
    pub filings_found: usize,
    pub documents_saved: usize,
    pub exhibits_downloaded: usize,
    pub failed_candidates: usize,
}

/// Files written for one filing folder.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FilingOutcome {
    pub document_saved: bool,
    /// Set when bundle recovery already mirrored the folder's assets.
    pub assets_mirrored: Option<usize>,
}

/// Sequential per-company pipeline: catalog, resolve, fetch document, fetch assets.
pub struct Downloader<'a> {
    fetch: &'a dyn Fetch,
    config: &'a Config,
    storage: &'a StorageManager,
    retry: RetryPolicy,
}

impl<'a> Downloader<'a> {
    pub fn new(fetch: &'a dyn Fetch, config: &'a Config, storage: &'a StorageManager) -> Self {
        Self {
            fetch,
            config,
            storage,
            retry: RetryPolicy::from_config(config),
        }
    }

    /// Processes every company; failures are counted, never propagated.
    pub async fn run(&self, companies: &[CompanyRef]) -> DownloadSummary {
        tracing::info!(
            "Downloading last {} annual-report HTML files for {} companies into {}",
            self.config.filings_per_company,
            companies.len(),
            self.storage.base_dir().display()
        );

        let mut summary = DownloadSummary::default();
        for (i, company) in companies.iter().enumerate() {
            tracing::info!(
                "[{}/{}] {} ({}) CIK {}",
                i + 1,
                companies.len(),
                company.ticker,
                company.name,
                company.cik
            );

            let outcome = self.process_company(company).await;
            tracing::debug!(
                "{}: {} filing(s), {} saved, {} failed",
                company.ticker,
                outcome.filings_found,
                outcome.documents_saved,
                outcome.failed_candidates
            );
            summary.documents_saved += outcome.documents_saved;
            summary.exhibits_downloaded += outcome.exhibits_downloaded;
            summary.failed_candidates += outcome.failed_candidates;

            if outcome.documents_saved > 0 {
                tracing::info!(
                    "Saved {} annual HTML file(s) for {}",
                    outcome.documents_saved,
                    company.ticker
                );
                summary.successful_companies += 1;
            } else {
                tracing::warn!("No annual HTML files saved for {}", company.ticker);
                summary.failed_companies.push(company.ticker.clone());
            }

            if i + 1 < companies.len() {
                pacing::pause(self.config.company_interval).await;
            }
        }
        summary
    }

    pub async fn process_company(&self, company: &CompanyRef) -> CompanyOutcome {
        let query = self.config.catalog_query();
        let candidates = recent_annual_filings(self.fetch, &self.retry, company, &query).await;

        let mut outcome = CompanyOutcome {
            filings_found: candidates.len(),
            ..CompanyOutcome::default()
        };
        if candidates.is_empty() {
            tracing::warn!("No annual report filings found for {}", company.ticker);
            return outcome;
        }
        tracing::info!("Found {} filing(s)", candidates.len());

        let resolver = DocumentResolver::new(self.fetch);
        for candidate in &candidates {
            let filing_dir = self.storage.filing_path(company, candidate);
            let existing = StorageManager::document_path(&filing_dir, candidate);

            let filing = if existing.is_file() {
                tracing::info!("Already present, skipping: {}", existing.display());
                FilingOutcome {
                    document_saved: true,
                    assets_mirrored: None,
                }
            } else {
                let Some(resolved) = resolver.resolve(candidate).await else {
                    outcome.failed_candidates += 1;
                    continue;
                };
                if let Err(e) = self.storage.filing_dir(company, candidate) {
                    tracing::error!("Could not create folder for {}: {}", candidate.accession, e);
                    outcome.failed_candidates += 1;
                    continue;
                }
                self.save_document(&resolved, &filing_dir).await
            };

            if filing.document_saved {
                outcome.documents_saved += 1;
            } else {
                outcome.failed_candidates += 1;
            }

            let exhibits = match filing.assets_mirrored {
                Some(count) => count,
                None if self.config.download_exhibits => {
                    self.asset_fetcher().fetch_assets(candidate, &filing_dir).await
                }
                None => 0,
            };
            if self.config.download_exhibits {
                tracing::info!("Downloaded {} exhibit file(s) for {}", exhibits, candidate.accession);
            }
            outcome.exhibits_downloaded += exhibits;
        }
        outcome
    }

    async fn save_document(&self, resolved: &ResolvedDocument, filing_dir: &Path) -> FilingOutcome {
        let candidate = &resolved.candidate;
        let path = StorageManager::document_path(filing_dir, candidate);
        tracing::info!(
            "{} {} ({}) via {}: {}",
            candidate.form,
            candidate.filing_date,
            candidate.accession,
            resolved.tier,
            resolved.url
        );

        let mut filing = FilingOutcome::default();
        match self.download_document(resolved, &path, &mut filing).await {
            Ok(()) => filing.document_saved = true,
            Err(e) => tracing::warn!("Could not download {}: {}", resolved.url, e),
        }
        filing
    }

    /// Fetches the document into `output_path`. If the archive answers with a
    /// legacy bundle instead of HTML, the bundle is kept beside the document,
    /// the filing's assets are mirrored (recorded in `filing`), and the embedded
    /// annual report is fetched by its own URL.
    pub async fn download_document(
        &self,
        resolved: &ResolvedDocument,
        output_path: &Path,
        filing: &mut FilingOutcome,
    ) -> Result<(), EdgarError> {
        let body = self.fetch.get(&resolved.url).await?;
        let text = String::from_utf8_lossy(&body);
        if !bundle::looks_like_bundle(&text) {
            write_atomic(output_path, &body)?;
            return Ok(());
        }

        let candidate = &resolved.candidate;
        tracing::info!(
            "Legacy bundle returned for {}; extracting the embedded annual report",
            candidate.accession
        );
        let dir = output_path.parent().unwrap_or_else(|| Path::new("."));
        filing.assets_mirrored = self.recover_from_bundle(candidate, &body, dir).await;

        let name = bundle::annual_report_filename(&text).ok_or_else(|| {
            EdgarError::Parse(format!(
                "no 10-K/20-F HTML document inside bundle for {}",
                candidate.accession
            ))
        })?;
        tracing::info!("Fetching embedded annual report: {}", name);
        let real = self.fetch.get(&candidate.file_url(&name)).await?;
        write_atomic(output_path, &real)?;
        Ok(())
    }

    /// Keeps the raw bundle and mirrors the folder's assets, or only refreshes
    /// the index page when exhibits are off. Returns the number of assets
    /// downloaded when the mirror ran.
    async fn recover_from_bundle(
        &self,
        candidate: &FilingCandidate,
        raw: &[u8],
        dir: &Path,
    ) -> Option<usize> {
        let bundle_path = dir.join(candidate.bundle_file_name());
        if let Err(e) = write_atomic(&bundle_path, raw) {
            tracing::debug!("Could not save bundle {}: {}", bundle_path.display(), e);
        }

        if self.config.download_exhibits {
            Some(self.asset_fetcher().fetch_assets(candidate, dir).await)
        } else {
            refresh_index(self.fetch, candidate, dir).await;
            None
        }
    }

    fn asset_fetcher(&self) -> AssetFetcher<'_> {
        AssetFetcher::new(self.fetch, &self.config.exhibit_extensions)
    }
}
