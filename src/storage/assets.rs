// src/storage/assets.rs
use crate::config::extension_allowed;
use crate::edgar::client::Fetch;
use crate::edgar::models::FilingCandidate;
use crate::edgar::resolver::directory_listing;
use crate::storage::index_page;
use crate::storage::{is_plain_file_name, write_atomic};
use std::fs;
use std::path::Path;

/// Mirrors the files of one filing folder into a local directory.
pub struct AssetFetcher<'a> {
    fetch: &'a dyn Fetch,
    extensions: &'a [String],
}

impl<'a> AssetFetcher<'a> {
    pub fn new(fetch: &'a dyn Fetch, extensions: &'a [String]) -> Self {
        Self { fetch, extensions }
    }

    /// Downloads every listed file with an allowed extension that is not on
    /// disk yet, then rewrites the local index page. Returns the number of
    /// files newly written; individual failures are logged and skipped.
    pub async fn fetch_assets(&self, candidate: &FilingCandidate, dest_dir: &Path) -> usize {
        let names = listing_or_empty(self.fetch, candidate).await;

        let mut downloaded = 0;
        for name in &names {
            if !extension_allowed(name, self.extensions) {
                continue;
            }
            if !is_plain_file_name(name) {
                tracing::warn!("Skipping suspicious listing entry {:?}", name);
                continue;
            }
            let dest_path = dest_dir.join(name);
            if dest_path.exists() {
                continue;
            }

            let url = candidate.file_url(name);
            match self.fetch.get(&url).await {
                Ok(bytes) => match write_atomic(&dest_path, &bytes) {
                    Ok(()) => downloaded += 1,
                    Err(e) => tracing::warn!("Could not save {}: {}", dest_path.display(), e),
                },
                Err(e) if e.is_not_found() => tracing::warn!("404 on {}", url),
                Err(e) => tracing::warn!("Download error for {}: {}", url, e),
            }
        }

        // Always refresh, even when nothing new arrived
        index_page::write_index(dest_dir, candidate, &names);
        downloaded
    }
}

/// Writes the index page from the listing without downloading anything.
pub async fn refresh_index(fetch: &dyn Fetch, candidate: &FilingCandidate, dest_dir: &Path) {
    let names = listing_or_empty(fetch, candidate).await;
    index_page::write_index(dest_dir, candidate, &names);
}

async fn listing_or_empty(fetch: &dyn Fetch, candidate: &FilingCandidate) -> Vec<String> {
    match directory_listing(fetch, candidate).await {
        Ok(names) => names,
        Err(e) => {
            tracing::warn!("Could not list files of {}: {}", candidate.accession, e);
            Vec::new()
        }
    }
}
