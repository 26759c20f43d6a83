// src/storage/mod.rs
pub mod assets;
pub mod index_page;

use crate::edgar::models::{CompanyRef, FilingCandidate};
use crate::edgar::tickers::TickerResolution;
use crate::utils::error::StorageError;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Lays out `<base>/<TICKER>/<FORMTAG>_<date>_<accession>/`.
pub struct StorageManager {
    base_dir: PathBuf,
}

impl StorageManager {
    /// Creates a new StorageManager with the specified base directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self, StorageError> {
        let base_path = base_dir.as_ref().to_path_buf();

        // Create the base directory if it doesn't exist
        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(StorageError::IoError)?;
        }

        Ok(Self { base_dir: base_path })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Where the filing's folder lives, without creating it.
    pub fn filing_path(&self, company: &CompanyRef, candidate: &FilingCandidate) -> PathBuf {
        self.base_dir
            .join(safe_component(&company.ticker))
            .join(candidate.local_stem())
    }

    /// One folder per filing keeps exhibits of different years apart.
    pub fn filing_dir(
        &self,
        company: &CompanyRef,
        candidate: &FilingCandidate,
    ) -> Result<PathBuf, StorageError> {
        let dir = self.filing_path(company, candidate);
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    pub fn document_path(filing_dir: &Path, candidate: &FilingCandidate) -> PathBuf {
        filing_dir.join(format!("{}.html", candidate.local_stem()))
    }
}

/// Ticker -> CIK mapping artifact written before any download.
#[derive(Debug, Serialize)]
pub struct TickerMapping {
    pub successful: BTreeMap<String, MappedCompany>,
    pub failed: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct MappedCompany {
    pub cik: String,
    pub name: String,
}

impl From<&TickerResolution> for TickerMapping {
    fn from(resolution: &TickerResolution) -> Self {
        let successful = resolution
            .resolved
            .iter()
            .map(|c| {
                (
                    c.ticker.clone(),
                    MappedCompany {
                        cik: c.cik.clone(),
                        name: c.name.clone(),
                    },
                )
            })
            .collect();
        Self {
            successful,
            failed: resolution.unresolved.clone(),
        }
    }
}

pub fn save_ticker_mapping(path: &Path, resolution: &TickerResolution) -> Result<(), StorageError> {
    let mapping = TickerMapping::from(resolution);
    let json = serde_json::to_string_pretty(&mapping)
        .map_err(|e| StorageError::SerializationError(e.to_string()))?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, json)?;
    tracing::info!("Mapping saved to: {}", path.display());
    Ok(())
}

/// Writes `bytes` beside `path` under a `.part` name and renames it into place,
/// so `path` only ever exists with complete contents.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut partial = path.as_os_str().to_owned();
    partial.push(".part");
    let partial = PathBuf::from(partial);

    if let Err(e) = fs::write(&partial, bytes).and_then(|_| fs::rename(&partial, path)) {
        let _ = fs::remove_file(&partial);
        return Err(e);
    }
    Ok(())
}

/// A remote file name usable as a single path component.
pub fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
}

fn safe_component(raw: &str) -> String {
    raw.trim().replace(['/', '\\'], "_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edgar::models::FormType;
    use chrono::NaiveDate;

    fn company() -> CompanyRef {
        CompanyRef {
            ticker: "BRK.B".to_string(),
            cik: "0001067983".to_string(),
            name: "BERKSHIRE HATHAWAY INC".to_string(),
        }
    }

    fn candidate() -> FilingCandidate {
        FilingCandidate {
            cik: "0001067983".to_string(),
            accession: "0000950170-24-021807".to_string(),
            filing_date: NaiveDate::from_ymd_opt(2024, 2, 26).unwrap(),
            form: FormType::PrimaryAmended,
            primary_document: None,
        }
    }

    #[test]
    fn filing_folder_is_named_by_form_date_and_accession() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = StorageManager::new(tmp.path().join("out")).unwrap();
        let dir = storage.filing_dir(&company(), &candidate()).unwrap();

        assert!(dir.is_dir());
        assert_eq!(
            dir,
            tmp.path()
                .join("out")
                .join("BRK.B")
                .join("10-KA_2024-02-26_0000950170-24-021807")
        );
        assert_eq!(
            StorageManager::document_path(&dir, &candidate()).file_name().unwrap(),
            "10-KA_2024-02-26_0000950170-24-021807.html"
        );
    }

    #[test]
    fn mapping_lists_successful_and_failed_tickers() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("mapping.json");
        let resolution = TickerResolution {
            resolved: vec![company()],
            unresolved: vec!["ZZZZ".to_string()],
        };
        save_ticker_mapping(&path, &resolution).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["successful"]["BRK.B"]["cik"], "0001067983");
        assert_eq!(written["successful"]["BRK.B"]["name"], "BERKSHIRE HATHAWAY INC");
        assert_eq!(written["failed"][0], "ZZZZ");
    }

    #[test]
    fn filing_path_matches_the_created_folder_without_creating_it() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = StorageManager::new(tmp.path()).unwrap();
        let planned = storage.filing_path(&company(), &candidate());
        assert!(!planned.exists());
        assert_eq!(storage.filing_dir(&company(), &candidate()).unwrap(), planned);
    }

    #[test]
    fn atomic_write_leaves_only_the_final_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("doc.html");
        fs::write(&path, "trunc").unwrap();

        write_atomic(&path, b"<html>complete</html>").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "<html>complete</html>");
        assert!(!tmp.path().join("doc.html.part").exists());
    }

    #[test]
    fn failed_atomic_write_creates_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("missing").join("doc.html");
        assert!(write_atomic(&path, b"x").is_err());
        assert!(!path.exists());
    }

    #[test]
    fn plain_file_names_exclude_paths() {
        assert!(is_plain_file_name("ex-10_1.htm"));
        assert!(!is_plain_file_name("../etc/passwd"));
        assert!(!is_plain_file_name("sub\\file.htm"));
        assert!(!is_plain_file_name(".."));
        assert!(!is_plain_file_name(""));
    }

    #[test]
    fn ticker_with_slash_stays_one_folder() {
        assert_eq!(safe_component(" BF/B "), "BF_B");
    }
}
