// src/edgar/bundle.rs
// Legacy single-file submissions (`<accession>.txt`) concatenate
// `<DOCUMENT>...</DOCUMENT>` blocks, each labelled by `<TYPE>` and `<FILENAME>` lines.

use crate::edgar::models::{is_html_name, FormType};
use once_cell::sync::Lazy;
use regex::Regex;

/// How much of a response is inspected for an `<HTML` root tag.
const HTML_SNIFF_CHARS: usize = 2000;

static DOCUMENT_BLOCK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<DOCUMENT>(.*?)</DOCUMENT>").expect("Failed to compile DOCUMENT_BLOCK_RE")
});

static TYPE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<TYPE>\s*([^\s<]+)").expect("Failed to compile TYPE_RE"));

static FILENAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<FILENAME>\s*([^\s<]+)").expect("Failed to compile FILENAME_RE")
});

/// Type and file name labels of one embedded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmbeddedDocument<'a> {
    pub doc_type: &'a str,
    pub filename: &'a str,
}

impl EmbeddedDocument<'_> {
    /// Tagged with one of the four annual forms and stored as HTML.
    pub fn is_annual_report(&self) -> bool {
        FormType::parse(self.doc_type).is_some() && is_html_name(self.filename)
    }
}

/// Embedded documents in bundle order. Blocks lacking either label are skipped.
pub fn documents(text: &str) -> impl Iterator<Item = EmbeddedDocument<'_>> {
    DOCUMENT_BLOCK_RE.captures_iter(text).filter_map(|caps| {
        let block = caps.get(1)?.as_str();
        let doc_type = TYPE_RE.captures(block)?.get(1)?.as_str();
        let filename = FILENAME_RE.captures(block)?.get(1)?.as_str();
        Some(EmbeddedDocument { doc_type, filename })
    })
}

/// File name of the first embedded annual-report HTML document.
pub fn annual_report_filename(text: &str) -> Option<String> {
    documents(text)
        .find(|doc| doc.is_annual_report())
        .map(|doc| doc.filename.to_string())
}

/// Bundle markers present and no `<HTML` root tag near the start.
pub fn looks_like_bundle(text: &str) -> bool {
    if !(text.contains("<SEC-HEADER>") || text.contains("<DOCUMENT>")) {
        return false;
    }
    let head: String = text.chars().take(HTML_SNIFF_CHARS).collect();
    !head.to_ascii_uppercase().contains("<HTML")
}
