// src/storage/index_page.rs
use crate::edgar::models::{AssetItem, FilingCandidate};
use html_escape::{encode_double_quoted_attribute, encode_text};
use std::fs;
use std::path::Path;

pub const INDEX_FILE_NAME: &str = "filing_index.html";

const STYLE: &str = "body{font-family:system-ui,Arial,sans-serif;margin:24px} \
table{border-collapse:collapse;width:100%} th,td{border:1px solid #ddd;padding:8px} \
th{background:#f7f7f7;text-align:left} .local{color:green}";

/// Pairs each listed name with its archive URL and whether a local copy exists.
pub fn collect_items(candidate: &FilingCandidate, names: &[String], dir: &Path) -> Vec<AssetItem> {
    names
        .iter()
        .map(|name| AssetItem {
            name: name.clone(),
            url: candidate.file_url(name),
            local_exists: dir.join(name).is_file(),
        })
        .collect()
}

/// Static page with a local link (when present) and the archive link for every item.
pub fn render(candidate: &FilingCandidate, items: &[AssetItem]) -> String {
    let mut html = vec![
        "<!doctype html><html><head><meta charset='utf-8'><title>Filing Index</title>".to_string(),
        format!("<style>{}</style>", STYLE),
        "</head><body>".to_string(),
        format!(
            "<h2>EDGAR Filing Index - {} filed {}, CIK {}, Accession {}</h2>",
            candidate.form,
            candidate.filing_date.format("%Y-%m-%d"),
            candidate.archive_cik(),
            candidate.accession_no_dashes()
        ),
        "<p>Local links point to files downloaded into this folder. SEC links point to the live archive.</p>"
            .to_string(),
        "<table><thead><tr><th>File</th><th>Local</th><th>SEC Link</th></tr></thead><tbody>".to_string(),
    ];

    for item in items {
        let local = if item.local_exists {
            format!(
                "<a class=\"local\" href=\"{}\" target=\"_blank\">open</a>",
                encode_double_quoted_attribute(&item.name)
            )
        } else {
            String::new()
        };
        html.push(format!(
            "<tr><td>{}</td><td>{}</td><td><a href=\"{}\" target=\"_blank\">{}</a></td></tr>",
            encode_text(&item.name),
            local,
            encode_double_quoted_attribute(&item.url),
            encode_text(&item.url)
        ));
    }

    html.push("</tbody></table>".to_string());
    html.push("</body></html>".to_string());
    html.join("\n")
}

/// Rewrites `filing_index.html` in `dir`. Best effort: failures are only logged at debug.
pub fn write_index(dir: &Path, candidate: &FilingCandidate, names: &[String]) {
    let items = collect_items(candidate, names, dir);
    let page = render(candidate, &items);
    let result = fs::create_dir_all(dir).and_then(|_| fs::write(dir.join(INDEX_FILE_NAME), page));
    if let Err(e) = result {
        tracing::debug!("Could not write {} in {}: {}", INDEX_FILE_NAME, dir.display(), e);
    }
}
