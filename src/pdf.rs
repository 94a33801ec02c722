//! PDF statements. Text comes out of the decompressed page content streams
//! and each line is matched against a `date  description  amount` layout.
//! Best-effort: layouts vary per bank and nothing guarantees full recall.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{CaixaError, Result};
use crate::models::{RawStatementRow, SourceFormat};
use crate::normalize::looks_like_date;
use crate::sheet::{Extraction, RowLimit};

fn line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(\d{1,4}[/.\-]\d{1,2}(?:[/.\-]\d{2,4})?)\s+(.+?)\s+((?:-\s*)?(?:R\$\s*)?-?\(?\d[\d.,]*[.,]\d{2}\)?(?:\s*-|\s*[DdCc])?)$",
        )
        .expect("valid regex")
    })
}

pub fn extract_text(bytes: &[u8]) -> Result<String> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| CaixaError::Pdf(e.to_string()))
}

/// Split extracted text into raw rows. Lines that start with a date but do not
/// fit the layout are kept with an empty amount so they are counted as
/// skipped; other lines are ignored. Fails once more than `max_rows`
/// non-empty lines have been seen.
pub fn rows_from_text(text: &str, max_rows: usize) -> Result<Extraction> {
    let mut out = Extraction::default();
    let mut limit = RowLimit::new(max_rows);
    for (i, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        limit.count()?;
        if let Some(caps) = line_re().captures(line) {
            out.rows.push(RawStatementRow {
                line: i + 1,
                date: caps[1].to_string(),
                description: caps[2].to_string(),
                amount: caps[3].to_string(),
                source: SourceFormat::Pdf,
            });
        } else if looks_like_date(line) {
            let mut parts = line.splitn(2, char::is_whitespace);
            let date = parts.next().unwrap_or_default().to_string();
            out.rows.push(RawStatementRow {
                line: i + 1,
                date,
                description: parts.next().unwrap_or_default().trim().to_string(),
                amount: String::new(),
                source: SourceFormat::Pdf,
            });
        } else {
            out.ignored += 1;
        }
    }
    Ok(out)
}
