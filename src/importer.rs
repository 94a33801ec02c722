use std::collections::BTreeSet;
use std::path::Path;

use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension};
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};
use tracing::{debug, info, info_span, warn};

use crate::categorizer::Categorizer;
use crate::db::category_id;
use crate::error::{CaixaError, Result, RowParseError};
use crate::ledger::{has_matching_transaction, insert_transaction, new_transaction, to_cents};
use crate::models::{
    CandidateTransaction, ImportRecord, PaymentMethod, RawStatementRow, SkippedRow, StatementKind,
};
use crate::normalize::{clean_description, match_key, parse_amount, parse_date};
use crate::rules::{find_rule, learn_keyword, record_hit, upsert_rule};
use crate::settings::Settings;
use crate::sheet::{extract_rows, read_csv, Extraction};

// ---------------------------------------------------------------------------
// Statement files
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementFormat {
    Csv,
    Xlsx,
    Xls,
    Ods,
    Pdf,
}

const ALL_FORMATS: &[StatementFormat] = &[
    StatementFormat::Csv,
    StatementFormat::Xlsx,
    StatementFormat::Xls,
    StatementFormat::Ods,
    StatementFormat::Pdf,
];

impl StatementFormat {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Xlsx => "xlsx",
            Self::Xls => "xls",
            Self::Ods => "ods",
            Self::Pdf => "pdf",
        }
    }

    pub fn from_key(key: &str) -> Result<Self> {
        let key = key.trim().trim_start_matches('.').to_lowercase();
        ALL_FORMATS
            .iter()
            .find(|f| f.key() == key)
            .copied()
            .ok_or(CaixaError::UnsupportedFormat(key))
    }

    /// Format from an explicit hint, else from the file extension.
    pub fn detect(file_path: &Path, hint: Option<&str>) -> Result<Self> {
        match hint {
            Some(h) => Self::from_key(h),
            None => {
                let ext = file_path
                    .extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or_default();
                Self::from_key(ext)
            }
        }
    }
}

pub struct StatementFile {
    pub name: String,
    pub bytes: Vec<u8>,
    pub format: StatementFormat,
}

impl StatementFile {
    /// Read a statement from disk, refusing files over the size limit before
    /// loading them.
    pub fn open(file_path: &Path, hint: Option<&str>, max_file_bytes: u64) -> Result<Self> {
        let format = StatementFormat::detect(file_path, hint)?;
        let size = std::fs::metadata(file_path)?.len();
        if size > max_file_bytes {
            return Err(CaixaError::FileTooLarge {
                size,
                limit: max_file_bytes,
            });
        }
        Ok(Self {
            name: file_path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_string(),
            bytes: std::fs::read(file_path)?,
            format,
        })
    }

    pub fn checksum(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.bytes);
        hex::encode(hasher.finalize())
    }
}

#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub kind: StatementKind,
    pub year_hint: Option<i32>,
    pub max_file_bytes: u64,
    pub max_rows: usize,
}

impl ImportOptions {
    pub fn new(settings: &Settings, kind: StatementKind, year_hint: Option<i32>) -> Self {
        Self {
            kind,
            year_hint,
            max_file_bytes: settings.max_file_bytes,
            max_rows: settings.max_rows,
        }
    }
}

// ---------------------------------------------------------------------------
// Preview
// ---------------------------------------------------------------------------

/// Candidates parsed from one statement. Nothing is persisted until
/// `confirm_import` is called with the accepted ids.
#[derive(Debug, Clone)]
pub struct ImportPreview {
    pub family_id: i64,
    pub file_name: String,
    pub format: StatementFormat,
    pub checksum: String,
    pub candidates: Vec<CandidateTransaction>,
    pub skipped: Vec<SkippedRow>,
    pub ignored: usize,
    /// Latest earlier import of the same file into this family.
    pub previously_imported: Option<ImportRecord>,
}

impl ImportPreview {
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    pub fn duplicate_count(&self) -> usize {
        self.candidates.iter().filter(|c| c.possible_duplicate).count()
    }

    pub fn candidate(&self, id: usize) -> Option<&CandidateTransaction> {
        self.candidates.iter().find(|c| c.id == id)
    }

    /// The one change allowed before confirmation: the user picks a category.
    /// The category must exist, whether or not the preview is confirmed.
    pub fn correct_category(&mut self, conn: &Connection, id: usize, category: &str) -> Result<()> {
        let candidate = self
            .candidates
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(CaixaError::UnknownCandidate(id))?;
        category_id(conn, category)?;
        candidate.category = Some(category.trim().to_string());
        candidate.matched_keyword = None;
        Ok(())
    }
}

/// Raw rows of a statement. Readers stop with `TooManyRows` as soon as the
/// non-blank row count passes `max_rows`.
fn extract(file: &StatementFile, max_rows: usize) -> Result<Extraction> {
    match file.format {
        StatementFormat::Csv => Ok(extract_rows(&read_csv(&file.bytes, max_rows)?)),
        StatementFormat::Xlsx | StatementFormat::Xls | StatementFormat::Ods => extract_workbook(file, max_rows),
        StatementFormat::Pdf => extract_pdf(file, max_rows),
    }
}

#[cfg(feature = "workbook")]
fn extract_workbook(file: &StatementFile, max_rows: usize) -> Result<Extraction> {
    let mut out = Extraction::default();
    for sheet in crate::sheet::read_workbook(&file.bytes, max_rows)? {
        let part = extract_rows(&sheet);
        debug!(sheet = %sheet.name, rows = part.rows.len(), "read worksheet");
        out.rows.extend(part.rows);
        out.ignored += part.ignored;
    }
    Ok(out)
}

#[cfg(not(feature = "workbook"))]
fn extract_workbook(file: &StatementFile, _max_rows: usize) -> Result<Extraction> {
    Err(CaixaError::UnsupportedFormat(file.format.key().to_string()))
}

#[cfg(feature = "pdf")]
fn extract_pdf(file: &StatementFile, max_rows: usize) -> Result<Extraction> {
    let text = crate::pdf::extract_text(&file.bytes)?;
    crate::pdf::rows_from_text(&text, max_rows)
}

#[cfg(not(feature = "pdf"))]
fn extract_pdf(file: &StatementFile, _max_rows: usize) -> Result<Extraction> {
    Err(CaixaError::UnsupportedFormat(file.format.key().to_string()))
}

/// Date, description and signed amount of one raw row.
fn normalize_row(
    raw: &RawStatementRow,
    opts: &ImportOptions,
) -> std::result::Result<(NaiveDate, String, Decimal), RowParseError> {
    let date_raw = raw.date.trim();
    if date_raw.is_empty() {
        return Err(RowParseError::MissingDate);
    }
    let date = parse_date(date_raw, opts.year_hint)
        .ok_or_else(|| RowParseError::BadDate(date_raw.to_string()))?;

    let amount_raw = raw.amount.trim();
    if amount_raw.is_empty() {
        return Err(RowParseError::MissingAmount);
    }
    let amount = parse_amount(amount_raw)
        .ok_or_else(|| RowParseError::BadAmount(amount_raw.to_string()))?;
    // Amounts are stored as i64 cents.
    to_cents(amount).map_err(|_| RowParseError::BadAmount(amount_raw.to_string()))?;
    let amount = match opts.kind {
        StatementKind::Bank => amount,
        StatementKind::CreditCard => -amount,
    };

    Ok((date, clean_description(&raw.description), amount))
}

pub fn infer_payment_method(kind: StatementKind, description: &str) -> PaymentMethod {
    if kind == StatementKind::CreditCard {
        return PaymentMethod::Credit;
    }
    let upper = description.to_uppercase();
    let has_word = |words: &[&str]| {
        upper
            .split(|c: char| !c.is_alphanumeric())
            .any(|token| words.contains(&token))
    };
    if has_word(&["PIX"]) {
        PaymentMethod::Pix
    } else if has_word(&["CHEQUE", "CHQ"]) {
        PaymentMethod::Cheque
    } else if has_word(&["TED", "DOC", "TEF", "TRANSF", "TRANSFERENCIA", "TRANSFERÊNCIA"]) {
        PaymentMethod::Transfer
    } else if has_word(&["SAQUE"]) {
        PaymentMethod::Cash
    } else {
        PaymentMethod::Debit
    }
}

fn previous_import(conn: &Connection, family_id: i64, checksum: &str) -> Result<Option<ImportRecord>> {
    Ok(conn
        .query_row(
            "SELECT id, family_id, filename, format, imported_count, skipped_count, \
             date_range_start, date_range_end, checksum, import_date \
             FROM imports WHERE family_id = ?1 AND checksum = ?2 ORDER BY id DESC LIMIT 1",
            rusqlite::params![family_id, checksum],
            |row| {
                Ok(ImportRecord {
                    id: row.get(0)?,
                    family_id: row.get(1)?,
                    filename: row.get(2)?,
                    format: row.get(3)?,
                    imported_count: row.get(4)?,
                    skipped_count: row.get(5)?,
                    date_range_start: row.get(6)?,
                    date_range_end: row.get(7)?,
                    checksum: row.get(8)?,
                    import_date: row.get(9)?,
                })
            },
        )
        .optional()?)
}

/// Parse a statement into candidates for `family_id`.
///
/// Malformed rows are skipped and counted; a file that yields no candidate at
/// all fails with `EmptyResult`. Rules are read through `conn`, so rules saved
/// earlier on the same connection are seen.
pub fn preview_import(
    conn: &Connection,
    family_id: i64,
    file: &StatementFile,
    opts: &ImportOptions,
) -> Result<ImportPreview> {
    let span = info_span!("import", family_id, file = %file.name, format = file.format.key());
    let _guard = span.enter();

    let size = file.bytes.len() as u64;
    if size > opts.max_file_bytes {
        return Err(CaixaError::FileTooLarge {
            size,
            limit: opts.max_file_bytes,
        });
    }

    let extraction = extract(file, opts.max_rows)?;

    let categorizer = Categorizer::load(conn, family_id)?;
    if categorizer.is_empty() {
        debug!(family_id, "no category rules, candidates stay uncategorized");
    }
    debug!(rules = categorizer.len(), rows = extraction.rows.len(), "extracted rows");

    let mut candidates = Vec::new();
    let mut skipped = Vec::new();
    for raw in &extraction.rows {
        let (event_date, description, amount) = match normalize_row(raw, opts) {
            Ok(parts) => parts,
            Err(reason) => {
                debug!(line = raw.line, source = ?raw.source, %reason, "skipped row");
                skipped.push(SkippedRow {
                    line: raw.line,
                    reason,
                });
                continue;
            }
        };
        let (category, matched_keyword) = match categorizer.infer(&description) {
            Some((rule, _)) => (Some(rule.category.clone()), Some(rule.keyword.clone())),
            None => (None, None),
        };
        let possible_duplicate =
            has_matching_transaction(conn, family_id, event_date, amount, &description)?;
        candidates.push(CandidateTransaction {
            id: candidates.len() + 1,
            line: raw.line,
            payment_method: infer_payment_method(opts.kind, &description),
            event_date,
            description,
            amount,
            category,
            matched_keyword,
            possible_duplicate,
        });
    }

    if candidates.is_empty() {
        warn!(skipped = skipped.len(), ignored = extraction.ignored, "no transactions extracted");
        return Err(CaixaError::EmptyResult);
    }

    let checksum = file.checksum();
    let previously_imported = previous_import(conn, family_id, &checksum)?;
    let preview = ImportPreview {
        family_id,
        file_name: file.name.clone(),
        format: file.format,
        checksum,
        candidates,
        skipped,
        ignored: extraction.ignored,
        previously_imported,
    };
    info!(
        candidates = preview.candidates.len(),
        skipped = preview.skipped_count(),
        duplicates = preview.duplicate_count(),
        "import preview ready"
    );
    Ok(preview)
}

// ---------------------------------------------------------------------------
// Confirmation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    All,
    /// Every candidate not flagged as a possible duplicate.
    New,
    Ids(Vec<usize>),
}

impl std::str::FromStr for Selection {
    type Err = CaixaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "all" => Ok(Self::All),
            "new" => Ok(Self::New),
            list => list
                .split(',')
                .map(|part| {
                    part.trim().parse::<usize>().map_err(|_| {
                        CaixaError::Other(format!(
                            "Invalid selection '{part}' (expected all, new or ids like 1,2,5)"
                        ))
                    })
                })
                .collect::<Result<Vec<_>>>()
                .map(Self::Ids),
        }
    }
}

pub struct ConfirmResult {
    /// `None` when nothing was accepted and no import was recorded.
    pub import_id: Option<i64>,
    pub imported: usize,
    pub skipped: usize,
    pub rules_learned: usize,
}

fn selected_ids(preview: &ImportPreview, selection: &Selection) -> Result<BTreeSet<usize>> {
    match selection {
        Selection::All => Ok(preview.candidates.iter().map(|c| c.id).collect()),
        Selection::New => Ok(preview
            .candidates
            .iter()
            .filter(|c| !c.possible_duplicate)
            .map(|c| c.id)
            .collect()),
        Selection::Ids(ids) => {
            for id in ids {
                if preview.candidate(*id).is_none() {
                    return Err(CaixaError::UnknownCandidate(*id));
                }
            }
            Ok(ids.iter().copied().collect())
        }
    }
}

/// Persist the accepted candidates as cash-basis transactions.
///
/// Every request-level check (unknown ids, unknown categories) runs before
/// the first write, and all writes share one SQLite transaction.
pub fn confirm_import(
    conn: &Connection,
    preview: &ImportPreview,
    selection: &Selection,
    learn: bool,
) -> Result<ConfirmResult> {
    let ids = selected_ids(preview, selection)?;
    let accepted: Vec<&CandidateTransaction> =
        preview.candidates.iter().filter(|c| ids.contains(&c.id)).collect();
    if accepted.is_empty() {
        info!(family_id = preview.family_id, "nothing accepted, no import recorded");
        return Ok(ConfirmResult {
            import_id: None,
            imported: 0,
            skipped: preview.candidates.len(),
            rules_learned: 0,
        });
    }

    let mut category_ids = Vec::with_capacity(accepted.len());
    for candidate in &accepted {
        let id = match &candidate.category {
            Some(name) => Some(category_id(conn, name)?),
            None => None,
        };
        category_ids.push(id);
    }

    let tx = conn.unchecked_transaction()?;

    let dates: Vec<NaiveDate> = accepted.iter().map(|c| c.event_date).collect();
    tx.execute(
        "INSERT INTO imports (family_id, filename, format, imported_count, skipped_count, date_range_start, date_range_end, checksum) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        rusqlite::params![
            preview.family_id,
            preview.file_name,
            preview.format.key(),
            accepted.len() as i64,
            (preview.candidates.len() - accepted.len()) as i64,
            dates.iter().min(),
            dates.iter().max(),
            preview.checksum,
        ],
    )?;
    let import_id = tx.last_insert_rowid();

    let mut learned = BTreeSet::new();
    for (candidate, cat_id) in accepted.iter().zip(&category_ids) {
        let mut txn = new_transaction(
            preview.family_id,
            candidate.event_date,
            candidate.payment_method,
            &candidate.description,
            candidate.amount,
            *cat_id,
        );
        txn.import_id = Some(import_id);
        insert_transaction(&tx, &txn)?;

        let Some(cat_id) = cat_id else { continue };
        if let Some(keyword) = &candidate.matched_keyword {
            if let Some((rule_id, _)) = find_rule(&tx, preview.family_id, keyword)? {
                record_hit(&tx, rule_id)?;
            }
        }
        if learn {
            let keyword = candidate
                .matched_keyword
                .clone()
                .or_else(|| learn_keyword(&candidate.description));
            let Some(keyword) = keyword else { continue };
            // Only new keywords and keywords pointed at a different category count.
            let existing = find_rule(&tx, preview.family_id, &keyword)?;
            if existing.map(|(_, category)| category) != Some(*cat_id) {
                upsert_rule(&tx, preview.family_id, &keyword, *cat_id)?;
                learned.insert(match_key(&keyword));
            }
        }
    }

    tx.commit()?;

    let result = ConfirmResult {
        import_id: Some(import_id),
        imported: accepted.len(),
        skipped: preview.candidates.len() - accepted.len(),
        rules_learned: learned.len(),
    };
    info!(
        family_id = preview.family_id,
        import_id,
        imported = result.imported,
        skipped = result.skipped,
        rules_learned = result.rules_learned,
        "import confirmed"
    );
    Ok(result)
}
