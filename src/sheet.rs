//! Tabular statements: CSV exports and spreadsheet workbooks, read into a
//! grid of cells and then into raw statement rows.

use chrono::NaiveDate;

use crate::error::{CaixaError, Result};
use crate::models::{RawStatementRow, SourceFormat};
use crate::normalize::{excel_serial_to_date, looks_like_amount, looks_like_date, match_key, parse_amount};

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

impl Cell {
    fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    fn text(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(s) => s.trim().to_string(),
            Self::Number(n) => n.to_string(),
            Self::Date(d) => d.format("%Y-%m-%d").to_string(),
        }
    }

    /// Cell as a date string, reading bare numbers as Excel serials.
    fn date_text(&self) -> String {
        match self {
            Self::Number(n) => excel_serial_to_date(*n)
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| n.to_string()),
            other => other.text(),
        }
    }

    fn is_date_like(&self) -> bool {
        match self {
            Self::Date(_) => true,
            Self::Text(s) => looks_like_date(s),
            _ => false,
        }
    }

    fn is_amount_like(&self) -> bool {
        match self {
            Self::Number(_) => true,
            Self::Text(s) => looks_like_amount(s),
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SheetRow {
    pub line: usize,
    pub cells: Vec<Cell>,
}

impl SheetRow {
    fn is_blank(&self) -> bool {
        self.cells.iter().all(Cell::is_empty)
    }
}

/// Running count of non-blank rows, failing as soon as it passes the limit so
/// an oversized statement is not read to the end.
#[derive(Debug)]
pub struct RowLimit {
    limit: usize,
    seen: usize,
}

impl RowLimit {
    pub fn new(limit: usize) -> Self {
        Self { limit, seen: 0 }
    }

    pub fn count(&mut self) -> Result<()> {
        self.seen += 1;
        if self.seen > self.limit {
            return Err(CaixaError::TooManyRows { limit: self.limit });
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<SheetRow>,
}

/// Rows pulled out of a statement: raw rows that look like transactions, plus
/// a count of rows with no transaction content (titles, headers, totals).
#[derive(Debug, Default)]
pub struct Extraction {
    pub rows: Vec<RawStatementRow>,
    pub ignored: usize,
}

// ---------------------------------------------------------------------------
// Readers
// ---------------------------------------------------------------------------

/// Decode statement text. Exports from Brazilian banks are often Latin-1.
pub fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

fn sniff_delimiter(text: &str) -> u8 {
    let sample: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).take(5).collect();
    let semicolons: usize = sample.iter().map(|l| l.matches(';').count()).sum();
    let commas: usize = sample.iter().map(|l| l.matches(',').count()).sum();
    if semicolons > commas {
        b';'
    } else {
        b','
    }
}

pub fn read_csv(bytes: &[u8], max_rows: usize) -> Result<Sheet> {
    let text = decode_text(bytes);
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(sniff_delimiter(&text))
        .from_reader(text.as_bytes());

    let mut limit = RowLimit::new(max_rows);
    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let line = record
            .position()
            .map_or(rows.len() + 1, |p| p.line() as usize);
        let cells = record
            .iter()
            .map(|field| {
                if field.trim().is_empty() {
                    Cell::Empty
                } else {
                    Cell::Text(field.to_string())
                }
            })
            .collect();
        let row = SheetRow { line, cells };
        if !row.is_blank() {
            limit.count()?;
        }
        rows.push(row);
    }
    Ok(Sheet {
        name: "csv".to_string(),
        rows,
    })
}

#[cfg(feature = "workbook")]
fn cell_from_data(value: &calamine::Data) -> Cell {
    use calamine::Data;

    match value {
        Data::String(s) => Cell::Text(s.clone()),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(n) => Cell::Number(*n as f64),
        Data::DateTime(dt) => excel_serial_to_date(dt.as_f64()).map_or(Cell::Empty, Cell::Date),
        Data::DateTimeIso(s) => Cell::Text(s.clone()),
        _ => Cell::Empty,
    }
}

/// Every worksheet in workbook order. Sheets are loaded one at a time and
/// reading stops at the first one that takes the row count past `max_rows`.
#[cfg(feature = "workbook")]
pub fn read_workbook(bytes: &[u8], max_rows: usize) -> Result<Vec<Sheet>> {
    use calamine::Reader;

    let cursor = std::io::Cursor::new(bytes.to_vec());
    let mut workbook = calamine::open_workbook_auto_from_rs(cursor)
        .map_err(|e| CaixaError::Spreadsheet(e.to_string()))?;

    let mut limit = RowLimit::new(max_rows);
    let mut sheets = Vec::new();
    for name in workbook.sheet_names() {
        let range = workbook
            .worksheet_range(&name)
            .map_err(|e| CaixaError::Spreadsheet(format!("{name}: {e}")))?;
        let mut rows = Vec::new();
        for (i, cells) in range.rows().enumerate() {
            let row = SheetRow {
                line: i + 1,
                cells: cells.iter().map(cell_from_data).collect(),
            };
            if !row.is_blank() {
                limit.count()?;
            }
            rows.push(row);
        }
        sheets.push(Sheet { name, rows });
    }
    Ok(sheets)
}

// ---------------------------------------------------------------------------
// Row extraction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
struct ColumnMap {
    date: usize,
    description: usize,
    amount: usize,
}

fn is_date_header(key: &str) -> bool {
    key.starts_with("data") || key.starts_with("date") || key == "dia"
}

fn is_description_header(key: &str) -> bool {
    ["descri", "hist", "lançamento", "lancamento", "estabelecimento", "payee", "memo"]
        .iter()
        .any(|p| key.starts_with(p))
}

fn is_amount_header(key: &str) -> bool {
    (key.starts_with("valor") || key.starts_with("amount") || key.starts_with("quantia"))
        && !key.contains("saldo")
}

fn detect_header(cells: &[Cell]) -> Option<ColumnMap> {
    let (mut date, mut description, mut amount) = (None, None, None);
    for (i, cell) in cells.iter().enumerate() {
        let Cell::Text(s) = cell else { continue };
        let key = match_key(s);
        if date.is_none() && is_date_header(&key) {
            date = Some(i);
        } else if description.is_none() && is_description_header(&key) {
            description = Some(i);
        } else if amount.is_none() && is_amount_header(&key) {
            amount = Some(i);
        }
    }
    Some(ColumnMap {
        date: date?,
        description: description?,
        amount: amount?,
    })
}

fn mapped_row(line: usize, cells: &[Cell], map: ColumnMap) -> Option<RawStatementRow> {
    let cell = |i: usize| cells.get(i).cloned().unwrap_or(Cell::Empty);
    let (date, description, amount) = (cell(map.date), cell(map.description), cell(map.amount));
    let transactional = date.is_date_like()
        || matches!(date, Cell::Number(_))
        || match &amount {
            Cell::Number(_) => true,
            Cell::Text(s) => parse_amount(s).is_some(),
            _ => false,
        };
    if !transactional {
        return None;
    }
    Some(RawStatementRow {
        line,
        date: date.date_text(),
        description: description.text(),
        amount: amount.text(),
        source: SourceFormat::Spreadsheet,
    })
}

/// Without a recognised header: first date-like cell, first amount-like cell
/// after it, remaining text joined as the description.
fn positional_row(line: usize, cells: &[Cell]) -> Option<RawStatementRow> {
    let date_idx = cells.iter().position(Cell::is_date_like);
    let search_from = date_idx.map_or(0, |i| i + 1);
    let amount_idx = cells
        .iter()
        .enumerate()
        .skip(search_from)
        .find(|(_, c)| c.is_amount_like())
        .map(|(i, _)| i);
    if date_idx.is_none() && amount_idx.is_none() {
        return None;
    }
    let description = cells
        .iter()
        .enumerate()
        .filter(|(i, c)| {
            Some(*i) != date_idx && Some(*i) != amount_idx && matches!(c, Cell::Text(_)) && !c.is_amount_like()
        })
        .map(|(_, c)| c.text())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    Some(RawStatementRow {
        line,
        date: date_idx.map(|i| cells[i].date_text()).unwrap_or_default(),
        description,
        amount: amount_idx.map(|i| cells[i].text()).unwrap_or_default(),
        source: SourceFormat::Spreadsheet,
    })
}

pub fn extract_rows(sheet: &Sheet) -> Extraction {
    let mut out = Extraction::default();
    let mut columns: Option<ColumnMap> = None;
    for row in &sheet.rows {
        if row.is_blank() {
            continue;
        }
        if let Some(map) = detect_header(&row.cells) {
            columns = Some(map);
            out.ignored += 1;
            continue;
        }
        let raw = match columns {
            Some(map) => mapped_row(row.line, &row.cells, map),
            None => positional_row(row.line, &row.cells),
        };
        match raw {
            Some(raw) => out.rows.push(raw),
            None => out.ignored += 1,
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_row(line: usize, cells: &[&str]) -> SheetRow {
        SheetRow {
            line,
            cells: cells
                .iter()
                .map(|c| if c.is_empty() { Cell::Empty } else { Cell::Text(c.to_string()) })
                .collect(),
        }
    }

    #[test]
    fn test_read_csv_semicolon() {
        let csv = "Data;Descrição;Valor\n15/03/2025;PADARIA;-12,50\n";
        let sheet = read_csv(csv.as_bytes(), 100).unwrap();
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.rows[1].cells[2], Cell::Text("-12,50".to_string()));
        assert_eq!(sheet.rows[1].line, 2);
    }

    #[test]
    fn test_read_csv_latin1() {
        let mut bytes = b"Data,Descri".to_vec();
        bytes.push(0xE7); // ç
        bytes.extend_from_slice(b"ao,Valor\n");
        let sheet = read_csv(&bytes, 100).unwrap();
        assert_eq!(sheet.rows[0].cells[1], Cell::Text("Descriçao".to_string()));
    }

    #[test]
    fn test_read_csv_row_limit_counts_non_blank_rows() {
        let csv = "Data;Descrição;Valor\n\n;;\n15/03/2025;PADARIA;-12,50\n16/03/2025;FEIRA;-30,00\n";
        assert_eq!(read_csv(csv.as_bytes(), 3).unwrap().rows.len(), 4);
        assert!(matches!(
            read_csv(csv.as_bytes(), 2),
            Err(CaixaError::TooManyRows { limit: 2 })
        ));

        let mut big = String::from("Data;Descrição;Valor\n");
        big.push_str(&"15/03/2025;PADARIA;-12,50\n".repeat(50_000));
        assert!(matches!(
            read_csv(big.as_bytes(), 10),
            Err(CaixaError::TooManyRows { limit: 10 })
        ));
    }

    #[test]
    fn test_row_limit_fails_on_the_first_row_over() {
        let mut limit = RowLimit::new(2);
        assert!(limit.count().is_ok());
        assert!(limit.count().is_ok());
        assert!(matches!(limit.count(), Err(CaixaError::TooManyRows { limit: 2 })));
    }

    #[test]
    fn test_header_mapping_skips_balance_column() {
        let sheet = Sheet {
            name: "extrato".to_string(),
            rows: vec![
                text_row(1, &["Extrato de conta corrente"]),
                text_row(2, &["Data", "Histórico", "Valor (R$)", "Saldo (R$)"]),
                text_row(3, &["01/03/2025", "PIX RECEBIDO", "1.500,00", "2.500,00"]),
                text_row(4, &["02/03/2025", "MERCADO", "-230,10", "2.269,90"]),
            ],
        };
        let out = extract_rows(&sheet);
        assert_eq!(out.ignored, 2);
        assert_eq!(out.rows.len(), 2);
        assert_eq!(out.rows[1].amount, "-230,10");
        assert_eq!(out.rows[1].description, "MERCADO");
    }

    #[test]
    fn test_positional_rows_without_header() {
        let sheet = Sheet {
            name: "s".to_string(),
            rows: vec![
                text_row(1, &["05/03/2025", "FARMACIA", "CENTRO", "45,90"]),
                text_row(2, &["Total", "", "", ""]),
                text_row(3, &["", "", "", ""]),
            ],
        };
        let out = extract_rows(&sheet);
        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.rows[0].description, "FARMACIA CENTRO");
        assert_eq!(out.rows[0].amount, "45,90");
        assert_eq!(out.ignored, 1);
    }

    #[test]
    fn test_mapped_row_keeps_malformed_transactional_rows() {
        let sheet = Sheet {
            name: "s".to_string(),
            rows: vec![
                text_row(1, &["Data", "Descrição", "Valor"]),
                text_row(2, &["32/13/2025", "ERRADO", "10,00"]),
                text_row(3, &["Saldo anterior", "", "900,00"]),
            ],
        };
        let out = extract_rows(&sheet);
        assert_eq!(out.rows.len(), 2);
        assert_eq!(out.rows[0].date, "32/13/2025");
        assert_eq!(out.rows[1].date, "Saldo anterior");
    }

    #[test]
    fn test_number_and_date_cells() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        let sheet = Sheet {
            name: "s".to_string(),
            rows: vec![SheetRow {
                line: 1,
                cells: vec![Cell::Date(date), Cell::Text("UBER".to_string()), Cell::Number(-23.4)],
            }],
        };
        let out = extract_rows(&sheet);
        assert_eq!(out.rows[0].date, "2025-01-10");
        assert_eq!(out.rows[0].amount, "-23.4");
    }

    #[cfg(feature = "workbook")]
    const WORKBOOK: &[u8] = include_bytes!("../tests/fixtures/extrato.xlsx");

    #[cfg(feature = "workbook")]
    #[test]
    fn test_cell_from_data() {
        use calamine::Data;

        assert_eq!(cell_from_data(&Data::Float(-45.9)), Cell::Number(-45.9));
        assert_eq!(cell_from_data(&Data::Int(12)), Cell::Number(12.0));
        assert_eq!(cell_from_data(&Data::String("PIX".to_string())), Cell::Text("PIX".to_string()));
        assert_eq!(
            cell_from_data(&Data::DateTimeIso("2025-03-01".to_string())),
            Cell::Text("2025-03-01".to_string())
        );
        assert_eq!(cell_from_data(&Data::Bool(true)), Cell::Empty);
        assert_eq!(cell_from_data(&Data::Empty), Cell::Empty);
    }

    #[cfg(feature = "workbook")]
    #[test]
    fn test_read_workbook_cells_and_sheet_order() {
        let sheets = read_workbook(WORKBOOK, 100).unwrap();
        let names: Vec<&str> = sheets.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Marco", "Abril"]);

        let marco = &sheets[0];
        assert_eq!(marco.rows.len(), 4);
        assert_eq!(marco.rows[2].line, 3);
        // date-formatted serial
        assert_eq!(marco.rows[2].cells[0], Cell::Date(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()));
        assert_eq!(marco.rows[2].cells[1], Cell::Text("PIX RECEBIDO JOAO".to_string()));
        assert_eq!(marco.rows[2].cells[2], Cell::Number(1500.5));
        assert_eq!(marco.rows[3].cells[2], Cell::Number(-230.0));

        let abril = &sheets[1];
        assert_eq!(abril.rows[1].cells[0], Cell::Text("05/04/2025".to_string()));
        assert_eq!(abril.rows[1].cells[2], Cell::Number(-45.9));
    }

    #[cfg(feature = "workbook")]
    #[test]
    fn test_read_workbook_row_limit_spans_sheets() {
        // 4 non-blank rows in the first sheet, 2 in the second.
        assert!(read_workbook(WORKBOOK, 6).is_ok());
        assert!(matches!(read_workbook(WORKBOOK, 5), Err(CaixaError::TooManyRows { limit: 5 })));
        assert!(matches!(read_workbook(WORKBOOK, 3), Err(CaixaError::TooManyRows { limit: 3 })));
    }

    #[cfg(feature = "workbook")]
    #[test]
    fn test_read_workbook_rejects_garbage() {
        assert!(matches!(read_workbook(b"not a workbook", 100), Err(CaixaError::Spreadsheet(_))));
    }
}
