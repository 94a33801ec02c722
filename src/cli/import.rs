use std::path::PathBuf;

use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::error::{CaixaError, Result};
use crate::fmt::{date, money, truncate};
use crate::importer::{confirm_import, preview_import, ImportOptions, ImportPreview, Selection, StatementFile};
use crate::models::{RowStatus, StatementKind};
use crate::settings::Settings;

use super::open_family;

pub struct ImportArgs {
    pub file: String,
    pub family: String,
    pub format: Option<String>,
    pub kind: String,
    pub year: Option<i32>,
    pub accept: Option<String>,
    pub categories: Vec<String>,
    pub learn: bool,
}

/// `ID=NAME` from `--category`.
fn parse_correction(raw: &str) -> Result<(usize, String)> {
    let invalid = || CaixaError::Other(format!("Invalid --category '{raw}' (expected ID=NAME)"));
    let (id, name) = raw.split_once('=').ok_or_else(invalid)?;
    let id = id.trim().parse::<usize>().map_err(|_| invalid())?;
    let name = name.trim();
    if name.is_empty() {
        return Err(invalid());
    }
    Ok((id, name.to_string()))
}

fn print_preview(preview: &ImportPreview) {
    let mut table = Table::new();
    table.set_header(vec!["ID", "Line", "Date", "Description", "Amount", "Method", "Category", "Status"]);
    for c in &preview.candidates {
        let status = match c.status() {
            RowStatus::FlaggedDuplicate => c.status().label().yellow().to_string(),
            other => other.label().to_string(),
        };
        table.add_row(vec![
            Cell::new(c.id),
            Cell::new(c.line),
            Cell::new(date(c.event_date)),
            Cell::new(truncate(&c.description, 40)),
            Cell::new(money(c.amount)),
            Cell::new(c.payment_method),
            Cell::new(c.category.as_deref().unwrap_or("")),
            Cell::new(status),
        ]);
    }
    for s in &preview.skipped {
        table.add_row(vec![
            Cell::new(""),
            Cell::new(s.line),
            Cell::new(""),
            Cell::new(s.reason.to_string()),
            Cell::new(""),
            Cell::new(""),
            Cell::new(""),
            Cell::new(RowStatus::SkippedMalformed.label().red().to_string()),
        ]);
    }
    println!("Import preview: {}\n{table}", preview.file_name);
    println!(
        "{} candidates, {} flagged as possible duplicates, {} skipped (malformed)",
        preview.candidates.len(),
        preview.duplicate_count(),
        preview.skipped_count()
    );
}

pub fn run(settings: &Settings, args: ImportArgs) -> Result<()> {
    let kind: StatementKind = args.kind.parse()?;
    // Validate everything the user typed before reading the file.
    let selection = args.accept.as_deref().map(str::parse::<Selection>).transpose()?;
    let corrections = args
        .categories
        .iter()
        .map(|c| parse_correction(c))
        .collect::<Result<Vec<_>>>()?;

    let (conn, family_id) = open_family(settings, &args.family)?;
    let opts = ImportOptions::new(settings, kind, args.year);
    let file = StatementFile::open(&PathBuf::from(&args.file), args.format.as_deref(), opts.max_file_bytes)?;

    let mut preview = preview_import(&conn, family_id, &file, &opts)?;
    for (id, name) in &corrections {
        preview.correct_category(&conn, *id, name)?;
    }

    if let Some(earlier) = &preview.previously_imported {
        println!(
            "{}",
            format!(
                "Warning: this file was already imported for {} on {} ({} transactions).",
                args.family, earlier.import_date, earlier.imported_count
            )
            .yellow()
        );
    }
    print_preview(&preview);

    let Some(selection) = selection else {
        println!("Nothing saved. Re-run with --accept all, --accept new or --accept 1,2,5 to confirm.");
        return Ok(());
    };

    let result = confirm_import(&conn, &preview, &selection, args.learn)?;
    println!("{} imported, {} skipped", result.imported, result.skipped);
    if result.import_id.is_none() {
        println!("Nothing accepted, no import recorded.");
    }
    if args.learn {
        println!("{} rules learned", result.rules_learned);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_correction() {
        assert_eq!(parse_correction("3=Mercado").unwrap(), (3, "Mercado".to_string()));
        assert_eq!(
            parse_correction(" 12 = Alimentação Fora ").unwrap(),
            (12, "Alimentação Fora".to_string())
        );
        assert!(parse_correction("Mercado").is_err());
        assert!(parse_correction("x=Mercado").is_err());
        assert!(parse_correction("3=").is_err());
    }
}
