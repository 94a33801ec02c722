use colored::Colorize;
use comfy_table::{Cell, Table};
use rust_decimal::Decimal;

use crate::cash_basis::{month_label, BudgetMonth};
use crate::error::Result;
use crate::fmt::{date, money, truncate};
use crate::reports;
use crate::settings::Settings;

use super::open_family;

pub fn month(settings: &Settings, family: &str, month: &str) -> Result<()> {
    let month: BudgetMonth = month.parse()?;
    let (conn, family_id) = open_family(settings, family)?;
    let summary = reports::get_month_summary(&conn, family_id, month)?;

    let mut table = Table::new();
    table.set_header(vec!["Category", "Amount", "Count"]);

    if !summary.income.is_empty() {
        table.add_row(vec![Cell::new("RECEITAS".green().bold()), Cell::new(""), Cell::new("")]);
        for item in &summary.income {
            table.add_row(vec![
                Cell::new(format!("  {}", item.name)),
                Cell::new(money(item.total)),
                Cell::new(item.count),
            ]);
        }
        table.add_row(vec![
            Cell::new("Total Receitas".bold()),
            Cell::new(money(summary.total_income)),
            Cell::new(""),
        ]);
        table.add_row(vec![Cell::new(""), Cell::new(""), Cell::new("")]);
    }

    if !summary.expenses.is_empty() {
        table.add_row(vec![Cell::new("DESPESAS".red().bold()), Cell::new(""), Cell::new("")]);
        for item in &summary.expenses {
            table.add_row(vec![
                Cell::new(format!("  {}", item.name)),
                Cell::new(money(item.total.abs())),
                Cell::new(item.count),
            ]);
        }
        table.add_row(vec![
            Cell::new("Total Despesas".bold()),
            Cell::new(money(summary.total_expenses.abs())),
            Cell::new(""),
        ]);
        table.add_row(vec![Cell::new(""), Cell::new(""), Cell::new("")]);
    }

    let net_label = if summary.net >= Decimal::ZERO {
        "SALDO".green().bold()
    } else {
        "SALDO".red().bold()
    };
    table.add_row(vec![Cell::new(net_label), Cell::new(money(summary.net)), Cell::new("")]);

    println!("{}\n{table}", summary.month.label());
    Ok(())
}

pub fn pending(settings: &Settings, family: &str) -> Result<()> {
    let (conn, family_id) = open_family(settings, family)?;
    let report = reports::get_pending(&conn, family_id)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Date", "Description", "Amount", "Method", "Budget Month"]);
    for e in &report.items {
        table.add_row(vec![
            Cell::new(e.txn.id.unwrap_or_default()),
            Cell::new(date(e.txn.event_date)),
            Cell::new(truncate(&e.txn.description, 40)),
            Cell::new(money(e.txn.amount)),
            Cell::new(e.txn.payment_method),
            Cell::new(month_label(e.txn.budget_month())),
        ]);
    }
    println!("Pending\n{table}");
    println!("{} pending, total {}", report.items.len(), money(report.total));
    Ok(())
}
