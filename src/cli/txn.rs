use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cash_basis::{month_label, BudgetMonth};
use crate::db::category_id;
use crate::error::{CaixaError, Result};
use crate::fmt::{date, money, truncate};
use crate::ledger::{insert_transaction, list_transactions, new_transaction, LedgerFilter};
use crate::models::PaymentMethod;
use crate::normalize::{clean_description, parse_amount};
use crate::settings::Settings;

use super::{open_family, parse_date_arg};

pub struct AddArgs {
    pub family: String,
    pub date: String,
    pub amount: String,
    pub description: String,
    pub method: String,
    pub category: Option<String>,
}

pub fn add(settings: &Settings, args: AddArgs) -> Result<()> {
    let event_date = parse_date_arg(&args.date)?;
    let amount = parse_amount(&args.amount).ok_or_else(|| CaixaError::InvalidAmount(args.amount.clone()))?;
    let method: PaymentMethod = args.method.parse()?;
    let description = clean_description(&args.description);
    if description.is_empty() {
        return Err(CaixaError::Other("Description cannot be empty".to_string()));
    }

    let (conn, family_id) = open_family(settings, &args.family)?;
    let cat_id = args.category.as_deref().map(|c| category_id(&conn, c)).transpose()?;

    let txn = new_transaction(family_id, event_date, method, &description, amount, cat_id);
    let id = insert_transaction(&conn, &txn)?;
    println!(
        "Added transaction {id}: {} {} \u{2192} {}",
        description,
        money(amount),
        month_label(txn.budget_month())
    );
    Ok(())
}

pub fn list(settings: &Settings, family: &str, month: Option<&str>, pending: bool) -> Result<()> {
    let month = month.map(str::parse::<BudgetMonth>).transpose()?;
    let (conn, family_id) = open_family(settings, family)?;
    let entries = list_transactions(
        &conn,
        family_id,
        LedgerFilter {
            month,
            pending_only: pending,
        },
    )?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Date", "Description", "Amount", "Method", "Category", "Paid", "Budget Month"]);
    for e in &entries {
        let budget = match e.txn.budget_month() {
            Some(m) => m.label(),
            None => month_label(None).yellow().to_string(),
        };
        table.add_row(vec![
            Cell::new(e.txn.id.unwrap_or_default()),
            Cell::new(date(e.txn.event_date)),
            Cell::new(truncate(&e.txn.description, 40)),
            Cell::new(money(e.txn.amount)),
            Cell::new(e.txn.payment_method),
            Cell::new(e.category.as_deref().unwrap_or("")),
            Cell::new(e.txn.cash_date().map(date).unwrap_or_default()),
            Cell::new(budget),
        ]);
    }
    println!("Transactions\n{table}");
    Ok(())
}
