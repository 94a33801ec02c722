use crate::error::Result;
use crate::ledger::{pay_invoice, settle_transaction};
use crate::settings::Settings;

use super::{open_db, open_family, parse_date_arg};

pub fn run(settings: &Settings, id: i64, settled_on: &str) -> Result<()> {
    let settled_on = parse_date_arg(settled_on)?;
    let conn = open_db(settings)?;
    let entry = settle_transaction(&conn, id, settled_on)?;
    if let Some(month) = entry.txn.budget_month() {
        println!("Settled transaction {id}: counts in {}", month.label());
    }
    Ok(())
}

pub fn invoice(settings: &Settings, family: &str, closing: &str, paid: &str) -> Result<()> {
    let closing = parse_date_arg(closing)?;
    let paid = parse_date_arg(paid)?;
    let (conn, family_id) = open_family(settings, family)?;
    let settled = pay_invoice(&conn, family_id, closing, paid)?;
    println!(
        "{settled} credit card purchases settled in {}",
        crate::cash_basis::BudgetMonth::of(paid).label()
    );
    Ok(())
}
