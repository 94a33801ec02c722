use chrono::NaiveDate;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{Connection, OptionalExtension, Row};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::cash_basis::{resolve, BudgetMonth, CashBasis};
use crate::error::{CaixaError, Result};
use crate::models::{CashBasisTransaction, PaymentMethod};
use crate::normalize::match_key;

impl ToSql for PaymentMethod {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.key()))
    }
}

impl FromSql for PaymentMethod {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value.as_str()?.parse().map_err(|_| FromSqlError::InvalidType)
    }
}

pub fn to_cents(amount: Decimal) -> Result<i64> {
    amount
        .round_dp(2)
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|cents| cents.to_i64())
        .ok_or_else(|| CaixaError::InvalidAmount(amount.to_string()))
}

pub fn from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

/// A new, unsaved transaction with its cash basis resolved from the method.
pub fn new_transaction(
    family_id: i64,
    event_date: NaiveDate,
    payment_method: PaymentMethod,
    description: &str,
    amount: Decimal,
    category_id: Option<i64>,
) -> CashBasisTransaction {
    CashBasisTransaction {
        id: None,
        family_id,
        event_date,
        cash: resolve(event_date, payment_method),
        payment_method,
        description: description.to_string(),
        amount,
        category_id,
        import_id: None,
    }
}

pub fn insert_transaction(conn: &Connection, txn: &CashBasisTransaction) -> Result<i64> {
    conn.execute(
        "INSERT INTO transactions (family_id, event_date, cash_date, budget_month, payment_method, description, amount_cents, category_id, import_id) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        rusqlite::params![
            txn.family_id,
            txn.event_date,
            txn.cash_date(),
            txn.budget_month().map(|m| m.to_string()),
            txn.payment_method,
            txn.description,
            to_cents(txn.amount)?,
            txn.category_id,
            txn.import_id,
        ],
    )?;
    let id = conn.last_insert_rowid();
    debug!(id, family_id = txn.family_id, method = %txn.payment_method, "inserted transaction");
    Ok(id)
}

const SELECT_COLUMNS: &str = "t.id, t.family_id, t.event_date, t.cash_date, t.payment_method, \
     t.description, t.amount_cents, t.category_id, t.import_id, c.name";

fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<LedgerEntry> {
    let cash_date: Option<NaiveDate> = row.get(3)?;
    Ok(LedgerEntry {
        txn: CashBasisTransaction {
            id: Some(row.get(0)?),
            family_id: row.get(1)?,
            event_date: row.get(2)?,
            cash: cash_date.map_or(CashBasis::Pending, |cash_date| CashBasis::Settled { cash_date }),
            payment_method: row.get(4)?,
            description: row.get(5)?,
            amount: from_cents(row.get(6)?),
            category_id: row.get(7)?,
            import_id: row.get(8)?,
        },
        category: row.get(9)?,
    })
}

/// A stored transaction together with its category name.
#[derive(Debug, Clone)]
pub struct LedgerEntry {
    pub txn: CashBasisTransaction,
    pub category: Option<String>,
}

pub fn get_transaction(conn: &Connection, id: i64) -> Result<LedgerEntry> {
    let sql = format!(
        "SELECT {SELECT_COLUMNS} FROM transactions t LEFT JOIN categories c ON t.category_id = c.id \
         WHERE t.id = ?1"
    );
    conn.query_row(&sql, [id], row_to_entry)
        .optional()?
        .ok_or(CaixaError::UnknownTransaction(id))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LedgerFilter {
    pub month: Option<BudgetMonth>,
    pub pending_only: bool,
}

pub fn list_transactions(
    conn: &Connection,
    family_id: i64,
    filter: LedgerFilter,
) -> Result<Vec<LedgerEntry>> {
    let mut clause = String::from("t.family_id = ?1");
    let mut params: Vec<Box<dyn ToSql>> = vec![Box::new(family_id)];
    if let Some(month) = filter.month {
        clause.push_str(" AND t.budget_month = ?2");
        params.push(Box::new(month.to_string()));
    }
    if filter.pending_only {
        clause.push_str(" AND t.cash_date IS NULL");
    }
    let sql = format!(
        "SELECT {SELECT_COLUMNS} FROM transactions t LEFT JOIN categories c ON t.category_id = c.id \
         WHERE {clause} ORDER BY t.event_date, t.id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(params.iter()), row_to_entry)?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

/// Fill in the cash date of a pending transaction (invoice paid, cheque
/// compensated). Settling twice is an error and changes nothing.
pub fn settle_transaction(conn: &Connection, id: i64, settled_on: NaiveDate) -> Result<LedgerEntry> {
    let mut entry = get_transaction(conn, id)?;
    entry.txn.cash.settle(settled_on)?;

    let month = BudgetMonth::of(settled_on);
    let changed = conn.execute(
        "UPDATE transactions SET cash_date = ?1, budget_month = ?2 WHERE id = ?3 AND cash_date IS NULL",
        rusqlite::params![settled_on, month.to_string(), id],
    )?;
    if changed == 0 {
        return Err(CaixaError::InvalidState(format!(
            "transaction {id} was settled concurrently"
        )));
    }
    info!(id, %settled_on, budget_month = %month, "settled transaction");
    Ok(entry)
}

/// Settle every pending credit-card purchase of a family made on or before
/// the invoice closing date. Returns how many were settled.
pub fn pay_invoice(
    conn: &Connection,
    family_id: i64,
    closing_date: NaiveDate,
    paid_on: NaiveDate,
) -> Result<usize> {
    let month = BudgetMonth::of(paid_on);
    let changed = conn.execute(
        "UPDATE transactions SET cash_date = ?1, budget_month = ?2 \
         WHERE family_id = ?3 AND payment_method = ?4 AND cash_date IS NULL AND event_date <= ?5",
        rusqlite::params![paid_on, month.to_string(), family_id, PaymentMethod::Credit, closing_date],
    )?;
    info!(family_id, %closing_date, %paid_on, settled = changed, "paid credit card invoice");
    Ok(changed)
}

/// True when the family already has a transaction with the same date, the
/// exact same amount and the same description (case and spacing ignored).
pub fn has_matching_transaction(
    conn: &Connection,
    family_id: i64,
    event_date: NaiveDate,
    amount: Decimal,
    description: &str,
) -> Result<bool> {
    let mut stmt = conn.prepare_cached(
        "SELECT description FROM transactions WHERE family_id = ?1 AND event_date = ?2 AND amount_cents = ?3",
    )?;
    let key = match_key(description);
    let descriptions = stmt.query_map(
        rusqlite::params![family_id, event_date, to_cents(amount)?],
        |row| row.get::<_, String>(0),
    )?;
    for existing in descriptions {
        if match_key(&existing?) == key {
            return Ok(true);
        }
    }
    Ok(false)
}
