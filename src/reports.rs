use rusqlite::Connection;
use rust_decimal::Decimal;

use crate::cash_basis::BudgetMonth;
use crate::error::Result;
use crate::ledger::{from_cents, list_transactions, LedgerEntry, LedgerFilter};

// ---------------------------------------------------------------------------
// Month summary
// ---------------------------------------------------------------------------

pub struct CategoryTotal {
    pub name: String,
    pub total: Decimal,
    pub count: i64,
}

/// Budget impact of one cash month. Pending transactions carry no month and
/// never show up here.
pub struct MonthSummary {
    pub month: BudgetMonth,
    pub income: Vec<CategoryTotal>,
    pub expenses: Vec<CategoryTotal>,
    pub total_income: Decimal,
    pub total_expenses: Decimal,
    pub net: Decimal,
}

pub fn get_month_summary(conn: &Connection, family_id: i64, month: BudgetMonth) -> Result<MonthSummary> {
    let mut stmt = conn.prepare(
        "SELECT COALESCE(c.name, 'Sem categoria'), SUM(t.amount_cents), COUNT(*) \
         FROM transactions t LEFT JOIN categories c ON t.category_id = c.id \
         WHERE t.family_id = ?1 AND t.budget_month = ?2 \
         GROUP BY 1",
    )?;
    let rows = stmt
        .query_map(rusqlite::params![family_id, month.to_string()], |row| {
            Ok(CategoryTotal {
                name: row.get(0)?,
                total: from_cents(row.get(1)?),
                count: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    // A category's side follows the sign of its net total, so refunds booked
    // under an expense category simply reduce that expense.
    let (mut income, mut expenses): (Vec<_>, Vec<_>) =
        rows.into_iter().partition(|r| r.total > Decimal::ZERO);
    income.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.name.cmp(&b.name)));
    expenses.sort_by(|a, b| a.total.cmp(&b.total).then_with(|| a.name.cmp(&b.name)));

    let total_income: Decimal = income.iter().map(|i| i.total).sum();
    let total_expenses: Decimal = expenses.iter().map(|i| i.total).sum();

    Ok(MonthSummary {
        month,
        income,
        expenses,
        total_income,
        total_expenses,
        net: total_income + total_expenses,
    })
}

// ---------------------------------------------------------------------------
// Pending
// ---------------------------------------------------------------------------

pub struct PendingReport {
    pub items: Vec<LedgerEntry>,
    pub total: Decimal,
}

/// Deferred transactions (credit purchases, uncleared cheques) still waiting
/// for a cash date.
pub fn get_pending(conn: &Connection, family_id: i64) -> Result<PendingReport> {
    let items = list_transactions(
        conn,
        family_id,
        LedgerFilter {
            month: None,
            pending_only: true,
        },
    )?;
    let total = items.iter().map(|e| e.txn.amount).sum();
    Ok(PendingReport { items, total })
}
