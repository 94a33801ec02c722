//! Cash-basis resolution: when a transaction's money actually moves, and
//! which budget month it lands in.
//!
//! Immediate methods (pix, debit, cash, transfer) move money on the event
//! date. Deferred methods (credit, cheque) stay pending until a settlement
//! event (invoice payment, cheque compensation) supplies the cash date.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};

use crate::error::{CaixaError, Result};
use crate::models::PaymentMethod;

pub const PENDING_LABEL: &str = "Pendente";

const MONTH_NAMES: [&str; 12] = [
    "Janeiro",
    "Fevereiro",
    "Março",
    "Abril",
    "Maio",
    "Junho",
    "Julho",
    "Agosto",
    "Setembro",
    "Outubro",
    "Novembro",
    "Dezembro",
];

/// A `YYYY-MM` budget bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BudgetMonth {
    year: i32,
    month: u32,
}

impl BudgetMonth {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(CaixaError::InvalidMonth(format!("{year:04}-{month:02}")));
        }
        Ok(Self { year, month })
    }

    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Display form, e.g. "Abril 2025".
    pub fn label(&self) -> String {
        format!("{} {}", MONTH_NAMES[(self.month - 1) as usize], self.year)
    }
}

impl fmt::Display for BudgetMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for BudgetMonth {
    type Err = CaixaError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || CaixaError::InvalidMonth(s.to_string());
        let (y, m) = s.trim().split_once('-').ok_or_else(invalid)?;
        if y.len() != 4 || m.is_empty() || m.len() > 2 {
            return Err(invalid());
        }
        let year: i32 = y.parse().map_err(|_| invalid())?;
        let month: u32 = m.parse().map_err(|_| invalid())?;
        Self::new(year, month).map_err(|_| invalid())
    }
}

/// Label for an optional budget month; a pending transaction has none.
pub fn month_label(month: Option<BudgetMonth>) -> String {
    match month {
        Some(m) => m.label(),
        None => PENDING_LABEL.to_string(),
    }
}

/// Cash movement state of a transaction. The budget month is always derived
/// from the cash date, so one is present exactly when the other is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CashBasis {
    Pending,
    Settled { cash_date: NaiveDate },
}

impl CashBasis {
    pub fn cash_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Pending => None,
            Self::Settled { cash_date } => Some(*cash_date),
        }
    }

    pub fn budget_month(&self) -> Option<BudgetMonth> {
        self.cash_date().map(BudgetMonth::of)
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Applies a settlement event. A settled transaction is never re-settled.
    pub fn settle(&mut self, settled_on: NaiveDate) -> Result<()> {
        if let Self::Settled { cash_date } = self {
            return Err(CaixaError::InvalidState(format!(
                "already settled on {cash_date}"
            )));
        }
        *self = Self::Settled {
            cash_date: settled_on,
        };
        Ok(())
    }
}

/// Cash basis at creation time.
pub fn resolve(event_date: NaiveDate, method: PaymentMethod) -> CashBasis {
    if method.is_deferred() {
        CashBasis::Pending
    } else {
        CashBasis::Settled {
            cash_date: event_date,
        }
    }
}
