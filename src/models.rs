use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::cash_basis::{BudgetMonth, CashBasis};
use crate::error::{CaixaError, RowParseError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaymentMethod {
    Pix,
    Debit,
    Cash,
    Transfer,
    Credit,
    Cheque,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 6] = [
        Self::Pix,
        Self::Debit,
        Self::Cash,
        Self::Transfer,
        Self::Credit,
        Self::Cheque,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Self::Pix => "pix",
            Self::Debit => "debit",
            Self::Cash => "cash",
            Self::Transfer => "transfer",
            Self::Credit => "credit",
            Self::Cheque => "cheque",
        }
    }

    /// Credit card and cheque: the money moves on a later settlement event.
    pub fn is_deferred(&self) -> bool {
        matches!(self, Self::Credit | Self::Cheque)
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for PaymentMethod {
    type Err = CaixaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .find(|m| m.key() == key)
            .copied()
            .ok_or_else(|| CaixaError::UnknownPaymentMethod(s.to_string()))
    }
}

#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct Family {
    pub id: i64,
    pub name: String,
}

#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub category_type: String,
    pub description: Option<String>,
}

/// A persisted transaction, owned by a family, bucketed by when cash moves.
#[derive(Debug, Clone)]
pub struct CashBasisTransaction {
    pub id: Option<i64>,
    pub family_id: i64,
    pub event_date: NaiveDate,
    pub cash: CashBasis,
    pub payment_method: PaymentMethod,
    pub description: String,
    pub amount: Decimal,
    pub category_id: Option<i64>,
    pub import_id: Option<i64>,
}

impl CashBasisTransaction {
    pub fn cash_date(&self) -> Option<NaiveDate> {
        self.cash.cash_date()
    }

    pub fn budget_month(&self) -> Option<BudgetMonth> {
        self.cash.budget_month()
    }
}

#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct CategoryRule {
    pub id: i64,
    pub family_id: i64,
    pub keyword: String,
    pub category_id: i64,
    pub category: String,
    pub hit_count: i64,
}

#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct ImportRecord {
    pub id: i64,
    pub family_id: i64,
    pub filename: String,
    pub format: String,
    pub imported_count: i64,
    pub skipped_count: i64,
    pub date_range_start: Option<String>,
    pub date_range_end: Option<String>,
    pub checksum: String,
    pub import_date: String,
}

// ---------------------------------------------------------------------------
// Import pipeline intermediates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Spreadsheet,
    Pdf,
}

/// One extracted line of a statement, before normalization.
#[derive(Debug, Clone)]
pub struct RawStatementRow {
    pub line: usize,
    pub date: String,
    pub description: String,
    pub amount: String,
    pub source: SourceFormat,
}

/// How the statement lists money: bank accounts list expenses as negative,
/// credit cards list charges as positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Bank,
    CreditCard,
}

impl FromStr for StatementKind {
    type Err = CaixaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bank" | "conta" => Ok(Self::Bank),
            "credit-card" | "credit_card" | "cartao" => Ok(Self::CreditCard),
            other => Err(CaixaError::Other(format!(
                "Unknown statement kind '{other}' (expected bank or credit-card)"
            ))),
        }
    }
}

/// Normalized row awaiting the user's confirmation.
#[derive(Debug, Clone)]
pub struct CandidateTransaction {
    pub id: usize,
    pub line: usize,
    pub event_date: NaiveDate,
    pub description: String,
    pub amount: Decimal,
    pub category: Option<String>,
    /// Rule keyword that produced `category`; cleared by a manual correction.
    pub matched_keyword: Option<String>,
    pub payment_method: PaymentMethod,
    pub possible_duplicate: bool,
}

impl CandidateTransaction {
    pub fn status(&self) -> RowStatus {
        if self.possible_duplicate {
            RowStatus::FlaggedDuplicate
        } else {
            RowStatus::Accepted
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    pub line: usize,
    pub reason: RowParseError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowStatus {
    Accepted,
    SkippedMalformed,
    FlaggedDuplicate,
}

impl RowStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::SkippedMalformed => "skipped-malformed",
            Self::FlaggedDuplicate => "flagged-duplicate",
        }
    }
}
