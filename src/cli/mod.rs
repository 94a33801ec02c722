pub mod categories;
pub mod categorize;
pub mod family;
pub mod import;
pub mod init;
pub mod report;
pub mod rules;
pub mod settle;
pub mod status;
pub mod txn;

use clap::{Parser, Subcommand};
use rusqlite::Connection;

use crate::db::{family_id, get_connection};
use crate::error::{CaixaError, Result};
use crate::settings::Settings;

/// Open the configured database, refusing to create one outside `init`.
pub(crate) fn open_db(settings: &Settings) -> Result<Connection> {
    let path = settings.db_path();
    if !path.exists() {
        return Err(CaixaError::Other(format!(
            "Database not found at {}. Run `caixa init` first.",
            path.display()
        )));
    }
    get_connection(&path)
}

pub(crate) fn open_family(settings: &Settings, family: &str) -> Result<(Connection, i64)> {
    let conn = open_db(settings)?;
    let id = family_id(&conn, family)?;
    Ok((conn, id))
}

pub(crate) fn parse_date_arg(raw: &str) -> Result<chrono::NaiveDate> {
    crate::normalize::parse_date(raw, None).ok_or_else(|| CaixaError::InvalidDate(raw.to_string()))
}

#[derive(Parser)]
#[command(
    name = "caixa",
    version,
    about = "Household finances on a cash basis: import statements, budget by the month money leaves."
)]
pub struct Cli {
    /// Log pipeline details to stderr.
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Choose a data directory and initialize the database.
    Init {
        /// Path for caixa data (default: ~/Documents/caixa)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Manage families.
    Family {
        #[command(subcommand)]
        command: FamilyCommands,
    },
    /// Preview a bank or credit card statement and optionally confirm it.
    Import {
        /// Path to a CSV, XLSX, XLS, ODS or PDF statement
        file: String,
        /// Family the statement belongs to
        #[arg(long)]
        family: String,
        /// Override format detection (csv, xlsx, xls, ods, pdf)
        #[arg(long)]
        format: Option<String>,
        /// Statement kind: bank or credit-card
        #[arg(long, default_value = "bank")]
        kind: String,
        /// Year for dates printed without one (common on card invoices)
        #[arg(long)]
        year: Option<i32>,
        /// Confirm candidates: all, new (not flagged as duplicates) or ids like 1,2,5
        #[arg(long)]
        accept: Option<String>,
        /// Set a candidate's category before confirming: ID=NAME
        #[arg(long = "category")]
        categories: Vec<String>,
        /// Save keyword rules from the confirmed categories
        #[arg(long)]
        learn: bool,
    },
    /// Manage keyword categorization rules.
    Rules {
        #[command(subcommand)]
        command: RulesCommands,
    },
    /// List the categories rules and transactions can use.
    Categories,
    /// Re-run a family's rules on its uncategorized transactions.
    Categorize {
        #[arg(long)]
        family: String,
    },
    /// Add or list transactions.
    Txn {
        #[command(subcommand)]
        command: TxnCommands,
    },
    /// Settle a pending transaction (cheque cleared, invoice item paid).
    Settle {
        /// Transaction ID (shown in `caixa txn list`)
        id: i64,
        /// Date the money actually left or arrived
        #[arg(long)]
        date: String,
    },
    /// Settle every pending credit purchase up to an invoice's closing date.
    PayInvoice {
        #[arg(long)]
        family: String,
        /// Invoice closing date
        #[arg(long)]
        closing: String,
        /// Date the invoice was paid
        #[arg(long)]
        paid: String,
    },
    /// Generate reports.
    Report {
        #[command(subcommand)]
        command: ReportCommands,
    },
    /// Show current database and summary statistics.
    Status,
}

#[derive(Subcommand)]
pub enum FamilyCommands {
    /// Add a family.
    Add { name: String },
    /// List families.
    List,
}

#[derive(Subcommand)]
pub enum RulesCommands {
    /// Add a rule, or point an existing keyword at a new category.
    Add {
        /// Keyword matched against transaction descriptions
        keyword: String,
        #[arg(long)]
        family: String,
        /// Category name to assign
        #[arg(long)]
        category: String,
    },
    /// List a family's rules.
    List {
        #[arg(long)]
        family: String,
    },
    /// Delete a rule by keyword.
    Delete {
        keyword: String,
        #[arg(long)]
        family: String,
    },
}

#[derive(Subcommand)]
pub enum TxnCommands {
    /// Record a transaction by hand.
    Add {
        #[arg(long)]
        family: String,
        /// Date of purchase or payment
        #[arg(long)]
        date: String,
        /// Signed amount, expenses negative (e.g. -120,50)
        #[arg(long, allow_hyphen_values = true)]
        amount: String,
        #[arg(long)]
        description: String,
        /// pix, debit, cash, transfer, credit or cheque
        #[arg(long)]
        method: String,
        #[arg(long)]
        category: Option<String>,
    },
    /// List transactions.
    List {
        #[arg(long)]
        family: String,
        /// Budget month: YYYY-MM
        #[arg(long)]
        month: Option<String>,
        /// Only transactions still waiting for a cash date
        #[arg(long)]
        pending: bool,
    },
}

#[derive(Subcommand)]
pub enum ReportCommands {
    /// Income and expenses by category for one budget month.
    Month {
        #[arg(long)]
        family: String,
        /// Budget month: YYYY-MM
        #[arg(long)]
        month: String,
    },
    /// Deferred transactions still waiting for a cash date.
    Pending {
        #[arg(long)]
        family: String,
    },
}
