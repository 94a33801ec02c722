use thiserror::Error;

#[derive(Error, Debug)]
pub enum CaixaError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Could not read spreadsheet: {0}")]
    Spreadsheet(String),

    #[error("Could not read PDF: {0}")]
    Pdf(String),

    #[error("Unsupported statement format: {0}")]
    UnsupportedFormat(String),

    #[error("No transactions could be extracted from the file")]
    EmptyResult,

    #[error("File is {size} bytes, the limit is {limit} bytes")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("File has more than {limit} rows")]
    TooManyRows { limit: usize },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Invalid month: {0} (expected YYYY-MM)")]
    InvalidMonth(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Unknown family: {0}")]
    UnknownFamily(String),

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Unknown candidate: {0}")]
    UnknownCandidate(usize),

    #[error("Unknown transaction: {0}")]
    UnknownTransaction(i64),

    #[error("Unknown payment method: {0}")]
    UnknownPaymentMethod(String),

    #[error("No rule for keyword '{0}'")]
    UnknownRule(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, CaixaError>;

/// Why a single statement row was skipped. Collected per row, never fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RowParseError {
    #[error("no date found")]
    MissingDate,

    #[error("no amount found")]
    MissingAmount,

    #[error("unreadable date '{0}'")]
    BadDate(String),

    #[error("unreadable amount '{0}'")]
    BadAmount(String),
}
