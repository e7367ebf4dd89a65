use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Row index {index} is out of range for a table of {len} records")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Record {id} not found")]
    RecordNotFound { id: Uuid },

    #[error("Sales data unavailable: {reason}")]
    DataUnavailable { reason: String },

    #[error("Table changed since it was read: expected version {expected}, found {actual}")]
    Conflict { expected: u64, actual: u64 },

    #[error("Store call timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Staff member '{name}' is already on the roster")]
    DuplicateStaff { name: String },

    #[error("Staff member '{name}' is not on the roster")]
    UnknownStaff { name: String },

    #[error("Invalid record: {reason}")]
    InvalidRecord { reason: String },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("Sheet error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type LedgerResult<T> = Result<T, LedgerError>;
