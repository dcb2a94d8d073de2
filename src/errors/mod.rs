// Defines a custom error type and a result type alias using the thiserror crate.
use thiserror::Error;

pub mod reply;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Permission denied")]
    Permission,

    #[error("Usage error: {0}")]
    Usage(&'static str),

    #[error("Daily quota exhausted")]
    QuotaExceeded,

    #[error("Lookup error: {0}")]
    External(String),

    #[error("Backup error: {0}")]
    Persistence(String),

    #[error("Telegram API error: {0}")]
    Telegram(String),
}

// Custom result type
pub type AppResult<T> = Result<T, AppError>;
