use thiserror::Error;

/// Errors from the persistence services.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("[Services] database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("[Services] ticket not found: {0}")]
    TicketNotFound(String),

    #[error("[Services] invalid ticket status: {0}")]
    InvalidStatus(String),

    #[error("[Services] invalid transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
}

pub type Result<T> = std::result::Result<T, ServiceError>;
