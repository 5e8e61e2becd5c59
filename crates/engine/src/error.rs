//! The module contains the errors the engine can throw.
//!
//! The errors are:
//!
//! - [`Ledger`] thrown when the ledger answers with a non-success status.
//! - [`MissingTransferLink`] thrown when a transfer update does not produce a
//!   counterpart transaction.
//! - [`KeyNotFound`] thrown when a bank account is not configured.
//!
//!  [`Ledger`]: EngineError::Ledger
//!  [`MissingTransferLink`]: EngineError::MissingTransferLink
//!  [`KeyNotFound`]: EngineError::KeyNotFound
use reqwest::StatusCode;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("ledger error {status}: {message}")]
    Ledger { status: StatusCode, message: String },
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("transaction {0} has no transfer counterpart")]
    MissingTransferLink(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
}

impl EngineError {
    /// Shorthand for ledger failures raised outside the HTTP client.
    pub fn ledger(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Ledger {
            status,
            message: message.into(),
        }
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Network(a), Self::Network(b)) => a.to_string() == b.to_string(),
            (
                Self::Ledger {
                    status: a,
                    message: am,
                },
                Self::Ledger {
                    status: b,
                    message: bm,
                },
            ) => a == b && am == bm,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::MissingTransferLink(a), Self::MissingTransferLink(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            _ => false,
        }
    }
}
