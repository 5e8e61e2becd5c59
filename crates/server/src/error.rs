use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

/// Failures of a call to the bank API.
#[derive(Debug, Error)]
pub enum BankError {
    /// The bank asked us to slow down (HTTP 429).
    #[error("rate limited by the bank")]
    RateLimited,
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("{status}: {message}")]
    Server { status: StatusCode, message: String },
}

/// Terminal outcome of a failed webhook registration for one account.
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("cannot bind confirmation listener on port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },
    #[error("webhook registration for {alias} rejected: {source}")]
    Bank {
        alias: String,
        #[source]
        source: BankError,
    },
    #[error("webhook registration for {alias} still rate limited after {attempts} attempts")]
    RetriesExhausted { alias: String, attempts: u32 },
    #[error("no confirmation request for {alias} within {waited:?}")]
    ConfirmationTimeout { alias: String, waited: Duration },
}
