use engine::EngineError;
use teloxide::{RequestError, types::UserId};

use crate::parsing::ParseError;

/// Outcome of a callback that did not go through.
///
/// `Unauthorized`, `Malformed` and `Unsupported` are dropped with a log line.
/// `Ledger` and `Telegram` are handed to the error reporter.
#[derive(Debug, thiserror::Error)]
pub enum CallbackError {
    #[error("callback from unknown user {0}")]
    Unauthorized(UserId),
    #[error("malformed callback: {0}")]
    Malformed(String),
    #[error("unsupported button {0:?}")]
    Unsupported(String),
    #[error("ledger error: {0}")]
    Ledger(#[from] EngineError),
    #[error("telegram error: {0}")]
    Telegram(#[from] RequestError),
}

impl CallbackError {
    /// Failures that never reach the error reporter.
    pub fn is_dropped(&self) -> bool {
        matches!(
            self,
            CallbackError::Unauthorized(_) | CallbackError::Malformed(_) | CallbackError::Unsupported(_)
        )
    }
}

impl From<ParseError> for CallbackError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::UnknownButton(data) => CallbackError::Unsupported(data),
            other => CallbackError::Malformed(other.to_string()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("telegram error: {0}")]
    Telegram(#[from] RequestError),
}
