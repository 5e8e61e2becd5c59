//! Bank-facing HTTP side: the persistent webhook listener and the webhook
//! registrar with its short-lived confirmation server.

pub use bank::{BankApi, MonobankClient};
pub use error::{BankError, RegistrationError};
pub use listener::WebhookListener;
pub use registrar::{AccountRegistration, RegistrationReport, RetryPolicy, WebhookRegistrar};

mod bank;
mod error;
mod listener;
mod registrar;
