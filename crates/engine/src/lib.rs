//! Domain core: statement events, ledger access and transfer reconciliation.
//!
//! The engine keeps no durable state of its own. Everything persistent lives
//! in the ledger behind the [`Ledger`] trait; the engine only caches
//! transfer payees and remembers unmatched transfer sides in memory.

pub use accounts::{AccountMap, BankAccount};
pub use currency::Currency;
pub use error::EngineError;
pub use factory::TransactionFactory;
pub use ledger::{Category, Ledger, LedgerAccount};
pub use money::Money;
pub use statement::StatementEvent;
pub use transactions::{Cleared, TransactionRecord};
pub use transfer::{TRANSFER_MEMO, TransferPayeeCache, TransferReconciler};
pub use ynab::YnabClient;

pub use api_types::ynab::SaveTransaction;

mod accounts;
mod currency;
mod error;
mod factory;
mod ledger;
mod money;
mod statement;
mod transactions;
mod transfer;
mod ynab;
