use api_types::ynab::SaveTransaction;
use async_trait::async_trait;

use crate::{EngineError, TransactionRecord};

/// Ledger account fields the engine relies on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerAccount {
    pub id: String,
    pub name: String,
    /// Payee that turns a transaction into a transfer to this account.
    pub transfer_payee_id: String,
}

/// A selectable budget category.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Category {
    pub id: String,
    pub name: String,
}

/// External ledger holding every durable piece of state.
///
/// No call carries its own deadline; implementations are expected to apply a
/// transport timeout.
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn account(&self, account_id: &str) -> Result<LedgerAccount, EngineError>;

    async fn transaction(&self, transaction_id: &str) -> Result<TransactionRecord, EngineError>;

    async fn create_transaction(
        &self,
        transaction: &SaveTransaction,
    ) -> Result<TransactionRecord, EngineError>;

    async fn update_transaction(
        &self,
        transaction_id: &str,
        transaction: &SaveTransaction,
    ) -> Result<TransactionRecord, EngineError>;

    /// Visible categories, in ledger order.
    async fn categories(&self) -> Result<Vec<Category>, EngineError>;
}
