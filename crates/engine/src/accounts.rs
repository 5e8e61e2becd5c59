use serde::Deserialize;

use crate::Currency;

/// A configured bank account and the ledger account it feeds.
#[derive(Clone, Debug, Deserialize)]
pub struct BankAccount {
    pub id: String,
    pub alias: String,
    pub ledger_account_id: String,
    #[serde(default)]
    pub currency: Currency,
    /// Whether the account takes part in transfer detection.
    #[serde(default = "default_transfers")]
    pub transfers: bool,
}

fn default_transfers() -> bool {
    true
}

/// Lookup table over the configured bank accounts.
#[derive(Clone, Debug, Default)]
pub struct AccountMap {
    accounts: Vec<BankAccount>,
}

impl AccountMap {
    pub fn new(accounts: Vec<BankAccount>) -> Self {
        Self { accounts }
    }

    pub fn get(&self, bank_account_id: &str) -> Option<&BankAccount> {
        self.accounts.iter().find(|a| a.id == bank_account_id)
    }

    pub fn ledger_account_id(&self, bank_account_id: &str) -> Option<&str> {
        self.get(bank_account_id)
            .map(|a| a.ledger_account_id.as_str())
    }

    /// `true` if the account belongs to the internal-account set used for transfers.
    pub fn is_internal(&self, bank_account_id: &str) -> bool {
        self.get(bank_account_id).is_some_and(|a| a.transfers)
    }
}
