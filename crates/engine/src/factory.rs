use std::{collections::HashMap, sync::Arc};

use api_types::ynab::SaveTransaction;
use chrono_tz::Tz;

use crate::{AccountMap, Cleared, EngineError, StatementEvent};

const IMPORT_ID_PREFIX: &str = "MONO:";
const IMPORT_ID_MAX_LEN: usize = 36;
const MEMO_MAX_LEN: usize = 200;

/// Turns statement events into new ledger transactions.
#[derive(Clone, Debug)]
pub struct TransactionFactory {
    accounts: Arc<AccountMap>,
    mcc_categories: HashMap<u32, String>,
    timezone: Tz,
}

impl TransactionFactory {
    pub fn new(accounts: Arc<AccountMap>, timezone: Tz) -> Self {
        Self {
            accounts,
            mcc_categories: HashMap::new(),
            timezone,
        }
    }

    /// Pre-assigns a category to every statement with one of the given MCCs.
    pub fn mcc_categories(mut self, mapping: HashMap<u32, String>) -> Self {
        self.mcc_categories = mapping;
        self
    }

    /// Builds the creation body for `event`.
    ///
    /// The payee is left empty so the operator can promote the description
    /// with the payee button; the import id lets the ledger drop redeliveries.
    pub fn create(&self, event: &StatementEvent) -> Result<SaveTransaction, EngineError> {
        let account_id = self
            .accounts
            .ledger_account_id(&event.account_id)
            .ok_or_else(|| EngineError::KeyNotFound(event.account_id.clone()))?;

        let memo = match event.comment.as_deref() {
            Some(comment) => format!("{} {}", event.description.trim(), comment.trim()),
            None => event.description.trim().to_string(),
        };

        Ok(SaveTransaction {
            account_id: account_id.to_string(),
            date: event
                .timestamp
                .with_timezone(&self.timezone)
                .date_naive()
                .to_string(),
            amount: event.money().to_milliunits()?,
            payee_id: None,
            payee_name: None,
            category_id: self.mcc_categories.get(&event.mcc).cloned(),
            memo: Some(truncate(&memo, MEMO_MAX_LEN)),
            cleared: Cleared::Uncleared,
            approved: false,
            import_id: Some(truncate(
                &format!("{IMPORT_ID_PREFIX}{}", event.external_txn_id),
                IMPORT_ID_MAX_LEN,
            )),
        })
    }
}

fn truncate(value: &str, max_chars: usize) -> String {
    value.chars().take(max_chars).collect()
}
