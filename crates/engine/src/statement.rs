use api_types::monobank::WebhookData;
use chrono::{DateTime, Utc};

use crate::{Currency, EngineError, Money};

/// A single bank transaction notification.
///
/// Built once per webhook delivery. Redeliveries carry the same
/// `external_txn_id`; the ledger deduplicates them through the import id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatementEvent {
    pub account_id: String,
    /// Signed amount in minor units.
    pub amount: i64,
    pub currency: Currency,
    pub mcc: u32,
    pub description: String,
    pub comment: Option<String>,
    pub external_txn_id: String,
    pub timestamp: DateTime<Utc>,
}

impl StatementEvent {
    /// Builds an event from a webhook payload for an account settled in `currency`.
    pub fn from_webhook(data: WebhookData, currency: Currency) -> Result<Self, EngineError> {
        let item = data.statement_item;
        let timestamp = DateTime::from_timestamp(item.time, 0).ok_or_else(|| {
            EngineError::InvalidAmount(format!("invalid statement time {}", item.time))
        })?;

        Ok(Self {
            account_id: data.account,
            amount: item.amount,
            currency,
            mcc: item.mcc,
            description: item.description,
            comment: item.comment.filter(|c| !c.trim().is_empty()),
            external_txn_id: item.id,
            timestamp,
        })
    }

    #[must_use]
    pub fn money(&self) -> Money {
        Money::new(self.amount, self.currency)
    }
}
