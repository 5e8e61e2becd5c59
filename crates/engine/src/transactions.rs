use api_types::ynab::{SaveTransaction, TransactionDetail};

pub use api_types::ynab::Cleared;

/// A transaction owned by the ledger, referenced by its id.
///
/// The engine never deletes records; every change goes through
/// [`Ledger::update_transaction`](crate::Ledger::update_transaction) with a
/// full [`SaveTransaction`] built by [`TransactionRecord::to_save`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionRecord {
    pub id: String,
    pub account_id: String,
    pub date: String,
    /// Milliunits.
    pub amount: i64,
    pub memo: Option<String>,
    pub cleared: Cleared,
    pub approved: bool,
    pub payee_id: Option<String>,
    pub payee_name: Option<String>,
    pub category_id: Option<String>,
    pub category_name: Option<String>,
    pub transfer_transaction_id: Option<String>,
    pub import_id: Option<String>,
}

impl TransactionRecord {
    /// Full update body reproducing the current state.
    ///
    /// The import id is left out: it only matters on creation.
    #[must_use]
    pub fn to_save(&self) -> SaveTransaction {
        SaveTransaction {
            account_id: self.account_id.clone(),
            date: self.date.clone(),
            amount: self.amount,
            payee_id: self.payee_id.clone(),
            payee_name: self.payee_name.clone(),
            category_id: self.category_id.clone(),
            memo: self.memo.clone(),
            cleared: self.cleared,
            approved: self.approved,
            import_id: None,
        }
    }

    #[must_use]
    pub fn is_categorized(&self) -> bool {
        self.category_name.as_deref().is_some_and(|name| !name.is_empty())
    }
}

impl From<TransactionDetail> for TransactionRecord {
    fn from(value: TransactionDetail) -> Self {
        Self {
            id: value.id,
            account_id: value.account_id,
            date: value.date,
            amount: value.amount,
            memo: value.memo,
            cleared: value.cleared,
            approved: value.approved,
            payee_id: value.payee_id,
            payee_name: value.payee_name,
            category_id: value.category_id,
            category_name: value.category_name,
            transfer_transaction_id: value.transfer_transaction_id,
            import_id: value.import_id,
        }
    }
}
