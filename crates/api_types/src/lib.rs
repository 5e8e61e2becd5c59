//! Wire types shared by the webhook server, the ledger client and the bot.
//!
//! Field names follow the upstream JSON exactly; everything the core does not
//! consume is left out so unknown fields are ignored on deserialization.

use serde::{Deserialize, Serialize};

pub mod monobank {
    use super::*;

    /// Body of the webhook POST sent by the bank for every statement item.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct WebhookResponse {
        #[serde(rename = "type")]
        pub kind: String,
        pub data: WebhookData,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct WebhookData {
        /// Bank account the statement item belongs to.
        pub account: String,
        pub statement_item: StatementItem,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct StatementItem {
        pub id: String,
        /// Unix timestamp, seconds.
        pub time: i64,
        #[serde(default)]
        pub description: String,
        pub mcc: u32,
        /// Signed amount in minor units of the account currency.
        pub amount: i64,
        #[serde(default)]
        pub operation_amount: i64,
        #[serde(default)]
        pub currency_code: u16,
        #[serde(default)]
        pub hold: bool,
        #[serde(default)]
        pub comment: Option<String>,
        #[serde(default)]
        pub counter_name: Option<String>,
    }

    /// Request body of the "set webhook" call.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct SetWebhook {
        pub web_hook_url: String,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ErrorBody {
        pub err_description: String,
    }
}

pub mod ynab {
    use super::*;

    /// Every successful YNAB response wraps its payload in `data`.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct Data<T> {
        pub data: T,
    }

    #[derive(Debug, Deserialize)]
    pub struct ErrorBody {
        pub error: ErrorDetail,
    }

    #[derive(Debug, Deserialize)]
    pub struct ErrorDetail {
        pub id: String,
        pub name: String,
        pub detail: String,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum Cleared {
        Cleared,
        Uncleared,
        Reconciled,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Account {
        pub id: String,
        pub name: String,
        pub transfer_payee_id: String,
        #[serde(default)]
        pub closed: bool,
        #[serde(default)]
        pub deleted: bool,
    }

    #[derive(Debug, Deserialize)]
    pub struct AccountWrapper {
        pub account: Account,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct TransactionDetail {
        pub id: String,
        /// ISO date, `YYYY-MM-DD`.
        pub date: String,
        /// Milliunits.
        pub amount: i64,
        pub memo: Option<String>,
        pub cleared: Cleared,
        pub approved: bool,
        pub account_id: String,
        pub payee_id: Option<String>,
        pub payee_name: Option<String>,
        pub category_id: Option<String>,
        pub category_name: Option<String>,
        pub transfer_account_id: Option<String>,
        pub transfer_transaction_id: Option<String>,
        pub import_id: Option<String>,
        #[serde(default)]
        pub deleted: bool,
    }

    #[derive(Debug, Deserialize)]
    pub struct TransactionWrapper {
        pub transaction: TransactionDetail,
    }

    /// Body used both to create (`POST`) and update (`PUT`) a transaction.
    ///
    /// `None` is sent as `null`, which YNAB interprets as "clear the field".
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct SaveTransaction {
        pub account_id: String,
        pub date: String,
        pub amount: i64,
        pub payee_id: Option<String>,
        pub payee_name: Option<String>,
        pub category_id: Option<String>,
        pub memo: Option<String>,
        pub cleared: Cleared,
        pub approved: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub import_id: Option<String>,
    }

    #[derive(Debug, Serialize)]
    pub struct SaveTransactionWrapper<'a> {
        pub transaction: &'a SaveTransaction,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Category {
        pub id: String,
        pub name: String,
        #[serde(default)]
        pub hidden: bool,
        #[serde(default)]
        pub deleted: bool,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct CategoryGroup {
        pub id: String,
        pub name: String,
        #[serde(default)]
        pub hidden: bool,
        #[serde(default)]
        pub deleted: bool,
        pub categories: Vec<Category>,
    }

    #[derive(Debug, Deserialize)]
    pub struct CategoryGroups {
        pub category_groups: Vec<CategoryGroup>,
    }
}
