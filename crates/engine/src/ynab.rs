use std::time::Duration;

use api_types::ynab::{
    AccountWrapper, CategoryGroups, Data, ErrorBody, SaveTransaction, SaveTransactionWrapper,
    TransactionWrapper,
};
use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;

use crate::{Category, EngineError, Ledger, LedgerAccount, TransactionRecord};

const DEFAULT_BASE_URL: &str = "https://api.youneedabudget.com/v1";

/// Budget-scoped YNAB REST client.
#[derive(Clone, Debug)]
pub struct YnabClient {
    client: Client,
    base_url: String,
    budget_id: String,
}

impl YnabClient {
    pub fn new(token: &str, budget_id: &str, timeout: Duration) -> Result<Self, EngineError> {
        let mut auth = reqwest::header::HeaderValue::try_from(format!("Bearer {token}"))
            .map_err(|err| EngineError::ledger(StatusCode::UNAUTHORIZED, err.to_string()))?;
        auth.set_sensitive(true);

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(reqwest::header::AUTHORIZATION, auth);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            budget_id: budget_id.to_string(),
        })
    }

    /// Points the client at another API root (tests, proxies).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/budgets/{}/{}",
            self.base_url.trim_end_matches('/'),
            self.budget_id,
            path.trim_start_matches('/')
        )
    }

    async fn send<TResp: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&SaveTransaction>,
    ) -> Result<TResp, EngineError> {
        tracing::debug!("Performing YNAB request {method} {path}");
        let mut req = self.client.request(method, self.url(path));
        if let Some(transaction) = body {
            req = req.json(&SaveTransactionWrapper { transaction });
        }

        let resp = req.send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp.json::<Data<TResp>>().await?.data);
        }

        let message = match resp.json::<ErrorBody>().await {
            Ok(err) => format!("{} ({}): {}", err.error.name, err.error.id, err.error.detail),
            Err(_) => "ledger error".to_string(),
        };
        tracing::error!("YNAB request {path} failed: {status} {message}");
        Err(EngineError::Ledger { status, message })
    }
}

#[async_trait]
impl Ledger for YnabClient {
    async fn account(&self, account_id: &str) -> Result<LedgerAccount, EngineError> {
        let wrapper: AccountWrapper = self
            .send(Method::GET, &format!("accounts/{account_id}"), None)
            .await?;
        Ok(LedgerAccount {
            id: wrapper.account.id,
            name: wrapper.account.name,
            transfer_payee_id: wrapper.account.transfer_payee_id,
        })
    }

    async fn transaction(&self, transaction_id: &str) -> Result<TransactionRecord, EngineError> {
        let wrapper: TransactionWrapper = self
            .send(Method::GET, &format!("transactions/{transaction_id}"), None)
            .await?;
        Ok(wrapper.transaction.into())
    }

    async fn create_transaction(
        &self,
        transaction: &SaveTransaction,
    ) -> Result<TransactionRecord, EngineError> {
        let wrapper: TransactionWrapper = self
            .send(Method::POST, "transactions", Some(transaction))
            .await?;
        Ok(wrapper.transaction.into())
    }

    async fn update_transaction(
        &self,
        transaction_id: &str,
        transaction: &SaveTransaction,
    ) -> Result<TransactionRecord, EngineError> {
        let wrapper: TransactionWrapper = self
            .send(
                Method::PUT,
                &format!("transactions/{transaction_id}"),
                Some(transaction),
            )
            .await?;
        Ok(wrapper.transaction.into())
    }

    async fn categories(&self) -> Result<Vec<Category>, EngineError> {
        let groups: CategoryGroups = self.send(Method::GET, "categories", None).await?;
        Ok(groups
            .category_groups
            .into_iter()
            .filter(|g| !g.hidden && !g.deleted)
            .flat_map(|g| g.categories)
            .filter(|c| !c.hidden && !c.deleted)
            .map(|c| Category {
                id: c.id,
                name: c.name,
            })
            .collect())
    }
}
