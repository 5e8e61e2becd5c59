use std::time::Duration;

use api_types::monobank::{ErrorBody, SetWebhook};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use crate::BankError;

const DEFAULT_BASE_URL: &str = "https://api.monobank.ua";

/// Bank-side operations needed by the registrar.
#[async_trait]
pub trait BankApi: Send + Sync {
    /// Asks the bank to deliver statements of this client to `url`.
    async fn set_webhook(&self, url: &str) -> Result<(), BankError>;
}

/// Monobank personal API client, one per token.
#[derive(Clone, Debug)]
pub struct MonobankClient {
    client: Client,
    base_url: String,
}

impl MonobankClient {
    pub fn new(token: &str, timeout: Duration) -> Result<Self, BankError> {
        let mut value = reqwest::header::HeaderValue::try_from(token).map_err(|err| {
            BankError::Server {
                status: StatusCode::UNAUTHORIZED,
                message: format!("invalid token header value: {err}"),
            }
        })?;
        value.set_sensitive(true);

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("X-Token", value);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl BankApi for MonobankClient {
    async fn set_webhook(&self, url: &str) -> Result<(), BankError> {
        let resp = self
            .client
            .post(self.url("/personal/webhook"))
            .json(&SetWebhook {
                web_hook_url: url.to_string(),
            })
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(BankError::RateLimited);
        }

        let message = match resp.json::<ErrorBody>().await {
            Ok(err) => err.err_description,
            Err(_) => "bank error".to_string(),
        };
        Err(BankError::Server { status, message })
    }
}
