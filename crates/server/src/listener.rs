use std::sync::Arc;

use api_types::monobank::WebhookResponse;
use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::post,
};
use engine::{AccountMap, StatementEvent};
use tokio::sync::broadcast;
use tokio_stream::{Stream, StreamExt, wrappers::BroadcastStream};

const DEFAULT_CAPACITY: usize = 256;

/// Persistent webhook endpoint publishing statement events to subscribers.
///
/// The bank always gets `200 OK`, whatever happens to the payload, so it never
/// enters its own retry loop because of us.
#[derive(Clone)]
pub struct WebhookListener {
    path: String,
    accounts: Arc<AccountMap>,
    sender: broadcast::Sender<StatementEvent>,
}

impl WebhookListener {
    pub fn new(path: &str, accounts: Arc<AccountMap>) -> Self {
        Self::with_capacity(path, accounts, DEFAULT_CAPACITY)
    }

    /// `capacity` bounds how far a subscriber may lag before it skips events.
    pub fn with_capacity(path: &str, accounts: Arc<AccountMap>, capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            path: path.to_string(),
            accounts,
            sender,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StatementEvent> {
        self.sender.subscribe()
    }

    /// Statement events received from now on, in arrival order.
    ///
    /// The stream never ends; events missed by a lagging subscriber are logged
    /// and skipped.
    pub fn statements(&self) -> impl Stream<Item = StatementEvent> + Send + 'static {
        BroadcastStream::new(self.subscribe()).filter_map(|item| match item {
            Ok(event) => Some(event),
            Err(err) => {
                tracing::warn!("Statement subscriber lagged: {err}");
                None
            }
        })
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route(&self.path, post(receive).get(probe))
            .with_state(self.clone())
    }

    pub async fn run_with_listener(
        self,
        listener: tokio::net::TcpListener,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!("Webhook listener on {}{}", addr, self.path);

        axum::serve(listener, self.router()).await
    }

    fn publish(&self, body: &[u8]) {
        let response: WebhookResponse = match serde_json::from_slice(body) {
            Ok(response) => response,
            Err(err) => {
                tracing::error!("Dropping unparsable webhook body: {err}");
                return;
            }
        };

        let Some(account) = self.accounts.get(&response.data.account) else {
            tracing::warn!(
                "Skipping statement {} for accountId={}: account is not configured",
                response.data.statement_item.id,
                response.data.account
            );
            return;
        };

        let event = match StatementEvent::from_webhook(response.data, account.currency) {
            Ok(event) => event,
            Err(err) => {
                tracing::error!("Dropping statement for {}: {err}", account.alias);
                return;
            }
        };

        tracing::info!(
            "Statement {} received for {}: {}",
            event.external_txn_id,
            account.alias,
            event.money()
        );
        if self.sender.send(event).is_err() {
            tracing::warn!("No statement subscribers, event dropped");
        }
    }
}

async fn receive(State(listener): State<WebhookListener>, body: Bytes) -> (StatusCode, &'static str) {
    listener.publish(&body);
    (StatusCode::OK, "OK")
}

async fn probe() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http::Request};
    use engine::{BankAccount, Currency};
    use http_body_util::BodyExt;
    use tokio::sync::broadcast::error::TryRecvError;
    use tower::ServiceExt;

    use super::*;

    const PATH: &str = "/mono/webhook";

    fn listener() -> WebhookListener {
        let accounts = AccountMap::new(vec![BankAccount {
            id: "acc-black".to_string(),
            alias: "black".to_string(),
            ledger_account_id: "ynab-black".to_string(),
            currency: Currency::Uah,
            transfers: true,
        }]);
        WebhookListener::new(PATH, Arc::new(accounts))
    }

    fn body(account: &str) -> String {
        serde_json::json!({
            "type": "StatementItem",
            "data": {
                "account": account,
                "statementItem": {
                    "id": "ZuHWzqkKGVo=",
                    "time": 1709287200,
                    "description": "Coffee",
                    "mcc": 5814,
                    "amount": -9500,
                    "operationAmount": -9500,
                    "currencyCode": 980
                }
            }
        })
        .to_string()
    }

    async fn post(listener: &WebhookListener, body: String) -> (StatusCode, String) {
        let res = listener
            .router()
            .oneshot(
                Request::post(PATH)
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = res.status();
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn configured_account_publishes_event() {
        let listener = listener();
        let mut rx = listener.subscribe();

        let (status, text) = post(&listener, body("acc-black")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(text, "OK");

        let event = rx.try_recv().unwrap();
        assert_eq!(event.account_id, "acc-black");
        assert_eq!(event.amount, -9500);
        assert_eq!(event.currency, Currency::Uah);
        assert_eq!(event.external_txn_id, "ZuHWzqkKGVo=");
    }

    #[tokio::test]
    async fn unconfigured_account_is_acknowledged_and_dropped() {
        let listener = listener();
        let mut rx = listener.subscribe();

        let (status, text) = post(&listener, body("acc-unknown")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(text, "OK");
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn malformed_body_still_gets_ok() {
        let listener = listener();
        let mut rx = listener.subscribe();

        let (status, _) = post(&listener, "{not json".to_string()).await;
        assert_eq!(status, StatusCode::OK);
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn get_on_the_webhook_path_answers_ok() {
        let res = listener()
            .router()
            .oneshot(Request::get(PATH).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn every_subscriber_sees_events_in_order() {
        let listener = listener();
        let mut first = Box::pin(listener.statements());
        let mut second = Box::pin(listener.statements());

        post(&listener, body("acc-black")).await;
        post(&listener, body("acc-black").replace("ZuHWzqkKGVo=", "second")).await;

        for stream in [&mut first, &mut second] {
            assert_eq!(stream.next().await.unwrap().external_txn_id, "ZuHWzqkKGVo=");
            assert_eq!(stream.next().await.unwrap().external_txn_id, "second");
        }
    }
}
