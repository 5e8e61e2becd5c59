//! Webhook registration with the bank.
//!
//! The bank validates a webhook URL by calling it with `GET` before it starts
//! delivering statements. Registration is therefore only considered done once
//! that confirmation request actually reached us.

use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex as StdMutex},
    time::Duration,
};

use axum::{Router, extract::State, http::StatusCode, routing::get};
use reqwest::Url;
use tokio::{
    net::TcpListener,
    sync::{Mutex, oneshot},
    task::{JoinHandle, JoinSet},
};

use crate::{BankApi, BankError, RegistrationError};

const BACKOFF_MULTIPLIER: u32 = 2;
const DEFAULT_GRACE_PERIOD: Duration = Duration::from_millis(100);

/// Exponential backoff applied while the bank answers "too many requests".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub initial_delay: Duration,
    /// Total number of registration calls, the first one included.
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_attempts: 5,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (0-based): `d`, `2d`, `4d`, ...
    pub fn delay(&self, retry: u32) -> Duration {
        self.initial_delay
            .saturating_mul(BACKOFF_MULTIPLIER.saturating_pow(retry))
    }

    /// Sum of every delay in the schedule.
    pub fn budget(&self) -> Duration {
        (0..self.max_attempts.saturating_sub(1))
            .map(|retry| self.delay(retry))
            .fold(Duration::ZERO, Duration::saturating_add)
    }
}

/// One account to register in a [`WebhookRegistrar::register_all`] run.
#[derive(Clone)]
pub struct AccountRegistration {
    pub alias: String,
    pub bank: Arc<dyn BankApi>,
    pub local_port: u16,
}

/// Per-account failures collected over a registration run.
#[derive(Debug, Default)]
pub struct RegistrationReport {
    pub registered: Vec<String>,
    pub failures: Vec<(String, RegistrationError)>,
}

impl RegistrationReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for RegistrationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} webhook(s) registered", self.registered.len())?;
        if !self.failures.is_empty() {
            let failed: Vec<&str> = self.failures.iter().map(|(a, _)| a.as_str()).collect();
            write!(f, ", failed: {}", failed.join(", "))?;
        }
        Ok(())
    }
}

/// Registers webhooks; accounts sharing a confirmation port take turns on it.
#[derive(Debug)]
pub struct WebhookRegistrar {
    policy: RetryPolicy,
    grace_period: Duration,
    port_locks: Mutex<HashMap<u16, Arc<Mutex<()>>>>,
}

impl Default for WebhookRegistrar {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

impl WebhookRegistrar {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            grace_period: DEFAULT_GRACE_PERIOD,
            port_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Registers every account concurrently. A failing account never stops the others.
    pub async fn register_all(
        self: &Arc<Self>,
        target_url: &Url,
        accounts: Vec<AccountRegistration>,
    ) -> RegistrationReport {
        let mut tasks = JoinSet::new();
        for account in accounts {
            let registrar = self.clone();
            let url = target_url.clone();
            tasks.spawn(async move {
                let result = registrar
                    .register_webhook(&account.alias, account.bank.as_ref(), &url, account.local_port)
                    .await;
                (account.alias, result)
            });
        }

        let mut report = RegistrationReport::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((alias, Ok(()))) => report.registered.push(alias),
                Ok((alias, Err(err))) => {
                    tracing::error!("Failed to set up webhook for {alias}: {err}");
                    report.failures.push((alias, err));
                }
                Err(err) => tracing::error!("webhook registration task failed: {err}"),
            }
        }

        if report.is_success() {
            tracing::info!("{report}");
        } else {
            tracing::warn!("Some webhooks failed to set up: {report}");
        }
        report
    }

    /// Registers `target_url` for one account and waits for the bank's
    /// confirmation request on `local_port`.
    pub async fn register_webhook(
        &self,
        alias: &str,
        bank: &dyn BankApi,
        target_url: &Url,
        local_port: u16,
    ) -> Result<(), RegistrationError> {
        let port_lock = self.port_lock(local_port).await;
        let _guard = port_lock.lock().await;

        let listener = TcpListener::bind(("0.0.0.0", local_port))
            .await
            .map_err(|source| RegistrationError::Bind {
                port: local_port,
                source,
            })?;
        tracing::info!("Starting temporary webhook setup server for {alias}...");
        let probe = ProbeServer::start(listener, target_url.path(), alias);

        let result = self.confirm(alias, bank, target_url, probe.confirmed).await;

        probe.handle.stop(self.grace_period).await;
        result
    }

    async fn confirm(
        &self,
        alias: &str,
        bank: &dyn BankApi,
        target_url: &Url,
        confirmed: oneshot::Receiver<()>,
    ) -> Result<(), RegistrationError> {
        let mut attempt = 1;
        loop {
            match bank.set_webhook(target_url.as_str()).await {
                Ok(()) => break,
                Err(BankError::RateLimited) if attempt < self.policy.max_attempts => {
                    let delay = self.policy.delay(attempt - 1);
                    tracing::warn!(
                        "Bank rate limited webhook setup for {alias}. Retrying in {delay:?} (attempt {attempt}/{})",
                        self.policy.max_attempts
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(BankError::RateLimited) => {
                    return Err(RegistrationError::RetriesExhausted {
                        alias: alias.to_string(),
                        attempts: attempt,
                    });
                }
                Err(source) => {
                    return Err(RegistrationError::Bank {
                        alias: alias.to_string(),
                        source,
                    });
                }
            }
        }

        // Never shorter than one backoff step, even with a single attempt.
        let waited = self.policy.budget().max(self.policy.initial_delay);
        match tokio::time::timeout(waited, confirmed).await {
            Ok(Ok(())) => {
                tracing::info!("Webhook setup for {alias} successful: {target_url}");
                Ok(())
            }
            _ => Err(RegistrationError::ConfirmationTimeout {
                alias: alias.to_string(),
                waited,
            }),
        }
    }

    async fn port_lock(&self, port: u16) -> Arc<Mutex<()>> {
        let mut locks = self.port_locks.lock().await;
        locks.entry(port).or_default().clone()
    }
}

type Latch = Arc<StdMutex<Option<oneshot::Sender<()>>>>;

struct ProbeServer {
    confirmed: oneshot::Receiver<()>,
    handle: ProbeHandle,
}

struct ProbeHandle {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl ProbeServer {
    fn start(listener: TcpListener, path: &str, alias: &str) -> Self {
        let (latch_tx, confirmed) = oneshot::channel();
        let latch: Latch = Arc::new(StdMutex::new(Some(latch_tx)));
        let (shutdown, shutdown_rx) = oneshot::channel::<()>();

        let router = Router::new()
            .route(path, get(confirmation))
            .with_state(latch);
        let alias = alias.to_string();
        let task = tokio::spawn(async move {
            let serve = axum::serve(listener, router).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            if let Err(err) = serve.await {
                tracing::error!("temporary webhook server for {alias} failed: {err}");
            }
        });

        Self {
            confirmed,
            handle: ProbeHandle { shutdown, task },
        }
    }
}

impl ProbeHandle {
    /// Graceful shutdown bounded by `grace`, then abort.
    async fn stop(self, grace: Duration) {
        let _ = self.shutdown.send(());
        let mut task = self.task;
        if tokio::time::timeout(grace, &mut task).await.is_err() {
            task.abort();
            let _ = task.await;
        }
        tracing::debug!("Temporary webhook setup server stopped");
    }
}

async fn confirmation(State(latch): State<Latch>) -> (StatusCode, &'static str) {
    let sender = latch.lock().ok().and_then(|mut slot| slot.take());
    if let Some(sender) = sender {
        let _ = sender.send(());
    }
    (StatusCode::OK, "OK\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_double_and_budget_sums_the_schedule() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay(0), Duration::from_secs(1));
        assert_eq!(policy.delay(1), Duration::from_secs(2));
        assert_eq!(policy.delay(3), Duration::from_secs(8));
        assert_eq!(policy.budget(), Duration::from_secs(15));
    }

    #[test]
    fn single_attempt_has_no_backoff() {
        let policy = RetryPolicy {
            initial_delay: Duration::from_millis(10),
            max_attempts: 1,
        };
        assert_eq!(policy.budget(), Duration::ZERO);
    }
}
