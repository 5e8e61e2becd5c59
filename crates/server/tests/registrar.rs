use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use server::{
    AccountRegistration, BankApi, BankError, RegistrationError, RetryPolicy, WebhookRegistrar,
};

#[derive(Clone, Copy, Debug)]
enum Outcome {
    RateLimited,
    Rejected,
    Accepted,
}

/// Bank double answering from a script. On acceptance it calls the webhook
/// URL back the way the real bank validates it.
struct ScriptedBank {
    script: Mutex<VecDeque<Outcome>>,
    calls: Mutex<Vec<Instant>>,
    confirm: bool,
    probe_response: Arc<Mutex<Option<String>>>,
}

impl ScriptedBank {
    fn new(script: &[Outcome]) -> Self {
        Self {
            script: Mutex::new(script.iter().copied().collect()),
            calls: Mutex::new(Vec::new()),
            confirm: true,
            probe_response: Arc::new(Mutex::new(None)),
        }
    }

    fn silent(script: &[Outcome]) -> Self {
        Self {
            confirm: false,
            ..Self::new(script)
        }
    }

    fn calls(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().clone()
    }

    async fn probe_response(&self) -> Option<String> {
        for _ in 0..100 {
            if let Some(text) = self.probe_response.lock().unwrap().clone() {
                return Some(text);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        None
    }
}

#[async_trait]
impl BankApi for ScriptedBank {
    async fn set_webhook(&self, url: &str) -> Result<(), BankError> {
        self.calls.lock().unwrap().push(Instant::now());
        let next = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Outcome::Accepted);

        match next {
            Outcome::RateLimited => Err(BankError::RateLimited),
            Outcome::Rejected => Err(BankError::Server {
                status: StatusCode::FORBIDDEN,
                message: "Unknown 'X-Token'".to_string(),
            }),
            Outcome::Accepted => {
                if self.confirm {
                    let url = url.to_string();
                    let slot = self.probe_response.clone();
                    tokio::spawn(async move {
                        if let Ok(resp) = reqwest::get(url).await
                            && let Ok(text) = resp.text().await
                        {
                            *slot.lock().unwrap() = Some(text);
                        }
                    });
                }
                Ok(())
            }
        }
    }
}

fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

fn target(port: u16) -> Url {
    Url::parse(&format!("http://127.0.0.1:{port}/mono/webhook")).unwrap()
}

fn registrar(initial_delay_ms: u64) -> WebhookRegistrar {
    WebhookRegistrar::new(RetryPolicy {
        initial_delay: Duration::from_millis(initial_delay_ms),
        max_attempts: 5,
    })
}

fn port_is_free(port: u16) -> bool {
    std::net::TcpListener::bind(("0.0.0.0", port)).is_ok()
}

#[tokio::test]
async fn confirms_after_rate_limited_retries_with_doubling_delays() {
    let port = free_port();
    let bank = ScriptedBank::new(&[Outcome::RateLimited, Outcome::RateLimited, Outcome::Accepted]);

    registrar(20)
        .register_webhook("black", &bank, &target(port), port)
        .await
        .unwrap();

    let calls = bank.calls();
    assert_eq!(calls.len(), 3);
    assert!(calls[1] - calls[0] >= Duration::from_millis(20));
    assert!(calls[2] - calls[1] >= Duration::from_millis(40));
    assert_eq!(bank.probe_response().await.as_deref(), Some("OK\n"));
    assert!(port_is_free(port));
}

#[tokio::test]
async fn gives_up_after_five_rate_limited_attempts() {
    let port = free_port();
    let bank = ScriptedBank::new(&[Outcome::RateLimited; 6]);

    let err = registrar(1)
        .register_webhook("black", &bank, &target(port), port)
        .await
        .unwrap_err();

    assert!(matches!(err, RegistrationError::RetriesExhausted { attempts: 5, .. }));
    assert_eq!(bank.calls().len(), 5);
    assert!(port_is_free(port));
}

#[tokio::test]
async fn other_bank_errors_abort_immediately() {
    let port = free_port();
    let bank = ScriptedBank::new(&[Outcome::Rejected, Outcome::Accepted]);

    let err = registrar(1)
        .register_webhook("black", &bank, &target(port), port)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        RegistrationError::Bank {
            source: BankError::Server { .. },
            ..
        }
    ));
    assert_eq!(bank.calls().len(), 1);
    assert!(port_is_free(port));
}

#[tokio::test]
async fn accepted_call_without_confirmation_request_fails() {
    let port = free_port();
    let bank = ScriptedBank::silent(&[Outcome::Accepted]);

    let err = registrar(10)
        .register_webhook("black", &bank, &target(port), port)
        .await
        .unwrap_err();

    match err {
        RegistrationError::ConfirmationTimeout { waited, .. } => {
            assert_eq!(waited, Duration::from_millis(150));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(port_is_free(port));
}

#[tokio::test]
async fn register_all_reports_failures_without_blocking_others() {
    let registrar = Arc::new(registrar(1));
    let shared_port = free_port();
    let other_port = free_port();

    let accounts = vec![
        AccountRegistration {
            alias: "black".to_string(),
            bank: Arc::new(ScriptedBank::new(&[Outcome::Accepted])),
            local_port: shared_port,
        },
        AccountRegistration {
            alias: "white".to_string(),
            bank: Arc::new(ScriptedBank::new(&[Outcome::Rejected])),
            local_port: other_port,
        },
        AccountRegistration {
            alias: "fop".to_string(),
            bank: Arc::new(ScriptedBank::new(&[Outcome::RateLimited, Outcome::Accepted])),
            local_port: shared_port,
        },
    ];

    let report = registrar.register_all(&target(shared_port), accounts).await;

    let mut registered = report.registered.clone();
    registered.sort();
    assert_eq!(registered, vec!["black".to_string(), "fop".to_string()]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].0, "white");
    assert!(!report.is_success());
}
