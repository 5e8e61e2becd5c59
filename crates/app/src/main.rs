use std::{collections::HashMap, sync::Arc, time::Duration};

use chrono_tz::Tz;
use engine::{AccountMap, Ledger, TransactionFactory, TransferReconciler, YnabClient};
use reqwest::Url;
use server::{AccountRegistration, MonobankClient, RetryPolicy, WebhookListener, WebhookRegistrar};
use telegram_bot::StatementNotifier;
use teloxide::types::{ChatId, UserId};

mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;
    let mut tasks = tokio::task::JoinSet::new();

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "monobudget={level},telegram_bot={level},server={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    let timezone: Tz = settings
        .app
        .timezone
        .parse()
        .map_err(|err| format!("invalid timezone {}: {err}", settings.app.timezone))?;
    let webhook_url = Url::parse(&settings.webhook.url)?;
    let accounts = Arc::new(AccountMap::new(
        settings.accounts.iter().map(|a| a.bank.clone()).collect(),
    ));

    let ledger: Arc<dyn Ledger> = Arc::new(YnabClient::new(
        &settings.ynab.token,
        &settings.ynab.budget_id,
        Duration::from_secs(settings.ynab.timeout_secs),
    )?);

    // The confirmation server may need the listener's port, so registration
    // finishes before the listener binds.
    if settings.webhook.set_webhook {
        let registrar = Arc::new(WebhookRegistrar::new(RetryPolicy {
            initial_delay: Duration::from_millis(settings.webhook.initial_delay_ms),
            max_attempts: settings.webhook.max_attempts,
        }));
        let mut registrations = Vec::new();
        for account in &settings.accounts {
            let bank = MonobankClient::new(
                &account.token,
                Duration::from_secs(settings.webhook.timeout_secs),
            )?;
            registrations.push(AccountRegistration {
                alias: account.bank.alias.clone(),
                bank: Arc::new(bank),
                local_port: account.probe_port.unwrap_or(settings.webhook.port),
            });
        }
        registrar.register_all(&webhook_url, registrations).await;
    }

    let listener = WebhookListener::new(webhook_url.path(), accounts.clone());
    let statements = listener.statements();
    let tcp = tokio::net::TcpListener::bind(("0.0.0.0", settings.webhook.port)).await?;
    tasks.spawn(async move {
        if let Err(err) = listener.run_with_listener(tcp).await {
            tracing::error!("webhook listener failed: {err}");
        }
    });

    let chats: HashMap<String, ChatId> = settings
        .accounts
        .iter()
        .map(|a| (a.bank.id.clone(), ChatId(a.telegram_chat_id)))
        .collect();
    let allowed_users = allowed_users(&settings);

    let bot = telegram_bot::Bot::builder()
        .token(&settings.telegram.token)
        .allowed_users(allowed_users)
        .ledger(ledger.clone())
        .build()?;

    let factory =
        TransactionFactory::new(accounts.clone(), timezone).mcc_categories(settings.mcc_categories());
    let reconciler = Arc::new(TransferReconciler::new(accounts, ledger.clone()));
    let notifier = StatementNotifier::new(factory, ledger, reconciler, bot.chat(), chats);
    tasks.spawn(notifier.run(statements));

    tasks.spawn(async move { bot.run().await });

    while tasks.join_next().await.is_some() {
        tasks.shutdown().await;
    }

    Ok(())
}

/// Configured users, or the private chats of the accounts when none are.
fn allowed_users(settings: &settings::Settings) -> Vec<UserId> {
    if !settings.telegram.allowed_users.is_empty() {
        return settings.telegram.allowed_users.iter().copied().map(UserId).collect();
    }
    settings
        .accounts
        .iter()
        .filter_map(|a| u64::try_from(a.telegram_chat_id).ok())
        .map(UserId)
        .collect()
}
