//! Settings for the application, read from `config/monobudget.toml` and
//! `MONOBUDGET__*` environment variables.
use std::collections::HashMap;

use clap::Parser;
use config::{Config, ConfigError, Environment, File};
use engine::BankAccount;
use serde::Deserialize;

const DEFAULT_CONFIG_PATH: &str = "config/monobudget";

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct App {
    pub level: String,
    /// IANA name; ledger dates are taken in this zone.
    pub timezone: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            timezone: "Europe/Kyiv".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Webhook {
    /// Public URL the bank posts statements to.
    pub url: String,
    /// Local port the listener serves on.
    pub port: u16,
    #[serde(default = "default_true")]
    pub set_webhook: bool,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Timeout of calls to the bank API.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct Ynab {
    pub token: String,
    pub budget_id: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct Telegram {
    pub token: String,
    /// Defaults to the account chats when empty.
    #[serde(default)]
    pub allowed_users: Vec<u64>,
}

#[derive(Debug, Deserialize)]
pub struct Account {
    #[serde(flatten)]
    pub bank: BankAccount,
    pub token: String,
    pub telegram_chat_id: i64,
    /// Port the bank's confirmation request reaches; the listener port when unset.
    pub probe_port: Option<u16>,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub app: App,
    pub webhook: Webhook,
    pub ynab: Ynab,
    pub telegram: Telegram,
    pub accounts: Vec<Account>,
    /// MCC code to ledger category id.
    #[serde(default)]
    pub mcc_categories: HashMap<String, String>,
}

#[derive(Debug, Parser)]
#[command(name = "monobudget", disable_version_flag = true)]
struct Args {
    /// Optional config file path (TOML).
    #[arg(long)]
    config: Option<String>,
    /// Override the log level.
    #[arg(long)]
    level: Option<String>,
    /// Skip webhook registration with the bank.
    #[arg(long)]
    no_set_webhook: bool,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let args = Args::parse();

        let config_path = args.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);
        let settings = Config::builder()
            .add_source(File::with_name(config_path).required(false))
            .add_source(Environment::with_prefix("MONOBUDGET").separator("__"))
            .build()?;
        let mut settings: Settings = settings.try_deserialize()?;

        if let Some(level) = args.level {
            settings.app.level = level;
        }
        if args.no_set_webhook {
            settings.webhook.set_webhook = false;
        }

        Ok(settings)
    }

    /// MCC mapping with numeric keys; unparsable codes are logged and skipped.
    pub fn mcc_categories(&self) -> HashMap<u32, String> {
        self.mcc_categories
            .iter()
            .filter_map(|(mcc, category)| match mcc.parse() {
                Ok(code) => Some((code, category.clone())),
                Err(_) => {
                    tracing::warn!("Ignoring invalid MCC {mcc:?} in mcc_categories");
                    None
                }
            })
            .collect()
    }
}

fn default_true() -> bool {
    true
}

fn default_initial_delay_ms() -> u64 {
    1000
}

fn default_max_attempts() -> u32 {
    5
}

fn default_timeout_secs() -> u64 {
    30
}
