//! Telegram bot.
//!
//! Statement notifications go out with an inline keyboard; button presses
//! come back as callback queries and are applied to the ledger.

use std::sync::Arc;

use engine::Ledger;
use teloxide::prelude::*;

pub use chat::{ChatApi, TelegramChat};
pub use error::{CallbackError, NotifyError};
pub use handlers::{
    CallbackEvent, CallbackStateMachine, ChatErrorReporter, ErrorReporter, TargetMessage,
};
pub use message::{StatementMessage, should_notify};
pub use notify::StatementNotifier;
pub use parsing::{ParseError, bold_payee, parse_button, strip_html_tags, transaction_id};
pub use ui::{ButtonClass, category_keyboard, render, transaction_keyboard};

mod chat;
mod error;
mod handlers;
mod message;
mod notify;
mod parsing;
mod ui;

#[derive(Clone)]
pub struct ConfigParameters {
    machine: Arc<CallbackStateMachine>,
}

pub struct Bot {
    bot: teloxide::Bot,
    allowed_users: Vec<UserId>,
    ledger: Arc<dyn Ledger>,
}

impl Bot {
    pub fn new(token: &str, allowed_users: Vec<UserId>, ledger: Arc<dyn Ledger>) -> Self {
        Self {
            bot: teloxide::Bot::new(token),
            allowed_users,
            ledger,
        }
    }

    pub fn builder() -> BotBuilder {
        BotBuilder::default()
    }

    /// Chat handle sharing this bot's token, for outgoing notifications.
    pub fn chat(&self) -> Arc<dyn ChatApi> {
        Arc::new(TelegramChat::new(self.bot.clone()))
    }

    pub async fn run(&self) {
        tracing::info!("Starting telegram bot...");

        let chat = self.chat();
        let parameters = ConfigParameters {
            machine: Arc::new(CallbackStateMachine::new(
                self.ledger.clone(),
                chat.clone(),
                Arc::new(ChatErrorReporter::new(chat)),
                self.allowed_users.clone(),
            )),
        };

        let handler = dptree::entry()
            .branch(Update::filter_callback_query().endpoint(handlers::handle_callback));

        Dispatcher::builder(self.bot.clone(), handler)
            .dependencies(dptree::deps![parameters])
            .default_handler(|upd| async move {
                tracing::debug!("Unhandled update: {:?}", upd.id);
            })
            .error_handler(LoggingErrorHandler::with_custom_text(
                "An error has occurred in the dispatcher",
            ))
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;
    }
}

#[derive(Default)]
pub struct BotBuilder {
    token: String,
    allowed_users: Vec<UserId>,
    ledger: Option<Arc<dyn Ledger>>,
}

impl BotBuilder {
    pub fn token(mut self, token: &str) -> BotBuilder {
        self.token = token.to_string();
        self
    }

    /// Users whose button presses are honoured; everyone else is ignored.
    pub fn allowed_users(mut self, allowed_users: Vec<UserId>) -> BotBuilder {
        self.allowed_users = allowed_users;
        self
    }

    pub fn ledger(mut self, ledger: Arc<dyn Ledger>) -> BotBuilder {
        self.ledger = Some(ledger);
        self
    }

    pub fn build(self) -> Result<Bot, String> {
        tracing::info!("Initializing telegram bot...");
        if self.token.is_empty() {
            return Err("telegram token is empty".to_string());
        }
        let ledger = self.ledger.ok_or("telegram bot needs a ledger")?;
        if self.allowed_users.is_empty() {
            tracing::warn!("No telegram users allowed, every button press will be ignored");
        }
        Ok(Bot::new(&self.token, self.allowed_users, ledger))
    }
}
