use std::sync::Arc;

use async_trait::async_trait;
use engine::{Cleared, Ledger};
use teloxide::{
    ApiError, RequestError,
    prelude::*,
    types::{CallbackQuery, InlineKeyboardMarkup, MessageEntity, MessageId},
};

use crate::{
    ConfigParameters,
    chat::ChatApi,
    error::CallbackError,
    message::{StatementMessage, escape_html},
    parsing::{bold_payee, parse_button, strip_html_tags, transaction_id},
    ui::{ButtonClass, category_keyboard, transaction_keyboard},
};

/// A button press, detached from the Bot API types that carry it.
#[derive(Clone, Debug)]
pub struct CallbackEvent {
    pub query_id: String,
    pub from: UserId,
    pub data: Option<String>,
    pub message: Option<TargetMessage>,
}

/// The statement message a button was pressed on.
#[derive(Clone, Debug)]
pub struct TargetMessage {
    pub chat_id: ChatId,
    pub message_id: MessageId,
    /// Plain text, as Telegram shows it.
    pub text: String,
    pub entities: Vec<MessageEntity>,
    pub markup: Option<InlineKeyboardMarkup>,
}

impl CallbackEvent {
    pub fn from_query(query: &CallbackQuery) -> Self {
        Self {
            query_id: query.id.to_string(),
            from: query.from.id,
            data: query.data.clone(),
            message: query.regular_message().map(TargetMessage::from_message),
        }
    }
}

impl TargetMessage {
    fn from_message(message: &Message) -> Self {
        Self {
            chat_id: message.chat.id,
            message_id: message.id,
            text: message.text().unwrap_or_default().to_string(),
            entities: message.entities().map(<[_]>::to_vec).unwrap_or_default(),
            markup: message.reply_markup().cloned(),
        }
    }
}

/// Receives callback failures that operators should hear about.
#[async_trait]
pub trait ErrorReporter: Send + Sync {
    async fn report(
        &self,
        event: &CallbackEvent,
        class: Option<&ButtonClass>,
        error: &CallbackError,
    ) -> Result<(), RequestError>;
}

/// Logs the failure and posts a short alert under the statement message.
pub struct ChatErrorReporter {
    chat: Arc<dyn ChatApi>,
}

impl ChatErrorReporter {
    pub fn new(chat: Arc<dyn ChatApi>) -> Self {
        Self { chat }
    }
}

#[async_trait]
impl ErrorReporter for ChatErrorReporter {
    async fn report(
        &self,
        event: &CallbackEvent,
        class: Option<&ButtonClass>,
        error: &CallbackError,
    ) -> Result<(), RequestError> {
        let button = class.map_or_else(|| "unknown".to_string(), ToString::to_string);
        tracing::error!(
            "Callback {} ({button}) from {} failed: {error}",
            event.query_id,
            event.from
        );

        let Some(message) = &event.message else {
            return Ok(());
        };
        let alert = format!(
            "⚠️ Could not apply <b>{}</b>: {}",
            escape_html(&button),
            escape_html(&error.to_string())
        );
        self.chat.send_message(message.chat_id, &alert, None).await
    }
}

/// Processes one button press at a time, from authorization to acknowledgment.
pub struct CallbackStateMachine {
    ledger: Arc<dyn Ledger>,
    chat: Arc<dyn ChatApi>,
    reporter: Arc<dyn ErrorReporter>,
    allowed_users: Vec<UserId>,
}

enum TransactionUpdate {
    Uncategorize,
    Unapprove,
    MakePayee(String),
    UpdateCategory(String),
}

impl CallbackStateMachine {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        chat: Arc<dyn ChatApi>,
        reporter: Arc<dyn ErrorReporter>,
        allowed_users: Vec<UserId>,
    ) -> Self {
        Self {
            ledger,
            chat,
            reporter,
            allowed_users,
        }
    }

    /// Handles `event` and acknowledges it exactly once, whatever happened.
    pub async fn handle(&self, event: &CallbackEvent) {
        let mut class = None;
        if let Err(err) = self.process(event, &mut class).await {
            if err.is_dropped() {
                tracing::warn!("Dropping callback {}: {err}", event.query_id);
            } else if let Err(report_err) = self.reporter.report(event, class.as_ref(), &err).await {
                tracing::error!("Failed to report callback error: {report_err}");
            }
        }

        if let Err(err) = self.chat.answer_callback(&event.query_id).await {
            tracing::error!("Error answering callback query {}: {err}", event.query_id);
        }
    }

    async fn process(
        &self,
        event: &CallbackEvent,
        class: &mut Option<ButtonClass>,
    ) -> Result<(), CallbackError> {
        if !self.allowed_users.contains(&event.from) {
            return Err(CallbackError::Unauthorized(event.from));
        }

        let data = event
            .data
            .as_deref()
            .filter(|data| !data.trim().is_empty())
            .ok_or_else(|| CallbackError::Malformed("empty callback data".to_string()))?;
        let message = event
            .message
            .as_ref()
            .ok_or_else(|| CallbackError::Malformed("callback without message".to_string()))?;

        let parsed = parse_button(data)?;
        *class = Some(parsed.clone());
        tracing::debug!("Callback {} classified as {parsed}", event.query_id);

        let id = transaction_id(&message.text)?.to_string();
        let update = match parsed {
            ButtonClass::ChooseCategory => return self.choose_category(message).await,
            ButtonClass::Uncategorize => TransactionUpdate::Uncategorize,
            ButtonClass::Unapprove => TransactionUpdate::Unapprove,
            ButtonClass::MakePayee => {
                let payee = bold_payee(&message.text, &message.entities)
                    .ok_or_else(|| CallbackError::Malformed("message has no payee".to_string()))?;
                TransactionUpdate::MakePayee(payee)
            }
            ButtonClass::UpdateCategory(category_id) => TransactionUpdate::UpdateCategory(category_id),
        };

        self.update(&id, update, message).await
    }

    async fn choose_category(&self, message: &TargetMessage) -> Result<(), CallbackError> {
        let categories = self.ledger.categories().await?;
        self.chat
            .edit_keyboard(message.chat_id, message.message_id, category_keyboard(&categories))
            .await?;
        Ok(())
    }

    async fn update(
        &self,
        id: &str,
        update: TransactionUpdate,
        message: &TargetMessage,
    ) -> Result<(), CallbackError> {
        let statement = StatementMessage::from_plain_text(&message.text)
            .ok_or_else(|| CallbackError::Malformed("not a statement message".to_string()))?;

        let record = self.ledger.transaction(id).await?;
        let mut save = record.to_save();
        match update {
            TransactionUpdate::Uncategorize => save.category_id = None,
            TransactionUpdate::Unapprove => {
                save.cleared = Cleared::Uncleared;
                save.approved = false;
            }
            TransactionUpdate::MakePayee(payee) => {
                save.payee_id = None;
                save.payee_name = Some(payee);
            }
            TransactionUpdate::UpdateCategory(category_id) => save.category_id = Some(category_id),
        }
        let updated = self.ledger.update_transaction(id, &save).await?;

        let html = statement.render(&updated);
        let markup = transaction_keyboard(&updated, &statement.description);
        if strip_html_tags(&html) == message.text && message.markup.as_ref() == Some(&markup) {
            tracing::debug!("Message {} already up to date", message.message_id.0);
            return Ok(());
        }

        match self
            .chat
            .edit_message(message.chat_id, message.message_id, &html, markup)
            .await
        {
            Err(RequestError::Api(ApiError::MessageNotModified)) => {
                tracing::debug!("Message {} not modified", message.message_id.0);
                Ok(())
            }
            other => other.map_err(CallbackError::from),
        }
    }
}

pub(crate) async fn handle_callback(q: CallbackQuery, cfg: ConfigParameters) -> ResponseResult<()> {
    cfg.machine.handle(&CallbackEvent::from_query(&q)).await;
    Ok(())
}
