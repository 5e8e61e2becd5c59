use async_trait::async_trait;
use teloxide::{
    RequestError,
    prelude::*,
    types::{InlineKeyboardMarkup, MessageId, ParseMode},
};

/// The Telegram calls the bot makes, all HTML formatted.
#[async_trait]
pub trait ChatApi: Send + Sync {
    async fn answer_callback(&self, query_id: &str) -> Result<(), RequestError>;

    async fn edit_keyboard(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        markup: InlineKeyboardMarkup,
    ) -> Result<(), RequestError>;

    async fn edit_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        html: &str,
        markup: InlineKeyboardMarkup,
    ) -> Result<(), RequestError>;

    async fn send_message(
        &self,
        chat_id: ChatId,
        html: &str,
        markup: Option<InlineKeyboardMarkup>,
    ) -> Result<(), RequestError>;
}

/// [`ChatApi`] over the Bot API.
#[derive(Clone)]
pub struct TelegramChat {
    bot: Bot,
}

impl TelegramChat {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl ChatApi for TelegramChat {
    async fn answer_callback(&self, query_id: &str) -> Result<(), RequestError> {
        self.bot.answer_callback_query(teloxide::types::CallbackQueryId(query_id.to_string())).await?;
        Ok(())
    }

    async fn edit_keyboard(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        markup: InlineKeyboardMarkup,
    ) -> Result<(), RequestError> {
        self.bot
            .edit_message_reply_markup(chat_id, message_id)
            .reply_markup(markup)
            .await?;
        Ok(())
    }

    async fn edit_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        html: &str,
        markup: InlineKeyboardMarkup,
    ) -> Result<(), RequestError> {
        self.bot
            .edit_message_text(chat_id, message_id, html)
            .parse_mode(ParseMode::Html)
            .reply_markup(markup)
            .await?;
        Ok(())
    }

    async fn send_message(
        &self,
        chat_id: ChatId,
        html: &str,
        markup: Option<InlineKeyboardMarkup>,
    ) -> Result<(), RequestError> {
        let mut request = self.bot.send_message(chat_id, html).parse_mode(ParseMode::Html);
        if let Some(markup) = markup {
            request = request.reply_markup(markup);
        }
        request.await?;
        Ok(())
    }
}
