use async_trait::async_trait;
use teloxide::payloads::{EditMessageTextSetters, SendMessageSetters};
use teloxide::prelude::*;
use teloxide::types::{
    ChatAction, InlineKeyboardButton, InlineKeyboardMarkup, MessageId, ParseMode,
};

use crate::domain::{ports::ChatTransport, Button, DomainError, PromptRef, Reply, TextFormat};

pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

fn parse_mode(format: TextFormat) -> Option<ParseMode> {
    match format {
        TextFormat::Plain => None,
        TextFormat::Html => Some(ParseMode::Html),
        TextFormat::MarkdownV2 => Some(ParseMode::MarkdownV2),
    }
}

/// One button per row.
fn keyboard(buttons: &[Button]) -> Option<InlineKeyboardMarkup> {
    if buttons.is_empty() {
        return None;
    }
    let rows = buttons
        .iter()
        .map(|b| vec![InlineKeyboardButton::callback(b.label.clone(), b.action.as_str())]);
    Some(InlineKeyboardMarkup::new(rows))
}

fn transport_error(e: teloxide::RequestError) -> DomainError {
    DomainError::transport(e.to_string())
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn send(&self, chat_id: i64, reply: Reply) -> Result<(), DomainError> {
        let mut request = self.bot.send_message(ChatId(chat_id), reply.text);
        if let Some(mode) = parse_mode(reply.format) {
            request = request.parse_mode(mode);
        }
        if let Some(markup) = keyboard(&reply.buttons) {
            request = request.reply_markup(markup);
        }
        request.await.map_err(transport_error)?;
        Ok(())
    }

    async fn edit(&self, chat_id: i64, prompt: PromptRef, reply: Reply) -> Result<(), DomainError> {
        let mut request =
            self.bot
                .edit_message_text(ChatId(chat_id), MessageId(prompt.0), reply.text);
        if let Some(mode) = parse_mode(reply.format) {
            request = request.parse_mode(mode);
        }
        if let Some(markup) = keyboard(&reply.buttons) {
            request = request.reply_markup(markup);
        }
        request.await.map_err(transport_error)?;
        Ok(())
    }

    async fn delete(&self, chat_id: i64, prompt: PromptRef) -> Result<(), DomainError> {
        self.bot
            .delete_message(ChatId(chat_id), MessageId(prompt.0))
            .await
            .map_err(transport_error)?;
        Ok(())
    }

    async fn typing(&self, chat_id: i64) -> Result<(), DomainError> {
        self.bot
            .send_chat_action(ChatId(chat_id), ChatAction::Typing)
            .await
            .map_err(transport_error)?;
        Ok(())
    }
}
