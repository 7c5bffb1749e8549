use async_trait::async_trait;
use teloxide::{prelude::*, types::ChatId};
use tracing::{debug, warn};

use common::{Error, NotificationMessage, NotificationSink, Result};

use crate::format::plain_text;
use crate::split::split_body;

/// Telegram message text limit.
pub const TELEGRAM_TEXT_MAX: usize = 4096;

/// Sends alerts as plain-text bot messages to every configured chat.
pub struct TelegramSink {
    bot: Bot,
    chat_ids: Vec<ChatId>,
}

impl TelegramSink {
    pub fn new(token: impl Into<String>, chat_ids: &[i64]) -> Result<Self> {
        if chat_ids.is_empty() {
            return Err(Error::Config(
                "TELEGRAM_TOKEN is set but TELEGRAM_CHAT_IDS is empty".to_string(),
            ));
        }
        Ok(Self {
            bot: Bot::new(token.into()),
            chat_ids: chat_ids.iter().map(|&id| ChatId(id)).collect(),
        })
    }
}

#[async_trait]
impl NotificationSink for TelegramSink {
    /// A chat that rejects a message is logged and skipped; the delivery
    /// fails only when no chat received any part.
    async fn deliver(&self, message: &NotificationMessage) -> Result<()> {
        let chunks = split_body(&plain_text(message), TELEGRAM_TEXT_MAX);
        let mut sent = 0usize;
        let mut last_error = None;

        for &chat_id in &self.chat_ids {
            for chunk in &chunks {
                match self.bot.send_message(chat_id, chunk.as_str()).await {
                    Ok(_) => sent += 1,
                    Err(e) => {
                        warn!(chat_id = ?chat_id, error = %e, "Failed to send Telegram alert");
                        last_error = Some(e.to_string());
                        break;
                    }
                }
            }
        }

        debug!(title = %message.title, sent, "Telegram delivery finished");
        match (sent, last_error) {
            (0, Some(e)) => Err(Error::NotificationDelivery(format!("telegram: {e}"))),
            _ => Ok(()),
        }
    }
}
