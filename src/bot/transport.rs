//! Chat transport seam between the handlers and Telegram

use anyhow::{Context, Result};
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::FileId;
use tracing::debug;

/// Outbound primitives the handlers need from the chat platform
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send one plain-text message
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<()>;

    /// Download the raw bytes of an uploaded file
    async fn fetch_file(&self, file_id: &FileId) -> Result<Vec<u8>>;
}

/// `ChatTransport` backed by a teloxide `Bot`
#[derive(Clone)]
pub struct TelegramTransport {
    bot: Bot,
    http: reqwest::Client,
}

impl TelegramTransport {
    pub fn new(bot: Bot, http: reqwest::Client) -> Self {
        Self { bot, http }
    }

    fn file_url(&self, file_path: &str) -> String {
        format!(
            "{}/file/bot{}/{}",
            self.bot.api_url().as_str().trim_end_matches('/'),
            self.bot.token(),
            file_path
        )
    }
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<()> {
        self.bot.send_message(chat_id, text).await?;
        Ok(())
    }

    async fn fetch_file(&self, file_id: &FileId) -> Result<Vec<u8>> {
        let file = self
            .bot
            .get_file(file_id.clone())
            .await
            .context("Failed to resolve file path")?;

        let response = self
            .http
            .get(self.file_url(&file.path))
            .send()
            .await
            .context("Failed to download file")?
            .error_for_status()
            .context("File download rejected")?;
        let bytes = response.bytes().await?;

        debug!(file_path = %file.path, bytes = bytes.len(), "File downloaded");
        Ok(bytes.to_vec())
    }
}
