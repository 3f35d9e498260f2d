//! Upload and question handling, independent of the teloxide dispatcher

use anyhow::Result;
use std::sync::Arc;
use teloxide::types::{ChatId, FileId, UserId};
use tracing::{debug, error, info, warn};

use crate::config::{BotConfig, InferenceConfig};
use crate::errors::ExtractionError;
use crate::inference::InferenceClient;
use crate::localization::{t_args_lang, t_lang};
use crate::pdf::{is_pdf_mime, DocumentExtractor};
use crate::prompt::{build_chat_request, normalize_question};
use crate::relay::relay_answer;
use crate::session::{Session, SessionStore};

use super::commands::{parse_command, Command};
use super::transport::ChatTransport;

/// An uploaded document as announced by the chat platform
#[derive(Debug, Clone)]
pub struct InboundDocument {
    pub file_id: FileId,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
    pub size: u32,
}

#[derive(Debug, Clone)]
pub enum InboundContent {
    Text(String),
    Document(InboundDocument),
    Other,
}

/// A chat message reduced to what the handlers need
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub chat_id: ChatId,
    pub user_id: Option<UserId>,
    pub language_code: Option<String>,
    pub content: InboundContent,
}

/// Settings the handlers read on every update
#[derive(Debug, Clone)]
pub struct AssistantSettings {
    pub inference: InferenceConfig,
    pub max_document_bytes: u32,
    pub message_limit: usize,
    /// Own username, used to ignore commands addressed to other bots
    pub bot_username: Option<String>,
}

impl AssistantSettings {
    pub fn from_config(config: &BotConfig, bot_username: Option<String>) -> Self {
        Self {
            inference: config.inference.clone(),
            max_document_bytes: config.max_document_bytes,
            message_limit: config.message_limit,
            bot_username,
        }
    }
}

/// Answers questions about each user's last uploaded PDF
pub struct PdfAssistant {
    transport: Arc<dyn ChatTransport>,
    extractor: Arc<dyn DocumentExtractor>,
    inference: Arc<dyn InferenceClient>,
    sessions: Arc<dyn SessionStore>,
    settings: AssistantSettings,
}

impl PdfAssistant {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        extractor: Arc<dyn DocumentExtractor>,
        inference: Arc<dyn InferenceClient>,
        sessions: Arc<dyn SessionStore>,
        settings: AssistantSettings,
    ) -> Self {
        Self {
            transport,
            extractor,
            inference,
            sessions,
            settings,
        }
    }

    /// Route one inbound message to its handler
    pub async fn handle(&self, msg: InboundMessage) -> Result<()> {
        let language_code = msg.language_code.as_deref();

        let Some(user_id) = msg.user_id else {
            debug!(chat_id = %msg.chat_id, "Ignoring message without a sender");
            return Ok(());
        };

        match msg.content {
            InboundContent::Text(text) => {
                match parse_command(&text, self.settings.bot_username.as_deref()) {
                    Some(Command::Start) => self.handle_start(msg.chat_id, language_code).await,
                    Some(Command::Help) => self.handle_help(msg.chat_id, language_code).await,
                    Some(Command::Ask(question)) => {
                        self.handle_ask(msg.chat_id, user_id, &question, language_code)
                            .await
                    }
                    None => {
                        debug!(chat_id = %msg.chat_id, "Ignoring non-command text");
                        Ok(())
                    }
                }
            }
            InboundContent::Document(document) => {
                if is_pdf_mime(document.mime_type.as_deref()) {
                    self.handle_document(msg.chat_id, user_id, document, language_code)
                        .await
                } else {
                    debug!(
                        chat_id = %msg.chat_id,
                        mime_type = ?document.mime_type,
                        "Ignoring non-PDF document"
                    );
                    Ok(())
                }
            }
            InboundContent::Other => {
                debug!(chat_id = %msg.chat_id, "Ignoring unsupported message type");
                Ok(())
            }
        }
    }

    pub async fn handle_start(&self, chat_id: ChatId, language_code: Option<&str>) -> Result<()> {
        let welcome_message = format!(
            "{}\n\n{}",
            t_lang("welcome-title", language_code),
            t_lang("welcome-description", language_code)
        );
        self.transport.send_text(chat_id, &welcome_message).await
    }

    pub async fn handle_help(&self, chat_id: ChatId, language_code: Option<&str>) -> Result<()> {
        let help_message = format!(
            "{}\n{}\n{}\n{}\n\n{}",
            t_lang("help-title", language_code),
            t_lang("help-step1", language_code),
            t_lang("help-step2", language_code),
            t_lang("help-step3", language_code),
            t_lang("help-final", language_code)
        );
        self.transport.send_text(chat_id, &help_message).await
    }

    /// Extract an uploaded PDF and make it the user's current document
    ///
    /// Any download or extraction failure leaves the previous session intact.
    pub async fn handle_document(
        &self,
        chat_id: ChatId,
        user_id: UserId,
        document: InboundDocument,
        language_code: Option<&str>,
    ) -> Result<()> {
        if document.size > self.settings.max_document_bytes {
            warn!(
                user_id = user_id.0,
                size = document.size,
                limit = self.settings.max_document_bytes,
                "Rejected oversized PDF"
            );
            let size_mb = format_megabytes(document.size);
            let limit_mb = format_megabytes(self.settings.max_document_bytes);
            let message = t_args_lang(
                "upload-too-large",
                &[("size_mb", size_mb.as_str()), ("limit_mb", limit_mb.as_str())],
                language_code,
            );
            return self.transport.send_text(chat_id, &message).await;
        }

        self.transport
            .send_text(chat_id, &t_lang("upload-reading", language_code))
            .await?;

        let extracted: Result<String, ExtractionError> = async {
            let bytes = self
                .transport
                .fetch_file(&document.file_id)
                .await
                .map_err(ExtractionError::from)?;
            debug!(user_id = user_id.0, bytes = bytes.len(), "PDF downloaded");
            self.extractor.extract_text(bytes).await
        }
        .await;

        let text = match extracted {
            Ok(text) => text,
            Err(e) => {
                error!(
                    user_id = user_id.0,
                    file_name = ?document.file_name,
                    error = %e,
                    "PDF processing error"
                );
                return self
                    .transport
                    .send_text(chat_id, &t_lang("upload-failed", language_code))
                    .await;
            }
        };

        let session = Session::new(text, document.file_name);
        if !session.has_text() {
            warn!(user_id = user_id.0, "PDF contained no extractable text");
            return self
                .transport
                .send_text(chat_id, &t_lang("upload-no-text", language_code))
                .await;
        }

        info!(
            user_id = user_id.0,
            chars_extracted = session.document_text.chars().count(),
            "Extracted text from PDF"
        );
        self.sessions.put(user_id, session);

        self.transport
            .send_text(chat_id, &t_lang("upload-success", language_code))
            .await
    }

    /// Answer a question about the user's current document
    pub async fn handle_ask(
        &self,
        chat_id: ChatId,
        user_id: UserId,
        raw_question: &str,
        language_code: Option<&str>,
    ) -> Result<()> {
        let Some(session) = self.sessions.get(user_id).filter(Session::has_text) else {
            return self
                .transport
                .send_text(chat_id, &t_lang("ask-no-document", language_code))
                .await;
        };

        let question = normalize_question(raw_question);
        if question.is_empty() {
            return self
                .transport
                .send_text(chat_id, &t_lang("ask-usage", language_code))
                .await;
        }

        self.transport
            .send_text(chat_id, &t_lang("ask-thinking", language_code))
            .await?;

        let request = build_chat_request(&self.settings.inference, &session.document_text, &question);
        debug!(
            user_id = user_id.0,
            question_chars = question.chars().count(),
            prompt_chars = request.user_content().map(|c| c.chars().count()).unwrap_or(0),
            "Submitting question"
        );

        let answer = match self.inference.complete(&request).await {
            Ok(answer) => answer,
            Err(e) => {
                error!(user_id = user_id.0, error = %e, "AI error");
                return self
                    .transport
                    .send_text(chat_id, &t_lang("ask-failed", language_code))
                    .await;
            }
        };

        let sent = relay_answer(
            self.transport.as_ref(),
            chat_id,
            &answer,
            self.settings.message_limit,
        )
        .await?;
        info!(
            user_id = user_id.0,
            answer_chars = answer.chars().count(),
            messages = sent,
            "Answer delivered"
        );
        Ok(())
    }
}

fn format_megabytes(bytes: u32) -> String {
    format!("{:.1}", bytes as f64 / (1024.0 * 1024.0))
}
