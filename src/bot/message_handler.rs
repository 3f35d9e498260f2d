//! Message Handler module: converts teloxide messages for the assistant

use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;

use super::assistant::{InboundContent, InboundDocument, InboundMessage, PdfAssistant};

/// Reduce a Telegram message to the transport-neutral form
pub fn to_inbound(msg: &Message) -> InboundMessage {
    let content = if let Some(text) = msg.text() {
        InboundContent::Text(text.to_string())
    } else if let Some(doc) = msg.document() {
        InboundContent::Document(InboundDocument {
            file_id: doc.file.id.clone(),
            file_name: doc.file_name.clone(),
            mime_type: doc.mime_type.as_ref().map(|m| m.to_string()),
            size: doc.file.size,
        })
    } else {
        InboundContent::Other
    };

    InboundMessage {
        chat_id: msg.chat.id,
        user_id: msg.from.as_ref().map(|user| user.id),
        language_code: msg
            .from
            .as_ref()
            .and_then(|user| user.language_code.clone()),
        content,
    }
}

pub async fn message_handler(msg: Message, assistant: Arc<PdfAssistant>) -> Result<()> {
    assistant.handle(to_inbound(&msg)).await
}
