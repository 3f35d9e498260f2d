//! Builds chat-completion requests from a document and a question.
//!
//! Everything here is pure so the request shape can be checked without a
//! transport or a network call.

use serde::{Deserialize, Serialize};

use crate::config::InferenceConfig;

pub const SYSTEM_PROMPT: &str = "You are an assistant that answers based only on the provided PDF text. \
If the answer cannot be found, say 'I couldn't find that in the document.'";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// Body of a chat-completion call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
}

impl ChatRequest {
    /// Content of the first user message, if any
    pub fn user_content(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }
}

/// Wrap the document and question in the delimited user prompt
pub fn build_user_prompt(document_text: &str, question: &str) -> String {
    format!("DOCUMENT:\n---\n{document_text}\n---\n\nQUESTION:\n{question}")
}

/// Build the two-message (system + user) request for a question about a document
pub fn build_chat_request(config: &InferenceConfig, document_text: &str, question: &str) -> ChatRequest {
    ChatRequest {
        model: config.model.clone(),
        messages: vec![
            ChatMessage {
                role: Role::System,
                content: SYSTEM_PROMPT.to_string(),
            },
            ChatMessage {
                role: Role::User,
                content: build_user_prompt(document_text, question),
            },
        ],
        temperature: config.temperature,
    }
}

/// Join the words after `/ask` with single spaces
pub fn normalize_question(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}
