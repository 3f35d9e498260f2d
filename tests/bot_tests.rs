//! # Bot Handler Tests
//!
//! End-to-end handler scenarios against in-memory mocks of the chat
//! transport, the document extractor and the inference client.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use teloxide::types::{ChatId, FileId, UserId};

use readnova::bot::assistant::{InboundContent, InboundDocument, InboundMessage};
use readnova::bot::{AssistantSettings, ChatTransport, PdfAssistant};
use readnova::config::InferenceConfig;
use readnova::errors::{ExtractionError, InferenceError};
use readnova::inference::InferenceClient;
use readnova::localization::t_lang;
use readnova::pdf::DocumentExtractor;
use readnova::prompt::{ChatRequest, SYSTEM_PROMPT};
use readnova::session::{InMemorySessionStore, Session, SessionStore};

const CHAT: ChatId = ChatId(1001);
const USER: UserId = UserId(42);

/// Records outbound messages; files are served from a map of id -> bytes
#[derive(Default)]
struct MockTransport {
    sent: Mutex<Vec<(ChatId, String)>>,
    files: Mutex<HashMap<String, Vec<u8>>>,
    /// Fail the n-th send (1-based)
    fail_on_send: Option<usize>,
}

impl MockTransport {
    fn with_file(self, id: &str, bytes: &[u8]) -> Self {
        self.files.lock().unwrap().insert(id.to_string(), bytes.to_vec());
        self
    }

    fn texts(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|(_, t)| t.clone()).collect()
    }
}

#[async_trait]
impl ChatTransport for MockTransport {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<()> {
        let mut sent = self.sent.lock().unwrap();
        if self.fail_on_send == Some(sent.len() + 1) {
            anyhow::bail!("network down");
        }
        sent.push((chat_id, text.to_string()));
        Ok(())
    }

    async fn fetch_file(&self, file_id: &FileId) -> Result<Vec<u8>> {
        self.files
            .lock()
            .unwrap()
            .get(&file_id.0)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("file not found"))
    }
}

/// Treats the bytes as UTF-8 text; `%CORRUPT` fails like a broken PDF
struct MockExtractor;

#[async_trait]
impl DocumentExtractor for MockExtractor {
    async fn extract_text(&self, bytes: Vec<u8>) -> Result<String, ExtractionError> {
        if bytes.starts_with(b"%CORRUPT") {
            return Err(ExtractionError::InvalidPdf("xref table not found".to_string()));
        }
        String::from_utf8(bytes).map_err(|e| ExtractionError::InvalidPdf(e.to_string()))
    }
}

/// Returns a fixed answer (or error) and records every request
struct MockInference {
    answer: Result<String, InferenceError>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl MockInference {
    fn answering(answer: &str) -> Self {
        Self {
            answer: Ok(answer.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn failing(err: InferenceError) -> Self {
        Self {
            answer: Err(err),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl InferenceClient for MockInference {
    async fn complete(&self, request: &ChatRequest) -> Result<String, InferenceError> {
        self.requests.lock().unwrap().push(request.clone());
        self.answer.clone()
    }
}

struct Harness {
    transport: Arc<MockTransport>,
    inference: Arc<MockInference>,
    sessions: Arc<InMemorySessionStore>,
    assistant: PdfAssistant,
}

fn harness(transport: MockTransport, inference: MockInference) -> Harness {
    let transport = Arc::new(transport);
    let inference = Arc::new(inference);
    let sessions = Arc::new(InMemorySessionStore::default());
    let settings = AssistantSettings {
        inference: InferenceConfig::new("sk-test"),
        max_document_bytes: 1024 * 1024,
        message_limit: 4096,
        bot_username: Some("ReadNovaBot".to_string()),
    };
    let assistant = PdfAssistant::new(
        transport.clone(),
        Arc::new(MockExtractor),
        inference.clone(),
        sessions.clone(),
        settings,
    );
    Harness {
        transport,
        inference,
        sessions,
        assistant,
    }
}

fn text_message(text: &str) -> InboundMessage {
    InboundMessage {
        chat_id: CHAT,
        user_id: Some(USER),
        language_code: Some("en".to_string()),
        content: InboundContent::Text(text.to_string()),
    }
}

fn pdf_message(file_id: &str, size: u32) -> InboundMessage {
    InboundMessage {
        chat_id: CHAT,
        user_id: Some(USER),
        language_code: Some("en".to_string()),
        content: InboundContent::Document(InboundDocument {
            file_id: FileId(file_id.to_string()),
            file_name: Some(format!("{file_id}.pdf")),
            mime_type: Some("application/pdf".to_string()),
            size,
        }),
    }
}

fn en(key: &str) -> String {
    t_lang(key, Some("en"))
}

#[tokio::test]
async fn test_upload_then_ask_relays_answer() -> Result<()> {
    let pages: Vec<String> = (1..=10)
        .map(|page| {
            if page == 3 {
                "Page 3: Revenue grew 20%".to_string()
            } else {
                format!("Page {page}: filler text")
            }
        })
        .collect();
    let document = pages.join("\n\x0c");

    let h = harness(
        MockTransport::default().with_file("report", document.as_bytes()),
        MockInference::answering("Revenue grew by 20% year over year."),
    );

    h.assistant.handle(pdf_message("report", 2048)).await?;
    h.assistant
        .handle(text_message("/ask What happened to revenue?"))
        .await?;

    let requests = h.inference.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].messages[0].content, SYSTEM_PROMPT);
    let user_content = requests[0].user_content().unwrap();
    assert!(user_content.contains("Revenue grew 20%"));
    assert!(user_content.contains(&format!("DOCUMENT:\n---\n{document}\n---")));
    assert!(user_content.ends_with("QUESTION:\nWhat happened to revenue?"));

    assert_eq!(
        h.transport.texts(),
        vec![
            en("upload-reading"),
            en("upload-success"),
            en("ask-thinking"),
            "Revenue grew by 20% year over year.".to_string(),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_ask_without_document_never_calls_inference() -> Result<()> {
    let h = harness(MockTransport::default(), MockInference::answering("unused"));

    h.assistant.handle(text_message("/ask anything")).await?;

    assert!(h.inference.requests().is_empty());
    assert_eq!(h.transport.texts(), vec![en("ask-no-document")]);
    Ok(())
}

#[tokio::test]
async fn test_ask_without_question_shows_usage() -> Result<()> {
    let h = harness(MockTransport::default(), MockInference::answering("unused"));
    h.sessions.put(USER, Session::new("some text".to_string(), None));

    h.assistant.handle(text_message("/ask")).await?;
    h.assistant.handle(text_message("/ask    ")).await?;

    assert!(h.inference.requests().is_empty());
    assert_eq!(h.transport.texts(), vec![en("ask-usage"), en("ask-usage")]);
    Ok(())
}

#[tokio::test]
async fn test_missing_document_is_checked_before_question() -> Result<()> {
    let h = harness(MockTransport::default(), MockInference::answering("unused"));

    h.assistant.handle(text_message("/ask")).await?;

    assert_eq!(h.transport.texts(), vec![en("ask-no-document")]);
    Ok(())
}

#[tokio::test]
async fn test_second_upload_replaces_first() -> Result<()> {
    let h = harness(
        MockTransport::default()
            .with_file("first", b"Alpha document")
            .with_file("second", b"Beta document"),
        MockInference::answering("ok"),
    );

    h.assistant.handle(pdf_message("first", 100)).await?;
    h.assistant.handle(pdf_message("second", 100)).await?;
    h.assistant.handle(text_message("/ask which one?")).await?;

    let requests = h.inference.requests();
    let user_content = requests[0].user_content().unwrap();
    assert!(user_content.contains("Beta document"));
    assert!(!user_content.contains("Alpha document"));
    Ok(())
}

#[tokio::test]
async fn test_corrupt_upload_keeps_previous_session() -> Result<()> {
    let h = harness(
        MockTransport::default()
            .with_file("good", b"Original text")
            .with_file("bad", b"%CORRUPT bytes"),
        MockInference::answering("ok"),
    );

    h.assistant.handle(pdf_message("good", 100)).await?;
    h.assistant.handle(pdf_message("bad", 100)).await?;

    assert_eq!(h.sessions.get(USER).unwrap().document_text, "Original text");
    let texts = h.transport.texts();
    assert_eq!(texts.last().unwrap(), &en("upload-failed"));

    // Still usable for a retry
    h.assistant.handle(text_message("/ask still there?")).await?;
    assert_eq!(h.inference.requests().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_download_failure_reports_generic_message() -> Result<()> {
    let h = harness(MockTransport::default(), MockInference::answering("ok"));

    h.assistant.handle(pdf_message("missing", 100)).await?;

    assert!(h.sessions.get(USER).is_none());
    assert_eq!(
        h.transport.texts(),
        vec![en("upload-reading"), en("upload-failed")]
    );
    Ok(())
}

#[tokio::test]
async fn test_blank_pdf_does_not_overwrite_session() -> Result<()> {
    let h = harness(
        MockTransport::default()
            .with_file("good", b"Original text")
            .with_file("blank", b"  \n\x0c\n "),
        MockInference::answering("ok"),
    );

    h.assistant.handle(pdf_message("good", 100)).await?;
    h.assistant.handle(pdf_message("blank", 100)).await?;

    assert_eq!(h.sessions.get(USER).unwrap().document_text, "Original text");
    assert_eq!(h.transport.texts().last().unwrap(), &en("upload-no-text"));
    Ok(())
}

#[tokio::test]
async fn test_oversized_pdf_is_rejected_before_download() -> Result<()> {
    let h = harness(
        MockTransport::default().with_file("huge", b"Huge text"),
        MockInference::answering("ok"),
    );

    h.assistant.handle(pdf_message("huge", 5 * 1024 * 1024)).await?;

    assert!(h.sessions.get(USER).is_none());
    let texts = h.transport.texts();
    assert_eq!(texts.len(), 1);
    assert!(texts[0].contains("5.0"));
    assert!(texts[0].contains("1.0"));
    Ok(())
}

#[tokio::test]
async fn test_inference_failure_keeps_document() -> Result<()> {
    let h = harness(
        MockTransport::default(),
        MockInference::failing(InferenceError::Status {
            status: 429,
            body: "rate limited".to_string(),
        }),
    );
    h.sessions.put(USER, Session::new("Stored text".to_string(), None));

    h.assistant.handle(text_message("/ask what now?")).await?;

    assert_eq!(
        h.transport.texts(),
        vec![en("ask-thinking"), en("ask-failed")]
    );
    assert_eq!(h.sessions.get(USER).unwrap().document_text, "Stored text");
    Ok(())
}

#[tokio::test]
async fn test_long_answer_is_split_in_order() -> Result<()> {
    let answer = format!("{}{}{}", "a".repeat(4096), "b".repeat(4096), "c".repeat(10));
    let h = harness(MockTransport::default(), MockInference::answering(&answer));
    h.sessions.put(USER, Session::new("Stored text".to_string(), None));

    h.assistant.handle(text_message("/ask long please")).await?;

    let texts = h.transport.texts();
    assert_eq!(texts.len(), 4);
    assert_eq!(texts[1], "a".repeat(4096));
    assert_eq!(texts[2], "b".repeat(4096));
    assert_eq!(texts[3], "c".repeat(10));
    assert_eq!(texts[1..].concat(), answer);
    Ok(())
}

#[tokio::test]
async fn test_whitespace_only_slice_is_not_sent() -> Result<()> {
    let answer = format!("{}\n\n", "a".repeat(4096));
    let h = harness(MockTransport::default(), MockInference::answering(&answer));
    h.sessions.put(USER, Session::new("Stored text".to_string(), None));

    h.assistant.handle(text_message("/ask trailing newlines")).await?;

    assert_eq!(
        h.transport.texts(),
        vec![en("ask-thinking"), "a".repeat(4096)]
    );
    Ok(())
}

#[tokio::test]
async fn test_relay_aborts_after_failed_slice() {
    let answer = "x".repeat(4096 * 3);
    // Sends: 1 = thinking, 2 = first slice, 3 = second slice fails
    let transport = MockTransport {
        fail_on_send: Some(3),
        ..Default::default()
    };
    let h = harness(transport, MockInference::answering(&answer));
    h.sessions.put(USER, Session::new("Stored text".to_string(), None));

    let result = h.assistant.handle(text_message("/ask go")).await;

    assert!(result.is_err());
    assert_eq!(h.transport.texts().len(), 2);
    assert_eq!(h.sessions.get(USER).unwrap().document_text, "Stored text");
}

#[tokio::test]
async fn test_sessions_are_per_user() -> Result<()> {
    let h = harness(
        MockTransport::default().with_file("mine", b"User 42 text"),
        MockInference::answering("ok"),
    );
    h.assistant.handle(pdf_message("mine", 100)).await?;

    let other_user = InboundMessage {
        user_id: Some(UserId(7)),
        ..text_message("/ask whose document?")
    };
    h.assistant.handle(other_user).await?;

    assert!(h.inference.requests().is_empty());
    assert_eq!(h.transport.texts().last().unwrap(), &en("ask-no-document"));
    Ok(())
}

#[tokio::test]
async fn test_ignored_inputs_send_nothing() -> Result<()> {
    let h = harness(MockTransport::default(), MockInference::answering("ok"));

    h.assistant.handle(text_message("just chatting")).await?;
    h.assistant.handle(text_message("/ask@OtherBot hello")).await?;
    h.assistant
        .handle(InboundMessage {
            content: InboundContent::Document(InboundDocument {
                file_id: FileId("img".to_string()),
                file_name: Some("photo.png".to_string()),
                mime_type: Some("image/png".to_string()),
                size: 10,
            }),
            ..text_message("")
        })
        .await?;
    h.assistant
        .handle(InboundMessage {
            content: InboundContent::Other,
            ..text_message("")
        })
        .await?;
    h.assistant
        .handle(InboundMessage {
            user_id: None,
            ..text_message("/start")
        })
        .await?;

    assert!(h.transport.texts().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_start_and_help_are_localized() -> Result<()> {
    let h = harness(MockTransport::default(), MockInference::answering("ok"));

    h.assistant.handle(text_message("/start")).await?;
    h.assistant
        .handle(InboundMessage {
            language_code: Some("fr-FR".to_string()),
            ..text_message("/help@ReadNovaBot")
        })
        .await?;

    let texts = h.transport.texts();
    assert!(texts[0].starts_with(&en("welcome-title")));
    assert!(texts[0].contains("/ask"));
    assert!(texts[1].starts_with(&t_lang("help-title", Some("fr"))));
    assert_ne!(t_lang("help-title", Some("fr")), en("help-title"));
    Ok(())
}
