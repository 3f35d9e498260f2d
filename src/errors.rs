//! # Error Types Module
//!
//! This module defines the error types returned by document extraction and
//! inference. Handlers log them with context and map every variant to a
//! single generic reply.

/// Errors raised while fetching or extracting a document
#[derive(Debug, Clone)]
pub enum ExtractionError {
    /// The file could not be downloaded from the chat platform
    Download(String),
    /// The bytes do not carry a PDF header
    NotPdf,
    /// The PDF parser rejected the bytes
    InvalidPdf(String),
    /// The extraction worker failed or panicked
    Worker(String),
}

impl std::fmt::Display for ExtractionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractionError::Download(msg) => write!(f, "Download error: {msg}"),
            ExtractionError::NotPdf => write!(f, "Not a PDF: missing %PDF- header"),
            ExtractionError::InvalidPdf(msg) => write!(f, "Invalid PDF: {msg}"),
            ExtractionError::Worker(msg) => write!(f, "Extraction worker error: {msg}"),
        }
    }
}

impl std::error::Error for ExtractionError {}

impl From<anyhow::Error> for ExtractionError {
    fn from(err: anyhow::Error) -> Self {
        ExtractionError::Download(err.to_string())
    }
}

/// Errors raised by the inference client
#[derive(Debug, Clone)]
pub enum InferenceError {
    /// Transport-level failure (connect, timeout, TLS)
    Http(String),
    /// Provider answered with a non-success status
    Status { status: u16, body: String },
    /// Response body did not match the chat-completion shape
    MalformedResponse(String),
    /// Response carried no answer text
    EmptyAnswer,
    /// Calls are suspended after repeated failures
    CircuitOpen,
}

impl std::fmt::Display for InferenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InferenceError::Http(msg) => write!(f, "HTTP error: {msg}"),
            InferenceError::Status { status, body } => {
                write!(f, "Provider returned status {status}: {body}")
            }
            InferenceError::MalformedResponse(msg) => write!(f, "Malformed response: {msg}"),
            InferenceError::EmptyAnswer => write!(f, "Provider returned an empty answer"),
            InferenceError::CircuitOpen => {
                write!(f, "Inference temporarily disabled after repeated failures")
            }
        }
    }
}

impl std::error::Error for InferenceError {}

impl From<reqwest::Error> for InferenceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            InferenceError::MalformedResponse(err.to_string())
        } else {
            InferenceError::Http(err.to_string())
        }
    }
}
