//! Bot module for handling Telegram interactions
//!
//! - `assistant`: upload, ask, start and help handlers over trait seams
//! - `commands`: slash command parsing
//! - `message_handler`: teloxide `Message` conversion and dispatcher endpoint
//! - `transport`: outbound send and file download

pub mod assistant;
pub mod commands;
pub mod message_handler;
pub mod transport;

// Re-export main handler functions for use in main.rs
pub use assistant::{AssistantSettings, PdfAssistant};
pub use message_handler::message_handler;
pub use transport::{ChatTransport, TelegramTransport};
