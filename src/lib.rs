//! # ReadNova Telegram Bot
//!
//! A Telegram bot that extracts the text of an uploaded PDF and answers
//! questions about it through a hosted chat-completion model.

pub mod bot;
pub mod circuit_breaker;
pub mod config;
pub mod errors;
pub mod inference;
pub mod localization;
pub mod logging;
pub mod pdf;
pub mod prompt;
pub mod relay;
pub mod session;
