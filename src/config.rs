//! # Configuration Module
//!
//! This module defines the configuration structures for the bot: Telegram
//! access, the inference provider, session retention and failure recovery.
//! Values come from the process environment (optionally seeded from `.env`).

use anyhow::{anyhow, Context, Result};
use std::str::FromStr;
use std::time::Duration;

// Constants for bot configuration
pub const DEFAULT_MODEL: &str = "meta-llama/llama-3-8b-instruct:free";
pub const DEFAULT_API_BASE: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_TEMPERATURE: f32 = 0.5;
pub const DEFAULT_AI_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_TELEGRAM_TIMEOUT_SECS: u64 = 30;
/// Long polling waits 10s per request, the HTTP timeout must outlast it
pub const MIN_TELEGRAM_TIMEOUT_SECS: u64 = 15;
pub const TELEGRAM_MESSAGE_LIMIT: usize = 4096;
pub const MAX_DOCUMENT_BYTES: u32 = 20 * 1024 * 1024; // Bot API download limit
/// Largest session TTL chrono can represent as a `TimeDelta`
pub const MAX_SESSION_TTL_SECS: u64 = i64::MAX as u64 / 1000;

/// Recovery configuration for inference failures
#[derive(Debug, Clone)]
pub struct RecoveryConfig {
    /// Consecutive failures before the circuit opens
    pub circuit_breaker_threshold: u32,
    /// Time before an open circuit lets calls through again, in seconds
    pub circuit_breaker_reset_secs: u64,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            circuit_breaker_threshold: 5,
            circuit_breaker_reset_secs: 60, // 1 minute
        }
    }
}

/// Settings for the chat-completion provider
#[derive(Clone)]
pub struct InferenceConfig {
    pub api_key: String,
    pub api_base: String,
    pub model: String,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl InferenceConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            timeout_secs: DEFAULT_AI_TIMEOUT_SECS,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl std::fmt::Debug for InferenceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceConfig")
            .field("api_key", &mask_secret(&self.api_key))
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Retention policy for per-user sessions. `None` means unbounded.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    pub ttl_secs: Option<u64>,
    pub capacity: Option<usize>,
}

/// Output format of the tracing subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(anyhow!("unknown log format '{other}' (expected text or json)")),
        }
    }
}

impl LogFormat {
    /// Read `LOG_FORMAT` on its own so logging can start before the full config loads
    pub fn from_env() -> Result<Self> {
        Self::from_setting(std::env::var("LOG_FORMAT").ok().as_deref())
    }

    /// Parse an optional setting; unset or blank means text
    pub fn from_setting(raw: Option<&str>) -> Result<Self> {
        match raw.map(str::trim).filter(|v| !v.is_empty()) {
            Some(value) => value.parse::<Self>().context("Invalid LOG_FORMAT"),
            None => Ok(Self::default()),
        }
    }
}

/// Configuration structure for the whole bot
#[derive(Clone)]
pub struct BotConfig {
    /// Telegram bot token
    pub bot_token: String,
    /// HTTP timeout for Telegram requests in seconds
    pub telegram_timeout_secs: u64,
    /// Largest document accepted for extraction, in bytes
    pub max_document_bytes: u32,
    /// Per-message character limit used when relaying answers
    pub message_limit: usize,
    pub inference: InferenceConfig,
    pub session: SessionConfig,
    pub recovery: RecoveryConfig,
}

impl std::fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotConfig")
            .field("bot_token", &mask_secret(&self.bot_token))
            .field("telegram_timeout_secs", &self.telegram_timeout_secs)
            .field("max_document_bytes", &self.max_document_bytes)
            .field("message_limit", &self.message_limit)
            .field("inference", &self.inference)
            .field("session", &self.session)
            .field("recovery", &self.recovery)
            .finish()
    }
}

impl BotConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let bot_token = value("BOT_KEY").ok_or_else(|| anyhow!("BOT_KEY must be set"))?;
        let api_key = value("AI_MODEL_KEY").ok_or_else(|| anyhow!("AI_MODEL_KEY must be set"))?;

        let mut inference = InferenceConfig::new(api_key);
        if let Some(model) = value("AI_MODEL") {
            inference.model = model;
        }
        if let Some(base) = value("AI_API_BASE") {
            inference.api_base = base.trim_end_matches('/').to_string();
        }
        if let Some(temperature) = parse_optional::<f32>(value("AI_TEMPERATURE"), "AI_TEMPERATURE")? {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(anyhow!("AI_TEMPERATURE must be between 0.0 and 2.0, got {temperature}"));
            }
            inference.temperature = temperature;
        }
        if let Some(timeout) = parse_optional::<u64>(value("AI_TIMEOUT_SECS"), "AI_TIMEOUT_SECS")? {
            inference.timeout_secs = timeout;
        }

        let recovery_defaults = RecoveryConfig::default();
        let recovery = RecoveryConfig {
            circuit_breaker_threshold: parse_optional(
                value("CIRCUIT_BREAKER_THRESHOLD"),
                "CIRCUIT_BREAKER_THRESHOLD",
            )?
            .unwrap_or(recovery_defaults.circuit_breaker_threshold),
            circuit_breaker_reset_secs: parse_optional(
                value("CIRCUIT_BREAKER_RESET_SECS"),
                "CIRCUIT_BREAKER_RESET_SECS",
            )?
            .unwrap_or(recovery_defaults.circuit_breaker_reset_secs),
        };

        let session = SessionConfig {
            ttl_secs: parse_optional(value("SESSION_TTL_SECS"), "SESSION_TTL_SECS")?,
            capacity: parse_optional(value("SESSION_CAPACITY"), "SESSION_CAPACITY")?,
        };
        if let Some(ttl) = session.ttl_secs {
            if ttl > MAX_SESSION_TTL_SECS {
                return Err(anyhow!(
                    "SESSION_TTL_SECS must be at most {MAX_SESSION_TTL_SECS}, got {ttl}"
                ));
            }
        }
        if session.capacity == Some(0) {
            return Err(anyhow!("SESSION_CAPACITY must be greater than zero"));
        }

        let telegram_timeout_secs =
            parse_optional(value("TELEGRAM_TIMEOUT_SECS"), "TELEGRAM_TIMEOUT_SECS")?
                .unwrap_or(DEFAULT_TELEGRAM_TIMEOUT_SECS);
        if telegram_timeout_secs < MIN_TELEGRAM_TIMEOUT_SECS {
            return Err(anyhow!(
                "TELEGRAM_TIMEOUT_SECS must be at least {MIN_TELEGRAM_TIMEOUT_SECS}, got {telegram_timeout_secs}"
            ));
        }

        Ok(Self {
            bot_token,
            telegram_timeout_secs,
            max_document_bytes: parse_optional(value("MAX_DOCUMENT_BYTES"), "MAX_DOCUMENT_BYTES")?
                .unwrap_or(MAX_DOCUMENT_BYTES),
            message_limit: TELEGRAM_MESSAGE_LIMIT,
            inference,
            session,
            recovery,
        })
    }

    pub fn telegram_timeout(&self) -> Duration {
        Duration::from_secs(self.telegram_timeout_secs)
    }
}

fn parse_optional<T>(raw: Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.map(|v| {
        v.parse::<T>()
            .map_err(|e| anyhow!("Invalid value '{v}' for {key}: {e}"))
    })
    .transpose()
}

/// Mask a secret for logs, keeping at most four characters on each end
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}…{tail}")
}
