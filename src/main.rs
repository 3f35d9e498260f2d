use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use teloxide::prelude::*;
use teloxide::types::BotCommand;
use tracing::{debug, error, info, warn};

use readnova::bot::commands::COMMAND_MENU;
use readnova::bot::{self, AssistantSettings, PdfAssistant, TelegramTransport};
use readnova::circuit_breaker::CircuitBreaker;
use readnova::config::{BotConfig, LogFormat};
use readnova::inference::{GuardedInferenceClient, OpenAiCompatibleClient};
use readnova::localization::t_lang;
use readnova::logging::init_tracing;
use readnova::pdf::PdfTextExtractor;
use readnova::session::InMemorySessionStore;

/// Pause before exiting after a crash so a supervisor restart does not spin
const CRASH_PAUSE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let log_format = LogFormat::from_env();
    init_tracing(log_format.as_ref().copied().unwrap_or_default())?;
    if let Err(e) = &log_format {
        warn!(error = ?e, "Falling back to text log output");
    }

    info!("Starting ReadNova Telegram Bot");

    if let Err(e) = run().await {
        error!(error = ?e, "Bot crashed");
        tokio::time::sleep(CRASH_PAUSE).await;
        return Err(e);
    }

    info!("Bot stopped");
    Ok(())
}

async fn run() -> Result<()> {
    let config = BotConfig::from_env()?;
    info!(config = ?config, "Configuration loaded");

    let http = teloxide::net::default_reqwest_settings()
        .timeout(config.telegram_timeout())
        .build()
        .context("Failed to build Telegram HTTP client")?;
    let bot = Bot::with_client(config.bot_token.clone(), http.clone());

    let me = bot
        .get_me()
        .await
        .context("Failed to authenticate with Telegram")?;
    let bot_username = me.user.username.clone();
    info!(username = ?bot_username, "Authenticated with Telegram");

    let commands: Vec<BotCommand> = COMMAND_MENU
        .iter()
        .map(|(name, key)| BotCommand::new(*name, t_lang(key, None)))
        .collect();
    if let Err(e) = bot.set_my_commands(commands).await {
        warn!(error = %e, "Failed to register command menu");
    }

    let inference = GuardedInferenceClient::new(
        OpenAiCompatibleClient::new(&config.inference)?,
        CircuitBreaker::new(config.recovery.clone()),
    );

    let assistant = Arc::new(PdfAssistant::new(
        Arc::new(TelegramTransport::new(bot.clone(), http)),
        Arc::new(PdfTextExtractor),
        Arc::new(inference),
        Arc::new(InMemorySessionStore::new(config.session.clone())),
        AssistantSettings::from_config(&config, bot_username),
    ));

    info!("Bot initialized, starting dispatcher");

    // Updates of one chat are handled in order; different chats run concurrently
    let handler = Update::filter_message().endpoint({
        let assistant = Arc::clone(&assistant);
        move |msg: Message| {
            let assistant = Arc::clone(&assistant);
            async move { bot::message_handler(msg, assistant).await }
        }
    });

    Dispatcher::builder(bot, handler)
        .default_handler(|update| async move {
            debug!(update_id = ?update.id, "Ignoring non-message update");
        })
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
