//! Component factory: builds the bot's shared components from config. Keeps assembly out of the runner.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::FixedOffset;
use handler_chain::HandlerChain;
use pbot_core::Bot;
use pbot_telegram::TelegramBotAdapter;
use reqwest::Client as HttpClient;
use storage::UserRepository;
use tracing::{error, info, instrument};

use crate::clock::Clock;
use crate::commands::{
    BroadcastCommand, CommandRouter, NextCommand, StartCommand, StopCommand, TodayCommand,
    TomorrowCommand,
};
use crate::config::BotConfig;
use crate::handlers::LoggingHandler;
use crate::oauth::OAuthClient;
use crate::scheduler::ReminderScheduler;
use crate::timetable::{HttpTimetableSource, TimetableCache, TimetableSource};

/// Shared dependencies of the command handlers and the reminder scheduler.
#[derive(Clone)]
pub struct BotComponents {
    pub repo: Arc<UserRepository>,
    pub bot: Arc<dyn Bot>,
    pub timetable: Arc<TimetableCache>,
    pub clock: Arc<dyn Clock>,
    pub offset: FixedOffset,
    pub scheduler: Arc<ReminderScheduler>,
    /// Set from `getMe`; commands mentioning another bot are ignored.
    pub bot_username: Option<String>,
}

impl BotComponents {
    pub fn new(
        repo: Arc<UserRepository>,
        bot: Arc<dyn Bot>,
        timetable: Arc<TimetableCache>,
        clock: Arc<dyn Clock>,
        offset: FixedOffset,
    ) -> Self {
        let scheduler = Arc::new(ReminderScheduler::new(
            bot.clone(),
            repo.clone(),
            timetable.clone(),
            clock.clone(),
            offset,
        ));
        Self {
            repo,
            bot,
            timetable,
            clock,
            offset,
            scheduler,
            bot_username: None,
        }
    }

    pub fn with_bot_username(mut self, username: impl Into<String>) -> Self {
        self.bot_username = Some(username.into());
        self
    }
}

/// teloxide bot with the configured API URL.
pub fn build_teloxide_bot(config: &BotConfig) -> teloxide::Bot {
    let bot = teloxide::Bot::new(config.bot_token.clone());
    match &config.telegram_api_url {
        Some(url) => {
            info!(url = %url, "Using custom Telegram API URL");
            bot.set_api_url(url.clone())
        }
        None => bot,
    }
}

/// HTTP client for the timetable page and the token endpoint. Every request is bounded by `timeout`
/// because the timetable cache is locked while a fetch runs.
pub fn build_http_client(timeout: Duration) -> Result<HttpClient> {
    HttpClient::builder()
        .timeout(timeout)
        .connect_timeout(timeout)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))
}

/// HTTP timetable source, authorized with the client secret when `TIMETABLE_AUTHORIZED` is set.
pub fn build_timetable(config: &BotConfig, http: HttpClient) -> Arc<TimetableCache> {
    let mut source = HttpTimetableSource::new(http.clone(), config.timetable_url.clone());
    if config.timetable_authorized {
        info!(origin = %config.secret_origin, "Timetable requests use OAuth bearer tokens");
        source = source.with_oauth(Arc::new(OAuthClient::new(http, config.client_secret.clone())));
    }
    let source: Arc<dyn TimetableSource> = Arc::new(source);
    Arc::new(TimetableCache::new(source))
}

pub fn build_router(components: &BotComponents, admin_chat_id: Option<i64>) -> CommandRouter {
    let c = components;
    CommandRouter::new(c.bot.clone(), c.clock.clone(), c.offset)
        .with_bot_username(c.bot_username.clone())
        .register(Arc::new(StartCommand::new(c.repo.clone(), c.scheduler.clone())))
        .register(Arc::new(StopCommand::new(c.repo.clone(), c.scheduler.clone())))
        .register(Arc::new(TodayCommand::new(c.timetable.clone())))
        .register(Arc::new(TomorrowCommand::new(c.timetable.clone())))
        .register(Arc::new(NextCommand::new(c.timetable.clone())))
        .register(Arc::new(BroadcastCommand::new(
            c.bot.clone(),
            c.repo.clone(),
            admin_chat_id,
        )))
}

/// Logging first, then the command router.
pub fn build_handler_chain(components: &BotComponents, admin_chat_id: Option<i64>) -> HandlerChain {
    HandlerChain::new()
        .add_handler(Arc::new(LoggingHandler))
        .add_handler(Arc::new(build_router(components, admin_chat_id)))
}

/// Opens the user store named by `DATABASE_URL`.
#[instrument(skip(database_url))]
pub async fn open_repository(database_url: &str) -> Result<Arc<UserRepository>> {
    let repo = UserRepository::connect(database_url).await.map_err(|e| {
        error!(error = %e, database_url = %database_url, "Failed to initialize user storage");
        anyhow::anyhow!("Failed to initialize user storage: {}", e)
    })?;
    Ok(Arc::new(repo))
}

/// Builds every component for a live Telegram bot.
#[instrument(skip(config, clock))]
pub async fn build_bot_components(
    config: &BotConfig,
    clock: Arc<dyn Clock>,
) -> Result<(BotComponents, teloxide::Bot)> {
    let repo = open_repository(&config.database_url).await?;
    let teloxide_bot = build_teloxide_bot(config);
    let bot: Arc<dyn Bot> = Arc::new(TelegramBotAdapter::new(teloxide_bot.clone()));
    let timetable = build_timetable(config, build_http_client(config.http_timeout)?);

    let components = BotComponents::new(repo, bot, timetable, clock, config.utc_offset);
    Ok((components, teloxide_bot))
}
