use std::sync::Arc;

use anyhow::Result;
use pbot_core::init_tracing;
use pbot_telegram::{BotRuntime, TelegramUpdateSource};
use storage::Repository;
use teloxide::prelude::Requester;
use tracing::{error, info, instrument, warn};

use crate::clock::SystemClock;
use crate::components::{build_bot_components, build_handler_chain, open_repository};
use crate::config::BotConfig;

/// Resolves on Ctrl-C, or SIGTERM on Unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}

/// Main entry: init logging, build components, restore reminders, then run the polling loop until shutdown.
#[instrument(skip(config))]
pub async fn run_bot(config: BotConfig) -> Result<()> {
    init_tracing(&config.log_file)?;
    info!(
        database_url = %config.database_url,
        timetable_url = %config.timetable_url,
        utc_offset = %config.utc_offset,
        "Initializing bot"
    );

    let (mut components, teloxide_bot) =
        build_bot_components(&config, Arc::new(SystemClock)).await?;

    match teloxide_bot.get_me().await {
        Ok(me) => {
            info!(username = %me.username(), "Connected to Telegram");
            components = components.with_bot_username(me.username());
        }
        Err(e) => warn!(error = %e, "get_me failed, @mentions will not be checked"),
    }

    let result = async {
        components.scheduler.restore().await?;

        let chain = build_handler_chain(&components, config.admin_chat_id);
        let source = TelegramUpdateSource::new(teloxide_bot, config.poll_timeout_secs);
        let mut runtime = BotRuntime::new(source, chain, config.runtime_options());

        info!("Bot started successfully");
        let outcome = runtime.run(shutdown_signal()).await;
        info!(processed = runtime.processed(), "Event loop finished");
        outcome?;
        Ok::<(), anyhow::Error>(())
    }
    .await;

    components.scheduler.shutdown().await;
    components.repo.close().await;

    if let Err(e) = &result {
        error!(error = %e, "Bot stopped with error");
    } else {
        info!("Bot shut down cleanly");
    }
    result
}

/// Prints every stored chat with its subscription state.
pub async fn list_users(database_url: &str) -> Result<()> {
    let repo = open_repository(database_url).await?;
    let users = repo.list().await;
    repo.close().await;
    let users = users?;

    if users.is_empty() {
        println!("No chats stored.");
        return Ok(());
    }

    println!("{:<16} {:<8} {:<20} {}", "chat_id", "active", "created_at", "updated_at");
    println!("{}", "-".repeat(68));
    for user in &users {
        println!(
            "{:<16} {:<8} {:<20} {}",
            user.id,
            user.active,
            user.created_at.format("%Y-%m-%d %H:%M:%S"),
            user.updated_at.format("%Y-%m-%d %H:%M:%S")
        );
    }
    println!("\n{} chat(s), {} active", users.len(), users.iter().filter(|u| u.active).count());
    Ok(())
}
