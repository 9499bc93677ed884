//! `pbot` binary: run the bot or inspect its stored chats. Config from env and optional CLI args.

use anyhow::Result;
use clap::Parser;
use prayer_bot::config::database_url_from_env;
use prayer_bot::{list_users, load_config, run_bot, Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { token } => {
            let config = load_config(token)?;
            run_bot(config).await
        }
        Commands::Users => list_users(&database_url_from_env()?).await,
    }
}
