//! Concept Bucket — Telegram bot gateway.
//!
//! Polls Telegram for incoming messages and feeds them to one session task
//! per chat. Buckets and sessions persist in a SQLite database under the
//! data directory, so everything survives restarts.

mod dispatch;
mod telegram;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use bucket_core::IdGenerator;
use bucket_store::{ConceptArchive, Database, SessionCache};

use crate::dispatch::Dispatcher;
use crate::telegram::TelegramClient;

#[derive(Parser)]
#[command(name = "bucket-bot", about = "Concept Bucket Telegram bot", version)]
struct Args {
    /// Directory holding the SQLite database.
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Long-poll timeout in seconds.
    #[arg(long, default_value_t = 30)]
    poll_timeout: u64,

    /// Worker index stamped into generated bucket ids.
    #[arg(long, default_value_t = 0)]
    worker: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing("info");

    let args = Args::parse();

    let token = std::env::var("TELEGRAM_BOT_TOKEN").context(
        "TELEGRAM_BOT_TOKEN is required. Create a bot at https://t.me/BotFather",
    )?;

    let client = TelegramClient::new(&token);
    let bot_name = client.get_me().await?;

    if !args.data_dir.exists() {
        std::fs::create_dir_all(&args.data_dir).context("failed to create data directory")?;
    }
    let db = Database::open_and_migrate(args.data_dir.join("bucket.db"))
        .await
        .context("failed to open database")?;

    let archive = ConceptArchive::new(db.clone());
    let cache = SessionCache::new(db);
    let ids = Arc::new(IdGenerator::new(args.worker)?);

    println!();
    println!("  Concept Bucket v{}", env!("CARGO_PKG_VERSION"));
    println!("  Bot: @{bot_name}");
    println!("  Data: {}", args.data_dir.display());
    println!("  Long-poll timeout: {}s", args.poll_timeout);
    println!();
    println!("  Bot is running. Send messages to @{bot_name} on Telegram.");
    println!("  Press Ctrl+C to stop.");
    println!();

    info!(bot = %bot_name, "starting Telegram gateway");

    let mut dispatcher = Dispatcher::new(archive, cache, ids, client.clone());
    let mut offset: i64 = 0;

    loop {
        let updates = match client.get_updates(offset, args.poll_timeout).await {
            Ok(updates) => updates,
            Err(err) => {
                warn!(error = %err, "Telegram poll failed, retrying...");
                tokio::time::sleep(Duration::from_secs(5)).await;
                continue;
            }
        };

        for update in &updates {
            offset = offset.max(telegram::update_id(update) + 1);

            if let Some((chat_id, text)) = telegram::extract_event(update) {
                dispatcher.dispatch(chat_id, text);
            }
        }
    }
}

fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
