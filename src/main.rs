mod agent;
mod config;
mod database;
mod ledger;
mod schedule;

use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;

use teloxide::prelude::*;
use teloxide::types::ChatKind;
use tracing::{error, info, warn};
use tracing_subscriber::prelude::*;

use agent::claude::Client as ClaudeClient;
use agent::{AgentEngine, TelegramClient};
use config::Config;
use database::Database;
use ledger::LedgerClient;

struct BotState {
    config: Config,
    engine: AgentEngine,
    telegram: Arc<TelegramClient>,
    database: Arc<Database>,
    denied: Mutex<HashSet<UserId>>,
}

impl BotState {
    fn new(config: Config, bot: &Bot) -> Self {
        let database = Arc::new(Database::load_or_new(&config.data_dir.join("centavo.db")));

        let ledger = Arc::new(LedgerClient::new(
            config.spreadsheet_id.clone(),
            config.sheets_token.clone(),
            config.expenses_sheet.clone(),
            config.income_sheet.clone(),
            config.account_id.clone(),
            config.timezone,
        ));

        let telegram = Arc::new(TelegramClient::new(bot.clone()));

        let engine = AgentEngine::new(
            ClaudeClient::new(config.anthropic_api_key.clone()),
            ledger.clone(),
            database.clone(),
            config.max_tokens,
            config.history_turns,
        );

        // Scheduled balance report for the owner
        if let Some(ref expr) = config.report_cron {
            schedule::spawn_report_task(
                expr.clone(),
                config.timezone,
                ledger,
                telegram.clone(),
                config.owner_id().0 as i64,
            );
            info!("Scheduled report enabled ({expr})");
        }

        Self {
            config,
            engine,
            telegram,
            database,
            denied: Mutex::new(HashSet::new()),
        }
    }
}

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "centavo.json".to_string());
    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    let bot = Bot::new(&config.telegram_bot_token);

    // Setup logging
    let log_dir = config.data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).ok();
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("centavo.log"))
        .expect("Failed to open log file");
    let (non_blocking, _guard) = tracing_appender::non_blocking(log_file);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .init();

    info!("🚀 Starting centavo...");
    info!("Loaded config from {config_path}");
    info!("Allowed users: {:?}", config.allowed_user_ids);

    match bot.get_me().await {
        Ok(me) => info!("Bot user ID: {}, username: @{}", me.id, me.username()),
        Err(e) => warn!("Failed to get bot info: {e}"),
    }

    let state = Arc::new(BotState::new(config, &bot));

    // Startup notice to the owner
    let owner_chat = state.config.owner_id().0 as i64;
    if let Err(e) = state
        .telegram
        .send_message(owner_chat, "servidor de finanzas personales está ON", None)
        .await
    {
        warn!("Failed to notify owner: {e}");
    }

    let handler = dptree::entry().branch(Update::filter_message().endpoint(handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

async fn handle_message(msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    // Personal finance is a DM-only conversation
    if !matches!(msg.chat.kind, ChatKind::Private(_)) {
        return Ok(());
    }

    let user = match msg.from {
        Some(ref u) => u,
        None => return Ok(()),
    };
    let username = user.username.as_deref().unwrap_or(&user.first_name);

    if !state.config.is_allowed(user.id) {
        let mut denied = state.denied.lock().await;
        if !denied.contains(&user.id) {
            denied.insert(user.id);
            info!("DM from non-trusted user {} ({}) - denial", username, user.id);
            state
                .telegram
                .send_message(msg.chat.id.0, "Access denied.", None)
                .await
                .ok();
        }
        return Ok(());
    }

    let text = match msg.text() {
        Some(t) => t,
        None => return Ok(()),
    };

    let chat_id = msg.chat.id.0;
    let message_id = msg.id.0 as i64;

    // Long-poll delivery is at-least-once; drop anything already handled
    if state.database.is_processed(chat_id, message_id) {
        info!("Skipping duplicate message {} in chat {}", message_id, chat_id);
        return Ok(());
    }

    let preview: String = text.chars().take(100).collect();
    info!("📨 {} ({}): \"{}\"", username, user.id, preview);

    match state.engine.handle_turn(chat_id, text).await {
        Ok(reply) => {
            if reply.is_empty() {
                warn!("Empty reply for chat {chat_id}");
            } else if let Err(e) = state
                .telegram
                .send_message(chat_id, &reply, Some(message_id))
                .await
            {
                warn!("Failed to reply in chat {chat_id}: {e}");
            }
            let stamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();
            state.database.mark_processed(chat_id, message_id, &stamp);
        }
        Err(e) => {
            // Not marked processed: a redelivery gets another chance
            error!("Turn failed for chat {chat_id}: {e}");
            state
                .telegram
                .send_message(chat_id, &format!("Lo siento, ocurrió un error: {e}"), None)
                .await
                .ok();
        }
    }

    Ok(())
}
