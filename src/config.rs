use chrono_tz::Tz;
use cron::Schedule;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use teloxide::types::UserId;

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the config file.
    ReadFile { path: PathBuf, source: std::io::Error },
    /// Failed to parse JSON.
    ParseJson { path: PathBuf, source: serde_json::Error },
    /// Invalid cron expression.
    InvalidCron { expr: String, source: cron::error::Error },
    /// Validation error.
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFile { path, source } => {
                write!(f, "failed to read config file '{}': {}", path.display(), source)
            }
            Self::ParseJson { path, source } => {
                write!(f, "failed to parse config file '{}': {}", path.display(), source)
            }
            Self::InvalidCron { expr, source } => {
                write!(f, "invalid cron expression '{}': {}", expr, source)
            }
            Self::Validation(msg) => write!(f, "config validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ReadFile { source, .. } => Some(source),
            Self::ParseJson { source, .. } => Some(source),
            Self::InvalidCron { source, .. } => Some(source),
            Self::Validation(_) => None,
        }
    }
}

#[derive(Deserialize)]
struct ConfigFile {
    /// Users allowed to talk to the bot. First ID is the owner.
    allowed_user_ids: Vec<u64>,
    telegram_bot_token: String,
    /// Anthropic API key for transaction extraction.
    anthropic_api_key: String,
    /// Google Sheets spreadsheet that holds the ledger.
    spreadsheet_id: String,
    /// OAuth bearer token for the Sheets API (minted externally).
    sheets_token: String,
    /// Worksheet receiving expense rows.
    #[serde(default = "default_expenses_sheet")]
    expenses_sheet: String,
    /// Worksheet receiving income rows.
    #[serde(default = "default_income_sheet")]
    income_sheet: String,
    /// Account column value written into every ledger row.
    account_id: String,
    /// Directory for state files (logs, database). Defaults to current directory.
    data_dir: Option<String>,
    /// Cron expression for the scheduled balance report (7-field; None = disabled).
    report_cron: Option<String>,
    /// Timezone for row timestamps, month boundaries and the report schedule.
    #[serde(default = "default_timezone")]
    timezone: String,
    /// Max tokens per model completion.
    #[serde(default = "default_max_tokens")]
    max_tokens: u32,
    /// How many stored turns are replayed into the model context.
    #[serde(default = "default_history_turns")]
    history_turns: usize,
}

fn default_expenses_sheet() -> String {
    "EntradaMaterial".to_string()
}

fn default_income_sheet() -> String {
    "Ventas".to_string()
}

fn default_timezone() -> String {
    "America/Argentina/Buenos_Aires".to_string()
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_history_turns() -> usize {
    40
}

pub struct Config {
    /// Allowed user IDs - first ID is the owner (gets startup notice and reports).
    pub allowed_user_ids: Vec<UserId>,
    pub telegram_bot_token: String,
    pub anthropic_api_key: String,
    pub spreadsheet_id: String,
    pub sheets_token: String,
    pub expenses_sheet: String,
    pub income_sheet: String,
    pub account_id: String,
    /// Directory for state files (logs, database).
    pub data_dir: PathBuf,
    /// Cron expression for the scheduled balance report (None = disabled).
    pub report_cron: Option<String>,
    pub timezone: Tz,
    pub max_tokens: u32,
    pub history_turns: usize,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config_path = path.as_ref().to_path_buf();
        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| ConfigError::ReadFile { path: config_path.clone(), source: e })?;
        let file: ConfigFile = serde_json::from_str(&content)
            .map_err(|e| ConfigError::ParseJson { path: config_path.clone(), source: e })?;

        // Validate required fields
        if file.allowed_user_ids.is_empty() {
            return Err(ConfigError::Validation(
                "allowed_user_ids must contain at least one user ID".into(),
            ));
        }
        if file.telegram_bot_token.is_empty() {
            return Err(ConfigError::Validation("telegram_bot_token is required".into()));
        }
        // Telegram tokens are formatted as {bot_id}:{secret} where bot_id is numeric
        let token_parts: Vec<&str> = file.telegram_bot_token.split(':').collect();
        if token_parts.len() != 2 || token_parts[0].parse::<u64>().is_err() || token_parts[1].is_empty() {
            return Err(ConfigError::Validation(
                "telegram_bot_token appears invalid (expected format: 123456789:ABCdefGHI...)".into(),
            ));
        }
        if file.anthropic_api_key.is_empty() {
            return Err(ConfigError::Validation("anthropic_api_key is required".into()));
        }
        if file.spreadsheet_id.is_empty() {
            return Err(ConfigError::Validation("spreadsheet_id is required".into()));
        }
        if file.sheets_token.is_empty() {
            return Err(ConfigError::Validation("sheets_token is required".into()));
        }
        if file.account_id.is_empty() {
            return Err(ConfigError::Validation("account_id is required".into()));
        }

        if let Some(ref expr) = file.report_cron {
            Schedule::from_str(expr)
                .map_err(|e| ConfigError::InvalidCron { expr: expr.clone(), source: e })?;
        }

        let timezone: Tz = file
            .timezone
            .parse()
            .map_err(|_| ConfigError::Validation(format!("unknown timezone '{}'", file.timezone)))?;

        let data_dir = file
            .data_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Self {
            allowed_user_ids: file.allowed_user_ids.into_iter().map(UserId).collect(),
            telegram_bot_token: file.telegram_bot_token,
            anthropic_api_key: file.anthropic_api_key,
            spreadsheet_id: file.spreadsheet_id,
            sheets_token: file.sheets_token,
            expenses_sheet: file.expenses_sheet,
            income_sheet: file.income_sheet,
            account_id: file.account_id,
            data_dir,
            report_cron: file.report_cron,
            timezone,
            max_tokens: file.max_tokens,
            history_turns: file.history_turns,
        })
    }

    pub fn is_allowed(&self, user_id: UserId) -> bool {
        self.allowed_user_ids.contains(&user_id)
    }

    /// The owner is the first allowed user.
    pub fn owner_id(&self) -> UserId {
        self.allowed_user_ids[0]
    }
}
