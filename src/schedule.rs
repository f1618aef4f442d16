//! Scheduled delivery of the monthly balance report.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use cron::Schedule;
use std::str::FromStr;
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::agent::TelegramClient;
use crate::ledger::LedgerClient;

/// Next occurrence of a cron expression in the given timezone.
pub fn next_occurrence(expr: &str, after: DateTime<Tz>) -> Result<DateTime<Tz>, String> {
    let schedule = Schedule::from_str(expr).map_err(|e| format!("Invalid cron: {e}"))?;
    schedule
        .after(&after)
        .next()
        .ok_or_else(|| "No future occurrence for cron".to_string())
}

/// Spawn the background task that sends the balance report to the owner
/// chat on the configured schedule.
pub fn spawn_report_task(
    expr: String,
    tz: Tz,
    ledger: Arc<LedgerClient>,
    telegram: Arc<TelegramClient>,
    owner_chat_id: i64,
) {
    tokio::spawn(async move {
        loop {
            let now = Utc::now().with_timezone(&tz);
            let next = match next_occurrence(&expr, now) {
                Ok(next) => next,
                Err(e) => {
                    // Config validated the expression, so this only fires
                    // when the schedule has no future occurrences left.
                    error!("Report schedule stopped: {e}");
                    return;
                }
            };

            info!("📅 Next scheduled report at {}", next.format("%Y-%m-%d %H:%M %Z"));
            let wait = (next - now).to_std().unwrap_or_default();
            sleep(wait).await;

            match ledger.monthly_report().await {
                Ok(report) => {
                    info!("📊 Sending scheduled report for {}", report.month);
                    if let Err(e) = telegram
                        .send_message(owner_chat_id, &report.render(), None)
                        .await
                    {
                        warn!("Failed to deliver scheduled report: {e}");
                    }
                }
                Err(e) => warn!("Scheduled report failed: {e}"),
            }
        }
    });
}
