//! Google Sheets client for the transaction ledger.
//!
//! Narrow REST contract: `values:append` to record rows, `values` GET to
//! read them back for aggregation. Authentication is a bearer token minted
//! outside this process.

use chrono::Utc;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::ledger::report::{month_totals, MonthlyReport};

const SHEETS_API_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// A transaction extracted by the agent, ready to persist.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub amount: f64,
    pub description: String,
    pub category: String,
    pub payment_method: String,
}

pub struct LedgerClient {
    http: reqwest::Client,
    spreadsheet_id: String,
    token: String,
    expenses_sheet: String,
    income_sheet: String,
    account_id: String,
    tz: Tz,
}

#[derive(Serialize)]
struct AppendRequest {
    values: Vec<Vec<serde_json::Value>>,
}

#[derive(Deserialize, Debug)]
struct AppendResponse {
    updates: Option<AppendUpdates>,
}

#[derive(Deserialize, Debug)]
struct AppendUpdates {
    #[serde(rename = "updatedRange")]
    updated_range: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ValueRange {
    values: Option<Vec<Vec<serde_json::Value>>>,
}

/// Expense worksheet row:
/// id, date, datetime, account, confirmed, amount, category, description, method.
fn expense_row(
    entry_id: &str,
    date: &str,
    datetime: &str,
    account_id: &str,
    tx: &Transaction,
) -> Vec<serde_json::Value> {
    vec![
        entry_id.into(),
        date.into(),
        datetime.into(),
        account_id.into(),
        "TRUE".into(),
        tx.amount.abs().into(),
        tx.category.as_str().into(),
        tx.description.as_str().into(),
        tx.payment_method.as_str().into(),
    ]
}

/// Income worksheet row:
/// id, date, datetime, account, method, confirmed, description, amount, category.
fn income_row(
    entry_id: &str,
    date: &str,
    datetime: &str,
    account_id: &str,
    tx: &Transaction,
) -> Vec<serde_json::Value> {
    vec![
        entry_id.into(),
        date.into(),
        datetime.into(),
        account_id.into(),
        tx.payment_method.as_str().into(),
        "TRUE".into(),
        tx.description.as_str().into(),
        tx.amount.abs().into(),
        tx.category.as_str().into(),
    ]
}

fn new_entry_id() -> String {
    Uuid::new_v4().simple().to_string().chars().take(8).collect()
}

impl LedgerClient {
    pub fn new(
        spreadsheet_id: String,
        token: String,
        expenses_sheet: String,
        income_sheet: String,
        account_id: String,
        tz: Tz,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            http,
            spreadsheet_id,
            token,
            expenses_sheet,
            income_sheet,
            account_id,
            tz,
        }
    }

    fn values_url(&self, range: &str, suffix: &str) -> String {
        format!(
            "{}/{}/values/{}{}",
            SHEETS_API_URL,
            self.spreadsheet_id,
            urlencoding::encode(range),
            suffix
        )
    }

    /// Append an expense row. Returns the entry id.
    pub async fn append_expense(&self, tx: &Transaction) -> Result<String, String> {
        let entry_id = new_entry_id();
        let now = Utc::now().with_timezone(&self.tz);
        let row = expense_row(
            &entry_id,
            &now.format("%Y-%m-%d").to_string(),
            &now.format("%Y-%m-%d %H:%M:%S").to_string(),
            &self.account_id,
            tx,
        );
        info!("📒 Recording expense {}: ${} {}", entry_id, tx.amount, tx.description);
        self.append_row(&self.expenses_sheet, row).await?;
        Ok(entry_id)
    }

    /// Append an income row. Returns the entry id.
    pub async fn append_income(&self, tx: &Transaction) -> Result<String, String> {
        let entry_id = new_entry_id();
        let now = Utc::now().with_timezone(&self.tz);
        let row = income_row(
            &entry_id,
            &now.format("%Y-%m-%d").to_string(),
            &now.format("%Y-%m-%d %H:%M:%S").to_string(),
            &self.account_id,
            tx,
        );
        info!("📒 Recording income {}: ${} {}", entry_id, tx.amount, tx.description);
        self.append_row(&self.income_sheet, row).await?;
        Ok(entry_id)
    }

    async fn append_row(&self, sheet: &str, row: Vec<serde_json::Value>) -> Result<(), String> {
        let range = format!("{sheet}!A:I");
        let url = self.values_url(&range, ":append?valueInputOption=USER_ENTERED");
        let request = AppendRequest { values: vec![row] };

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(&request)
            .send()
            .await
            .map_err(|e| format!("HTTP error: {e}"))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| format!("Failed to read response: {e}"))?;

        if !status.is_success() {
            return Err(format!("Sheets API error {status}: {body}"));
        }

        let parsed: AppendResponse =
            serde_json::from_str(&body).map_err(|e| format!("Failed to parse response: {e}"))?;

        if let Some(range) = parsed.updates.and_then(|u| u.updated_range) {
            debug!("Appended to {}", range);
        }

        Ok(())
    }

    async fn fetch_rows(&self, sheet: &str) -> Result<Vec<Vec<serde_json::Value>>, String> {
        let url = self.values_url(sheet, "");

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| format!("HTTP error: {e}"))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| format!("Failed to read response: {e}"))?;

        if !status.is_success() {
            return Err(format!("Sheets API error {status}: {body}"));
        }

        let parsed: ValueRange =
            serde_json::from_str(&body).map_err(|e| format!("Failed to parse response: {e}"))?;

        Ok(parsed.values.unwrap_or_default())
    }

    /// Read both worksheets and compute the current month's balance.
    pub async fn monthly_report(&self) -> Result<MonthlyReport, String> {
        let month = Utc::now().with_timezone(&self.tz).format("%Y-%m").to_string();

        let expense_rows = self.fetch_rows(&self.expenses_sheet).await?;
        let income_rows = self.fetch_rows(&self.income_sheet).await?;
        debug!(
            "Fetched {} expense row(s), {} income row(s)",
            expense_rows.len(),
            income_rows.len()
        );

        Ok(month_totals(&expense_rows, &income_rows, &month))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx() -> Transaction {
        Transaction {
            amount: -1500.0,
            description: "helado".to_string(),
            category: "Varios".to_string(),
            payment_method: "Efectivo".to_string(),
        }
    }

    #[test]
    fn test_expense_row_layout() {
        let row = expense_row("a1b2c3d4", "2026-08-06", "2026-08-06 15:30:00", "16162b8f", &tx());
        assert_eq!(row.len(), 9);
        assert_eq!(row[0], "a1b2c3d4");
        assert_eq!(row[1], "2026-08-06");
        assert_eq!(row[3], "16162b8f");
        assert_eq!(row[4], "TRUE");
        // Amounts are recorded as absolute values
        assert_eq!(row[5], 1500.0);
        assert_eq!(row[6], "Varios");
        assert_eq!(row[7], "helado");
        assert_eq!(row[8], "Efectivo");
    }

    #[test]
    fn test_income_row_layout() {
        let row = income_row("a1b2c3d4", "2026-08-06", "2026-08-06 15:30:00", "16162b8f", &tx());
        assert_eq!(row.len(), 9);
        // Income sheet keeps the method before the confirmation flag
        assert_eq!(row[4], "Efectivo");
        assert_eq!(row[5], "TRUE");
        assert_eq!(row[6], "helado");
        assert_eq!(row[7], 1500.0);
        assert_eq!(row[8], "Varios");
    }

    #[test]
    fn test_entry_id_is_short_hex() {
        let id = new_entry_id();
        assert_eq!(id.len(), 8);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
