//! Spreadsheet-backed ledger: the system of record for transactions.

pub mod categories;
pub mod report;
pub mod sheets;

pub use report::MonthlyReport;
pub use sheets::{LedgerClient, Transaction};
