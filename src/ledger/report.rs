//! Monthly balance aggregation over raw worksheet rows.

/// Column positions in a ledger row, as written by the client.
/// Both worksheets keep the date in column B; the amount column differs.
pub const DATE_COLUMN: usize = 1;
pub const EXPENSE_AMOUNT_COLUMN: usize = 5;
pub const INCOME_AMOUNT_COLUMN: usize = 7;

/// Income/expense totals for one month.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyReport {
    /// Month key, `YYYY-MM`.
    pub month: String,
    pub income: f64,
    pub expenses: f64,
}

impl MonthlyReport {
    pub fn balance(&self) -> f64 {
        self.income - self.expenses
    }

    /// Render the report the way the bot replies it.
    pub fn render(&self) -> String {
        format!(
            "Este mes tuvimos:\nIngresos totales: ${:.2}\nGastos totales: ${:.2}\nBalance: ${:.2}",
            self.income,
            self.expenses,
            self.balance()
        )
    }
}

/// Build the report for `month` from the raw rows of both worksheets.
pub fn month_totals(
    expense_rows: &[Vec<serde_json::Value>],
    income_rows: &[Vec<serde_json::Value>],
    month: &str,
) -> MonthlyReport {
    MonthlyReport {
        month: month.to_string(),
        income: sum_month(income_rows, INCOME_AMOUNT_COLUMN, month),
        expenses: sum_month(expense_rows, EXPENSE_AMOUNT_COLUMN, month),
    }
}

/// Sum the amount column of rows whose date cell falls in `month`.
///
/// The header row and any malformed row drop out naturally: their amount
/// cell does not parse as a number, or their date cell does not start
/// with a `YYYY-MM` key.
fn sum_month(rows: &[Vec<serde_json::Value>], amount_column: usize, month: &str) -> f64 {
    rows.iter()
        .filter(|row| {
            cell_str(row, DATE_COLUMN)
                .map(|date| date.starts_with(month))
                .unwrap_or(false)
        })
        .filter_map(|row| cell_f64(row, amount_column))
        .sum()
}

fn cell_str(row: &[serde_json::Value], column: usize) -> Option<&str> {
    row.get(column).and_then(|v| v.as_str())
}

/// Amount cells come back as strings or numbers depending on the sheet's
/// formatting, so accept both.
fn cell_f64(row: &[serde_json::Value], column: usize) -> Option<f64> {
    match row.get(column)? {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn expense_row(date: &str, amount: &str) -> Vec<serde_json::Value> {
        vec![
            json!("a1b2c3d4"),
            json!(date),
            json!(format!("{date} 10:00:00")),
            json!("16162b8f"),
            json!("TRUE"),
            json!(amount),
            json!("Varios"),
            json!("algo"),
            json!("Efectivo"),
        ]
    }

    fn income_row(date: &str, amount: &str) -> Vec<serde_json::Value> {
        vec![
            json!("a1b2c3d4"),
            json!(date),
            json!(format!("{date} 10:00:00")),
            json!("16162b8f"),
            json!("Transferencia"),
            json!("TRUE"),
            json!("sueldo"),
            json!(amount),
            json!("Salario"),
        ]
    }

    fn header_row() -> Vec<serde_json::Value> {
        vec![
            json!("Id"),
            json!("EntradaMaterialFecha"),
            json!("FechaHora"),
            json!("Cuenta"),
            json!("Confirmado"),
            json!("Monto"),
            json!("Categoría"),
            json!("Descripción"),
            json!("Método"),
        ]
    }

    #[test]
    fn test_month_totals_sums_matching_month() {
        let expenses = vec![
            header_row(),
            expense_row("2026-08-01", "1500"),
            expense_row("2026-08-15", "500.50"),
            expense_row("2026-07-30", "9999"),
        ];
        let income = vec![header_row(), income_row("2026-08-05", "200000")];

        let report = month_totals(&expenses, &income, "2026-08");
        assert_eq!(report.expenses, 2000.5);
        assert_eq!(report.income, 200000.0);
        assert_eq!(report.balance(), 197999.5);
    }

    #[test]
    fn test_header_row_is_skipped() {
        let expenses = vec![header_row()];
        let report = month_totals(&expenses, &[], "2026-08");
        assert_eq!(report.expenses, 0.0);
    }

    #[test]
    fn test_numeric_cells_accepted() {
        let mut row = expense_row("2026-08-01", "0");
        row[EXPENSE_AMOUNT_COLUMN] = json!(1234.5);
        let report = month_totals(&[row], &[], "2026-08");
        assert_eq!(report.expenses, 1234.5);
    }

    #[test]
    fn test_malformed_amount_is_skipped() {
        let expenses = vec![
            expense_row("2026-08-01", "no es un número"),
            expense_row("2026-08-02", "100"),
        ];
        let report = month_totals(&expenses, &[], "2026-08");
        assert_eq!(report.expenses, 100.0);
    }

    #[test]
    fn test_short_row_is_skipped() {
        let short = vec![json!("a1b2c3d4"), json!("2026-08-01")];
        let report = month_totals(&[short], &[], "2026-08");
        assert_eq!(report.expenses, 0.0);
    }

    #[test]
    fn test_render_shape() {
        let report = MonthlyReport {
            month: "2026-08".to_string(),
            income: 200000.0,
            expenses: 2000.5,
        };

        let text = report.render();
        assert!(text.starts_with("Este mes tuvimos:\n"));
        assert!(text.contains("Ingresos totales: $200000.00"));
        assert!(text.contains("Gastos totales: $2000.50"));
        assert!(text.contains("Balance: $197999.50"));
    }

    #[test]
    fn test_negative_balance() {
        let report = MonthlyReport {
            month: "2026-08".to_string(),
            income: 100.0,
            expenses: 250.0,
        };
        assert_eq!(report.balance(), -150.0);
        assert!(report.render().contains("Balance: $-150.00"));
    }
}
