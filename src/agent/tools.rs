//! Tool definitions for the finance agent.

use serde::Deserialize;

use crate::agent::claude::ToolDefinition;

/// Default payment method when the model omits one.
pub const DEFAULT_PAYMENT_METHOD: &str = "Efectivo";

/// Tool calls the model can make.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    /// Record an expense in the ledger.
    AddExpense {
        amount: f64,
        description: String,
        category: String,
        payment_method: String,
    },
    /// Record income in the ledger.
    AddIncome {
        amount: f64,
        description: String,
        category: String,
        payment_method: String,
    },
    /// Compute the current month's balance.
    GenerateMonthlyReport,
}

#[derive(Deserialize)]
struct TransactionParams {
    amount: f64,
    description: String,
    category: String,
    payment_method: Option<String>,
}

impl ToolCall {
    /// Parse a tool invocation from the API's (name, input) pair.
    pub fn parse(name: &str, input: &serde_json::Value) -> Result<ToolCall, String> {
        match name {
            "add_expense" => {
                let p: TransactionParams = serde_json::from_value(input.clone())
                    .map_err(|e| format!("invalid add_expense input: {e}"))?;
                Ok(ToolCall::AddExpense {
                    amount: p.amount,
                    description: p.description,
                    category: p.category,
                    payment_method: p.payment_method.unwrap_or_else(|| DEFAULT_PAYMENT_METHOD.to_string()),
                })
            }
            "add_income" => {
                let p: TransactionParams = serde_json::from_value(input.clone())
                    .map_err(|e| format!("invalid add_income input: {e}"))?;
                Ok(ToolCall::AddIncome {
                    amount: p.amount,
                    description: p.description,
                    category: p.category,
                    payment_method: p.payment_method.unwrap_or_else(|| DEFAULT_PAYMENT_METHOD.to_string()),
                })
            }
            "generate_monthly_report" => Ok(ToolCall::GenerateMonthlyReport),
            other => Err(format!("unknown tool '{other}'")),
        }
    }

    /// True for tools that write a transaction to the ledger.
    pub fn is_recording(&self) -> bool {
        matches!(self, ToolCall::AddExpense { .. } | ToolCall::AddIncome { .. })
    }
}

/// Get the tool definitions advertised to the model.
pub fn get_tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "add_expense".to_string(),
            description: "Record an expense in the ledger. Amount is a positive number in ARS."
                .to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "amount": {
                        "type": "number",
                        "description": "The amount spent (positive number)"
                    },
                    "description": {
                        "type": "string",
                        "description": "What the expense was for"
                    },
                    "category": {
                        "type": "string",
                        "description": "Expense category, e.g. Farmacia, Impuestos, Viajes"
                    },
                    "payment_method": {
                        "type": "string",
                        "description": "Payment method, e.g. Efectivo, Transferencia, QR (default Efectivo)"
                    }
                },
                "required": ["amount", "description", "category"]
            }),
        },
        ToolDefinition {
            name: "add_income".to_string(),
            description: "Record income in the ledger. Amount is a positive number in ARS."
                .to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "amount": {
                        "type": "number",
                        "description": "The amount received (positive number)"
                    },
                    "description": {
                        "type": "string",
                        "description": "What the income was for"
                    },
                    "category": {
                        "type": "string",
                        "description": "Income category, e.g. Salario, Freelance / Trabajos temporales"
                    },
                    "payment_method": {
                        "type": "string",
                        "description": "Payment method, e.g. Efectivo, Transferencia (default Efectivo)"
                    }
                },
                "required": ["amount", "description", "category"]
            }),
        },
        ToolDefinition {
            name: "generate_monthly_report".to_string(),
            description: "Compute the current month's balance: total income minus total expenses."
                .to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {}
            }),
        },
    ]
}
