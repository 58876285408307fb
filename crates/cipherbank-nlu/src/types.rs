use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const CHECK_ACCOUNTS: &str = "Check Accounts";
pub const TRANSFER_MONEY: &str = "Transfer Money";

/// Parameter naming the transfer direction.
pub const PARAM_TRANSFER: &str = "transfer";
/// Parameter carrying the transfer amount.
pub const PARAM_AMOUNT: &str = "amount";

/// Classification returned by the NLU service for one utterance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntentResult {
    /// Matched intent display name. `None` means the utterance was not understood.
    pub intent: Option<String>,
    /// Loosely typed slot values extracted from the utterance.
    #[serde(default)]
    pub parameters: Map<String, Value>,
    /// Reply text prepared by the NLU service (fulfillment or fallback).
    #[serde(default)]
    pub fulfillment_text: String,
}

/// Intents the bot acts on. Everything else falls through to the
/// NLU-provided reply text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    CheckAccounts,
    TransferMoney,
    Other(String),
    NotUnderstood,
}

impl IntentResult {
    pub fn intent(&self) -> Intent {
        match self.intent.as_deref() {
            Some(CHECK_ACCOUNTS) => Intent::CheckAccounts,
            Some(TRANSFER_MONEY) => Intent::TransferMoney,
            Some(other) => Intent::Other(other.to_string()),
            None => Intent::NotUnderstood,
        }
    }

    /// String parameter, ignoring empty values.
    pub fn param_str(&self, name: &str) -> Option<&str> {
        self.parameters
            .get(name)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Numeric parameter. Accepts a JSON number, a numeric string, or a
    /// currency object such as `{"amount": 200, "currency": "USD"}`.
    pub fn param_number(&self, name: &str) -> Option<f64> {
        self.parameters.get(name).and_then(number_from)
    }
}

fn number_from(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_start_matches('$').replace(',', "").parse().ok(),
        Value::Object(map) => map.get("amount").and_then(number_from),
        _ => None,
    };
    n.filter(|n| n.is_finite())
}
