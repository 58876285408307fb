use std::sync::Arc;

use tracing::{debug, info};

use cipherbank_core::UserId;
use cipherbank_ledger::{AccountLedger, Balances, LedgerError, TransferDirection};
use cipherbank_nlu::types::{PARAM_AMOUNT, PARAM_TRANSFER};
use cipherbank_nlu::{Intent, IntentResult};

/// Reply when a transfer names accounts other than checking and savings.
pub const UNKNOWN_ACCOUNTS_REPLY: &str =
    "Sorry, I don't know those accounts. I can only move money between checking and savings.";

/// Reply when a transfer carries no usable amount.
pub const INVALID_AMOUNT_REPLY: &str = "Sorry, I couldn't work out how much you want to transfer.";

/// Computes the reply text for an interpreted utterance.
///
/// The only side effect is the ledger mutation on a resolved transfer.
pub struct ResponseBuilder {
    ledger: Arc<AccountLedger>,
}

impl ResponseBuilder {
    pub fn new(ledger: Arc<AccountLedger>) -> Self {
        Self { ledger }
    }

    pub fn build(&self, user_id: &UserId, result: &IntentResult) -> Result<String, LedgerError> {
        match result.intent() {
            Intent::CheckAccounts => {
                let balances = self.ledger.read(user_id)?;
                Ok(balance_summary(&balances))
            }
            Intent::TransferMoney => self.transfer(user_id, result),
            Intent::Other(_) | Intent::NotUnderstood => Ok(result.fulfillment_text.clone()),
        }
    }

    fn transfer(&self, user_id: &UserId, result: &IntentResult) -> Result<String, LedgerError> {
        let direction = match result
            .param_str(PARAM_TRANSFER)
            .map(str::parse::<TransferDirection>)
        {
            Some(Ok(direction)) => direction,
            Some(Err(_)) | None => {
                debug!(transfer = ?result.param_str(PARAM_TRANSFER), "unknown transfer accounts");
                return Ok(UNKNOWN_ACCOUNTS_REPLY.to_string());
            }
        };

        let Some(amount) = result.param_number(PARAM_AMOUNT) else {
            debug!("transfer without a usable amount");
            return Ok(INVALID_AMOUNT_REPLY.to_string());
        };

        let after = self.ledger.apply_transfer(user_id, direction, amount)?;
        info!(
            user_id = %user_id,
            direction = %direction,
            amount,
            checking = after.checking,
            savings = after.savings,
            "transfer committed"
        );
        Ok(result.fulfillment_text.clone())
    }
}

/// Two-line balance summary under a fixed heading.
pub fn balance_summary(balances: &Balances) -> String {
    format!(
        "Here are your balances\nChecking: ${}\nSavings: ${}",
        balances.checking, balances.savings
    )
}
