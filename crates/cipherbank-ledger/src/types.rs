use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use cipherbank_core::UserId;

use crate::error::LedgerError;

/// Checking/savings pair. Balances are signed and may go negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Balances {
    pub checking: f64,
    pub savings: f64,
}

impl Balances {
    pub fn new(checking: f64, savings: f64) -> Self {
        Self { checking, savings }
    }

    pub fn total(&self) -> f64 {
        self.checking + self.savings
    }
}

/// A user's two-account balance record.
///
/// Opened lazily on first contact and kept for the process lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub user_id: UserId,
    pub balances: Balances,
    /// Number of transfers applied since the account was opened.
    pub transfers: u64,
}

/// Which way money moves between the two accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransferDirection {
    CheckingToSavings,
    SavingsToChecking,
}

impl TransferDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferDirection::CheckingToSavings => "checking-to-savings",
            TransferDirection::SavingsToChecking => "savings-to-checking",
        }
    }
}

impl fmt::Display for TransferDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransferDirection {
    type Err = LedgerError;

    /// Accepts `checking-to-savings`, `checking to savings`, `checking_to_savings`
    /// and the savings variants, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .to_ascii_lowercase()
            .chars()
            .map(|c| if c == '_' || c == ' ' { '-' } else { c })
            .collect();
        match normalized.as_str() {
            "checking-to-savings" => Ok(TransferDirection::CheckingToSavings),
            "savings-to-checking" => Ok(TransferDirection::SavingsToChecking),
            _ => Err(LedgerError::UnknownDirection(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_direction_spellings() {
        for s in ["checking-to-savings", "Checking to Savings", "checking_to_savings"] {
            assert_eq!(
                s.parse::<TransferDirection>().unwrap(),
                TransferDirection::CheckingToSavings
            );
        }
        assert_eq!(
            " savings to checking ".parse::<TransferDirection>().unwrap(),
            TransferDirection::SavingsToChecking
        );
    }

    #[test]
    fn rejects_unknown_accounts() {
        assert!("checking-to-brokerage".parse::<TransferDirection>().is_err());
        assert!("".parse::<TransferDirection>().is_err());
    }

    #[test]
    fn display_round_trips_through_parse() {
        for d in [
            TransferDirection::CheckingToSavings,
            TransferDirection::SavingsToChecking,
        ] {
            assert_eq!(d.to_string().parse::<TransferDirection>().unwrap(), d);
        }
    }
}
