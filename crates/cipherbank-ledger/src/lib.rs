//! Per-user two-account balance ledger.
//!
//! Accounts are opened on first contact with fixed opening balances and
//! mutated only through [`AccountLedger::apply_transfer`].

pub mod error;
pub mod manager;
pub mod types;

pub use error::LedgerError;
pub use manager::AccountLedger;
pub use types::{Account, Balances, TransferDirection};
