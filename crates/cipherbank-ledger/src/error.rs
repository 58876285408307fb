use thiserror::Error;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// No account has been opened for this user yet.
    #[error("no account for user {user_id}")]
    UnknownAccount { user_id: String },

    /// The transfer amount is NaN or infinite.
    #[error("invalid transfer amount: {0}")]
    InvalidAmount(f64),

    /// The transfer direction names an account pair the ledger does not hold.
    #[error("unknown transfer direction: {0}")]
    UnknownDirection(String),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
