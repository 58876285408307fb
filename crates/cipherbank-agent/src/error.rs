use cipherbank_channels::ChannelError;
use cipherbank_codec::CodecError;
use cipherbank_ledger::LedgerError;
use cipherbank_nlu::NluError;
use thiserror::Error;

/// Failure of a single inbound event. Never fatal to the process.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("malformed event: {0}")]
    MalformedEvent(String),

    #[error("decryption failed: {0}")]
    Decryption(#[source] CodecError),

    #[error("encryption failed: {0}")]
    Encryption(#[source] CodecError),

    #[error("intent interpretation failed: {0}")]
    Interpretation(#[from] NluError),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("delivery failed: {0}")]
    Delivery(#[from] ChannelError),

    #[error("{stage} timed out after {ms}ms")]
    Timeout { stage: &'static str, ms: u64 },
}

impl DispatchError {
    /// Short error code string for structured error responses.
    pub fn code(&self) -> &'static str {
        match self {
            DispatchError::MalformedEvent(_) => "MALFORMED_EVENT",
            DispatchError::Decryption(_) => "DECRYPTION_FAILED",
            DispatchError::Encryption(_) => "ENCRYPTION_FAILED",
            DispatchError::Interpretation(_) => "INTERPRETATION_FAILED",
            DispatchError::Ledger(_) => "LEDGER_ERROR",
            DispatchError::Delivery(_) => "DELIVERY_FAILED",
            DispatchError::Timeout { .. } => "TIMEOUT",
        }
    }

    /// Whether the caller sent a bad request, as opposed to a downstream failure.
    pub fn is_client_error(&self) -> bool {
        matches!(self, DispatchError::MalformedEvent(_))
    }
}
