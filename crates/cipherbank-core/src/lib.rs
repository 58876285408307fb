pub mod config;
pub mod error;
pub mod types;

pub use config::CipherBankConfig;
pub use error::{CipherBankError, Result};
pub use types::{BotIdentity, UserId};
