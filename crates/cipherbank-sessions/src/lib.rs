pub mod manager;
pub mod types;

pub use manager::SessionRegistry;
pub use types::{Session, SessionToken};
