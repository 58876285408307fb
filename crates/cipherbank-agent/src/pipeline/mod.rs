//! Channel-agnostic message pipeline.
//!
//! The gateway hands every webhook body to [`MessageDispatcher::handle`];
//! everything between parsing and emission happens here.

pub mod dispatch;
pub mod event;
pub mod respond;

pub use dispatch::{Ack, MessageDispatcher};
pub use event::InboundEvent;
pub use respond::ResponseBuilder;
