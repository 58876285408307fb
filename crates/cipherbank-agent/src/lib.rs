//! Inbound message pipeline: webhook event in, encrypted reply out.

pub mod error;
pub mod pipeline;

pub use error::DispatchError;
pub use pipeline::{Ack, InboundEvent, MessageDispatcher, ResponseBuilder};
