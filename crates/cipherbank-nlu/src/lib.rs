//! Intent interpretation: utterance + session in, structured intent out.

pub mod dialogflow;
pub mod error;
pub mod interpreter;
pub mod provider;
pub mod types;

pub use dialogflow::DialogflowDetector;
pub use error::NluError;
pub use interpreter::IntentInterpreter;
pub use provider::IntentDetector;
pub use types::{Intent, IntentResult};
