use std::sync::Arc;

use tracing::{debug, instrument};

use crate::error::Result;
use crate::provider::IntentDetector;
use crate::types::IntentResult;

/// Turns decrypted utterances into intents using a fixed locale.
///
/// One detector call per utterance; no retry.
pub struct IntentInterpreter {
    detector: Arc<dyn IntentDetector>,
    locale: String,
}

impl IntentInterpreter {
    pub fn new(detector: Arc<dyn IntentDetector>, locale: impl Into<String>) -> Self {
        Self {
            detector,
            locale: locale.into(),
        }
    }

    #[instrument(skip(self, text), fields(detector = self.detector.name(), locale = %self.locale))]
    pub async fn interpret(&self, session: &str, text: &str) -> Result<IntentResult> {
        let result = self
            .detector
            .detect_intent(session, text, &self.locale)
            .await?;
        debug!(intent = ?result.intent, params = result.parameters.len(), "intent detected");
        Ok(result)
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }
}
