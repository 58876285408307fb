use async_trait::async_trait;

use crate::error::Result;
use crate::types::IntentResult;

/// Common interface for intent detection services.
#[async_trait]
pub trait IntentDetector: Send + Sync {
    /// Detector name for logging and error messages.
    fn name(&self) -> &str;

    /// Classify one utterance within a conversation session.
    ///
    /// `session` correlates turns so the service can keep multi-turn
    /// context (e.g. a follow-up that only names an amount).
    async fn detect_intent(&self, session: &str, text: &str, locale: &str) -> Result<IntentResult>;
}
