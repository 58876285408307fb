//! Per-event state machine:
//! `Received → Filtered → SessionEnsured → Decrypted → Interpreted →
//! Responded → Encrypted → Emitted`.
//!
//! Self-authored and non-message events stop at `Filtered` and are
//! acknowledged without touching any store.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use cipherbank_channels::{Channel, OutboundMessage};
use cipherbank_codec::SecureCodec;
use cipherbank_core::config::{DEFAULT_CHANNEL_TYPE, REQUEST_TIMEOUT_MS};
use cipherbank_core::{BotIdentity, UserId};
use cipherbank_ledger::AccountLedger;
use cipherbank_nlu::IntentInterpreter;
use cipherbank_sessions::SessionRegistry;

use super::event::InboundEvent;
use super::respond::ResponseBuilder;
use crate::error::DispatchError;

/// Outcome of a successfully handled event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ack {
    /// Filtered out: not a new message, or authored by the bot itself.
    Ignored,
    /// A reply was encrypted and handed to the channel.
    Replied,
}

pub struct MessageDispatcher {
    bot: BotIdentity,
    ledger: Arc<AccountLedger>,
    sessions: Arc<SessionRegistry>,
    codec: Arc<SecureCodec>,
    interpreter: IntentInterpreter,
    responder: ResponseBuilder,
    channel: Arc<dyn Channel>,
    channel_type: String,
    timeout: Duration,
}

impl MessageDispatcher {
    pub fn new(
        ledger: Arc<AccountLedger>,
        sessions: Arc<SessionRegistry>,
        codec: Arc<SecureCodec>,
        interpreter: IntentInterpreter,
        channel: Arc<dyn Channel>,
    ) -> Self {
        Self {
            bot: codec.bot().clone(),
            responder: ResponseBuilder::new(Arc::clone(&ledger)),
            ledger,
            sessions,
            codec,
            interpreter,
            channel,
            channel_type: DEFAULT_CHANNEL_TYPE.to_string(),
            timeout: Duration::from_millis(REQUEST_TIMEOUT_MS),
        }
    }

    /// Channel type replies are posted under.
    pub fn with_channel_type(mut self, channel_type: impl Into<String>) -> Self {
        self.channel_type = channel_type.into();
        self
    }

    /// Deadline for each external round trip (key lookup, NLU, delivery).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn bot(&self) -> &BotIdentity {
        &self.bot
    }

    pub fn ledger(&self) -> &AccountLedger {
        &self.ledger
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// Handle one webhook body.
    ///
    /// Errors are scoped to this event; the dispatcher stays usable.
    #[instrument(skip(self, body))]
    pub async fn handle(&self, body: &Value) -> Result<Ack, DispatchError> {
        let event = InboundEvent::parse(body, &self.bot)?;

        let (sender, ciphertext) = match event {
            InboundEvent::NewMessage { sender, ciphertext } => (sender, ciphertext),
            other => {
                debug!(kind = other.kind(), sender = ?other.sender(), "event filtered");
                return Ok(Ack::Ignored);
            }
        };

        self.process(&sender, &ciphertext).await.inspect_err(|e| {
            warn!(sender = %sender, code = e.code(), error = %e, "message pipeline failed");
        })
    }

    #[instrument(skip(self, sender, ciphertext), fields(sender = %sender))]
    async fn process(&self, sender: &UserId, ciphertext: &str) -> Result<Ack, DispatchError> {
        self.ledger.ensure(sender);
        let session = self.sessions.ensure(sender);
        debug!(state = "SessionEnsured");

        let text = self
            .bounded("decrypt", self.codec.decrypt(ciphertext, sender))
            .await?
            .map_err(DispatchError::Decryption)?;
        debug!(state = "Decrypted", len = text.len());

        let result = self
            .bounded("interpret", self.interpreter.interpret(session.as_str(), &text))
            .await??;
        debug!(state = "Interpreted", intent = ?result.intent);

        let reply = self.responder.build(sender, &result)?;
        debug!(state = "Responded", len = reply.len());

        let sealed = self
            .bounded("encrypt", self.codec.encrypt(&reply, sender))
            .await?
            .map_err(DispatchError::Encryption)?;
        debug!(state = "Encrypted");

        let msg = OutboundMessage::reply(&self.bot, sender, &self.channel_type, sealed);
        self.bounded("emit", self.channel.send(&msg)).await??;
        info!(channel = %msg.channel_id, via = self.channel.name(), "reply emitted");

        Ok(Ack::Replied)
    }

    async fn bounded<F: Future>(&self, stage: &'static str, fut: F) -> Result<F::Output, DispatchError> {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| DispatchError::Timeout {
                stage,
                ms: self.timeout.as_millis() as u64,
            })
    }
}
