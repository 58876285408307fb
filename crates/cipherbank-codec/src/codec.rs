use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use cipherbank_core::{BotIdentity, UserId};

use crate::directory::KeyDirectory;
use crate::envelope;
use crate::error::{CodecError, Result};
use crate::identity::{Identity, IdentityKey};

/// Encrypt/decrypt boundary between the chat channel and the pipeline.
///
/// Owns the bot's private identity for the process lifetime; user keys are
/// looked up through the [`KeyDirectory`] on every call.
pub struct SecureCodec {
    bot: BotIdentity,
    identity: Identity,
    directory: Arc<dyn KeyDirectory>,
}

impl SecureCodec {
    pub fn new(bot: BotIdentity, identity: Identity, directory: Arc<dyn KeyDirectory>) -> Self {
        Self {
            bot,
            identity,
            directory,
        }
    }

    /// Publish the bot's public key so users can encrypt for it.
    ///
    /// A key already registered under the bot id is accepted only when it is
    /// this identity's key. Any other key means users would encrypt for a
    /// bot that can no longer read them, so registration fails.
    pub async fn register(&self) -> Result<()> {
        let key = self.identity.public_key();
        match self.directory.publish(self.bot.user_id(), &key).await {
            Ok(()) => {
                info!(bot = %self.bot, key_id = %key.key_id(), "bot identity registered");
                Ok(())
            }
            Err(CodecError::KeyAlreadyExists { .. }) => {
                let registered = self.directory.resolve(self.bot.user_id()).await?;
                if registered.key_id() != key.key_id() {
                    warn!(
                        bot = %self.bot,
                        registered = %registered.key_id(),
                        local = %key.key_id(),
                        "bot id is registered with a different key"
                    );
                    return Err(CodecError::KeyMismatch {
                        user_id: self.bot.to_string(),
                        registered: registered.key_id(),
                        local: key.key_id(),
                    });
                }
                info!(bot = %self.bot, key_id = %key.key_id(), "bot identity already registered");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Verify and decrypt a message sent by `sender`.
    #[instrument(skip(self, ciphertext, sender), fields(sender = %sender, bytes = ciphertext.len()))]
    pub async fn decrypt(&self, ciphertext: &str, sender: &UserId) -> Result<String> {
        let sender_key = self.directory.resolve(sender).await?;
        let plaintext = envelope::open(&self.identity, &sender_key, ciphertext)?;
        let text = String::from_utf8(plaintext)
            .map_err(|_| CodecError::Malformed("plaintext is not UTF-8".into()))?;
        debug!(len = text.len(), "message decrypted");
        Ok(text)
    }

    /// Encrypt a reply readable by `recipient` and by the bot itself.
    #[instrument(skip(self, plaintext, recipient), fields(recipient = %recipient))]
    pub async fn encrypt(&self, plaintext: &str, recipient: &UserId) -> Result<String> {
        let recipient_key = self.directory.resolve(recipient).await?;
        let own_key = self.identity.public_key();
        envelope::seal(
            &self.identity,
            &[&recipient_key, &own_key],
            plaintext.as_bytes(),
        )
    }

    pub fn public_key(&self) -> IdentityKey {
        self.identity.public_key()
    }

    pub fn bot(&self) -> &BotIdentity {
        &self.bot
    }

    /// Release the bot identity. The private scalar is zeroized on drop.
    pub fn shutdown(self) {
        info!(bot = %self.bot, key_id = %self.identity.key_id(), "secure codec shut down");
    }
}
