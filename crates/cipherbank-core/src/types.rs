use serde::{Deserialize, Serialize};
use std::fmt;

/// Chat-platform user identifier, as delivered in webhook payloads.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// The bot's reserved identity.
///
/// Replies are authored as this user, and inbound events sent by it are
/// dropped so the bot never answers its own messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotIdentity(UserId);

impl BotIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(UserId::new(id))
    }

    pub fn user_id(&self) -> &UserId {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// True when `sender` is the bot itself.
    pub fn is_self(&self, sender: &str) -> bool {
        self.0.as_str() == sender
    }

    /// Direct channel between a user and the bot: `{user_id}-{bot_id}`.
    pub fn channel_for(&self, user: &UserId) -> String {
        format!("{}-{}", user, self.0)
    }
}

impl fmt::Display for BotIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bot_recognises_itself() {
        let bot = BotIdentity::new("chatbot");
        assert!(bot.is_self("chatbot"));
        assert!(!bot.is_self("alice"));
        assert!(!bot.is_self("Chatbot"));
    }

    #[test]
    fn channel_id_pairs_user_with_bot() {
        let bot = BotIdentity::new("chatbot");
        assert_eq!(bot.channel_for(&UserId::from("alice")), "alice-chatbot");
    }

    #[test]
    fn user_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&UserId::from("bob")).unwrap();
        assert_eq!(json, r#""bob""#);
    }
}
