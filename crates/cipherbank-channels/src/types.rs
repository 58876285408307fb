use serde::{Deserialize, Serialize};

use cipherbank_core::{BotIdentity, UserId};

/// A message to be delivered to a chat channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Channel type on the chat service (e.g. "team", "messaging").
    pub channel_type: String,

    /// Channel identifier within that type.
    pub channel_id: String,

    /// Content to deliver. For the bot this is always a sealed envelope.
    pub text: String,

    /// User the message is posted as.
    pub author_id: String,
}

impl OutboundMessage {
    /// Reply from the bot into its private channel with `recipient`.
    pub fn reply(
        bot: &BotIdentity,
        recipient: &UserId,
        channel_type: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            channel_type: channel_type.into(),
            channel_id: bot.channel_for(recipient),
            text: text.into(),
            author_id: bot.as_str().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_targets_the_user_bot_channel() {
        let bot = BotIdentity::new("chatbot");
        let msg = OutboundMessage::reply(&bot, &UserId::from("alice"), "team", "sealed");
        assert_eq!(msg.channel_type, "team");
        assert_eq!(msg.channel_id, "alice-chatbot");
        assert_eq!(msg.author_id, "chatbot");
        assert_eq!(msg.text, "sealed");
    }
}
