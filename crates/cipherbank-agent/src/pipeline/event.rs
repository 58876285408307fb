use serde::Deserialize;
use serde_json::Value;

use cipherbank_core::{BotIdentity, UserId};

use crate::error::DispatchError;

/// Event type tag for a newly posted chat message.
pub const NEW_MESSAGE: &str = "message.new";

/// One webhook event, reduced to what the pipeline needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// A user posted a message. `ciphertext` is the sealed envelope.
    NewMessage { sender: UserId, ciphertext: String },
    /// A message posted by the bot itself, echoed back by the chat service.
    SelfAuthored,
    /// Any other event type. Acknowledged without processing.
    Other { kind: String, sender: Option<UserId> },
}

// Only `type` is strict; everything else is inspected after filtering.
#[derive(Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    user: Value,
    #[serde(default)]
    message: Value,
}

impl InboundEvent {
    /// Parse a webhook body.
    ///
    /// Events that are not `message.new`, and messages authored by `bot`, are
    /// returned without looking at the message payload. Only a user's
    /// `message.new` must carry a string sender and a string text.
    pub fn parse(body: &Value, bot: &BotIdentity) -> Result<Self, DispatchError> {
        let raw = RawEvent::deserialize(body)
            .map_err(|e| DispatchError::MalformedEvent(e.to_string()))?;

        let sender_id = &raw.user["id"];

        if raw.kind != NEW_MESSAGE {
            let sender = sender_id
                .as_str()
                .filter(|id| !id.is_empty())
                .map(UserId::from);
            return Ok(InboundEvent::Other {
                kind: raw.kind,
                sender,
            });
        }

        let sender = match sender_id {
            Value::String(id) if !id.is_empty() => id,
            Value::Null => return Err(DispatchError::MalformedEvent("missing user.id".into())),
            Value::String(_) => return Err(DispatchError::MalformedEvent("empty user.id".into())),
            _ => {
                return Err(DispatchError::MalformedEvent(
                    "user.id is not a string".into(),
                ))
            }
        };
        if bot.is_self(sender) {
            return Ok(InboundEvent::SelfAuthored);
        }

        let ciphertext = raw.message["text"]
            .as_str()
            .ok_or_else(|| DispatchError::MalformedEvent("missing message.text".into()))?;

        Ok(InboundEvent::NewMessage {
            sender: UserId::from(sender.as_str()),
            ciphertext: ciphertext.to_string(),
        })
    }

    pub fn kind(&self) -> &str {
        match self {
            InboundEvent::NewMessage { .. } | InboundEvent::SelfAuthored => NEW_MESSAGE,
            InboundEvent::Other { kind, .. } => kind,
        }
    }

    pub fn sender(&self) -> Option<&UserId> {
        match self {
            InboundEvent::NewMessage { sender, .. } => Some(sender),
            InboundEvent::SelfAuthored => None,
            InboundEvent::Other { sender, .. } => sender.as_ref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(body: Value) -> Result<InboundEvent, DispatchError> {
        InboundEvent::parse(&body, &BotIdentity::new("chatbot"))
    }

    #[test]
    fn parses_new_message() {
        let event = parse(json!({
            "type": "message.new",
            "user": {"id": "alice", "name": "Alice"},
            "message": {"id": "m1", "text": "c2VhbGVk"},
            "channel_id": "alice-chatbot"
        }))
        .unwrap();
        assert_eq!(
            event,
            InboundEvent::NewMessage {
                sender: UserId::from("alice"),
                ciphertext: "c2VhbGVk".into(),
            }
        );
        assert_eq!(event.kind(), NEW_MESSAGE);
    }

    #[test]
    fn other_event_types_need_no_sender() {
        let event = parse(json!({"type": "typing.start"})).unwrap();
        assert_eq!(
            event,
            InboundEvent::Other {
                kind: "typing.start".into(),
                sender: None
            }
        );
    }

    #[test]
    fn new_message_without_sender_is_malformed() {
        let err = parse(json!({
            "type": "message.new",
            "message": {"text": "x"}
        }))
        .unwrap_err();
        assert!(matches!(err, DispatchError::MalformedEvent(_)));

        let err = parse(json!({
            "type": "message.new",
            "user": {"id": ""},
            "message": {"text": "x"}
        }))
        .unwrap_err();
        assert!(matches!(err, DispatchError::MalformedEvent(_)));
    }

    #[test]
    fn new_message_without_text_is_malformed() {
        let err = parse(json!({
            "type": "message.new",
            "user": {"id": "alice"},
            "message": {}
        }))
        .unwrap_err();
        assert!(matches!(err, DispatchError::MalformedEvent(_)));
    }

    #[test]
    fn own_messages_are_filtered_before_payload_checks() {
        for message in [json!({"text": null}), json!({"attachments": []}), Value::Null] {
            let event = parse(json!({
                "type": "message.new",
                "user": {"id": "chatbot"},
                "message": message
            }))
            .unwrap();
            assert_eq!(event, InboundEvent::SelfAuthored);
            assert_eq!(event.sender(), None);
        }
    }

    #[test]
    fn other_event_types_tolerate_odd_senders() {
        let event = parse(json!({"type": "typing.start", "user": {"id": 42}})).unwrap();
        assert_eq!(
            event,
            InboundEvent::Other {
                kind: "typing.start".into(),
                sender: None
            }
        );

        let event = parse(json!({"type": "member.added", "user": "alice"})).unwrap();
        assert_eq!(event.kind(), "member.added");
    }

    #[test]
    fn new_message_with_non_string_sender_is_malformed() {
        let err = parse(json!({
            "type": "message.new",
            "user": {"id": 42},
            "message": {"text": "x"}
        }))
        .unwrap_err();
        assert!(matches!(err, DispatchError::MalformedEvent(_)));
    }

    #[test]
    fn missing_type_is_malformed() {
        assert!(parse(json!({"user": {"id": "alice"}})).is_err());
        assert!(parse(json!("message.new")).is_err());
    }
}
