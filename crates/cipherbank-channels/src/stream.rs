//! Stream Chat REST adapter.
//!
//! Server-side calls authenticate with an HS256 JWT carrying `{"server": true}`,
//! signed with the application's API secret.

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::{debug, instrument, warn};

use crate::{channel::Channel, error::ChannelError, types::OutboundMessage};

type HmacSha256 = Hmac<Sha256>;

const DEFAULT_BASE_URL: &str = "https://chat.stream-io-api.com";

pub struct StreamChatChannel {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    server_token: String,
}

impl StreamChatChannel {
    pub fn new(
        base_url: Option<String>,
        api_key: impl Into<String>,
        api_secret: &str,
    ) -> Result<Self, ChannelError> {
        let api_key = api_key.into();
        if api_key.is_empty() || api_secret.is_empty() {
            return Err(ChannelError::ConfigError(
                "channel.api_key and channel.api_secret are required".into(),
            ));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            api_key,
            server_token: server_token(api_secret)?,
        })
    }

    fn message_url(&self, msg: &OutboundMessage) -> String {
        format!(
            "{}/channels/{}/{}/message?api_key={}",
            self.base_url,
            urlencoding::encode(&msg.channel_type),
            urlencoding::encode(&msg.channel_id),
            urlencoding::encode(&self.api_key)
        )
    }
}

#[async_trait]
impl Channel for StreamChatChannel {
    fn name(&self) -> &str {
        "stream"
    }

    #[instrument(skip(self, msg), fields(channel = %msg.channel_id, author = %msg.author_id))]
    async fn send(&self, msg: &OutboundMessage) -> Result<(), ChannelError> {
        let body = serde_json::json!({
            "message": {
                "text": msg.text,
                "user_id": msg.author_id,
            }
        });

        let resp = self
            .client
            .post(self.message_url(msg))
            .header("Authorization", &self.server_token)
            .header("Stream-Auth-Type", "jwt")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            let text = resp.text().await.unwrap_or_default();
            return Err(ChannelError::AuthFailed(format!("{status}: {text}")));
        }
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %text, "Stream Chat send failed");
            return Err(ChannelError::SendFailed(format!("{status}: {text}")));
        }

        debug!("message delivered");
        Ok(())
    }
}

/// Build the server-side token. It never expires; Stream accepts
/// server tokens without `exp`.
fn server_token(api_secret: &str) -> Result<String, ChannelError> {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let claims = serde_json::json!({
        "server": true,
        "iat": chrono::Utc::now().timestamp(),
    });
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    let signing_input = format!("{header}.{payload}");

    let mut mac = HmacSha256::new_from_slice(api_secret.as_bytes())
        .map_err(|e| ChannelError::ConfigError(format!("api secret: {e}")))?;
    mac.update(signing_input.as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    Ok(format!("{signing_input}.{signature}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_token_is_a_verifiable_hs256_jwt() {
        let token = server_token("s3cret").unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        assert_eq!(parts.len(), 3);

        let header: serde_json::Value =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(parts[0]).unwrap()).unwrap();
        assert_eq!(header["alg"], "HS256");
        let claims: serde_json::Value =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(parts[1]).unwrap()).unwrap();
        assert_eq!(claims["server"], true);

        let mut mac = HmacSha256::new_from_slice(b"s3cret").unwrap();
        mac.update(format!("{}.{}", parts[0], parts[1]).as_bytes());
        mac.verify_slice(&URL_SAFE_NO_PAD.decode(parts[2]).unwrap())
            .unwrap();
    }

    #[test]
    fn message_url_includes_channel_and_api_key() {
        let ch = StreamChatChannel::new(Some("http://chat.local/".into()), "key1", "secret").unwrap();
        let msg = OutboundMessage {
            channel_type: "team".into(),
            channel_id: "alice-chatbot".into(),
            text: "x".into(),
            author_id: "chatbot".into(),
        };
        assert_eq!(
            ch.message_url(&msg),
            "http://chat.local/channels/team/alice-chatbot/message?api_key=key1"
        );
    }

    #[test]
    fn missing_credentials_are_rejected() {
        assert!(matches!(
            StreamChatChannel::new(None, "", "secret"),
            Err(ChannelError::ConfigError(_))
        ));
        assert!(matches!(
            StreamChatChannel::new(None, "key", ""),
            Err(ChannelError::ConfigError(_))
        ));
    }
}
