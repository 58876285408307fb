//! REST key directory client.
//!
//! `GET  {base}/v1/keys/{user_id}` → `{"user_id": "...", "public_key": "<base64 SEC1>"}`
//! `PUT  {base}/v1/keys/{user_id}` with the same body; 409 when already registered.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use cipherbank_core::UserId;

use crate::directory::KeyDirectory;
use crate::error::{CodecError, Result};
use crate::identity::IdentityKey;

pub struct HttpKeyDirectory {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct KeyRecord {
    user_id: String,
    public_key: IdentityKey,
}

impl HttpKeyDirectory {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    fn key_url(&self, user_id: &UserId) -> String {
        format!(
            "{}/v1/keys/{}",
            self.base_url,
            urlencoding::encode(user_id.as_str())
        )
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }
}

#[async_trait]
impl KeyDirectory for HttpKeyDirectory {
    fn name(&self) -> &str {
        "http"
    }

    async fn resolve(&self, user_id: &UserId) -> Result<IdentityKey> {
        let url = self.key_url(user_id);
        debug!(user_id = %user_id, "resolving public key");

        let resp = self.authorize(self.client.get(&url)).send().await?;
        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(CodecError::KeyNotFound {
                user_id: user_id.to_string(),
            });
        }
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %text, "key directory error");
            return Err(CodecError::Directory(format!("{status}: {text}")));
        }

        let record: KeyRecord = resp
            .json()
            .await
            .map_err(|e| CodecError::Directory(format!("bad key record: {e}")))?;
        if record.user_id != user_id.as_str() {
            return Err(CodecError::Directory(format!(
                "directory answered for {} instead of {}",
                record.user_id, user_id
            )));
        }
        Ok(record.public_key)
    }

    async fn publish(&self, user_id: &UserId, key: &IdentityKey) -> Result<()> {
        let url = self.key_url(user_id);
        let record = KeyRecord {
            user_id: user_id.to_string(),
            public_key: key.clone(),
        };

        let resp = self
            .authorize(self.client.put(&url))
            .json(&record)
            .send()
            .await?;
        let status = resp.status();
        if status == reqwest::StatusCode::CONFLICT {
            return Err(CodecError::KeyAlreadyExists {
                user_id: user_id.to_string(),
            });
        }
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(CodecError::Directory(format!("{status}: {text}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_url_escapes_user_ids() {
        let dir = HttpKeyDirectory::new("http://keys.local/", None);
        assert_eq!(
            dir.key_url(&UserId::from("alice")),
            "http://keys.local/v1/keys/alice"
        );
        assert_eq!(
            dir.key_url(&UserId::from("a b/c")),
            "http://keys.local/v1/keys/a%20b%2Fc"
        );
    }
}
