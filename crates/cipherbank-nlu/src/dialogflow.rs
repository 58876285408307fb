use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{NluError, Result};
use crate::provider::IntentDetector;
use crate::types::IntentResult;

/// Dialogflow ES `detectIntent` REST client.
pub struct DialogflowDetector {
    client: reqwest::Client,
    base_url: String,
    project_id: String,
    access_token: Option<String>,
}

impl DialogflowDetector {
    pub fn new(base_url: Option<String>, project_id: String, access_token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url
                .unwrap_or_else(|| "https://dialogflow.googleapis.com".to_string())
                .trim_end_matches('/')
                .to_string(),
            project_id,
            access_token,
        }
    }

    fn session_url(&self, session: &str) -> String {
        format!(
            "{}/v2/projects/{}/agent/sessions/{}:detectIntent",
            self.base_url,
            self.project_id,
            urlencoding::encode(session)
        )
    }
}

#[async_trait]
impl IntentDetector for DialogflowDetector {
    fn name(&self) -> &str {
        "dialogflow"
    }

    async fn detect_intent(&self, session: &str, text: &str, locale: &str) -> Result<IntentResult> {
        let url = self.session_url(session);
        let body = build_request_body(text, locale);

        debug!(session, locale, "sending detectIntent request");

        let mut req = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .json(&body);
        if let Some(token) = &self.access_token {
            req = req.bearer_auth(token);
        }

        let resp = req.send().await.map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                NluError::Unavailable(e.to_string())
            } else {
                NluError::Http(e)
            }
        })?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(status, body = %text, "Dialogflow API error");
            return Err(NluError::Api {
                status,
                message: text,
            });
        }

        let api_resp: ApiResponse = resp
            .json()
            .await
            .map_err(|e| NluError::Parse(e.to_string()))?;

        Ok(parse_response(api_resp))
    }
}

fn build_request_body(text: &str, locale: &str) -> Value {
    serde_json::json!({
        "queryInput": {
            "text": {
                "text": text,
                "languageCode": locale,
            }
        }
    })
}

fn parse_response(resp: ApiResponse) -> IntentResult {
    let query = resp.query_result.unwrap_or_default();
    IntentResult {
        intent: query
            .intent
            .map(|i| i.display_name)
            .filter(|name| !name.is_empty()),
        parameters: query.parameters,
        fulfillment_text: query.fulfillment_text,
    }
}

// Dialogflow response types, deserialization only

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiResponse {
    query_result: Option<QueryResult>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct QueryResult {
    intent: Option<ApiIntent>,
    #[serde(default)]
    parameters: Map<String, Value>,
    #[serde(default)]
    fulfillment_text: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiIntent {
    #[serde(default)]
    display_name: String,
}
