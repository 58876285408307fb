use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_BOT_ID: &str = "chatbot";
pub const DEFAULT_LOCALE: &str = "en-US";
pub const DEFAULT_CHANNEL_TYPE: &str = "team";
pub const OPENING_CHECKING: f64 = 1000.0;
pub const OPENING_SAVINGS: f64 = 500.0;
pub const REQUEST_TIMEOUT_MS: u64 = 10_000; // per external round trip

/// Top-level config (cipherbank.toml + CIPHERBANK_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CipherBankConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub keys: KeyDirectoryConfig,
    #[serde(default)]
    pub nlu: NluConfig,
    #[serde(default)]
    pub channel: ChannelConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default)]
    pub webhook_auth: WebhookAuthMode,
    /// Shared secret for `hmac-sha256` webhook verification.
    pub webhook_secret: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
            webhook_auth: WebhookAuthMode::default(),
            webhook_secret: None,
        }
    }
}

/// Authentication mode for the inbound message webhook.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum WebhookAuthMode {
    /// Hex HMAC-SHA256 of the raw body in the `X-Signature` header.
    HmacSha256,
    /// No authentication (use only for internal/trusted networks).
    #[default]
    None,
}

/// The bot's own identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Reserved user id the bot authors replies as. Events from this id are ignored.
    #[serde(default = "default_bot_id")]
    pub id: String,
    /// Hex-encoded P-256 private scalar. When unset an ephemeral identity is
    /// generated at startup and replies cannot be read after a restart.
    pub private_key: Option<String>,
    /// Language tag sent with every utterance to the NLU service.
    #[serde(default = "default_locale")]
    pub locale: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            id: default_bot_id(),
            private_key: None,
            locale: default_locale(),
        }
    }
}

/// Opening balances for newly seen users.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default = "default_opening_checking")]
    pub opening_checking: f64,
    #[serde(default = "default_opening_savings")]
    pub opening_savings: f64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            opening_checking: OPENING_CHECKING,
            opening_savings: OPENING_SAVINGS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Deadline applied to each external call (key lookup, NLU, delivery).
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: REQUEST_TIMEOUT_MS,
        }
    }
}

/// Identity / public-key lookup service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyDirectoryConfig {
    #[serde(default = "default_keys_base_url")]
    pub base_url: String,
    /// Bearer token for the directory API.
    pub token: Option<String>,
    /// Memoise resolved keys for the process lifetime.
    #[serde(default = "bool_true")]
    pub cache: bool,
}

impl Default for KeyDirectoryConfig {
    fn default() -> Self {
        Self {
            base_url: default_keys_base_url(),
            token: None,
            cache: true,
        }
    }
}

/// Intent detection service (Dialogflow-compatible REST API).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NluConfig {
    #[serde(default = "default_nlu_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub project_id: String,
    pub access_token: Option<String>,
}

impl Default for NluConfig {
    fn default() -> Self {
        Self {
            base_url: default_nlu_base_url(),
            project_id: String::new(),
            access_token: None,
        }
    }
}

/// Outbound chat service (Stream Chat-compatible REST API).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    #[serde(default = "default_channel_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_secret: String,
    #[serde(default = "default_channel_type")]
    pub channel_type: String,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            base_url: default_channel_base_url(),
            api_key: String::new(),
            api_secret: String::new(),
            channel_type: default_channel_type(),
        }
    }
}

fn bool_true() -> bool {
    true
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_bot_id() -> String {
    DEFAULT_BOT_ID.to_string()
}
fn default_locale() -> String {
    DEFAULT_LOCALE.to_string()
}
fn default_opening_checking() -> f64 {
    OPENING_CHECKING
}
fn default_opening_savings() -> f64 {
    OPENING_SAVINGS
}
fn default_request_timeout_ms() -> u64 {
    REQUEST_TIMEOUT_MS
}
fn default_keys_base_url() -> String {
    "http://localhost:8090".to_string()
}
fn default_nlu_base_url() -> String {
    "https://dialogflow.googleapis.com".to_string()
}
fn default_channel_base_url() -> String {
    "https://chat.stream-io-api.com".to_string()
}
fn default_channel_type() -> String {
    DEFAULT_CHANNEL_TYPE.to_string()
}

impl CipherBankConfig {
    /// Load config from a TOML file with CIPHERBANK_* env var overrides.
    ///
    /// Nested keys use a double underscore: `CIPHERBANK_BOT__PRIVATE_KEY`.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("CIPHERBANK_").split("__"))
            .extract()
            .map_err(|e| crate::error::CipherBankError::Config(e.to_string()))
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.cipherbank/cipherbank.toml", home)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = CipherBankConfig::default();
        assert_eq!(config.bot.id, "chatbot");
        assert_eq!(config.bot.locale, "en-US");
        assert_eq!(config.ledger.opening_checking, 1000.0);
        assert_eq!(config.ledger.opening_savings, 500.0);
        assert_eq!(config.channel.channel_type, "team");
        assert_eq!(config.gateway.webhook_auth, WebhookAuthMode::None);
        assert!(config.keys.cache);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let toml = r#"
            [bot]
            id = "teller"

            [gateway]
            port = 9000
            webhook_auth = "hmac-sha256"
            webhook_secret = "s3cret"
        "#;
        let config: CipherBankConfig = Figment::new()
            .merge(Toml::string(toml))
            .extract()
            .expect("extract failed");
        assert_eq!(config.bot.id, "teller");
        assert_eq!(config.bot.locale, DEFAULT_LOCALE);
        assert_eq!(config.gateway.port, 9000);
        assert_eq!(config.gateway.bind, DEFAULT_BIND);
        assert_eq!(config.gateway.webhook_auth, WebhookAuthMode::HmacSha256);
        assert_eq!(config.pipeline.request_timeout_ms, REQUEST_TIMEOUT_MS);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = CipherBankConfig::load(Some("/nonexistent/cipherbank.toml"))
            .expect("load failed");
        assert_eq!(config.gateway.port, DEFAULT_PORT);
    }

    #[test]
    fn invalid_file_is_a_config_error() {
        let path = std::env::temp_dir().join(format!("cipherbank-bad-{}.toml", std::process::id()));
        std::fs::write(&path, "[gateway]\nport = \"not a port\"\n").unwrap();

        let err = CipherBankConfig::load(path.to_str()).unwrap_err();
        std::fs::remove_file(&path).ok();

        assert!(matches!(err, crate::error::CipherBankError::Config(_)));
        assert!(err.to_string().starts_with("Configuration error"));
    }
}
