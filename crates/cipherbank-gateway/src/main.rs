use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use cipherbank_agent::MessageDispatcher;
use cipherbank_channels::StreamChatChannel;
use cipherbank_codec::{CachedKeyDirectory, HttpKeyDirectory, Identity, KeyDirectory, SecureCodec};
use cipherbank_core::config::{CipherBankConfig, WebhookAuthMode};
use cipherbank_core::BotIdentity;
use cipherbank_ledger::{AccountLedger, Balances};
use cipherbank_nlu::{DialogflowDetector, IntentInterpreter};
use cipherbank_sessions::SessionRegistry;

mod app;
mod http;

const DEFAULT_LOG_FILTER: &str = "cipherbank_gateway=info,cipherbank_agent=info,tower_http=debug";

#[derive(Parser, Debug)]
#[command(name = "cipherbank-gateway", about = "Encrypted banking chat bot", version)]
struct Cli {
    /// Config file path (defaults to $CIPHERBANK_CONFIG, then ~/.cipherbank/cipherbank.toml)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the webhook server (default)
    Serve,

    /// Generate a bot private key for `bot.private_key`
    Keygen,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Keygen => {
            keygen();
            Ok(())
        }
        Command::Serve => serve(cli.config).await,
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn keygen() {
    let identity = Identity::generate();
    let public = identity.public_key();
    println!("private_key = \"{}\"", identity.to_hex());
    println!("# public key: {}", public.to_base64());
    println!("# key id:     {}", public.key_id());
}

async fn serve(config_path: Option<String>) -> anyhow::Result<()> {
    // explicit path > CIPHERBANK_CONFIG env > ~/.cipherbank/cipherbank.toml
    let config_path = config_path.or_else(|| std::env::var("CIPHERBANK_CONFIG").ok());
    let config = CipherBankConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        warn!("Config load failed ({}), using defaults", e);
        CipherBankConfig::default()
    });

    if config.gateway.webhook_auth == WebhookAuthMode::HmacSha256
        && config.gateway.webhook_secret.is_none()
    {
        warn!("webhook_auth = hmac-sha256 but no webhook_secret set; every webhook will be rejected");
    }

    let codec = Arc::new(build_codec(&config).await?);

    let detector = Arc::new(DialogflowDetector::new(
        Some(config.nlu.base_url.clone()),
        config.nlu.project_id.clone(),
        config.nlu.access_token.clone(),
    ));
    let interpreter = IntentInterpreter::new(detector, config.bot.locale.clone());

    let channel = Arc::new(
        StreamChatChannel::new(
            Some(config.channel.base_url.clone()),
            config.channel.api_key.clone(),
            &config.channel.api_secret,
        )
        .context("building chat channel")?,
    );

    let ledger = Arc::new(AccountLedger::new(Balances::new(
        config.ledger.opening_checking,
        config.ledger.opening_savings,
    )));
    let sessions = Arc::new(SessionRegistry::new());

    let dispatcher = MessageDispatcher::new(
        ledger,
        sessions,
        Arc::clone(&codec),
        interpreter,
        channel,
    )
    .with_channel_type(config.channel.channel_type.clone())
    .with_timeout(Duration::from_millis(config.pipeline.request_timeout_ms));

    let addr: SocketAddr = format!("{}:{}", config.gateway.bind, config.gateway.port).parse()?;
    let state = Arc::new(app::AppState::new(config, dispatcher));
    let router = app::build_router(Arc::clone(&state));

    info!("CipherBank gateway listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Release the dispatcher's handle so the codec can be shut down.
    drop(state);
    match Arc::try_unwrap(codec) {
        Ok(codec) => codec.shutdown(),
        Err(_) => warn!("secure codec still referenced at shutdown"),
    }
    Ok(())
}

/// Bot identity from config (or a fresh one), key directory, and startup
/// registration of the bot's public key.
async fn build_codec(config: &CipherBankConfig) -> anyhow::Result<SecureCodec> {
    let identity = match config.bot.private_key.as_deref() {
        Some(hex) => Identity::from_hex(hex).context("bot.private_key")?,
        None => {
            warn!("no bot.private_key configured; using an ephemeral identity (run `keygen`)");
            Identity::generate()
        }
    };

    let http: Arc<dyn KeyDirectory> = Arc::new(HttpKeyDirectory::new(
        config.keys.base_url.clone(),
        config.keys.token.clone(),
    ));
    let directory: Arc<dyn KeyDirectory> = if config.keys.cache {
        Arc::new(CachedKeyDirectory::new(http))
    } else {
        http
    };
    info!(directory = directory.name(), base_url = %config.keys.base_url, "key directory ready");

    let codec = SecureCodec::new(BotIdentity::new(config.bot.id.clone()), identity, directory);
    codec
        .register()
        .await
        .context("registering bot identity with key directory")?;
    Ok(codec)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
