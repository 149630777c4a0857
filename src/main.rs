//! KiraBot Telegram 服务
//!
//! 通过 Telegram Webhook 接收消息，调用 OpenAI 兼容 API 生成回复。
//!
//! 环境变量:
//! - TELEGRAM_TOKEN（或 KIRA__TELEGRAM__TOKEN）: Bot token
//! - OPENAI_API_KEY（或 KIRA__LLM__API_KEY）: API Key
//! - KIRA__SERVER__PORT: 监听端口（默认 10000）
//! - KIRA__SERVER__WEBHOOK_SECRET: 可选，setWebhook 时的 secret_token
//!
//! 启动: cargo run -- [config.toml]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use kira::config::load_config;
use kira::core::shutdown_signal;
use kira::integrations::{create_router, TelegramMessenger, TelegramState};
use kira::llm::OpenAiGateway;
use kira::observability;
use kira::router::Session;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let cfg = load_config(config_path).context("Failed to load config")?;

    let token = cfg.telegram_token()?;
    let api_key = cfg.openai_api_key()?;

    let ai = Arc::new(OpenAiGateway::new(&cfg, &api_key).context("Failed to build AI client")?);
    let messenger = Arc::new(
        TelegramMessenger::new(
            token,
            &cfg.telegram.api_base,
            cfg.telegram.request_timeout_secs,
        )
        .context("Failed to build Telegram client")?,
    );
    let session = Arc::new(Session::from_config(&cfg, ai, messenger));

    let state = Arc::new(TelegramState {
        session,
        webhook_secret: cfg.server.webhook_secret.clone(),
    });
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", cfg.server.host, cfg.server.port)
        .parse()
        .context("Invalid server.host / server.port")?;
    tracing::info!("KiraBot listening on http://{}", addr);
    tracing::info!(
        chat_model = %cfg.llm.chat_model,
        image_model = %cfg.image.model,
        "Webhook URL: https://YOUR_HOST/webhook"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("KiraBot stopped");
    Ok(())
}
