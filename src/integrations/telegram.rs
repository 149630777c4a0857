//! Telegram Bot API 集成
//!
//! 通过 Webhook 接收 Update，交给 Session 处理后用 teloxide Bot 发送回复。
//!
//! Telegram 要求 Webhook 尽快返回 200，否则会重发同一 Update。
//! 本模块在解析 Update 后立即返回，耗时处理在后台任务中执行。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use teloxide::net::Download;
use teloxide::requests::Requester;
use teloxide::types::{ChatId, InputFile, Message, Update, UpdateKind};
use teloxide::{Bot, DownloadError, RequestError};

use crate::core::TransportError;
use crate::integrations::MessagingGateway;
use crate::router::{InboundEvent, Language, Session};

/// setWebhook 的 secret_token 会原样出现在此请求头中
const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

/// Telegram 单条消息上限 4096 字符，留一点余量
const MAX_MESSAGE_CHARS: usize = 4000;

/// Webhook 服务状态
pub struct TelegramState {
    pub session: Arc<Session>,
    pub webhook_secret: Option<String>,
}

/// Update 解析结果
#[derive(Debug, PartialEq, Eq)]
pub enum Inbound {
    /// /start 命令
    Start { user_id: String, language: Language },
    /// 需要走路由的普通消息
    Event(InboundEvent),
}

/// 将 Update 转为入站消息
///
/// 返回 None 的情况：非新消息（编辑、回调等）、没有文本也没有图片（贴纸、位置等）、
/// 除 /start 以外的命令。
pub fn parse_update(update: Update) -> Option<Inbound> {
    let UpdateKind::Message(msg) = update.kind else {
        return None;
    };
    parse_message(&msg)
}

fn parse_message(msg: &Message) -> Option<Inbound> {
    let user_id = msg.chat.id.0.to_string();
    let locale_hint = msg.from.as_ref().and_then(|u| u.language_code.clone());

    if let Some(command) = msg.text().and_then(command_name) {
        if command == "/start" {
            return Some(Inbound::Start {
                user_id,
                language: Language::from_locale(locale_hint.as_deref()),
            });
        }
        tracing::debug!(%user_id, command, "Telegram: unsupported command, ignoring");
        return None;
    }

    let raw_text = msg.text().or_else(|| msg.caption()).map(str::to_string);

    // 同一张图的多个尺寸，取像素最多的一张
    let attachment = msg.photo().and_then(|sizes| {
        sizes
            .iter()
            .max_by_key(|p| u64::from(p.width) * u64::from(p.height))
            .map(|p| p.file.id.to_string())
    });

    if raw_text.is_none() && attachment.is_none() {
        return None;
    }

    Some(Inbound::Event(InboundEvent {
        user_id,
        raw_text,
        attachment,
        locale_hint,
    }))
}

/// "/start@KiraBot payload" → "/start"；不是命令返回 None
fn command_name(text: &str) -> Option<&str> {
    let token = text.split_whitespace().next()?;
    if !token.starts_with('/') {
        return None;
    }
    Some(token.split_once('@').map_or(token, |(name, _)| name))
}

/// 创建 Telegram 路由
pub fn create_router(state: Arc<TelegramState>) -> Router {
    Router::new()
        .route("/webhook", post(webhook_receive))
        .route("/health", get(|| async { "OK" }))
        .with_state(state)
}

/// POST /webhook - 接收 Telegram Update
async fn webhook_receive(
    State(state): State<Arc<TelegramState>>,
    headers: HeaderMap,
    Json(update): Json<Update>,
) -> StatusCode {
    let update_id = update.id;
    if let Some(expected) = state.webhook_secret.as_deref() {
        let provided = headers.get(SECRET_HEADER).and_then(|v| v.to_str().ok());
        if provided != Some(expected) {
            tracing::warn!(?update_id, "Telegram webhook: secret token mismatch");
            return StatusCode::FORBIDDEN;
        }
    }

    let Some(inbound) = parse_update(update) else {
        tracing::debug!(?update_id, "Telegram webhook: nothing to handle, ignoring");
        return StatusCode::OK;
    };

    let session = state.session.clone();
    tokio::spawn(async move {
        match inbound {
            Inbound::Start { user_id, language } => session.greet(&user_id, language).await,
            Inbound::Event(event) => {
                session.handle(event).await;
            }
        }
    });

    StatusCode::OK
}

/// 按字符切分长文本
fn chunk_text(body: &str, max_len: usize) -> Vec<String> {
    if body.chars().count() <= max_len {
        return vec![body.to_string()];
    }
    body.chars()
        .collect::<Vec<_>>()
        .chunks(max_len)
        .map(|c| c.iter().collect())
        .collect()
}

/// 根据文件扩展名推断图片 MIME
fn image_mime(file_path: &str) -> &'static str {
    let ext = file_path
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        _ => "image/jpeg",
    }
}

fn chat_id(user_id: &str) -> Result<ChatId, TransportError> {
    user_id
        .parse::<i64>()
        .map(ChatId)
        .map_err(|_| TransportError::InvalidChat(user_id.to_string()))
}

/// Bot API 客户端（所有请求与文件下载共用一个带超时的 HTTP 客户端）
pub struct TelegramMessenger {
    bot: Bot,
    timeout_secs: u64,
}

impl TelegramMessenger {
    pub fn new(
        token: impl Into<String>,
        api_base: &str,
        timeout_secs: u64,
    ) -> Result<Self, TransportError> {
        let client = teloxide::net::default_reqwest_settings()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;
        let api_url = reqwest::Url::parse(&format!("{}/", api_base.trim_end_matches('/')))
            .map_err(|e| TransportError::Client(format!("api_base {}: {}", api_base, e)))?;

        Ok(Self {
            bot: Bot::with_client(token, client).set_api_url(api_url),
            timeout_secs,
        })
    }

    fn map_request(&self, e: RequestError) -> TransportError {
        match &e {
            RequestError::Network(inner) if inner.is_timeout() => {
                TransportError::Timeout(self.timeout_secs)
            }
            _ => TransportError::Request(e),
        }
    }

    fn map_download(&self, e: DownloadError) -> TransportError {
        match &e {
            DownloadError::Network(inner) if inner.is_timeout() => {
                TransportError::Timeout(self.timeout_secs)
            }
            _ => TransportError::Download(e),
        }
    }
}

#[async_trait]
impl MessagingGateway for TelegramMessenger {
    /// 超长文本分条发送；中途失败时前面的分片已送达，日志里记下失败位置
    async fn send_text(&self, user_id: &str, text: &str) -> Result<(), TransportError> {
        let chat = chat_id(user_id)?;
        let chunks = chunk_text(text, MAX_MESSAGE_CHARS);
        let total = chunks.len();
        for (index, chunk) in chunks.into_iter().enumerate() {
            if let Err(e) = self.bot.send_message(chat, chunk).await {
                tracing::warn!(
                    %user_id,
                    chunk = index + 1,
                    total,
                    error = %e,
                    "Telegram sendMessage failed, reply is incomplete"
                );
                return Err(self.map_request(e));
            }
        }
        Ok(())
    }

    async fn send_photo(&self, user_id: &str, bytes: Bytes) -> Result<(), TransportError> {
        let input = InputFile::memory(bytes.to_vec()).file_name("image.png");
        self.bot
            .send_photo(chat_id(user_id)?, input)
            .await
            .map_err(|e| self.map_request(e))?;
        Ok(())
    }

    async fn send_voice(&self, user_id: &str, bytes: Bytes) -> Result<(), TransportError> {
        let input = InputFile::memory(bytes.to_vec()).file_name("voice.ogg");
        self.bot
            .send_voice(chat_id(user_id)?, input)
            .await
            .map_err(|e| self.map_request(e))?;
        Ok(())
    }

    /// getFile 后下载文件，转成 data: URL，避免把带 token 的下载地址交给第三方
    async fn resolve_attachment(&self, attachment: &str) -> Result<String, TransportError> {
        let file = self
            .bot
            .get_file(attachment)
            .await
            .map_err(|e| self.map_request(e))?;
        if file.path.is_empty() {
            return Err(TransportError::Malformed(format!(
                "getFile {}: empty file_path",
                attachment
            )));
        }

        let mut data = Vec::new();
        self.bot
            .download_file(&file.path, &mut data)
            .await
            .map_err(|e| self.map_download(e))?;

        Ok(format!(
            "data:{};base64,{}",
            image_mime(&file.path),
            STANDARD.encode(&data)
        ))
    }
}
