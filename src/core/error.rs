//! 错误类型
//!
//! - GatewayError：与 AI 后端通信或解析响应失败，只在 Dispatcher 边界被捕获并转为 Failure 回复
//! - TransportError：通过消息平台发送回复失败，只记录日志，不重试
//! - BotError：启动阶段（配置、监听端口）的错误

use async_openai::error::{ApiError, OpenAIError};
use thiserror::Error;

/// AI 后端调用错误（网络、鉴权、限流、响应格式）
#[derive(Error, Debug, Clone)]
pub enum GatewayError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// 请求体构建失败（参数非法）
    #[error("Invalid request: {0}")]
    Request(String),
}

impl GatewayError {
    /// 按 HTTP 状态码归类非 2xx 响应
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => GatewayError::Auth(body),
            429 => GatewayError::RateLimited(body),
            _ => GatewayError::Api {
                status,
                message: body,
            },
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            GatewayError::MalformedResponse(e.to_string())
        } else {
            GatewayError::Network(e.to_string())
        }
    }
}

impl From<OpenAIError> for GatewayError {
    fn from(e: OpenAIError) -> Self {
        match e {
            OpenAIError::Reqwest(e) => GatewayError::Network(e.to_string()),
            OpenAIError::ApiError(api) => GatewayError::from_api_error(api),
            e @ OpenAIError::JSONDeserialize(..) => GatewayError::MalformedResponse(e.to_string()),
            other => GatewayError::Api {
                status: 0,
                message: other.to_string(),
            },
        }
    }
}

impl GatewayError {
    /// 按 OpenAI 错误体的 code / type 归类（async_openai 不暴露 HTTP 状态码）
    fn from_api_error(api: ApiError) -> Self {
        match (api.code.as_deref(), api.r#type.as_deref()) {
            (Some("rate_limit_exceeded" | "insufficient_quota"), _)
            | (_, Some("requests" | "tokens" | "insufficient_quota")) => {
                GatewayError::RateLimited(api.message)
            }
            (Some("invalid_api_key"), _) | (_, Some("authentication_error")) => {
                GatewayError::Auth(api.message)
            }
            _ => GatewayError::Api {
                status: 0,
                message: api.message,
            },
        }
    }
}

/// 消息平台投递错误
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Telegram request timed out after {0}s")]
    Timeout(u64),

    #[error("Telegram request failed: {0}")]
    Request(#[from] teloxide::RequestError),

    #[error("Telegram file download failed: {0}")]
    Download(#[from] teloxide::DownloadError),

    #[error("Telegram API error in {method}: {description}")]
    Api { method: String, description: String },

    #[error("Invalid chat id: {0}")]
    InvalidChat(String),

    #[error("Telegram client setup failed: {0}")]
    Client(String),

    #[error("Malformed Telegram response: {0}")]
    Malformed(String),
}

/// 启动错误
#[derive(Error, Debug)]
pub enum BotError {
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Missing setting: {0}")]
    MissingSetting(&'static str),
}
