//! 消息平台抽象
//!
//! Session 只依赖 MessagingGateway；Telegram 实现见 telegram.rs，测试用 RecordingMessenger 记录发出的消息。

use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;

use crate::core::TransportError;

/// 出站发送与附件解析
#[async_trait]
pub trait MessagingGateway: Send + Sync {
    async fn send_text(&self, user_id: &str, text: &str) -> Result<(), TransportError>;

    async fn send_photo(&self, user_id: &str, bytes: Bytes) -> Result<(), TransportError>;

    async fn send_voice(&self, user_id: &str, bytes: Bytes) -> Result<(), TransportError>;

    /// 将平台附件句柄解析为 AI 后端可读取的图片引用（URL 或 data: URL）
    async fn resolve_attachment(&self, attachment: &str) -> Result<String, TransportError>;
}

/// 一次已发出的消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentMessage {
    Text { user_id: String, text: String },
    Photo { user_id: String, bytes: Bytes },
    Voice { user_id: String, bytes: Bytes },
}

/// 记录型 Messenger（测试用）：所有发送写入内存，附件解析为 `mock://{file_id}`
#[derive(Debug, Default)]
pub struct RecordingMessenger {
    sent: Mutex<Vec<SentMessage>>,
    fail_sends: bool,
}

impl RecordingMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    /// 所有发送与附件解析都返回错误
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_sends: true,
        }
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    fn push(&self, method: &str, msg: SentMessage) -> Result<(), TransportError> {
        if self.fail_sends {
            return Err(TransportError::Api {
                method: method.to_string(),
                description: "simulated transport failure".to_string(),
            });
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(msg);
        }
        Ok(())
    }
}

#[async_trait]
impl MessagingGateway for RecordingMessenger {
    async fn send_text(&self, user_id: &str, text: &str) -> Result<(), TransportError> {
        self.push(
            "sendMessage",
            SentMessage::Text {
                user_id: user_id.to_string(),
                text: text.to_string(),
            },
        )
    }

    async fn send_photo(&self, user_id: &str, bytes: Bytes) -> Result<(), TransportError> {
        self.push(
            "sendPhoto",
            SentMessage::Photo {
                user_id: user_id.to_string(),
                bytes,
            },
        )
    }

    async fn send_voice(&self, user_id: &str, bytes: Bytes) -> Result<(), TransportError> {
        self.push(
            "sendVoice",
            SentMessage::Voice {
                user_id: user_id.to_string(),
                bytes,
            },
        )
    }

    async fn resolve_attachment(&self, attachment: &str) -> Result<String, TransportError> {
        if self.fail_sends {
            return Err(TransportError::Malformed(format!(
                "cannot resolve {}",
                attachment
            )));
        }
        Ok(format!("mock://{}", attachment))
    }
}
