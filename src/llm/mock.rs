//! Mock AI 后端（用于测试，无需 API）
//!
//! 默认回显用户输入；`failing` 构造的实例对每个调用都返回给定错误。所有调用都被记录，便于断言参数。

use std::sync::Mutex;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;

use crate::core::GatewayError;
use crate::llm::AiGateway;

/// Mock 画图返回的原始字节（base64 编码后交给调用方）
pub const MOCK_IMAGE_BYTES: &[u8] = b"\x89PNG mock image";
/// Mock 语音返回的原始字节
pub const MOCK_VOICE_BYTES: &[u8] = b"OggS mock voice";

/// 被记录的一次调用
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Chat { preamble: String, text: String },
    Image { prompt: String, size: String },
    Speech { text: String, voice: String },
    Describe { instruction: String, reference: String },
}

/// Mock 客户端
#[derive(Debug, Default)]
pub struct MockAiGateway {
    failure: Option<GatewayError>,
    calls: Mutex<Vec<MockCall>>,
}

impl MockAiGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// 每次调用都返回 `error`
    pub fn failing(error: GatewayError) -> Self {
        Self {
            failure: Some(error),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// 迄今为止记录到的调用
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn record(&self, call: MockCall) -> Result<(), GatewayError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
        match &self.failure {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl AiGateway for MockAiGateway {
    async fn chat_complete(
        &self,
        system_preamble: &str,
        user_text: &str,
    ) -> Result<String, GatewayError> {
        self.record(MockCall::Chat {
            preamble: system_preamble.to_string(),
            text: user_text.to_string(),
        })?;
        Ok(format!("Echo from Mock: {}", user_text))
    }

    async fn generate_image(&self, prompt: &str, size: &str) -> Result<String, GatewayError> {
        self.record(MockCall::Image {
            prompt: prompt.to_string(),
            size: size.to_string(),
        })?;
        Ok(STANDARD.encode(MOCK_IMAGE_BYTES))
    }

    async fn synthesize(&self, text: &str, voice: &str) -> Result<Bytes, GatewayError> {
        self.record(MockCall::Speech {
            text: text.to_string(),
            voice: voice.to_string(),
        })?;
        Ok(Bytes::from_static(MOCK_VOICE_BYTES))
    }

    async fn describe_image(
        &self,
        instruction: &str,
        image_reference: &str,
    ) -> Result<String, GatewayError> {
        self.record(MockCall::Describe {
            instruction: instruction.to_string(),
            reference: image_reference.to_string(),
        })?;
        Ok(format!("Mock description of {}", image_reference))
    }
}
