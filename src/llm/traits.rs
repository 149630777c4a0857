//! AI 后端抽象
//!
//! 所有后端（OpenAI 兼容 / Mock）实现 AiGateway：聊天补全、画图、语音合成、识图。
//! 调用方通过构造注入 `Arc<dyn AiGateway>`，测试时替换为 MockAiGateway。

use async_trait::async_trait;
use bytes::Bytes;

use crate::core::GatewayError;

/// AI 后端 trait：每个方法对应一次远程调用，失败即返回，不做内部重试
#[async_trait]
pub trait AiGateway: Send + Sync {
    /// 单轮聊天补全：一条 system 前言 + 一条用户消息
    async fn chat_complete(&self, system_preamble: &str, user_text: &str)
        -> Result<String, GatewayError>;

    /// 画图，返回 base64 编码的图片
    async fn generate_image(&self, prompt: &str, size: &str) -> Result<String, GatewayError>;

    /// 文本转语音，返回原始音频字节
    async fn synthesize(&self, text: &str, voice: &str) -> Result<Bytes, GatewayError>;

    /// 识图：instruction 作为 system 指令，image_reference 为可访问的图片 URL（含 data: URL）
    async fn describe_image(
        &self,
        instruction: &str,
        image_reference: &str,
    ) -> Result<String, GatewayError>;
}
