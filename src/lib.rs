//! KiraBot - Telegram 双语 AI 助手
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型、优雅关闭
//! - **integrations**: 消息平台抽象与 Telegram Webhook / Bot API 实现
//! - **llm**: AI 后端抽象与实现（OpenAI 兼容 / Mock）
//! - **observability**: 日志初始化
//! - **router**: 意图识别、能力分发、会话入口

pub mod config;
pub mod core;
pub mod integrations;
pub mod llm;
pub mod observability;
pub mod router;

pub use router::{InboundEvent, Intent, ReplyDescriptor, Session};
