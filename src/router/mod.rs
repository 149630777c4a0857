//! 消息路由：意图识别 → 能力分发 → 回复投递
//!
//! - **intent**：按有序规则表把入站消息映射为意图（纯函数）
//! - **dispatcher**：调用对应的 AI 能力，所有后端错误转为本地化 Failure
//! - **session**：单一入口，每条消息恰好一次出站发送
//! - **i18n**：俄 / 英文案与模型前言

pub mod dispatcher;
pub mod i18n;
pub mod intent;
pub mod message;
pub mod session;

pub use dispatcher::{DispatchOptions, Dispatcher};
pub use intent::IntentClassifier;
pub use message::{Capability, InboundEvent, Intent, Language, ReplyDescriptor};
pub use session::Session;
