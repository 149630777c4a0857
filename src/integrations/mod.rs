//! 外部集成：消息平台抽象与 Telegram Webhook 实现

pub mod messenger;
pub mod telegram;

pub use messenger::{MessagingGateway, RecordingMessenger, SentMessage};
pub use telegram::{create_router, TelegramMessenger, TelegramState};
