//! 路由层数据模型
//!
//! InboundEvent → Intent → ReplyDescriptor，三者均为单次请求内创建、创建后不再修改。

use std::fmt;

use bytes::Bytes;

/// 一次入站消息（由 Webhook 解析得到）
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InboundEvent {
    /// 回复目标（Telegram chat_id）
    pub user_id: String,
    /// 文本或图片说明
    pub raw_text: Option<String>,
    /// 图片句柄（Telegram file_id）
    pub attachment: Option<String>,
    /// 客户端语言代码，如 "ru"、"en-US"
    pub locale_hint: Option<String>,
}

impl InboundEvent {
    pub fn text(user_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            raw_text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn photo(user_id: impl Into<String>, attachment: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            attachment: Some(attachment.into()),
            ..Default::default()
        }
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale_hint = Some(locale.into());
        self
    }

    /// 回复语言
    pub fn language(&self) -> Language {
        Language::from_locale(self.locale_hint.as_deref())
    }
}

/// 识别出的意图
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// 普通对话
    Chat { text: String },
    /// 画图
    GenerateImage { prompt: String },
    /// 翻译
    Translate { text: String, target_lang: String },
    /// 文本转语音
    Synthesize { text: String },
    /// 识图
    DescribeImage { attachment: String },
}

impl Intent {
    pub fn capability(&self) -> Capability {
        match self {
            Intent::Chat { .. } => Capability::Chat,
            Intent::GenerateImage { .. } => Capability::Image,
            Intent::Translate { .. } => Capability::Translate,
            Intent::Synthesize { .. } => Capability::Voice,
            Intent::DescribeImage { .. } => Capability::Describe,
        }
    }
}

/// 意图对应的能力，用于选择失败提示与日志字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Chat,
    Image,
    Translate,
    Voice,
    Describe,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Chat => write!(f, "chat"),
            Capability::Image => write!(f, "image"),
            Capability::Translate => write!(f, "translate"),
            Capability::Voice => write!(f, "voice"),
            Capability::Describe => write!(f, "describe"),
        }
    }
}

/// 回复语言：仅区分俄语与英语
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    Ru,
    #[default]
    En,
}

impl Language {
    /// "ru"、"ru-RU" 为俄语，其余（含缺失）为英语
    pub fn from_locale(locale: Option<&str>) -> Self {
        match locale {
            Some(l) if l.to_lowercase().starts_with("ru") => Language::Ru,
            _ => Language::En,
        }
    }
}

/// 要发回给用户的内容，与具体平台的发送接口解耦
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyDescriptor {
    TextReply { body: String },
    ImageReply { bytes: Bytes },
    VoiceReply { bytes: Bytes },
    Failure {
        user_message: String,
        internal_cause: String,
    },
}

impl ReplyDescriptor {
    pub fn kind(&self) -> &'static str {
        match self {
            ReplyDescriptor::TextReply { .. } => "text",
            ReplyDescriptor::ImageReply { .. } => "image",
            ReplyDescriptor::VoiceReply { .. } => "voice",
            ReplyDescriptor::Failure { .. } => "failure",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, ReplyDescriptor::Failure { .. })
    }
}
