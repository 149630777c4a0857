//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `KIRA__*` 覆盖（双下划线表示嵌套，如 `KIRA__LLM__CHAT_MODEL=gpt-4o`）。
//! 两个密钥另外兼容常用的 `TELEGRAM_TOKEN`、`OPENAI_API_KEY` 环境变量。

use std::path::PathBuf;

use serde::Deserialize;

use crate::core::BotError;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerSection,
    pub telegram: TelegramSection,
    pub llm: LlmSection,
    pub image: ImageSection,
    pub voice: VoiceSection,
    pub router: RouterSection,
}

/// [server] 段：Webhook 监听地址与校验密钥
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
    /// setWebhook 时登记的 secret_token；设置后校验 X-Telegram-Bot-Api-Secret-Token 头
    pub webhook_secret: Option<String>,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 10000,
            webhook_secret: None,
        }
    }
}

/// [telegram] 段
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelegramSection {
    pub token: Option<String>,
    pub api_base: String,
    /// Bot API 请求（含文件下载）超时（秒）
    pub request_timeout_secs: u64,
}

impl Default for TelegramSection {
    fn default() -> Self {
        Self {
            token: None,
            api_base: "https://api.telegram.org".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// [llm] 段：OpenAI 兼容端点、模型与超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    pub api_key: Option<String>,
    pub base_url: String,
    pub chat_model: String,
    /// 识图用模型，需支持 image_url 输入
    pub vision_model: String,
    /// 单次请求超时（秒）
    pub request_timeout_secs: u64,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            chat_model: "gpt-4o-mini".to_string(),
            vision_model: "gpt-4o-mini".to_string(),
            request_timeout_secs: 60,
        }
    }
}

/// [image] 段
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ImageSection {
    pub model: String,
    pub size: String,
}

impl Default for ImageSection {
    fn default() -> Self {
        Self {
            model: "dall-e-3".to_string(),
            size: "1024x1024".to_string(),
        }
    }
}

/// [voice] 段
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VoiceSection {
    pub model: String,
    pub voice: String,
}

impl Default for VoiceSection {
    fn default() -> Self {
        Self {
            model: "tts-1".to_string(),
            voice: "alloy".to_string(),
        }
    }
}

/// [router] 段：触发词（不区分大小写）与默认翻译目标语言
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RouterSection {
    pub image_triggers: Vec<String>,
    pub translate_prefixes: Vec<String>,
    pub voice_prefixes: Vec<String>,
    pub default_target_lang: String,
}

impl Default for RouterSection {
    fn default() -> Self {
        Self {
            image_triggers: vec![
                "draw".into(),
                "generate".into(),
                "картинка".into(),
                "картинку".into(),
                "нарисуй".into(),
                "сгенерируй".into(),
            ],
            translate_prefixes: vec!["переведи".into(), "translate".into()],
            voice_prefixes: vec!["озвучь".into(), "say".into()],
            default_target_lang: "English".to_string(),
        }
    }
}

impl AppConfig {
    /// Bot token：配置优先，其次 TELEGRAM_TOKEN
    pub fn telegram_token(&self) -> Result<String, BotError> {
        self.telegram
            .token
            .clone()
            .filter(|t| !t.is_empty())
            .or_else(|| std::env::var("TELEGRAM_TOKEN").ok())
            .ok_or(BotError::MissingSetting("telegram.token / TELEGRAM_TOKEN"))
    }

    /// OpenAI key：配置优先，其次 OPENAI_API_KEY
    pub fn openai_api_key(&self) -> Result<String, BotError> {
        self.llm
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or(BotError::MissingSetting("llm.api_key / OPENAI_API_KEY"))
    }
}

/// 从 config 目录加载配置，环境变量 KIRA__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 KIRA__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, BotError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("KIRA")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    Ok(c.try_deserialize()?)
}
