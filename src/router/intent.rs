//! 意图识别模块
//!
//! 按固定优先级依次检查规则（画图 → 翻译 → 语音 → 识图），第一条命中的规则决定意图，
//! 都未命中则为普通对话。纯函数：无 LLM 调用、无内部状态。

use std::collections::HashSet;

use crate::config::RouterSection;
use crate::router::message::{InboundEvent, Intent};

/// 一条路由规则：predicate 命中后由 build 构造意图
struct Rule {
    name: &'static str,
    predicate: fn(&IntentClassifier, &InboundEvent) -> bool,
    build: fn(&IntentClassifier, &InboundEvent) -> Intent,
}

/// 规则表，顺序即优先级
const RULES: &[Rule] = &[
    Rule {
        name: "image",
        predicate: IntentClassifier::has_image_trigger,
        build: IntentClassifier::build_image,
    },
    Rule {
        name: "translate",
        predicate: IntentClassifier::has_translate_prefix,
        build: IntentClassifier::build_translate,
    },
    Rule {
        name: "voice",
        predicate: IntentClassifier::has_voice_prefix,
        build: IntentClassifier::build_voice,
    },
    Rule {
        name: "describe",
        predicate: IntentClassifier::is_bare_photo,
        build: IntentClassifier::build_describe,
    },
];

/// 意图识别器（触发词已统一为小写）
#[derive(Debug, Clone)]
pub struct IntentClassifier {
    image_triggers: HashSet<String>,
    translate_prefixes: HashSet<String>,
    voice_prefixes: HashSet<String>,
    target_lang: String,
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::new(&RouterSection::default())
    }
}

impl IntentClassifier {
    pub fn new(cfg: &RouterSection) -> Self {
        let lower = |words: &[String]| -> HashSet<String> {
            words.iter().map(|w| w.trim().to_lowercase()).collect()
        };
        Self {
            image_triggers: lower(&cfg.image_triggers),
            translate_prefixes: lower(&cfg.translate_prefixes),
            voice_prefixes: lower(&cfg.voice_prefixes),
            target_lang: cfg.default_target_lang.clone(),
        }
    }

    /// 识别意图
    pub fn classify(&self, event: &InboundEvent) -> Intent {
        for rule in RULES {
            if (rule.predicate)(self, event) {
                let intent = (rule.build)(self, event);
                tracing::debug!(rule = rule.name, ?intent, "intent rule matched");
                return intent;
            }
        }
        chat(event)
    }

    fn has_image_trigger(&self, event: &InboundEvent) -> bool {
        first_token(event).is_some_and(|t| self.image_triggers.contains(&normalize(t)))
    }

    /// 触发词之后的原文作为 prompt（保留内部空白）；为空时退回普通对话
    fn build_image(&self, event: &InboundEvent) -> Intent {
        match remainder(event) {
            Some(prompt) => Intent::GenerateImage { prompt },
            None => chat(event),
        }
    }

    fn has_translate_prefix(&self, event: &InboundEvent) -> bool {
        first_token(event).is_some_and(|t| self.translate_prefixes.contains(&normalize(t)))
    }

    fn build_translate(&self, event: &InboundEvent) -> Intent {
        match remainder(event) {
            Some(text) => Intent::Translate {
                text,
                target_lang: self.target_lang.clone(),
            },
            None => chat(event),
        }
    }

    fn has_voice_prefix(&self, event: &InboundEvent) -> bool {
        first_token(event).is_some_and(|t| self.voice_prefixes.contains(&normalize(t)))
    }

    fn build_voice(&self, event: &InboundEvent) -> Intent {
        match remainder(event) {
            Some(text) => Intent::Synthesize { text },
            None => chat(event),
        }
    }

    fn is_bare_photo(&self, event: &InboundEvent) -> bool {
        event.attachment.is_some() && text_of(event).trim().is_empty()
    }

    fn build_describe(&self, event: &InboundEvent) -> Intent {
        match &event.attachment {
            Some(attachment) => Intent::DescribeImage {
                attachment: attachment.clone(),
            },
            None => chat(event),
        }
    }
}

fn text_of(event: &InboundEvent) -> &str {
    event.raw_text.as_deref().unwrap_or("")
}

fn chat(event: &InboundEvent) -> Intent {
    Intent::Chat {
        text: text_of(event).to_string(),
    }
}

/// 小写并去掉首尾标点，"Нарисуй," → "нарисуй"
fn normalize(token: &str) -> String {
    token
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase()
}

fn first_token(event: &InboundEvent) -> Option<&str> {
    text_of(event).split_whitespace().next()
}

/// 首词之后的文本（去首尾空白），为空返回 None
fn remainder(event: &InboundEvent) -> Option<String> {
    let (_, rest) = text_of(event).trim_start().split_once(char::is_whitespace)?;
    let rest = rest.trim();
    (!rest.is_empty()).then(|| rest.to_string())
}
