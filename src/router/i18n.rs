//! 面向用户的固定文案（俄语 / 英语）与发给模型的 system 前言

use crate::router::message::{Capability, Language};

/// 普通对话前言：双语助手，用用户的语言回答
pub const CHAT_PREAMBLE: &str = "You are KiraBot — a bilingual assistant. \
Автоматически определяй язык пользователя и отвечай на том же.";

/// 识图指令
pub const DESCRIBE_INSTRUCTION: &str = "Describe this image in detail. \
Answer in Russian if the user's language is Russian, otherwise in English.";

/// 翻译前言
pub fn translation_preamble(target_lang: &str) -> String {
    format!(
        "You are a professional translator. Translate the user's message into {}. \
         Reply with the translation only, without comments or quotes.",
        target_lang
    )
}

/// 失败时的道歉文案，按能力区分
pub fn apology(capability: Capability, lang: Language) -> &'static str {
    match (capability, lang) {
        (Capability::Chat, Language::Ru) => "Извини, не получилось ответить. Попробуй ещё раз чуть позже.",
        (Capability::Chat, Language::En) => "Sorry, I couldn't answer right now. Please try again a bit later.",
        (Capability::Image, Language::Ru) => "Извини, не получилось создать картинку.",
        (Capability::Image, Language::En) => "Sorry, I couldn't generate the image.",
        (Capability::Translate, Language::Ru) => "Извини, не получилось перевести текст.",
        (Capability::Translate, Language::En) => "Sorry, I couldn't translate that.",
        (Capability::Voice, Language::Ru) => "Извини, не получилось озвучить текст.",
        (Capability::Voice, Language::En) => "Sorry, I couldn't create the voice message.",
        (Capability::Describe, Language::Ru) => "Извини, не получилось разобрать фото.",
        (Capability::Describe, Language::En) => "Sorry, I couldn't analyze the photo.",
    }
}

/// /start 欢迎语
pub fn greeting(lang: Language) -> &'static str {
    match lang {
        Language::Ru => {
            "🔥 Привет! Я KiraBot.\n\n\
             Я умею:\n\
             • Создавать картинки\n\
             • Отвечать на вопросы\n\
             • Переводить\n\
             • Озвучивать текст\n\
             • Анализировать фото\n\
             Напиши что-нибудь!"
        }
        Language::En => {
            "🔥 Hello! I'm KiraBot.\n\n\
             I can:\n\
             • Create images\n\
             • Answer questions\n\
             • Translate\n\
             • Read text aloud\n\
             • Analyze photos\n\
             Send me a message!"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apologies_are_distinct_per_capability() {
        let caps = [
            Capability::Chat,
            Capability::Image,
            Capability::Translate,
            Capability::Voice,
            Capability::Describe,
        ];
        for lang in [Language::Ru, Language::En] {
            let texts: std::collections::HashSet<_> =
                caps.iter().map(|c| apology(*c, lang)).collect();
            assert_eq!(texts.len(), caps.len());
        }
    }

    #[test]
    fn test_translation_preamble_names_target() {
        assert!(translation_preamble("German").contains("into German"));
    }
}
