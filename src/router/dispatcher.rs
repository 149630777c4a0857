//! 能力分发
//!
//! 把意图路由到对应的 AI 后端调用。任何后端错误（网络、鉴权、限流、超时、响应格式）
//! 以及附件解析失败都在此转为带本地化道歉文案的 Failure，不向上抛出，也不重试。

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use thiserror::Error;

use crate::config::AppConfig;
use crate::core::{GatewayError, TransportError};
use crate::integrations::MessagingGateway;
use crate::llm::AiGateway;
use crate::router::i18n::{apology, translation_preamble, CHAT_PREAMBLE, DESCRIBE_INSTRUCTION};
use crate::router::message::{Intent, Language, ReplyDescriptor};

#[derive(Error, Debug)]
enum DispatchError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("attachment resolution failed: {0}")]
    Attachment(#[from] TransportError),
}

/// 分发器选项
#[derive(Debug, Clone)]
pub struct DispatchOptions {
    pub image_size: String,
    pub voice: String,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl DispatchOptions {
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            image_size: cfg.image.size.clone(),
            voice: cfg.voice.voice.clone(),
        }
    }
}

/// 能力分发器：AI 后端与消息平台均由构造注入
pub struct Dispatcher {
    ai: Arc<dyn AiGateway>,
    messenger: Arc<dyn MessagingGateway>,
    options: DispatchOptions,
}

impl Dispatcher {
    pub fn new(
        ai: Arc<dyn AiGateway>,
        messenger: Arc<dyn MessagingGateway>,
        options: DispatchOptions,
    ) -> Self {
        Self {
            ai,
            messenger,
            options,
        }
    }

    /// 执行意图，总是返回一个 ReplyDescriptor
    pub async fn dispatch(&self, intent: Intent, lang: Language) -> ReplyDescriptor {
        let capability = intent.capability();
        match self.run(intent).await {
            Ok(reply) => reply,
            Err(cause) => {
                tracing::warn!(%capability, error = %cause, "capability call failed");
                ReplyDescriptor::Failure {
                    user_message: apology(capability, lang).to_string(),
                    internal_cause: cause.to_string(),
                }
            }
        }
    }

    async fn run(&self, intent: Intent) -> Result<ReplyDescriptor, DispatchError> {
        match intent {
            Intent::Chat { text } => {
                let body = self.ai.chat_complete(CHAT_PREAMBLE, &text).await?;
                text_reply(body)
            }
            Intent::GenerateImage { prompt } => {
                let encoded = self
                    .ai
                    .generate_image(&prompt, &self.options.image_size)
                    .await?;
                let bytes = STANDARD
                    .decode(encoded.trim())
                    .map_err(|e| GatewayError::MalformedResponse(format!("image payload: {}", e)))?;
                Ok(ReplyDescriptor::ImageReply {
                    bytes: Bytes::from(bytes),
                })
            }
            Intent::Translate { text, target_lang } => {
                let preamble = translation_preamble(&target_lang);
                let body = self.ai.chat_complete(&preamble, &text).await?;
                text_reply(body)
            }
            Intent::Synthesize { text } => {
                let bytes = self.ai.synthesize(&text, &self.options.voice).await?;
                if bytes.is_empty() {
                    return Err(GatewayError::MalformedResponse("empty audio".into()).into());
                }
                Ok(ReplyDescriptor::VoiceReply { bytes })
            }
            Intent::DescribeImage { attachment } => {
                let reference = self.messenger.resolve_attachment(&attachment).await?;
                let body = self
                    .ai
                    .describe_image(DESCRIBE_INSTRUCTION, &reference)
                    .await?;
                text_reply(body)
            }
        }
    }
}

fn text_reply(body: String) -> Result<ReplyDescriptor, DispatchError> {
    if body.trim().is_empty() {
        return Err(GatewayError::MalformedResponse("empty completion".into()).into());
    }
    Ok(ReplyDescriptor::TextReply { body })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrations::RecordingMessenger;
    use crate::llm::mock::{MockCall, MOCK_IMAGE_BYTES, MOCK_VOICE_BYTES};
    use crate::llm::MockAiGateway;

    fn dispatcher(ai: Arc<MockAiGateway>) -> Dispatcher {
        Dispatcher::new(
            ai,
            Arc::new(RecordingMessenger::new()),
            DispatchOptions::default(),
        )
    }

    fn all_intents() -> Vec<Intent> {
        vec![
            Intent::Chat { text: "hi".into() },
            Intent::GenerateImage {
                prompt: "кота".into(),
            },
            Intent::Translate {
                text: "hello".into(),
                target_lang: "Russian".into(),
            },
            Intent::Synthesize {
                text: "привет".into(),
            },
            Intent::DescribeImage {
                attachment: "file-1".into(),
            },
        ]
    }

    #[tokio::test]
    async fn test_chat_uses_bilingual_preamble() {
        let ai = Arc::new(MockAiGateway::new());
        let reply = dispatcher(ai.clone())
            .dispatch(Intent::Chat { text: "hi".into() }, Language::En)
            .await;

        assert_eq!(
            reply,
            ReplyDescriptor::TextReply {
                body: "Echo from Mock: hi".into()
            }
        );
        assert_eq!(
            ai.calls(),
            vec![MockCall::Chat {
                preamble: CHAT_PREAMBLE.into(),
                text: "hi".into()
            }]
        );
    }

    #[tokio::test]
    async fn test_image_payload_is_decoded() {
        let ai = Arc::new(MockAiGateway::new());
        let reply = dispatcher(ai.clone())
            .dispatch(
                Intent::GenerateImage {
                    prompt: "кота".into(),
                },
                Language::Ru,
            )
            .await;

        assert_eq!(
            reply,
            ReplyDescriptor::ImageReply {
                bytes: Bytes::from_static(MOCK_IMAGE_BYTES)
            }
        );
        assert_eq!(
            ai.calls(),
            vec![MockCall::Image {
                prompt: "кота".into(),
                size: "1024x1024".into()
            }]
        );
    }

    #[tokio::test]
    async fn test_translate_uses_target_language() {
        let ai = Arc::new(MockAiGateway::new());
        dispatcher(ai.clone())
            .dispatch(
                Intent::Translate {
                    text: "hello".into(),
                    target_lang: "Russian".into(),
                },
                Language::En,
            )
            .await;

        match &ai.calls()[0] {
            MockCall::Chat { preamble, text } => {
                assert!(preamble.contains("into Russian"));
                assert_eq!(text, "hello");
            }
            other => panic!("unexpected call {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_synthesize_returns_voice() {
        let ai = Arc::new(MockAiGateway::new());
        let reply = dispatcher(ai.clone())
            .dispatch(
                Intent::Synthesize {
                    text: "привет".into(),
                },
                Language::Ru,
            )
            .await;

        assert_eq!(
            reply,
            ReplyDescriptor::VoiceReply {
                bytes: Bytes::from_static(MOCK_VOICE_BYTES)
            }
        );
        assert_eq!(
            ai.calls(),
            vec![MockCall::Speech {
                text: "привет".into(),
                voice: "alloy".into()
            }]
        );
    }

    #[tokio::test]
    async fn test_describe_resolves_attachment_first() {
        let ai = Arc::new(MockAiGateway::new());
        let reply = dispatcher(ai.clone())
            .dispatch(
                Intent::DescribeImage {
                    attachment: "file-1".into(),
                },
                Language::En,
            )
            .await;

        assert_eq!(
            reply,
            ReplyDescriptor::TextReply {
                body: "Mock description of mock://file-1".into()
            }
        );
    }

    #[tokio::test]
    async fn test_every_intent_fails_softly() {
        let ai = Arc::new(MockAiGateway::failing(GatewayError::Timeout(60)));
        let d = dispatcher(ai);

        for intent in all_intents() {
            let capability = intent.capability();
            let reply = d.dispatch(intent, Language::En).await;
            match reply {
                ReplyDescriptor::Failure {
                    user_message,
                    internal_cause,
                } => {
                    assert_eq!(user_message, apology(capability, Language::En));
                    assert!(internal_cause.contains("timed out"));
                }
                other => panic!("expected failure, got {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_attachment_failure_is_localized() {
        let d = Dispatcher::new(
            Arc::new(MockAiGateway::new()),
            Arc::new(RecordingMessenger::failing()),
            DispatchOptions::default(),
        );
        let reply = d
            .dispatch(
                Intent::DescribeImage {
                    attachment: "file-1".into(),
                },
                Language::Ru,
            )
            .await;

        assert!(matches!(
            reply,
            ReplyDescriptor::Failure { ref user_message, .. }
                if user_message == "Извини, не получилось разобрать фото."
        ));
    }

    #[tokio::test]
    async fn test_bad_base64_becomes_failure() {
        struct BrokenImages;

        #[async_trait::async_trait]
        impl AiGateway for BrokenImages {
            async fn chat_complete(&self, _: &str, _: &str) -> Result<String, GatewayError> {
                Ok(String::new())
            }
            async fn generate_image(&self, _: &str, _: &str) -> Result<String, GatewayError> {
                Ok("%%% not base64 %%%".into())
            }
            async fn synthesize(&self, _: &str, _: &str) -> Result<Bytes, GatewayError> {
                Ok(Bytes::new())
            }
            async fn describe_image(&self, _: &str, _: &str) -> Result<String, GatewayError> {
                Ok("ok".into())
            }
        }

        let d = Dispatcher::new(
            Arc::new(BrokenImages),
            Arc::new(RecordingMessenger::new()),
            DispatchOptions::default(),
        );

        let image = d
            .dispatch(Intent::GenerateImage { prompt: "x".into() }, Language::En)
            .await;
        assert!(image.is_failure());

        let chat = d
            .dispatch(Intent::Chat { text: "x".into() }, Language::En)
            .await;
        assert!(chat.is_failure());

        let voice = d
            .dispatch(Intent::Synthesize { text: "x".into() }, Language::En)
            .await;
        assert!(voice.is_failure());
    }
}
