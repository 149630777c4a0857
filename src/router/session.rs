//! 会话入口
//!
//! 每条入站消息：识别意图 → 分发 → 恰好一次出站发送。无跨请求状态；
//! 发送只在分发结果完整就绪后进行，任务在此之前被取消不会产生半条回复。

use std::sync::Arc;

use tracing::Instrument;

use crate::config::AppConfig;
use crate::core::TransportError;
use crate::integrations::MessagingGateway;
use crate::llm::AiGateway;
use crate::router::dispatcher::{DispatchOptions, Dispatcher};
use crate::router::i18n::greeting;
use crate::router::intent::IntentClassifier;
use crate::router::message::{InboundEvent, Language, ReplyDescriptor};

/// 会话入口：持有识别器、分发器与消息平台客户端，可在多个任务间共享
pub struct Session {
    classifier: IntentClassifier,
    dispatcher: Dispatcher,
    messenger: Arc<dyn MessagingGateway>,
}

impl Session {
    pub fn new(
        classifier: IntentClassifier,
        ai: Arc<dyn AiGateway>,
        messenger: Arc<dyn MessagingGateway>,
        options: DispatchOptions,
    ) -> Self {
        Self {
            classifier,
            dispatcher: Dispatcher::new(ai, messenger.clone(), options),
            messenger,
        }
    }

    /// 按配置构建（触发词、画图尺寸、音色）
    pub fn from_config(
        cfg: &AppConfig,
        ai: Arc<dyn AiGateway>,
        messenger: Arc<dyn MessagingGateway>,
    ) -> Self {
        Self::new(
            IntentClassifier::new(&cfg.router),
            ai,
            messenger,
            DispatchOptions::from_config(cfg),
        )
    }

    /// 处理一条入站消息，返回已投递（或尝试投递）的回复
    pub async fn handle(&self, event: InboundEvent) -> ReplyDescriptor {
        let intent = self.classifier.classify(&event);
        let capability = intent.capability();
        tracing::info!(user_id = %event.user_id, %capability, "handling message");

        // 失败日志由 Dispatcher 记录，span 为其补上 user_id
        let reply = self
            .dispatcher
            .dispatch(intent, event.language())
            .instrument(tracing::info_span!("message", user_id = %event.user_id))
            .await;

        if let Err(e) = self.deliver(&event.user_id, &reply).await {
            tracing::error!(user_id = %event.user_id, kind = reply.kind(), error = %e, "Failed to send reply");
        }
        reply
    }

    /// /start：发送本地化欢迎语
    pub async fn greet(&self, user_id: &str, lang: Language) {
        if let Err(e) = self.messenger.send_text(user_id, greeting(lang)).await {
            tracing::error!(user_id = %user_id, error = %e, "Failed to send greeting");
        }
    }

    async fn deliver(&self, user_id: &str, reply: &ReplyDescriptor) -> Result<(), TransportError> {
        match reply {
            ReplyDescriptor::TextReply { body } => self.messenger.send_text(user_id, body).await,
            ReplyDescriptor::ImageReply { bytes } => {
                self.messenger.send_photo(user_id, bytes.clone()).await
            }
            ReplyDescriptor::VoiceReply { bytes } => {
                self.messenger.send_voice(user_id, bytes.clone()).await
            }
            ReplyDescriptor::Failure { user_message, .. } => {
                self.messenger.send_text(user_id, user_message).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::core::GatewayError;
    use crate::integrations::{RecordingMessenger, SentMessage};
    use crate::llm::mock::MOCK_IMAGE_BYTES;
    use crate::llm::MockAiGateway;

    fn session(ai: MockAiGateway, messenger: Arc<RecordingMessenger>) -> Session {
        Session::new(
            IntentClassifier::default(),
            Arc::new(ai),
            messenger,
            DispatchOptions::default(),
        )
    }

    #[tokio::test]
    async fn test_image_request_sends_photo() {
        let messenger = Arc::new(RecordingMessenger::new());
        let s = session(MockAiGateway::new(), messenger.clone());

        s.handle(InboundEvent::text("42", "нарисуй кота")).await;

        assert_eq!(
            messenger.sent(),
            vec![SentMessage::Photo {
                user_id: "42".into(),
                bytes: Bytes::from_static(MOCK_IMAGE_BYTES)
            }]
        );
    }

    #[tokio::test]
    async fn test_failure_sends_exactly_one_apology() {
        let messenger = Arc::new(RecordingMessenger::new());
        let s = session(
            MockAiGateway::failing(GatewayError::RateLimited("429".into())),
            messenger.clone(),
        );

        let reply = s
            .handle(InboundEvent::text("42", "привет").with_locale("ru"))
            .await;

        assert!(reply.is_failure());
        assert_eq!(
            messenger.sent(),
            vec![SentMessage::Text {
                user_id: "42".into(),
                text: "Извини, не получилось ответить. Попробуй ещё раз чуть позже.".into()
            }]
        );
    }

    #[tokio::test]
    async fn test_transport_error_does_not_panic() {
        let messenger = Arc::new(RecordingMessenger::failing());
        let s = session(MockAiGateway::new(), messenger.clone());

        let reply = s.handle(InboundEvent::text("42", "hello")).await;
        assert!(matches!(reply, ReplyDescriptor::TextReply { .. }));
        assert!(messenger.sent().is_empty());
    }

    #[tokio::test]
    async fn test_greet_in_user_language() {
        let messenger = Arc::new(RecordingMessenger::new());
        let s = session(MockAiGateway::new(), messenger.clone());

        s.greet("42", Language::Ru).await;
        s.greet("43", Language::En).await;

        let sent = messenger.sent();
        assert!(matches!(&sent[0], SentMessage::Text { text, .. } if text.contains("Привет")));
        assert!(matches!(&sent[1], SentMessage::Text { text, .. } if text.contains("Hello")));
    }
}
