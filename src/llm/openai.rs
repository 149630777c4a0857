//! OpenAI 兼容 API 客户端
//!
//! 聊天补全通过 async_openai 调用；画图、语音、识图直接用 reqwest 调 REST 端点（可配置 base_url）。
//! 所有请求都受 request_timeout_secs 限制，超时即返回 GatewayError::Timeout。

use std::time::Duration;

use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::AppConfig;
use crate::core::GatewayError;
use crate::llm::AiGateway;

/// OpenAI 兼容后端：chat 走 async_openai，其余走 reqwest
pub struct OpenAiGateway {
    client: Client<OpenAIConfig>,
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    chat_model: String,
    vision_model: String,
    image_model: String,
    speech_model: String,
    timeout_secs: u64,
}

impl OpenAiGateway {
    pub fn new(cfg: &AppConfig, api_key: &str) -> Result<Self, GatewayError> {
        let base_url = cfg.llm.base_url.trim_end_matches('/').to_string();
        let config = OpenAIConfig::new()
            .with_api_base(&base_url)
            .with_api_key(api_key);

        let timeout_secs = cfg.llm.request_timeout_secs;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| GatewayError::Request(e.to_string()))?;

        Ok(Self {
            client: Client::with_config(config),
            http,
            api_key: api_key.to_string(),
            base_url,
            chat_model: cfg.llm.chat_model.clone(),
            vision_model: cfg.llm.vision_model.clone(),
            image_model: cfg.image.model.clone(),
            speech_model: cfg.voice.model.clone(),
            timeout_secs,
        })
    }

    fn map_reqwest(&self, e: reqwest::Error) -> GatewayError {
        if e.is_timeout() {
            GatewayError::Timeout(self.timeout_secs)
        } else {
            GatewayError::from(e)
        }
    }

    /// POST JSON 到 `{base_url}{path}`，非 2xx 按状态码归类
    async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<reqwest::Response, GatewayError> {
        let resp = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_reqwest(e))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let text = resp.text().await.unwrap_or_default();
            return Err(GatewayError::from_status(status, text));
        }
        Ok(resp)
    }
}

#[async_trait]
impl AiGateway for OpenAiGateway {
    async fn chat_complete(
        &self,
        system_preamble: &str,
        user_text: &str,
    ) -> Result<String, GatewayError> {
        let messages = vec![
            ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(system_preamble.to_string())
                    .build()?,
            ),
            ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(user_text.to_string())
                    .build()?,
            ),
        ];
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.chat_model)
            .messages(messages)
            .build()?;

        let response = tokio::time::timeout(
            Duration::from_secs(self.timeout_secs),
            self.client.chat().create(request),
        )
        .await
        .map_err(|_| GatewayError::Timeout(self.timeout_secs))??;

        response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| GatewayError::MalformedResponse("no choices in completion".into()))
    }

    async fn generate_image(&self, prompt: &str, size: &str) -> Result<String, GatewayError> {
        let body = ImageRequest {
            model: &self.image_model,
            prompt,
            n: 1,
            size,
            response_format: "b64_json",
        };
        let resp: ImageResponse = self
            .post_json("/images/generations", &body)
            .await?
            .json()
            .await
            .map_err(|e| GatewayError::MalformedResponse(e.to_string()))?;

        resp.data
            .into_iter()
            .next()
            .and_then(|d| d.b64_json)
            .ok_or_else(|| GatewayError::MalformedResponse("no b64_json in image response".into()))
    }

    async fn synthesize(&self, text: &str, voice: &str) -> Result<Bytes, GatewayError> {
        let body = SpeechRequest {
            model: &self.speech_model,
            input: text,
            voice,
            // Telegram 语音消息要求 OGG/Opus
            response_format: "opus",
        };
        self.post_json("/audio/speech", &body)
            .await?
            .bytes()
            .await
            .map_err(|e| self.map_reqwest(e))
    }

    async fn describe_image(
        &self,
        instruction: &str,
        image_reference: &str,
    ) -> Result<String, GatewayError> {
        let body = json!({
            "model": self.vision_model,
            "messages": [
                { "role": "system", "content": instruction },
                {
                    "role": "user",
                    "content": [
                        { "type": "image_url", "image_url": { "url": image_reference } }
                    ]
                }
            ]
        });
        let resp: VisionResponse = self
            .post_json("/chat/completions", &body)
            .await?
            .json()
            .await
            .map_err(|e| GatewayError::MalformedResponse(e.to_string()))?;

        resp.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| GatewayError::MalformedResponse("no choices in vision response".into()))
    }
}

// ── API Types ──

#[derive(Debug, Serialize)]
struct ImageRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u8,
    size: &'a str,
    response_format: &'a str,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    b64_json: Option<String>,
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    response_format: &'a str,
}

#[derive(Debug, Deserialize)]
struct VisionResponse {
    choices: Vec<VisionChoice>,
}

#[derive(Debug, Deserialize)]
struct VisionChoice {
    message: VisionMessage,
}

#[derive(Debug, Deserialize)]
struct VisionMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::response::{IntoResponse, Response};
    use axum::routing::any;
    use axum::Router;

    use super::*;

    #[test]
    fn test_image_request_serialization() {
        let req = ImageRequest {
            model: "dall-e-3",
            prompt: "кота",
            n: 1,
            size: "1024x1024",
            response_format: "b64_json",
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"prompt\":\"кота\""));
        assert!(json.contains("\"response_format\":\"b64_json\""));
    }

    #[test]
    fn test_vision_response_parse() {
        let raw = r#"{"choices":[{"index":0,"message":{"role":"assistant","content":"A cat on a sofa"}}]}"#;
        let resp: VisionResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(
            resp.choices[0].message.content.as_deref(),
            Some("A cat on a sofa")
        );
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let mut cfg = AppConfig::default();
        cfg.llm.base_url = "http://localhost:8080/v1/".to_string();
        let gw = OpenAiGateway::new(&cfg, "sk-test").unwrap();
        assert_eq!(gw.base_url, "http://localhost:8080/v1");
        assert_eq!(gw.image_model, "dall-e-3");
    }

    // ── 本地假上游：验证错误归类 ──

    #[derive(Clone, Copy)]
    enum Upstream {
        Status(u16),
        Garbage,
        Stall,
    }

    async fn upstream(State(mode): State<Upstream>) -> Response {
        match mode {
            Upstream::Status(code) => (
                StatusCode::from_u16(code).unwrap(),
                r#"{"error":{"message":"nope"}}"#,
            )
                .into_response(),
            Upstream::Garbage => (
                [("content-type", "application/json")],
                "this is not json",
            )
                .into_response(),
            Upstream::Stall => {
                tokio::time::sleep(Duration::from_secs(3)).await;
                "too late".into_response()
            }
        }
    }

    async fn gateway_against(mode: Upstream) -> OpenAiGateway {
        let app = Router::new().route("/*path", any(upstream)).with_state(mode);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let mut cfg = AppConfig::default();
        cfg.llm.base_url = format!("http://{}/v1", addr);
        cfg.llm.request_timeout_secs = 1;
        OpenAiGateway::new(&cfg, "sk-test").unwrap()
    }

    #[tokio::test]
    async fn test_non_2xx_is_classified_by_status() {
        let gw = gateway_against(Upstream::Status(429)).await;
        assert!(matches!(
            gw.generate_image("кота", "1024x1024").await,
            Err(GatewayError::RateLimited(body)) if body.contains("nope")
        ));

        let gw = gateway_against(Upstream::Status(500)).await;
        assert!(matches!(
            gw.synthesize("hello", "alloy").await,
            Err(GatewayError::Api { status: 500, .. })
        ));

        let gw = gateway_against(Upstream::Status(401)).await;
        assert!(matches!(
            gw.describe_image("describe", "data:image/png;base64,AQID").await,
            Err(GatewayError::Auth(_))
        ));
    }

    #[tokio::test]
    async fn test_garbage_body_is_malformed() {
        let gw = gateway_against(Upstream::Garbage).await;
        assert!(matches!(
            gw.generate_image("кота", "1024x1024").await,
            Err(GatewayError::MalformedResponse(_))
        ));
        assert!(matches!(
            gw.describe_image("describe", "data:image/png;base64,AQID").await,
            Err(GatewayError::MalformedResponse(_))
        ));
        assert!(matches!(
            gw.chat_complete("preamble", "hi").await,
            Err(GatewayError::MalformedResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_stalled_upstream_times_out() {
        let gw = gateway_against(Upstream::Stall).await;
        assert!(matches!(
            gw.chat_complete("preamble", "hi").await,
            Err(GatewayError::Timeout(1))
        ));
        assert!(matches!(
            gw.generate_image("кота", "1024x1024").await,
            Err(GatewayError::Timeout(1))
        ));
    }
}
