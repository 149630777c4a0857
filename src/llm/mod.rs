//! AI 层：后端抽象与实现（OpenAI 兼容 / Mock）

pub mod mock;
pub mod openai;
pub mod traits;

pub use mock::{MockAiGateway, MockCall};
pub use openai::OpenAiGateway;
pub use traits::AiGateway;
