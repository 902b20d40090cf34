//! 生成器边界：客户端抽象与实现（OpenAI 兼容文本 / HTTP 图像 / Mock / 脚本化）

pub mod error;
pub mod images;
pub mod message;
pub mod mock;
pub mod openai;
pub mod traits;

pub use error::{LlmError, LlmErrorKind};
pub use images::HttpImageClient;
pub use message::{Message, Role};
pub use mock::{ImageCall, MockImageClient, MockLlmClient, ScriptedImages, ScriptedLlm};
pub use openai::{OpenAiClient, TokenUsage};
pub use traits::{ImageClient, LlmClient};
