//! OpenAI 兼容 API 客户端
//!
//! 通过 async_openai 调用任意 OpenAI 兼容端点（可配置 base_url）；错误在此处归类为结构化 LlmError。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;
use async_openai::types::chat::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequest, CreateChatCompletionRequestArgs, ResponseFormat,
};
use async_openai::Client;
use async_trait::async_trait;

use crate::llm::{LlmClient, LlmError, Message, Role};

/// Token 使用统计（累计值）
#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    pub prompt_tokens: Arc<AtomicU64>,
    pub completion_tokens: Arc<AtomicU64>,
}

impl TokenUsage {
    pub fn add(&self, prompt: u64, completion: u64) {
        self.prompt_tokens.fetch_add(prompt, Ordering::Relaxed);
        self.completion_tokens.fetch_add(completion, Ordering::Relaxed);
    }

    /// (prompt, completion, total)
    pub fn get(&self) -> (u64, u64, u64) {
        let prompt = self.prompt_tokens.load(Ordering::Relaxed);
        let completion = self.completion_tokens.load(Ordering::Relaxed);
        (prompt, completion, prompt + completion)
    }
}

/// OpenAI 兼容客户端：持有 Client、model 名与请求超时
pub struct OpenAiClient {
    client: Client<OpenAIConfig>,
    model: String,
    request_timeout: Duration,
    pub usage: TokenUsage,
}

impl OpenAiClient {
    pub fn new(
        base_url: Option<&str>,
        model: &str,
        api_key: Option<&str>,
        request_timeout: Duration,
    ) -> Self {
        let api_key = api_key
            .map(String::from)
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .unwrap_or_else(|| "sk-placeholder".to_string());

        let config = if let Some(url) = base_url {
            OpenAIConfig::new().with_api_base(url).with_api_key(api_key)
        } else {
            OpenAIConfig::new().with_api_key(api_key)
        };

        Self {
            client: Client::with_config(config),
            model: model.to_string(),
            request_timeout,
            usage: TokenUsage::default(),
        }
    }

    fn to_openai_messages(
        &self,
        messages: &[Message],
    ) -> Result<Vec<ChatCompletionRequestMessage>, LlmError> {
        messages
            .iter()
            .map(|m| {
                let built = match m.role {
                    Role::System => ChatCompletionRequestSystemMessageArgs::default()
                        .content(m.content.clone())
                        .build()
                        .map(ChatCompletionRequestMessage::System),
                    Role::User => ChatCompletionRequestUserMessageArgs::default()
                        .content(m.content.clone())
                        .build()
                        .map(ChatCompletionRequestMessage::User),
                    Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
                        .content(m.content.clone())
                        .build()
                        .map(ChatCompletionRequestMessage::Assistant),
                };
                built.map_err(|e| LlmError::request(e.to_string()))
            })
            .collect()
    }

    /// 所有回合请求都要求 JSON 对象输出
    fn build_request(&self, messages: &[Message]) -> Result<CreateChatCompletionRequest, LlmError> {
        CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(self.to_openai_messages(messages)?)
            .response_format(ResponseFormat::JsonObject)
            .build()
            .map_err(|e| LlmError::request(e.to_string()))
    }
}

/// 把 async_openai 的错误映射到结构化错误：API 返回的限流类型可重试，其余不可
fn classify(err: OpenAIError) -> LlmError {
    if let OpenAIError::ApiError(api) = &err {
        let rate_limited = matches!(
            api.r#type.as_deref(),
            Some("rate_limit_exceeded") | Some("rate_limit_error") | Some("overloaded_error")
        );
        if rate_limited {
            return LlmError::rate_limited(api.message.clone());
        }
    }
    LlmError::request(err.to_string())
}

#[async_trait]
impl LlmClient for OpenAiClient {
    fn name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        let request = self.build_request(messages)?;

        let response = tokio::time::timeout(self.request_timeout, self.client.chat().create(request))
            .await
            .map_err(|_| {
                LlmError::timeout(format!(
                    "no response within {}s",
                    self.request_timeout.as_secs()
                ))
            })?
            .map_err(classify)?;

        if let Some(usage) = &response.usage {
            self.usage
                .add(usage.prompt_tokens as u64, usage.completion_tokens as u64);
            let (prompt, completion, total) = self.usage.get();
            tracing::debug!(model = %self.model, prompt, completion, total, "Cumulative token usage");
        }

        response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| LlmError::malformed("empty completion"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_asks_for_json_object() {
        let client = OpenAiClient::new(
            Some("http://localhost:1"),
            "test-model",
            Some("sk-test"),
            Duration::from_secs(5),
        );
        let messages = vec![Message::system("rules"), Message::user("round 1")];
        let request = client.build_request(&messages).unwrap();

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "test-model");
        assert_eq!(json["response_format"]["type"], "json_object");
        assert_eq!(json["messages"].as_array().map(Vec::len), Some(2));
    }
}
