//! Mock / 脚本化客户端（离线演示与测试，无需 API）
//!
//! - MockLlmClient：返回一份「通用」JSON，同时满足情景、结果、建议三种解析；数值随调用次数缓慢变化
//! - MockImageClient：从不返回图像
//! - ScriptedLlm / ScriptedImages：按队列依次返回预设结果，并记录调用，供测试断言

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::{Mutex, Notify};

use crate::llm::{ImageClient, LlmClient, LlmError, Message};

/// 离线文本后端
#[derive(Debug, Default)]
pub struct MockLlmClient {
    calls: AtomicUsize,
}

#[async_trait]
impl LlmClient for MockLlmClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, _messages: &[Message]) -> Result<String, LlmError> {
        let n = self.calls.fetch_add(1, Ordering::Relaxed) as f64;
        let reply = json!({
            "narrative": "الجو هادي النهارده، بس الأرض محتاجة منك انتباه.",
            "challenge": "حافظ على رطوبة التربة من غير ما تهدر مية.",
            "data": {
                "temperature": 26.0 + n,
                "rainfall": 1.0,
                "soilMoisture": 50.0,
                "ndvi": 0.65,
                "humidity": 55.0,
                "windSpeed": 12.0,
                "cloudCover": 15.0,
                "pressure": 1011.0
            },
            "updatedStats": {
                "cropHealth": (70.0 - 3.0 * n).max(0.0),
                "soilMoisture": 58.0,
                "waterReserves": (78.0 - 4.0 * n).max(0.0)
            },
            "tips": ["نوّع قراراتك بين الري والحفاظ على المية."]
        });
        Ok(reply.to_string())
    }
}

/// 离线图像后端：总是「没有图像」
#[derive(Debug, Default)]
pub struct MockImageClient;

#[async_trait]
impl ImageClient for MockImageClient {
    async fn create(&self, _prompt: &str) -> Result<Option<String>, LlmError> {
        Ok(None)
    }

    async fn edit(&self, _base_image: &str, _prompt: &str) -> Result<Option<String>, LlmError> {
        Ok(None)
    }
}

/// 脚本化文本后端：按顺序弹出预设回复；队列耗尽后返回 `exhausted` 错误
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<Result<String, LlmError>>>,
    exhausted: LlmError,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    pub fn new(replies: impl IntoIterator<Item = Result<String, LlmError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            exhausted: LlmError::unavailable("script exhausted"),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// 每次调用都返回同一个错误
    pub fn failing(err: LlmError) -> Self {
        Self {
            exhausted: err,
            ..Self::new([])
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// 每次调用时最后一条消息的内容
    pub async fn prompts(&self) -> Vec<String> {
        self.prompts.lock().await.clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(last) = messages.last() {
            self.prompts.lock().await.push(last.content.clone());
        }
        self.replies
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(self.exhausted.clone()))
    }
}

/// 图像调用模式
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImageCall {
    Create,
    /// 携带作为编辑底图的上一张图
    Edit(String),
}

/// 脚本化图像后端；可选闸门（Notify）让调用挂起直到测试放行
pub struct ScriptedImages {
    replies: Mutex<VecDeque<Result<Option<String>, LlmError>>>,
    exhausted: Result<Option<String>, LlmError>,
    calls: Mutex<Vec<ImageCall>>,
    gate: Option<Arc<Notify>>,
}

impl ScriptedImages {
    pub fn new(replies: impl IntoIterator<Item = Result<Option<String>, LlmError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            exhausted: Ok(None),
            calls: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    pub fn failing(err: LlmError) -> Self {
        Self {
            exhausted: Err(err),
            ..Self::new([])
        }
    }

    /// 每次调用先等待闸门放行（`Notify::notify_one`）
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub async fn calls(&self) -> Vec<ImageCall> {
        self.calls.lock().await.clone()
    }

    async fn respond(&self, call: ImageCall) -> Result<Option<String>, LlmError> {
        self.calls.lock().await.push(call);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.replies
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| self.exhausted.clone())
    }
}

#[async_trait]
impl ImageClient for ScriptedImages {
    async fn create(&self, _prompt: &str) -> Result<Option<String>, LlmError> {
        self.respond(ImageCall::Create).await
    }

    async fn edit(&self, base_image: &str, _prompt: &str) -> Result<Option<String>, LlmError> {
        self.respond(ImageCall::Edit(base_image.to_string())).await
    }
}
