//! 生成器客户端抽象
//!
//! 文本后端（OpenAI 兼容 / Mock）实现 LlmClient；图像后端实现 ImageClient（create 从零生成、edit 基于上一张图修改）。

use async_trait::async_trait;

use crate::llm::{LlmError, Message};

/// 文本生成客户端：非流式完成，返回原始文本（通常是 JSON）
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError>;

    /// 日志中显示的后端名
    fn name(&self) -> &str {
        "llm"
    }
}

/// 图像生成客户端；图像以 data URL（或远程 URL）字符串表示
#[async_trait]
pub trait ImageClient: Send + Sync {
    /// 无上一张图时：从零生成；Ok(None) 表示后端未返回图像
    async fn create(&self, prompt: &str) -> Result<Option<String>, LlmError>;

    /// 基于上一张图修改
    async fn edit(&self, base_image: &str, prompt: &str) -> Result<Option<String>, LlmError>;
}
