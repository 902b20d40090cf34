//! 游戏构建器：统一的初始化逻辑
//!
//! 从配置选择文本 / 图像后端，组装 ContentGateway → RoundOrchestrator → GameController。
//! 测试可用 `with_llm` / `with_images` / `with_content` 注入脚本化协作者。

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{load_config, AppConfig};
use crate::core::{BackgroundTasks, GameController, RetryPolicy, RoundOrchestrator};
use crate::gateway::{ContentGateway, ContentService};
use crate::llm::{HttpImageClient, ImageClient, LlmClient, MockImageClient, MockLlmClient, OpenAiClient};

fn use_openai(cfg: &AppConfig) -> bool {
    std::env::var("OPENAI_API_KEY").is_ok() && cfg.llm.provider.to_lowercase() != "mock"
}

/// 根据配置与环境变量选择文本后端（OpenAI 兼容 / Mock）
pub fn create_llm_from_config(cfg: &AppConfig) -> Arc<dyn LlmClient> {
    if use_openai(cfg) {
        tracing::info!("Using OpenAI LLM ({})", cfg.llm.model);
        Arc::new(OpenAiClient::new(
            cfg.llm.base_url.as_deref(),
            &cfg.llm.model,
            std::env::var("OPENAI_API_KEY").ok().as_deref(),
            Duration::from_secs(cfg.llm.timeouts.request),
        ))
    } else {
        tracing::warn!("No API key set or provider is mock, using Mock LLM");
        Arc::new(MockLlmClient::default())
    }
}

/// 图像后端：与文本后端同一套开关
pub fn create_image_client_from_config(cfg: &AppConfig) -> Arc<dyn ImageClient> {
    if use_openai(cfg) {
        tracing::info!("Using HTTP image backend ({})", cfg.llm.image_model);
        Arc::new(HttpImageClient::new(
            cfg.llm.image_base_url.as_deref().or(cfg.llm.base_url.as_deref()),
            &cfg.llm.image_model,
            std::env::var("OPENAI_API_KEY").ok().as_deref(),
            Duration::from_secs(cfg.llm.timeouts.image),
        ))
    } else {
        Arc::new(MockImageClient)
    }
}

pub struct GameBuilder {
    config: AppConfig,
    llm: Option<Arc<dyn LlmClient>>,
    images: Option<Arc<dyn ImageClient>>,
    content: Option<Arc<dyn ContentService>>,
}

impl GameBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            llm: None,
            images: None,
            content: None,
        }
    }

    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_images(mut self, images: Arc<dyn ImageClient>) -> Self {
        self.images = Some(images);
        self
    }

    /// 直接替换整个内容服务（跳过网关）
    pub fn with_content(mut self, content: Arc<dyn ContentService>) -> Self {
        self.content = Some(content);
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn build_content(&self) -> Arc<dyn ContentService> {
        if let Some(content) = &self.content {
            return Arc::clone(content);
        }
        let llm = self
            .llm
            .clone()
            .unwrap_or_else(|| create_llm_from_config(&self.config));
        let images = self
            .images
            .clone()
            .unwrap_or_else(|| create_image_client_from_config(&self.config));
        Arc::new(ContentGateway::new(
            llm,
            images,
            RetryPolicy::from(&self.config.retry),
        ))
    }

    pub fn build(self) -> GameController {
        let content = self.build_content();
        let (tasks, background_rx) = BackgroundTasks::channel();
        let orchestrator = RoundOrchestrator::new(content, tasks, self.config.game.max_rounds);
        GameController::new(orchestrator, background_rx, self.config.game)
    }
}

/// 便捷函数：从默认路径加载配置并创建构建器
pub fn create_game_builder(config_path: Option<PathBuf>) -> GameBuilder {
    let config = load_config(config_path).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        AppConfig::default()
    });
    GameBuilder::new(config)
}
