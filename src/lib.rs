//! Harvest - 回合制可持续农场模拟的回合编排引擎
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 重试、回合编排、后台任务、状态机与运行时
//! - **farm**: 农场数据模型、历史账本、目录、赛后报告
//! - **gateway**: 内容网关（提示词、回复解析、确定性兜底）
//! - **llm**: 文本 / 图像生成客户端抽象与实现（OpenAI 兼容 / HTTP / Mock）
//! - **observability**: tracing 初始化
//! - **ui**: 终端界面（Ratatui + crossterm）
//! - **weather**: 真实天气种子

pub mod config;
pub mod core;
pub mod farm;
pub mod gateway;
pub mod llm;
pub mod observability;
pub mod ui;
pub mod weather;
