//! 核心编排层：错误、状态投影、重试、会话、后台任务、回合编排、控制器、运行时

pub mod builder;
pub mod controller;
pub mod error;
pub mod orchestrator;
pub mod retry;
pub mod runtime;
pub mod session;
pub mod state;
pub mod task_scheduler;

pub use builder::{create_game_builder, GameBuilder};
pub use controller::{BackgroundApplied, GameController, GameSetup};
pub use error::{FailedStep, GameError};
pub use orchestrator::{EndReason, RoundOrchestrator, RoundResult};
pub use retry::{RetryPolicy, Retryable};
pub use runtime::{spawn_game, Command, GameHandle};
pub use session::GameSession;
pub use state::{GameSnapshot, GameState, ImageState, TipsState};
pub use task_scheduler::{
    BackgroundEvent, BackgroundPayload, BackgroundTasks, StalePolicy, TaskKind,
};
