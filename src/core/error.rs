//! 编排层错误
//!
//! 外部调用失败在网关层就被兜底值吸收；到达这里的只有编排级结构性错误，
//! 控制器把它们转成玩家可见的错误提示，玩家总是可以重试同一动作。

use thiserror::Error;

use crate::core::GameState;
use crate::farm::OutOfOrderEntry;
use crate::llm::LlmError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GameError {
    #[error("game is not active (state: {0:?})")]
    NotActive(GameState),

    #[error("a round is already being evaluated")]
    Busy,

    #[error("no playable scenario for the current round")]
    ScenarioUnavailable,

    #[error("cannot {via} while in state {from:?}")]
    InvalidTransition { from: GameState, via: &'static str },

    #[error("invariant violated: {0}")]
    InvariantViolated(String),

    #[error("generation failed: {0}")]
    Generation(#[from] LlmError),

    #[error(transparent)]
    History(#[from] OutOfOrderEntry),
}

/// 错误发生在哪个前台步骤，决定给玩家的提示
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailedStep {
    Start,
    Action,
    Scenario,
}

impl GameError {
    /// 玩家可见的提示（游戏界面语言）
    pub fn user_message(&self, step: FailedStep) -> String {
        match (self, step) {
            (GameError::Busy, _) => "استنى شوية، لسه بنحسب نتيجة قرارك.".to_string(),
            (GameError::NotActive(_), _) | (GameError::InvalidTransition { .. }, _) => {
                "الخطوة دي مش متاحة دلوقتي.".to_string()
            }
            (_, FailedStep::Start) => {
                "اللعبة مش عايزة تبدأ. فيه مشكلة في الاتصال بالذكاء الاصطناعي.".to_string()
            }
            (_, FailedStep::Scenario) => "حصلت مشكلة في تحميل السيناريو الجديد.".to_string(),
            (_, FailedStep::Action) => "حصلت مشكلة وإحنا بننفذ قرارك. حاول تاني لو سمحت.".to_string(),
        }
    }
}
