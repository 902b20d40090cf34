//! 状态定义：GameState、后台产物状态与 GameSnapshot 投影
//!
//! 展示层只持有轻量的 GameSnapshot；权威状态由 GameController 维护并投影出来。

use serde::Serialize;

use crate::farm::{FarmStats, GameReport, HistoryEntry, Scenario};

/// 顶层状态机（教程 → 配置 → 进行中 → 结束）
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum GameState {
    #[default]
    Setup,
    AwaitingConfiguration,
    Active,
    Ended,
}

/// 尽力而为的农场图像；url 可能落后情景一个回合
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ImageState {
    pub url: Option<String>,
    pub generating: bool,
}

/// 结算建议；None 表示尚未产生
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TipsState {
    pub tips: Option<Vec<String>>,
    pub generating: bool,
}

impl TipsState {
    pub fn pending() -> Self {
        Self {
            tips: None,
            generating: true,
        }
    }

    pub fn ready(tips: Vec<String>) -> Self {
        Self {
            tips: Some(tips),
            generating: false,
        }
    }
}

/// 展示层看到的「投影」状态
#[derive(Clone, Debug, Default, Serialize)]
pub struct GameSnapshot {
    pub state: GameState,
    pub round: u32,
    pub max_rounds: u32,
    pub stats: Option<FarmStats>,
    pub scenario: Option<Scenario>,
    pub history: Vec<HistoryEntry>,
    pub image: ImageState,
    pub tips: TipsState,
    /// 前台步骤进行中，输入锁定
    pub busy: bool,
    /// 新回合情景生成失败，需先重试情景
    pub awaiting_scenario: bool,
    pub error_message: Option<String>,
    /// 仅 Ended 状态下存在
    pub report: Option<GameReport>,
}
