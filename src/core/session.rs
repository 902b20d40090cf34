//! 一局游戏的权威数据（由 GameController 独占持有）

use uuid::Uuid;

use crate::core::{ImageState, TipsState};
use crate::farm::{FarmStats, HistoryLedger, Scenario, ScenarioData};

#[derive(Clone, Debug)]
pub struct GameSession {
    pub id: Uuid,
    /// 从 1 开始，每个非终局回合 +1
    pub round: u32,
    pub stats: FarmStats,
    /// 当前回合的情景；新回合开始时整体替换
    pub scenario: Option<Scenario>,
    pub ledger: HistoryLedger,
    pub image: ImageState,
    pub tips: TipsState,
    /// 开局种子，首回合情景重试时沿用
    pub seed: Option<ScenarioData>,
    /// 本回合情景生成失败，玩家需先重试
    pub awaiting_scenario: bool,
    /// 情景生成失败时暂存的上一回合结果叙述，重试成功后用于图像
    pub(crate) pending_image_context: Option<String>,
}

impl GameSession {
    pub fn new(stats: FarmStats, seed: Option<ScenarioData>) -> Self {
        Self {
            id: Uuid::new_v4(),
            round: 1,
            stats,
            scenario: None,
            ledger: HistoryLedger::new(),
            image: ImageState::default(),
            tips: TipsState::default(),
            seed,
            awaiting_scenario: false,
            pending_image_context: None,
        }
    }
}
