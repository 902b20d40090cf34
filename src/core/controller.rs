//! 顶层状态机：GameController
//!
//! Setup --(教程确认)--> AwaitingConfiguration --(提交配置)--> Active
//! Active --(动作)--> Active | Ended；Ended --(重开)--> AwaitingConfiguration
//!
//! 控制器是权威状态的唯一写者：前台动作经 RoundOrchestrator 修改会话，
//! 后台任务结果经 mpsc 通道回到这里，由 `apply_background` 按 epoch 决定应用或丢弃。

use tokio::sync::mpsc;

use crate::config::GameSection;
use crate::core::{
    BackgroundEvent, BackgroundPayload, EndReason, FailedStep, GameError, GameSession,
    GameSnapshot, GameState, RoundOrchestrator, RoundResult, StalePolicy, TaskKind, TipsState,
};
use crate::farm::{Action, FarmStats, GameReport, ScenarioData, SoilType};

/// 配置步骤提交的内容；未填的字段取配置默认值
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GameSetup {
    pub soil_type: Option<SoilType>,
    pub crop_type: Option<String>,
    /// 手动输入或真实天气得到的首回合数据；None 表示自动生成
    pub seed: Option<ScenarioData>,
}

/// 一次后台事件的处理结果
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackgroundApplied {
    Applied(TaskKind),
    Discarded(TaskKind),
}

pub struct GameController {
    state: GameState,
    session: Option<GameSession>,
    orchestrator: RoundOrchestrator,
    background_rx: mpsc::UnboundedReceiver<BackgroundEvent>,
    policy: StalePolicy,
    defaults: GameSection,
    error_message: Option<String>,
}

impl GameController {
    pub fn new(
        orchestrator: RoundOrchestrator,
        background_rx: mpsc::UnboundedReceiver<BackgroundEvent>,
        defaults: GameSection,
    ) -> Self {
        let policy = if defaults.discard_stale_background {
            StalePolicy::Discard
        } else {
            StalePolicy::Apply
        };
        Self {
            state: GameState::Setup,
            session: None,
            orchestrator,
            background_rx,
            policy,
            defaults,
            error_message: None,
        }
    }

    pub fn with_stale_policy(mut self, policy: StalePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn session(&self) -> Option<&GameSession> {
        self.session.as_ref()
    }

    pub fn current_epoch(&self) -> u64 {
        self.orchestrator.background().current_epoch()
    }

    pub fn acknowledge_tutorial(&mut self) -> Result<(), GameError> {
        self.expect_state(GameState::Setup, "acknowledge tutorial")?;
        self.state = GameState::AwaitingConfiguration;
        Ok(())
    }

    /// 提交配置：新建会话（round=1、空账本、空图像），进入 Active 并生成首回合情景
    ///
    /// 首回合情景失败时仍停留在 Active，会话标记 awaiting_scenario，可用 `retry_scenario` 重试。
    pub async fn configure(&mut self, setup: GameSetup) -> Result<(), GameError> {
        self.expect_state(GameState::AwaitingConfiguration, "configure")?;

        let soil_type = setup.soil_type.unwrap_or(self.defaults.default_soil_type);
        let crop_type = setup
            .crop_type
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| self.defaults.default_crop_type.clone());
        if !crate::farm::catalog::is_known_crop(&crop_type) {
            tracing::debug!(crop = %crop_type, "Crop not in catalog");
        }
        let stats = FarmStats::new(
            self.defaults.initial_crop_health,
            self.defaults.initial_soil_moisture,
            self.defaults.initial_water_reserves,
            soil_type,
            crop_type,
        )
        .clamped();

        let mut session = GameSession::new(stats, setup.seed);
        tracing::info!(game = %session.id, soil = %session.stats.soil_type, crop = %session.stats.crop_type, "New game configured");

        self.orchestrator.begin_epoch();
        self.state = GameState::Active;
        self.error_message = None;

        let result = self.orchestrator.open_game(&mut session).await;
        self.session = Some(session);
        result.map_err(|e| self.record(e, FailedStep::Start))
    }

    /// 玩家提交动作；只在 Active 且当前情景可玩时接受
    pub async fn submit_action(
        &mut self,
        action: Action,
        edited: Option<ScenarioData>,
    ) -> Result<RoundResult, GameError> {
        if self.state != GameState::Active || self.session.is_none() {
            return Err(self.reject(GameError::NotActive(self.state)));
        }
        let Some(session) = self.session.as_mut() else {
            return Err(GameError::NotActive(self.state));
        };
        let step = if session.awaiting_scenario {
            FailedStep::Scenario
        } else {
            FailedStep::Action
        };
        self.error_message = None;

        let result = self
            .orchestrator
            .play_round(session, action, edited.map(ScenarioData::sanitized))
            .await;

        match result {
            Ok(result) => {
                if let RoundResult::Ended { reason, .. } = &result {
                    tracing::info!(?reason, "Game ended");
                    self.state = GameState::Ended;
                }
                Ok(result)
            }
            Err(e) => {
                // 结果已应用、只是新情景没出来：错误归到情景步骤
                let step = if session.awaiting_scenario {
                    FailedStep::Scenario
                } else {
                    step
                };
                Err(self.record(e, step))
            }
        }
    }

    /// 只重跑当前回合的情景生成
    pub async fn retry_scenario(&mut self) -> Result<(), GameError> {
        if self.state != GameState::Active || self.session.is_none() {
            return Err(self.reject(GameError::NotActive(self.state)));
        }
        if !self.session.as_ref().is_some_and(|s| s.awaiting_scenario) {
            return Err(self.reject(GameError::InvalidTransition {
                from: self.state,
                via: "retry scenario",
            }));
        }
        let Some(session) = self.session.as_mut() else {
            return Err(GameError::NotActive(self.state));
        };
        let step = if session.ledger.is_empty() {
            FailedStep::Start
        } else {
            FailedStep::Scenario
        };
        self.error_message = None;

        let result = self.orchestrator.retry_scenario(session).await;
        result.map_err(|e| self.record(e, step))
    }

    /// Ended → AwaitingConfiguration；丢弃上一局会话，其后台结果从此过期
    pub fn restart(&mut self) -> Result<(), GameError> {
        self.expect_state(GameState::Ended, "restart")?;
        let epoch = self.orchestrator.begin_epoch();
        self.session = None;
        self.state = GameState::AwaitingConfiguration;
        self.error_message = None;
        tracing::info!(epoch, "Game restarted");
        Ok(())
    }

    /// 应用一条后台事件
    ///
    /// 其他游戏（重开前的旧局）的事件总是丢弃；同一局内旧回合的事件按 StalePolicy 处理。
    pub fn apply_background(&mut self, event: BackgroundEvent) -> BackgroundApplied {
        let kind = event.payload.kind();
        let current = self.orchestrator.background().is_current(&event);
        let Some(session) = self.session.as_mut().filter(|s| s.id == event.game) else {
            tracing::debug!(?kind, game = %event.game, "Discarding result from another game");
            return BackgroundApplied::Discarded(kind);
        };
        if !current && self.policy == StalePolicy::Discard {
            tracing::debug!(
                ?kind,
                epoch = event.epoch,
                current = self.orchestrator.background().current_epoch(),
                "Discarding stale background result"
            );
            return BackgroundApplied::Discarded(kind);
        }

        match event.payload {
            BackgroundPayload::Image(url) => {
                if url.is_some() {
                    session.image.url = url;
                }
                if current {
                    session.image.generating = false;
                }
            }
            BackgroundPayload::Tips(tips) => {
                session.tips = TipsState::ready(tips);
            }
            BackgroundPayload::Failed(TaskKind::Image) => {
                if current {
                    session.image.generating = false;
                }
            }
            BackgroundPayload::Failed(TaskKind::Tips) => {
                session.tips = TipsState::ready(Vec::new());
            }
        }
        BackgroundApplied::Applied(kind)
    }

    /// 等待下一条后台事件并应用；通道关闭时返回 None
    pub async fn next_background(&mut self) -> Option<BackgroundApplied> {
        let event = self.background_rx.recv().await?;
        Some(self.apply_background(event))
    }

    /// 拆出后台事件接收端（运行时循环在 select! 中独立轮询它）
    pub(crate) fn background_rx(&mut self) -> &mut mpsc::UnboundedReceiver<BackgroundEvent> {
        &mut self.background_rx
    }

    pub fn snapshot(&self) -> GameSnapshot {
        let mut snapshot = GameSnapshot {
            state: self.state,
            max_rounds: self.orchestrator.max_rounds(),
            error_message: self.error_message.clone(),
            ..GameSnapshot::default()
        };
        if let Some(session) = &self.session {
            snapshot.round = session.round;
            snapshot.stats = Some(session.stats.clone());
            snapshot.scenario = session.scenario.clone();
            snapshot.history = session.ledger.entries().to_vec();
            snapshot.image = session.image.clone();
            snapshot.tips = session.tips.clone();
            snapshot.awaiting_scenario = session.awaiting_scenario;
        }
        snapshot.report = self.report();
        snapshot
    }

    /// 终局报告（仅 Ended 状态）
    pub fn report(&self) -> Option<GameReport> {
        if self.state != GameState::Ended {
            return None;
        }
        let session = self.session.as_ref()?;
        let tips = session.tips.tips.clone().unwrap_or_default();
        Some(GameReport::build(&session.stats, &session.ledger, &tips))
    }

    /// 游戏结束的原因（报告展示用）
    pub fn end_reason(&self) -> Option<EndReason> {
        if self.state != GameState::Ended {
            return None;
        }
        let session = self.session.as_ref()?;
        self.orchestrator
            .terminal_reason(&session.stats, session.round + 1)
    }

    fn expect_state(&mut self, expected: GameState, via: &'static str) -> Result<(), GameError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(self.reject(GameError::InvalidTransition {
                from: self.state,
                via,
            }))
        }
    }

    /// 非法请求：不改变任何状态，只留下提示
    fn reject(&mut self, error: GameError) -> GameError {
        tracing::warn!(error = %error, "Request rejected");
        self.error_message = Some(error.user_message(FailedStep::Action));
        error
    }

    fn record(&mut self, error: GameError, step: FailedStep) -> GameError {
        tracing::error!(error = %error, ?step, "Foreground step failed");
        self.error_message = Some(error.user_message(step));
        error
    }
}
