//! 回合编排器：一次玩家动作 = 一个 Evaluating 周期
//!
//! Idle → Evaluating → {Terminal | Advancing} → Idle
//! 1. Evaluating：计算结果 → 追加历史 + 替换统计（原子，要么全做要么全不做）
//! 2. 终局判定：cropHealth ≤ 0 或「下一回合号」> MAX_ROUNDS，每个动作只判定一次
//! 3. Terminal：后台派发结算建议，立即解除前台阻塞
//! 4. Advancing：回合号 +1，前台生成新情景（玩家需等待），成功后后台派发图像（不阻塞）

use std::sync::Arc;

use crate::core::{BackgroundTasks, GameError, GameSession, TipsState};
use crate::farm::{Action, FarmStats, HistoryEntry, Outcome, Scenario, ScenarioData};
use crate::gateway::{prompts::NEW_FARM_CONTEXT, ContentService, ImageRequest};

/// 终局原因
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EndReason {
    /// 作物死亡
    CropFailed,
    /// 回合数用尽
    RoundsExhausted,
}

/// 一次动作的结果
#[derive(Clone, Debug, PartialEq)]
pub enum RoundResult {
    /// 进入新回合，新情景已就绪
    Advanced { round: u32, outcome: Outcome },
    /// 游戏结束，结算建议在后台生成
    Ended { outcome: Outcome, reason: EndReason },
}

pub struct RoundOrchestrator {
    content: Arc<dyn ContentService>,
    background: BackgroundTasks,
    max_rounds: u32,
}

impl RoundOrchestrator {
    pub fn new(content: Arc<dyn ContentService>, background: BackgroundTasks, max_rounds: u32) -> Self {
        Self {
            content,
            background,
            max_rounds: max_rounds.max(1),
        }
    }

    pub fn max_rounds(&self) -> u32 {
        self.max_rounds
    }

    pub fn background(&self) -> &BackgroundTasks {
        &self.background
    }

    /// 新一局或重开时调用：之前局派发的后台任务全部过期
    pub fn begin_epoch(&mut self) -> u64 {
        self.background.advance_epoch()
    }

    /// 终局判定（在结果应用之后、回合号递增之前）
    pub fn terminal_reason(&self, stats: &FarmStats, next_round: u32) -> Option<EndReason> {
        if stats.is_depleted() {
            Some(EndReason::CropFailed)
        } else if next_round > self.max_rounds {
            Some(EndReason::RoundsExhausted)
        } else {
            None
        }
    }

    /// 首回合：生成情景（有种子则沿用种子数据），随后后台 create 首张图像
    pub async fn open_game(&mut self, session: &mut GameSession) -> Result<(), GameError> {
        tracing::info!(game = %session.id, seeded = session.seed.is_some(), "Opening game");
        self.advance_scenario(session).await
    }

    /// 情景生成失败后重试，只重跑情景这一步
    pub async fn retry_scenario(&mut self, session: &mut GameSession) -> Result<(), GameError> {
        if !session.awaiting_scenario {
            return Ok(());
        }
        tracing::info!(game = %session.id, round = session.round, "Retrying scenario generation");
        self.advance_scenario(session).await
    }

    /// 处理一次玩家动作；`edited` 是玩家在提交前本地编辑过的环境数据
    pub async fn play_round(
        &mut self,
        session: &mut GameSession,
        action: Action,
        edited: Option<ScenarioData>,
    ) -> Result<RoundResult, GameError> {
        if session.awaiting_scenario {
            return Err(GameError::ScenarioUnavailable);
        }
        let current = session
            .scenario
            .as_ref()
            .ok_or(GameError::ScenarioUnavailable)?;
        // 提交副本在此刻冻结
        let submitted = match edited {
            Some(data) => current.with_data(data),
            None => current.clone(),
        };

        tracing::info!(game = %session.id, round = session.round, %action, "Evaluating action");
        let outcome = self
            .content
            .compute_outcome(&session.stats, &submitted, action)
            .await?;

        if !outcome.updated_stats.same_identity(&session.stats) {
            return Err(GameError::InvariantViolated(format!(
                "outcome changed farm identity from {}/{} to {}/{}",
                session.stats.soil_type,
                session.stats.crop_type,
                outcome.updated_stats.soil_type,
                outcome.updated_stats.crop_type
            )));
        }

        session.ledger.append(HistoryEntry {
            round: session.round,
            scenario: submitted,
            action,
            outcome: outcome.clone(),
        })?;
        session.stats = outcome.updated_stats.clone();

        if let Some(reason) = self.terminal_reason(&session.stats, session.round + 1) {
            tracing::info!(
                game = %session.id,
                round = session.round,
                ?reason,
                score = session.stats.final_score(),
                "Game over"
            );
            session.tips = TipsState::pending();
            self.background.spawn_tips(
                session.id,
                Arc::clone(&self.content),
                session.stats.clone(),
                session.ledger.entries().to_vec(),
            );
            return Ok(RoundResult::Ended { outcome, reason });
        }

        session.round += 1;
        session.pending_image_context = Some(outcome.narrative.clone());
        tracing::info!(game = %session.id, round = session.round, "Advancing to next round");
        self.advance_scenario(session).await?;

        Ok(RoundResult::Advanced {
            round: session.round,
            outcome,
        })
    }

    /// 前台情景生成；失败时不替换当前情景，标记 awaiting_scenario 等待重试
    async fn advance_scenario(&mut self, session: &mut GameSession) -> Result<(), GameError> {
        session.awaiting_scenario = true;

        let generated = if session.ledger.is_empty() {
            match &session.seed {
                Some(seed) => {
                    self.content
                        .generate_scenario_from_seed(
                            seed,
                            session.stats.soil_type,
                            &session.stats.crop_type,
                        )
                        .await
                }
                None => self.content.generate_scenario(&[], &session.stats).await,
            }
        } else {
            self.content
                .generate_scenario(session.ledger.entries(), &session.stats)
                .await
        };

        let scenario = generated.map_err(|e| {
            tracing::error!(game = %session.id, round = session.round, error = %e, "Scenario generation failed");
            e
        })?;

        session.scenario = Some(scenario.clone());
        session.awaiting_scenario = false;

        let context = session
            .pending_image_context
            .take()
            .unwrap_or_else(|| NEW_FARM_CONTEXT.to_string());
        self.dispatch_image(session, scenario, context);
        Ok(())
    }

    /// 以当前图像为底图（首张则 create）后台派发图像任务
    fn dispatch_image(&mut self, session: &mut GameSession, scenario: Scenario, context: String) {
        session.image.generating = true;
        let request = ImageRequest {
            scenario,
            previous: session.image.url.clone(),
            outcome_narrative: context,
            crop_type: session.stats.crop_type.clone(),
            soil_type: session.stats.soil_type,
        };
        self.background
            .spawn_image(session.id, Arc::clone(&self.content), request);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::farm::SoilType;
    use crate::gateway::fallback_scenario;

    /// 结果计算本身抛错（绕过网关兜底）的内容服务
    struct BrokenOutcome {
        drift_identity: bool,
    }

    #[async_trait]
    impl ContentService for BrokenOutcome {
        async fn generate_scenario(&self, _history: &[HistoryEntry], _stats: &FarmStats) -> Result<Scenario, GameError> {
            Ok(fallback_scenario())
        }

        async fn generate_scenario_from_seed(&self, _seed: &ScenarioData, _soil: SoilType, _crop: &str) -> Result<Scenario, GameError> {
            Ok(fallback_scenario())
        }

        async fn compute_outcome(&self, stats: &FarmStats, _scenario: &Scenario, _action: Action) -> Result<Outcome, GameError> {
            if self.drift_identity {
                let mut updated = stats.clone();
                updated.crop_type = "القطن".into();
                updated.crop_health = 10.0;
                return Ok(Outcome {
                    narrative: "drift".into(),
                    updated_stats: updated,
                });
            }
            Err(GameError::InvariantViolated("fallback unavailable".into()))
        }

        async fn generate_image(&self, request: &ImageRequest) -> Option<String> {
            request.previous.clone()
        }

        async fn generate_tips(&self, _stats: &FarmStats, _history: &[HistoryEntry]) -> Vec<String> {
            Vec::new()
        }
    }

    fn active_session() -> GameSession {
        let mut session = GameSession::new(
            FarmStats::new(70.0, 60.0, 80.0, SoilType::Silty, "القمح"),
            None,
        );
        session.scenario = Some(fallback_scenario());
        session
    }

    #[tokio::test]
    async fn test_escaped_outcome_error_leaves_session_untouched() {
        let (tasks, _rx) = BackgroundTasks::channel();
        let mut orchestrator =
            RoundOrchestrator::new(Arc::new(BrokenOutcome { drift_identity: false }), tasks, 5);
        let mut session = active_session();
        let before = session.stats.clone();

        let err = orchestrator
            .play_round(&mut session, Action::Irrigate, None)
            .await
            .unwrap_err();

        assert!(matches!(err, GameError::InvariantViolated(_)));
        assert_eq!(session.round, 1);
        assert_eq!(session.stats, before);
        assert!(session.ledger.is_empty());
    }

    #[tokio::test]
    async fn test_identity_drift_is_rejected_atomically() {
        let (tasks, _rx) = BackgroundTasks::channel();
        let mut orchestrator =
            RoundOrchestrator::new(Arc::new(BrokenOutcome { drift_identity: true }), tasks, 5);
        let mut session = active_session();

        let err = orchestrator
            .play_round(&mut session, Action::Fertilize, None)
            .await
            .unwrap_err();

        assert!(matches!(err, GameError::InvariantViolated(_)));
        assert_eq!(session.stats.crop_health, 70.0);
        assert!(session.ledger.is_empty());
    }

    #[test]
    fn test_terminal_reason() {
        let (tasks, _rx) = BackgroundTasks::channel();
        let orchestrator =
            RoundOrchestrator::new(Arc::new(BrokenOutcome { drift_identity: false }), tasks, 5);
        let healthy = FarmStats::new(50.0, 50.0, 50.0, SoilType::Silty, "القمح");
        let dead = FarmStats::new(0.0, 50.0, 50.0, SoilType::Silty, "القمح");

        assert_eq!(orchestrator.terminal_reason(&healthy, 5), None);
        assert_eq!(
            orchestrator.terminal_reason(&healthy, 6),
            Some(EndReason::RoundsExhausted)
        );
        assert_eq!(
            orchestrator.terminal_reason(&dead, 3),
            Some(EndReason::CropFailed)
        );
    }
}
