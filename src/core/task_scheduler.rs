//! 后台任务：图像生成与结算建议（不阻塞前台）
//!
//! 每个后台任务在派发时带上所属游戏的 id 与 epoch；完成后把结果作为 BackgroundEvent
//! 发回控制器，由控制器（唯一写者）决定应用还是丢弃过期结果。任务 panic 也会转成 Failed 事件，
//! 「生成中」标志不会永久卡住。

use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::farm::{FarmStats, HistoryEntry};
use crate::gateway::{ContentService, ImageRequest};

/// 任务类型
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum TaskKind {
    Image,
    Tips,
}

#[derive(Clone, Debug, PartialEq)]
pub enum BackgroundPayload {
    /// None：没有产生新图像，保持原样
    Image(Option<String>),
    Tips(Vec<String>),
    /// 任务异常终止
    Failed(TaskKind),
}

impl BackgroundPayload {
    pub fn kind(&self) -> TaskKind {
        match self {
            BackgroundPayload::Image(_) => TaskKind::Image,
            BackgroundPayload::Tips(_) => TaskKind::Tips,
            BackgroundPayload::Failed(kind) => *kind,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BackgroundEvent {
    /// 派发任务的游戏；与当前游戏不同的事件总是丢弃
    pub game: Uuid,
    pub epoch: u64,
    pub payload: BackgroundPayload,
}

/// 过期结果的处理策略
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StalePolicy {
    /// epoch 不匹配则丢弃
    Discard,
    /// 同一局内的旧回合结果也应用（后写者胜）
    Apply,
}

/// 派发后台任务并维护单调递增的 epoch
#[derive(Debug)]
pub struct BackgroundTasks {
    epoch: u64,
    tx: mpsc::UnboundedSender<BackgroundEvent>,
}

impl BackgroundTasks {
    /// 返回派发器与事件接收端
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<BackgroundEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { epoch: 0, tx }, rx)
    }

    pub fn current_epoch(&self) -> u64 {
        self.epoch
    }

    /// 进入新 epoch：之前派发的任务从此视为过期
    pub fn advance_epoch(&mut self) -> u64 {
        self.epoch += 1;
        self.epoch
    }

    pub fn is_current(&self, event: &BackgroundEvent) -> bool {
        event.epoch == self.epoch
    }

    /// 在新 epoch 下派发图像任务，返回该 epoch
    pub fn spawn_image(
        &mut self,
        game: Uuid,
        content: Arc<dyn ContentService>,
        request: ImageRequest,
    ) -> u64 {
        let epoch = self.advance_epoch();
        tracing::debug!(%game, epoch, edit = request.previous.is_some(), "Dispatching image task");
        self.spawn(game, epoch, TaskKind::Image, async move {
            BackgroundPayload::Image(content.generate_image(&request).await)
        });
        epoch
    }

    /// 在当前 epoch 下派发结算建议任务
    pub fn spawn_tips(
        &self,
        game: Uuid,
        content: Arc<dyn ContentService>,
        final_stats: FarmStats,
        history: Vec<HistoryEntry>,
    ) -> u64 {
        let epoch = self.epoch;
        tracing::debug!(%game, epoch, rounds = history.len(), "Dispatching tips task");
        self.spawn(game, epoch, TaskKind::Tips, async move {
            BackgroundPayload::Tips(content.generate_tips(&final_stats, &history).await)
        });
        epoch
    }

    fn spawn<F>(&self, game: Uuid, epoch: u64, kind: TaskKind, work: F)
    where
        F: Future<Output = BackgroundPayload> + Send + 'static,
    {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let payload = match tokio::spawn(work).await {
                Ok(payload) => payload,
                Err(e) => {
                    tracing::warn!(?kind, error = %e, "Background task aborted");
                    BackgroundPayload::Failed(kind)
                }
            };
            // 接收端已关闭说明游戏已退出，结果无人需要
            let _ = tx.send(BackgroundEvent { game, epoch, payload });
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::core::GameError;
    use crate::farm::{Action, Outcome, Scenario, ScenarioData, SoilType};
    use crate::gateway::fallback_scenario;

    struct PanickingImages;

    #[async_trait]
    impl ContentService for PanickingImages {
        async fn generate_scenario(&self, _history: &[HistoryEntry], _stats: &FarmStats) -> Result<Scenario, GameError> {
            Ok(fallback_scenario())
        }

        async fn generate_scenario_from_seed(&self, _seed: &ScenarioData, _soil: SoilType, _crop: &str) -> Result<Scenario, GameError> {
            Ok(fallback_scenario())
        }

        async fn compute_outcome(&self, stats: &FarmStats, _scenario: &Scenario, _action: Action) -> Result<Outcome, GameError> {
            Ok(Outcome {
                narrative: String::new(),
                updated_stats: stats.clone(),
            })
        }

        async fn generate_image(&self, _request: &ImageRequest) -> Option<String> {
            panic!("image backend crashed")
        }

        async fn generate_tips(&self, _stats: &FarmStats, _history: &[HistoryEntry]) -> Vec<String> {
            vec!["tip".into()]
        }
    }

    fn request() -> ImageRequest {
        ImageRequest {
            scenario: fallback_scenario(),
            previous: None,
            outcome_narrative: String::new(),
            crop_type: "القمح".into(),
            soil_type: SoilType::Silty,
        }
    }

    #[tokio::test]
    async fn test_epochs_are_monotonic() {
        let (mut tasks, _rx) = BackgroundTasks::channel();
        assert_eq!(tasks.current_epoch(), 0);
        assert_eq!(tasks.advance_epoch(), 1);
        assert_eq!(tasks.advance_epoch(), 2);
    }

    #[tokio::test]
    async fn test_panicking_task_reports_failure() {
        let (mut tasks, mut rx) = BackgroundTasks::channel();
        let game = Uuid::new_v4();
        let epoch = tasks.spawn_image(game, Arc::new(PanickingImages), request());

        let event = rx.recv().await.unwrap();
        assert_eq!(event.game, game);
        assert_eq!(event.epoch, epoch);
        assert_eq!(event.payload, BackgroundPayload::Failed(TaskKind::Image));
        assert!(tasks.is_current(&event));
    }

    #[tokio::test]
    async fn test_tips_use_current_epoch() {
        let (mut tasks, mut rx) = BackgroundTasks::channel();
        tasks.advance_epoch();
        let stats = FarmStats::new(10.0, 10.0, 10.0, SoilType::Silty, "القمح");
        let epoch = tasks.spawn_tips(Uuid::new_v4(), Arc::new(PanickingImages), stats, Vec::new());
        assert_eq!(epoch, 1);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.payload, BackgroundPayload::Tips(vec!["tip".into()]));

        tasks.advance_epoch();
        assert!(!tasks.is_current(&event));
    }
}
