//! 游戏运行时：主控循环
//!
//! 建立 command / snapshot 两条通道，在后台任务中消费玩家命令并驱动 GameController；
//! 后台任务结果也在同一个循环里应用（单写者）。
//! 前台步骤进行中（结果计算、情景生成）再到达的命令一律以 Busy 拒绝，Quit 延后到步骤结束。

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::core::{FailedStep, GameController, GameError, GameSetup, GameSnapshot};
use crate::farm::{Action, ScenarioData};

/// 从展示层发往运行时的玩家命令
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// 看完教程
    AcknowledgeTutorial,
    /// 提交配置并开局
    Configure(GameSetup),
    /// 提交动作（可附带本地编辑过的环境数据）
    Act {
        action: Action,
        edited: Option<ScenarioData>,
    },
    /// 重试情景生成
    RetryScenario,
    /// 结束后重开
    Restart,
    /// 退出
    Quit,
}

/// 运行中游戏的句柄
pub struct GameHandle {
    commands: mpsc::UnboundedSender<Command>,
    snapshots: watch::Receiver<GameSnapshot>,
    task: JoinHandle<GameController>,
}

impl GameHandle {
    /// 发送命令；运行时已退出时返回 false
    pub fn send(&self, command: Command) -> bool {
        self.commands.send(command).is_ok()
    }

    /// 命令发送端副本（后台任务完成后再发命令时使用）
    pub fn commands(&self) -> mpsc::UnboundedSender<Command> {
        self.commands.clone()
    }

    pub fn snapshots(&self) -> watch::Receiver<GameSnapshot> {
        self.snapshots.clone()
    }

    pub fn latest(&self) -> GameSnapshot {
        self.snapshots.borrow().clone()
    }

    /// 等待运行时退出，取回控制器（用于生成报告）
    pub async fn join(self) -> Result<GameController, tokio::task::JoinError> {
        drop(self.commands);
        self.task.await
    }
}

/// 在后台任务中运行控制器
pub fn spawn_game(controller: GameController) -> GameHandle {
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<Command>();
    let (state_tx, state_rx) = watch::channel(controller.snapshot());

    let task = tokio::spawn(run(controller, cmd_rx, state_tx));

    GameHandle {
        commands: cmd_tx,
        snapshots: state_rx,
        task,
    }
}

async fn run(
    mut controller: GameController,
    mut commands: mpsc::UnboundedReceiver<Command>,
    snapshots: watch::Sender<GameSnapshot>,
) -> GameController {
    loop {
        tokio::select! {
            cmd = commands.recv() => {
                match cmd {
                    Some(Command::Quit) | None => break,
                    Some(cmd) => {
                        let quit = execute(&mut controller, cmd, &mut commands, &snapshots).await;
                        if quit {
                            break;
                        }
                    }
                }
            }
            Some(event) = controller.background_rx().recv() => {
                controller.apply_background(event);
                snapshots.send_replace(controller.snapshot());
            }
        }
    }
    tracing::info!("Game runtime stopped");
    controller
}

/// 执行一条前台命令，期间拒绝其余命令；返回期间是否收到了 Quit
async fn execute(
    controller: &mut GameController,
    cmd: Command,
    commands: &mut mpsc::UnboundedReceiver<Command>,
    snapshots: &watch::Sender<GameSnapshot>,
) -> bool {
    let mut busy = controller.snapshot();
    busy.busy = true;
    snapshots.send_replace(busy.clone());

    let mut quit = false;
    {
        let work = dispatch(controller, cmd);
        tokio::pin!(work);
        loop {
            tokio::select! {
                biased;
                _ = &mut work => break,
                incoming = commands.recv(), if !quit => match incoming {
                    Some(Command::Quit) | None => quit = true,
                    Some(other) => {
                        tracing::warn!(command = ?other, "Command rejected while busy");
                        busy.error_message = Some(GameError::Busy.user_message(FailedStep::Action));
                        snapshots.send_replace(busy.clone());
                    }
                },
            }
        }
    }

    snapshots.send_replace(controller.snapshot());
    quit
}

async fn dispatch(controller: &mut GameController, cmd: Command) {
    let result = match cmd {
        Command::AcknowledgeTutorial => controller.acknowledge_tutorial(),
        Command::Configure(setup) => controller.configure(setup).await,
        Command::Act { action, edited } => controller.submit_action(action, edited).await.map(|_| ()),
        Command::RetryScenario => controller.retry_scenario().await,
        Command::Restart => controller.restart(),
        Command::Quit => Ok(()),
    };
    if let Err(e) = result {
        tracing::debug!(error = %e, "Command finished with error");
    }
}
