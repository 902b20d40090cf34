//! 事件处理
//!
//! 轮询 crossterm 键盘事件：Ctrl+C / Ctrl+Q 转为退出，其余按键交给 run_app 编辑输入行；
//! 解析好的 Command 经 send 发给运行时。

use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tokio::sync::mpsc;

use crate::core::Command;

/// 应用事件：退出请求或原始按键
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    Quit,
    Key(KeyEvent),
}

/// 事件处理器：持有命令发送端，poll 时读键盘
pub struct EventHandler {
    commands: mpsc::UnboundedSender<Command>,
    tick: Duration,
}

impl EventHandler {
    pub fn new(commands: mpsc::UnboundedSender<Command>) -> Self {
        Self {
            commands,
            tick: Duration::from_millis(100),
        }
    }

    /// 最多等待一个 tick；超时返回 None，用于重绘
    pub fn poll(&self) -> anyhow::Result<Option<AppEvent>> {
        if event::poll(self.tick)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    return Ok(Some(classify(key)));
                }
            }
        }
        Ok(None)
    }

    /// 发送命令；运行时已退出时返回 false
    pub fn send(&self, command: Command) -> bool {
        self.commands.send(command).is_ok()
    }
}

fn classify(key: KeyEvent) -> AppEvent {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('c') | KeyCode::Char('q') if ctrl => AppEvent::Quit,
        _ => AppEvent::Key(key),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ctrl_shortcuts_quit() {
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        let ctrl_q = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::CONTROL);
        assert_eq!(classify(ctrl_c), AppEvent::Quit);
        assert_eq!(classify(ctrl_q), AppEvent::Quit);

        let plain_q = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE);
        assert_eq!(classify(plain_q), AppEvent::Key(plain_q));
    }

    #[tokio::test]
    async fn test_send_reports_closed_runtime() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handler = EventHandler::new(tx);
        assert!(handler.send(Command::RetryScenario));
        assert_eq!(rx.recv().await, Some(Command::RetryScenario));

        drop(rx);
        assert!(!handler.send(Command::Quit));
    }
}
