//! TUI 应用主循环
//!
//! 进入全屏 / 原始模式，每帧读取最新 GameSnapshot 并用 draw 渲染；
//! 键盘输入在本地拼成一行，Enter 时解析为 Command 交给运行时。
//! 真实天气查询在独立任务中完成，成功后以种子开局，界面不会因此卡住。

use std::io::{self, Stdout};
use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;

use crate::core::{Command, GameHandle, GameSetup, GameSnapshot};
use crate::farm::SoilType;
use crate::ui::event::{AppEvent, EventHandler};
use crate::ui::input::{parse_line, Input};
use crate::ui::render::{draw, Panel, ViewState};
use crate::weather::WeatherProvider;

/// 一次按键处理后需要 run_app 执行的动作
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    Send(Command),
    LookupWeather {
        city: &'static str,
        soil_type: Option<SoilType>,
        crop_type: Option<String>,
    },
    Quit,
}

/// 处理一个按键：编辑输入行、切换面板、滚动；Enter 时解析整行
pub fn handle_key(view: &mut ViewState, key: KeyEvent, snapshot: &GameSnapshot) -> Option<Intent> {
    match key.code {
        KeyCode::Enter => {
            let line = std::mem::take(&mut view.input);
            if line.trim().is_empty() {
                return None;
            }
            submit(view, &line, snapshot)
        }
        KeyCode::Char(c) => {
            view.input.push(c);
            None
        }
        KeyCode::Backspace => {
            view.input.pop();
            None
        }
        KeyCode::Esc => {
            view.panel = Panel::Game;
            view.notice = None;
            view.scroll = 0;
            None
        }
        KeyCode::Up => {
            view.scroll = view.scroll.saturating_sub(1);
            None
        }
        KeyCode::Down => {
            view.scroll = view.scroll.saturating_add(1);
            None
        }
        KeyCode::PageUp => {
            view.scroll = view.scroll.saturating_sub(10);
            None
        }
        KeyCode::PageDown => {
            view.scroll = view.scroll.saturating_add(10);
            None
        }
        KeyCode::Home => {
            view.scroll = 0;
            None
        }
        _ => None,
    }
}

fn submit(view: &mut ViewState, line: &str, snapshot: &GameSnapshot) -> Option<Intent> {
    let current = snapshot.scenario.as_ref().map(|s| s.data);
    view.notice = None;
    match parse_line(line, current.as_ref()) {
        Ok(Input::Send(command)) => {
            show(view, Panel::Game);
            Some(Intent::Send(command))
        }
        Ok(Input::RealWeather {
            city,
            soil_type,
            crop_type,
        }) => {
            view.notice = Some(format!("Fetching the weather for {city}…"));
            Some(Intent::LookupWeather {
                city,
                soil_type,
                crop_type,
            })
        }
        Ok(Input::Report) => {
            show(view, Panel::Report);
            None
        }
        Ok(Input::Catalog) => {
            show(view, Panel::Catalog);
            None
        }
        Ok(Input::Help) => {
            show(view, Panel::Help);
            None
        }
        Ok(Input::Quit) => Some(Intent::Quit),
        Err(e) => {
            view.notice = Some(e.to_string());
            None
        }
    }
}

fn show(view: &mut ViewState, panel: Panel) {
    view.panel = panel;
    view.scroll = 0;
}

/// 后台查询天气，成功后以查询结果为种子开局；结果提示经 notices 回到界面
fn spawn_weather_lookup(
    weather: Arc<dyn WeatherProvider>,
    commands: mpsc::UnboundedSender<Command>,
    notices: mpsc::UnboundedSender<String>,
    city: &'static str,
    soil_type: Option<SoilType>,
    crop_type: Option<String>,
) {
    tokio::spawn(async move {
        match weather.current(city).await {
            Ok(seed) => {
                let setup = GameSetup {
                    soil_type,
                    crop_type,
                    seed: Some(seed),
                };
                let _ = commands.send(Command::Configure(setup));
                let _ = notices.send(format!("Weather for {city} loaded"));
            }
            Err(e) => {
                tracing::warn!(city, error = %e, "Weather lookup failed");
                let _ = notices.send(format!("Could not fetch the weather for {city}: {e}"));
            }
        }
    });
}

/// 运行 TUI：启用原始模式与全屏，循环 poll 事件 + 渲染，退出时恢复终端
pub async fn run_app(handle: &GameHandle, weather: Arc<dyn WeatherProvider>) -> anyhow::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, handle, weather).await;

    restore_terminal(&mut terminal)?;
    result
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    handle: &GameHandle,
    weather: Arc<dyn WeatherProvider>,
) -> anyhow::Result<()> {
    let events = EventHandler::new(handle.commands());
    let (notice_tx, mut notice_rx) = mpsc::unbounded_channel::<String>();
    let mut view = ViewState::default();

    loop {
        let snapshot = handle.latest();
        while let Ok(notice) = notice_rx.try_recv() {
            view.notice = Some(notice);
        }

        terminal.draw(|f| draw(f, &snapshot, &view))?;

        match events.poll()? {
            Some(AppEvent::Quit) => {
                events.send(Command::Quit);
                break;
            }
            Some(AppEvent::Key(key)) => match handle_key(&mut view, key, &snapshot) {
                Some(Intent::Send(command)) => {
                    if !events.send(command) {
                        break;
                    }
                }
                Some(Intent::LookupWeather {
                    city,
                    soil_type,
                    crop_type,
                }) => spawn_weather_lookup(
                    Arc::clone(&weather),
                    handle.commands(),
                    notice_tx.clone(),
                    city,
                    soil_type,
                    crop_type,
                ),
                Some(Intent::Quit) => {
                    events.send(Command::Quit);
                    break;
                }
                None => {}
            },
            None => {}
        }

        tokio::task::yield_now().await;
    }
    Ok(())
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> anyhow::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crossterm::event::KeyModifiers;

    use crate::farm::{Action, ScenarioData};
    use crate::weather::WeatherError;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_line(view: &mut ViewState, line: &str, snapshot: &GameSnapshot) -> Option<Intent> {
        for c in line.chars() {
            assert_eq!(handle_key(view, key(KeyCode::Char(c)), snapshot), None);
        }
        handle_key(view, key(KeyCode::Enter), snapshot)
    }

    #[test]
    fn test_enter_submits_action() {
        let mut view = ViewState::default();
        let snapshot = GameSnapshot::default();
        for c in "conservx".chars() {
            handle_key(&mut view, key(KeyCode::Char(c)), &snapshot);
        }
        handle_key(&mut view, key(KeyCode::Backspace), &snapshot);
        let intent = type_line(&mut view, "e", &snapshot);

        assert_eq!(
            intent,
            Some(Intent::Send(Command::Act {
                action: Action::Conserve,
                edited: None
            }))
        );
        assert!(view.input.is_empty());
    }

    #[test]
    fn test_unknown_command_shows_notice() {
        let mut view = ViewState::default();
        assert_eq!(type_line(&mut view, "dance", &GameSnapshot::default()), None);
        assert!(view.notice.as_deref().is_some_and(|n| n.contains("dance")));
    }

    #[test]
    fn test_local_commands_switch_panels() {
        let mut view = ViewState::default();
        let snapshot = GameSnapshot::default();

        assert_eq!(type_line(&mut view, "report", &snapshot), None);
        assert_eq!(view.panel, Panel::Report);
        assert_eq!(type_line(&mut view, "crops", &snapshot), None);
        assert_eq!(view.panel, Panel::Catalog);

        handle_key(&mut view, key(KeyCode::PageDown), &snapshot);
        assert_eq!(view.scroll, 10);
        handle_key(&mut view, key(KeyCode::Esc), &snapshot);
        assert_eq!(view.panel, Panel::Game);
        assert_eq!(view.scroll, 0);

        assert_eq!(type_line(&mut view, "quit", &snapshot), Some(Intent::Quit));
    }

    #[test]
    fn test_city_requests_weather_lookup() {
        let mut view = ViewState::default();
        let intent = type_line(&mut view, "city luxor sandy", &GameSnapshot::default());
        assert_eq!(
            intent,
            Some(Intent::LookupWeather {
                city: "Luxor",
                soil_type: Some(SoilType::Sandy),
                crop_type: None
            })
        );
        assert!(view.notice.is_some());
    }

    struct SlowWeather;

    #[async_trait]
    impl WeatherProvider for SlowWeather {
        async fn current(&self, _city: &str) -> Result<ScenarioData, WeatherError> {
            tokio::time::sleep(std::time::Duration::from_secs(30)).await;
            Ok(ScenarioData::neutral())
        }
    }

    struct NoKey;

    #[async_trait]
    impl WeatherProvider for NoKey {
        async fn current(&self, _city: &str) -> Result<ScenarioData, WeatherError> {
            Err(WeatherError::MissingApiKey)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_weather_lookup_runs_in_background() {
        let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel();
        let (notice_tx, mut notice_rx) = mpsc::unbounded_channel();

        spawn_weather_lookup(
            Arc::new(SlowWeather),
            cmd_tx,
            notice_tx,
            "Cairo",
            None,
            Some("القمح".into()),
        );
        // 派发立即返回，结果在查询完成后才到达
        assert!(cmd_rx.try_recv().is_err());

        let command = cmd_rx.recv().await.unwrap();
        assert_eq!(
            command,
            Command::Configure(GameSetup {
                soil_type: None,
                crop_type: Some("القمح".into()),
                seed: Some(ScenarioData::neutral()),
            })
        );
        assert!(notice_rx.recv().await.unwrap().contains("Cairo"));
    }

    #[tokio::test]
    async fn test_failed_lookup_only_posts_notice() {
        let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel();
        let (notice_tx, mut notice_rx) = mpsc::unbounded_channel();

        spawn_weather_lookup(Arc::new(NoKey), cmd_tx, notice_tx, "Giza", None, None);

        let notice = notice_rx.recv().await.unwrap();
        assert!(notice.contains("Could not fetch the weather for Giza"));
        assert_eq!(cmd_rx.recv().await, None);
    }
}
