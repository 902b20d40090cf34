//! 界面渲染
//!
//! 根据 GameSnapshot 与 ViewState 绘制一帧：标题栏显示状态与回合，
//! 左侧为农场数值（Gauge）与图像 / 建议状态，右侧为当前面板（回合、报告、目录、帮助），
//! 底部为输入框与快捷键提示。

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Gauge, Paragraph, Wrap},
    Frame,
};

use crate::core::{GameSnapshot, GameState};
use crate::farm::catalog::{self, Season};
use crate::farm::{GameReport, ScenarioData};
use crate::ui::input::HELP;

/// 叙述的最大显示字符数
const MAX_DISPLAY_CHARS: usize = 600;

/// 右侧主面板
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Panel {
    #[default]
    Game,
    Report,
    Catalog,
    Help,
}

/// 界面本地状态：输入缓冲、当前面板、提示、滚动位置
#[derive(Clone, Debug, Default)]
pub struct ViewState {
    pub input: String,
    pub panel: Panel,
    pub notice: Option<String>,
    pub scroll: u16,
}

fn truncate_for_display(content: &str) -> String {
    let total = content.chars().count();
    if total <= MAX_DISPLAY_CHARS {
        return content.to_string();
    }
    let head: String = content.chars().take(MAX_DISPLAY_CHARS).collect();
    format!("{head}\n... [{total} chars]")
}

fn heading(text: impl Into<String>) -> Line<'static> {
    Line::from(Span::styled(
        text.into(),
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
    ))
}

fn paragraph_lines(text: &str) -> Vec<Line<'static>> {
    truncate_for_display(text)
        .split('\n')
        .map(|l| Line::from(l.to_string()))
        .collect()
}

fn data_line(data: &ScenarioData) -> Line<'static> {
    Line::from(Span::styled(
        format!(
            "temp={}°C rain={}mm moisture={}% ndvi={:.2} humidity={}% wind={}km/h clouds={}% pressure={}hPa",
            data.temperature,
            data.rainfall,
            data.soil_moisture,
            data.ndvi,
            data.humidity,
            data.wind_speed,
            data.cloud_cover,
            data.pressure
        ),
        Style::default().fg(Color::Cyan),
    ))
}

fn state_title(snapshot: &GameSnapshot) -> String {
    match snapshot.state {
        GameState::Setup => "Get Ready for Green (type `start`)".to_string(),
        GameState::AwaitingConfiguration => "Configure your farm (auto / manual / city)".to_string(),
        GameState::Active => format!("Round {}/{}", snapshot.round, snapshot.max_rounds),
        GameState::Ended => "Game over (type `report` or `restart`)".to_string(),
    }
}

/// 回合面板：最近一次结果、当前情景（或等待重试提示）、终局建议
pub fn game_lines(snapshot: &GameSnapshot) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    if let Some(last) = snapshot.history.last() {
        lines.push(heading(format!("Round {} → {}", last.round, last.action)));
        lines.extend(paragraph_lines(&last.outcome.narrative));
        lines.push(Line::from(""));
    }

    if snapshot.state == GameState::Active {
        if snapshot.awaiting_scenario {
            lines.push(Line::from(Span::styled(
                "The next scenario is not ready. Type `retry`.",
                Style::default().fg(Color::Red),
            )));
        } else if let Some(scenario) = &snapshot.scenario {
            lines.extend(paragraph_lines(&scenario.narrative));
            lines.push(heading(format!("Challenge: {}", scenario.challenge)));
            lines.push(data_line(&scenario.data));
        }
    }

    if snapshot.state == GameState::Ended {
        match &snapshot.tips.tips {
            None if snapshot.tips.generating => lines.push(Line::from("tips: generating")),
            Some(tips) => lines.extend(tips.iter().map(|t| Line::from(format!("* {t}")))),
            None => {}
        }
    }
    lines
}

pub fn report_lines(report: Option<&GameReport>) -> Vec<Line<'static>> {
    let Some(report) = report else {
        return vec![Line::from("The report is available once the game ends.")];
    };
    let verdict = if report.is_win {
        "Your crop survived"
    } else {
        "Your crop failed"
    };
    let mut lines = vec![
        heading(verdict),
        Line::from(format!("score: {}", report.score)),
        Line::from(format!(
            "crop health {:.0}% | soil moisture {:.0}% | water {:.0}%",
            report.final_stats.crop_health,
            report.final_stats.soil_moisture,
            report.final_stats.water_reserves
        )),
        Line::from(format!("rounds played: {}", report.rounds_played)),
    ];
    for (action, count) in &report.action_counts {
        lines.push(Line::from(format!("  {action}: {count}")));
    }
    lines.extend(report.tips.iter().map(|t| Line::from(format!("* {t}"))));
    lines
}

pub fn catalog_lines() -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for (label, season) in [("summer", Season::Summer), ("winter", Season::Winter)] {
        let crops: Vec<&str> = catalog::crops_in(season).collect();
        lines.push(heading(format!("{label} crops")));
        lines.push(Line::from(crops.join("، ")));
    }
    let cities: Vec<&str> = catalog::CITIES.iter().map(|c| c.name_en).collect();
    lines.push(heading("cities"));
    lines.push(Line::from(cities.join(", ")));
    lines
}

pub fn help_lines() -> Vec<Line<'static>> {
    HELP.lines().map(|l| Line::from(l.to_string())).collect()
}

fn gauge_color(value: f64) -> Color {
    if value < 30.0 {
        Color::Red
    } else if value < 60.0 {
        Color::Yellow
    } else {
        Color::Green
    }
}

fn draw_stats(f: &mut Frame, area: Rect, snapshot: &GameSnapshot) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(3),
        ])
        .split(area);

    let (health, moisture, water) = snapshot
        .stats
        .as_ref()
        .map(|s| (s.crop_health, s.soil_moisture, s.water_reserves))
        .unwrap_or_default();
    let gauges = [
        ("crop health", health),
        ("soil moisture", moisture),
        ("water", water),
    ];
    for (row, (label, value)) in rows.iter().zip(gauges) {
        let gauge = Gauge::default()
            .block(Block::default().title(format!(" {label} ")).borders(Borders::ALL))
            .gauge_style(Style::default().fg(gauge_color(value)))
            .percent(value.clamp(0.0, 100.0).round() as u16)
            .label(format!("{value:.0}%"));
        f.render_widget(gauge, *row);
    }

    let image = match (&snapshot.image.url, snapshot.image.generating) {
        (_, true) => "generating",
        (Some(_), false) => "ready",
        (None, false) => "none",
    };
    let mut status = vec![Line::from(format!("image: {image}"))];
    if let Some(stats) = &snapshot.stats {
        status.push(Line::from(format!("soil: {}", stats.soil_type)));
        status.push(Line::from(format!("crop: {}", stats.crop_type)));
    }
    let status = Paragraph::new(Text::from(status))
        .block(Block::default().title(" farm ").borders(Borders::ALL))
        .wrap(Wrap { trim: false });
    f.render_widget(status, rows[3]);
}

/// 绘制一帧
pub fn draw(f: &mut Frame, snapshot: &GameSnapshot, view: &ViewState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(3),
        ])
        .split(f.area());

    let mut title = state_title(snapshot);
    if snapshot.busy {
        title.push_str("  [working…]");
    }
    let header = Paragraph::new(title).block(
        Block::default()
            .title(" Harvest ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Green)),
    );
    f.render_widget(header, chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(30), Constraint::Min(20)])
        .split(chunks[1]);
    draw_stats(f, body[0], snapshot);

    let (panel_title, lines) = match view.panel {
        Panel::Game => (" round ", game_lines(snapshot)),
        Panel::Report => (" final report ", report_lines(snapshot.report.as_ref())),
        Panel::Catalog => (" crops & cities ", catalog_lines()),
        Panel::Help => (" help ", help_lines()),
    };
    let max_scroll = lines.len().saturating_sub(1) as u16;
    let main = Paragraph::new(Text::from(lines))
        .block(Block::default().title(panel_title).borders(Borders::ALL))
        .wrap(Wrap { trim: false })
        .scroll((view.scroll.min(max_scroll), 0));
    f.render_widget(main, body[1]);

    let (prompt, border) = if let Some(error) = &snapshot.error_message {
        (format!(" ! {error} "), Color::Red)
    } else if let Some(notice) = &view.notice {
        (format!(" {notice} "), Color::Yellow)
    } else if snapshot.busy {
        (" waiting… ".to_string(), Color::DarkGray)
    } else {
        (" command ".to_string(), Color::Blue)
    };
    let hint = " Enter send │ PgUp/PgDn scroll │ Esc back │ Ctrl+Q quit ";
    let input = Paragraph::new(view.input.as_str()).block(
        Block::default()
            .title(prompt)
            .title_bottom(Line::from(Span::styled(hint, Style::default().fg(Color::DarkGray))))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border)),
    );
    f.render_widget(input, chunks[2]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    use crate::core::TipsState;
    use crate::farm::{FarmStats, HistoryLedger, SoilType};

    fn plain(lines: &[Line]) -> String {
        lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_awaiting_scenario_prompts_retry() {
        let snapshot = GameSnapshot {
            state: GameState::Active,
            round: 3,
            max_rounds: 5,
            awaiting_scenario: true,
            ..GameSnapshot::default()
        };
        assert_eq!(state_title(&snapshot), "Round 3/5");
        assert!(plain(&game_lines(&snapshot)).contains("retry"));
    }

    #[test]
    fn test_ended_lists_tips() {
        let snapshot = GameSnapshot {
            state: GameState::Ended,
            tips: TipsState::ready(vec!["وفّر المية".into()]),
            ..GameSnapshot::default()
        };
        assert!(state_title(&snapshot).contains("Game over"));
        assert!(plain(&game_lines(&snapshot)).contains("* وفّر المية"));
    }

    #[test]
    fn test_catalog_lists_default_crop_and_cities() {
        let text = plain(&catalog_lines());
        assert!(text.contains("القمح"));
        assert!(text.contains("Aswan"));
    }

    #[test]
    fn test_report_lines() {
        let stats = FarmStats::new(50.0, 40.0, 60.0, SoilType::Silty, "القمح");
        let report = GameReport::build(&stats, &HistoryLedger::new(), &[]);
        let text = plain(&report_lines(Some(&report)));
        assert!(text.contains("survived"));
        assert!(text.contains("score: 750"));

        assert!(plain(&report_lines(None)).contains("once the game ends"));
    }

    #[test]
    fn test_draw_frame_shows_round_and_error() {
        let mut terminal = Terminal::new(TestBackend::new(100, 24)).unwrap();
        let snapshot = GameSnapshot {
            state: GameState::Active,
            round: 2,
            max_rounds: 5,
            stats: Some(FarmStats::new(72.0, 65.0, 75.0, SoilType::Silty, "wheat")),
            error_message: Some("Please try again".into()),
            ..GameSnapshot::default()
        };
        let view = ViewState {
            input: "irrigate".into(),
            ..ViewState::default()
        };
        terminal.draw(|f| draw(f, &snapshot, &view)).unwrap();

        let screen: String = terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|c| c.symbol())
            .collect();
        assert!(screen.contains("Round 2/5"));
        assert!(screen.contains("Please try again"));
        assert!(screen.contains("irrigate"));
        assert!(screen.contains("72%"));
    }
}
