//! TUI 层：Ratatui + crossterm，主循环（app）、事件（event）、输入解析（input）、渲染（render）

pub mod app;
pub mod event;
pub mod input;
pub mod render;

pub use app::run_app;
pub use event::EventHandler;
pub use input::{parse_line, Input, InputError};
pub use render::draw;
