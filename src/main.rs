//! Harvest - 回合制可持续农场模拟
//!
//! 入口：初始化日志（写入 harvest.log）、加载配置、创建游戏运行时与 TUI，并运行主循环。
//! 用法：`harvest [config.toml]`

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use harvest::core::{create_game_builder, spawn_game, RetryPolicy};
use harvest::observability;
use harvest::ui::run_app;
use harvest::weather::OpenWeatherProvider;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init(Path::new(observability::DEFAULT_LOG_FILE))
        .context("Failed to open log file")?;

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let builder = create_game_builder(config_path);
    let weather = Arc::new(OpenWeatherProvider::new(
        &builder.config().weather,
        RetryPolicy::from(&builder.config().retry),
    ));

    let handle = spawn_game(builder.build());

    run_app(&handle, weather).await.context("App run failed")?;

    handle.join().await.context("Game runtime panicked")?;
    Ok(())
}
