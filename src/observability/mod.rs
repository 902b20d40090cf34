//! 可观测性：tracing 订阅器初始化
//!
//! 终端界面占用了 stdout，日志写入文件。

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// 默认日志文件（工作目录下）
pub const DEFAULT_LOG_FILE: &str = "harvest.log";

/// 日志：默认 info，可通过 RUST_LOG 覆盖；追加写入 log_file，重复初始化时静默忽略
pub fn init(log_file: &Path) -> std::io::Result<()> {
    let file = OpenOptions::new().create(true).append(true).open(log_file)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .try_init();
    Ok(())
}
