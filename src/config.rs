//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `HARVEST__*` 覆盖（双下划线表示嵌套，如 `HARVEST__GAME__MAX_ROUNDS=8`）。

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::farm::SoilType;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub game: GameSection,
    #[serde(default)]
    pub retry: RetrySection,
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub weather: WeatherSection,
}

/// [game] 段：回合上限、初始农场数值、默认土壤/作物、后台结果的过期策略
#[derive(Debug, Clone, Deserialize)]
pub struct GameSection {
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,
    #[serde(default = "default_initial_crop_health")]
    pub initial_crop_health: f64,
    #[serde(default = "default_initial_soil_moisture")]
    pub initial_soil_moisture: f64,
    #[serde(default = "default_initial_water_reserves")]
    pub initial_water_reserves: f64,
    #[serde(default)]
    pub default_soil_type: SoilType,
    #[serde(default = "default_crop_type")]
    pub default_crop_type: String,
    /// 后台任务（图像 / 建议）完成时若 epoch 已过期则丢弃结果；false 时照旧应用
    #[serde(default = "default_discard_stale_background")]
    pub discard_stale_background: bool,
}

fn default_max_rounds() -> u32 {
    5
}

fn default_initial_crop_health() -> f64 {
    70.0
}

fn default_initial_soil_moisture() -> f64 {
    60.0
}

fn default_initial_water_reserves() -> f64 {
    80.0
}

fn default_crop_type() -> String {
    "القمح".to_string()
}

fn default_discard_stale_background() -> bool {
    true
}

impl Default for GameSection {
    fn default() -> Self {
        Self {
            max_rounds: default_max_rounds(),
            initial_crop_health: default_initial_crop_health(),
            initial_soil_moisture: default_initial_soil_moisture(),
            initial_water_reserves: default_initial_water_reserves(),
            default_soil_type: SoilType::default(),
            default_crop_type: default_crop_type(),
            discard_stale_background: default_discard_stale_background(),
        }
    }
}

/// [retry] 段：限流错误的最大尝试次数与首次退避间隔
#[derive(Debug, Clone, Deserialize)]
pub struct RetrySection {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    2000
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
        }
    }
}

impl RetrySection {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }
}

/// [llm] 段：文本与图像生成后端
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    /// 后端：openai / mock；未设置 OPENAI_API_KEY 时总是退回 mock
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    pub base_url: Option<String>,
    #[serde(default = "default_image_model")]
    pub image_model: String,
    pub image_base_url: Option<String>,
    #[serde(default)]
    pub timeouts: LlmTimeoutsSection,
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_image_model() -> String {
    "gpt-image-1".to_string()
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: None,
            image_model: default_image_model(),
            image_base_url: None,
            timeouts: LlmTimeoutsSection::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmTimeoutsSection {
    #[serde(default = "default_request_timeout")]
    pub request: u64,
    #[serde(default = "default_image_timeout")]
    pub image: u64,
}

fn default_request_timeout() -> u64 {
    60
}

fn default_image_timeout() -> u64 {
    120
}

impl Default for LlmTimeoutsSection {
    fn default() -> Self {
        Self {
            request: default_request_timeout(),
            image: default_image_timeout(),
        }
    }
}

/// [weather] 段：真实天气种子（OpenWeatherMap 兼容接口）
#[derive(Debug, Clone, Deserialize)]
pub struct WeatherSection {
    #[serde(default = "default_weather_base_url")]
    pub base_url: String,
    #[serde(default = "default_weather_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_weather_base_url() -> String {
    "https://api.openweathermap.org/data/2.5".to_string()
}

fn default_weather_timeout_secs() -> u64 {
    15
}

impl Default for WeatherSection {
    fn default() -> Self {
        Self {
            base_url: default_weather_base_url(),
            timeout_secs: default_weather_timeout_secs(),
        }
    }
}

/// 从 config 目录加载配置，环境变量 HARVEST__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 HARVEST__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("HARVEST")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_game_rules() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.game.max_rounds, 5);
        assert_eq!(cfg.game.initial_crop_health, 70.0);
        assert_eq!(cfg.game.initial_soil_moisture, 60.0);
        assert_eq!(cfg.game.initial_water_reserves, 80.0);
        assert_eq!(cfg.game.default_soil_type, SoilType::Silty);
        assert_eq!(cfg.game.default_crop_type, "القمح");
        assert!(cfg.game.discard_stale_background);
        assert_eq!(cfg.retry.max_attempts, 3);
        assert_eq!(cfg.retry.initial_delay(), Duration::from_millis(2000));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[game]
max_rounds = 8
default_soil_type = "SANDY"

[retry]
initial_delay_ms = 500
"#
        )
        .unwrap();

        let cfg = load_config(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(cfg.game.max_rounds, 8);
        assert_eq!(cfg.game.default_soil_type, SoilType::Sandy);
        assert_eq!(cfg.game.initial_crop_health, 70.0);
        assert_eq!(cfg.retry.initial_delay_ms, 500);
        assert_eq!(cfg.retry.max_attempts, 3);
    }
}
