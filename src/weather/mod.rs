//! 真实天气种子：按城市查询当前天气，转成首回合的 ScenarioData
//!
//! 天气接口不提供的字段用固定值补齐（soilMoisture = 50，ndvi = 0.65）。
//! 失败只在配置步骤提示玩家，从不进入回合编排。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

use crate::config::WeatherSection;
use crate::core::{RetryPolicy, Retryable};
use crate::farm::ScenarioData;

#[derive(Error, Debug)]
pub enum WeatherError {
    #[error("OPENWEATHER_API_KEY is not set")]
    MissingApiKey,

    #[error("weather request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("weather service returned HTTP {status}")]
    Status { status: u16 },
}

impl Retryable for WeatherError {
    fn is_retryable(&self) -> bool {
        matches!(self, WeatherError::Status { status: 429 | 503 })
    }
}

#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn current(&self, city: &str) -> Result<ScenarioData, WeatherError>;
}

/// OpenWeatherMap `/weather` 响应中用到的部分
#[derive(Debug, Deserialize)]
pub struct CurrentWeather {
    pub main: MainReading,
    pub wind: WindReading,
    pub clouds: CloudReading,
    #[serde(default)]
    pub rain: Option<RainReading>,
}

#[derive(Debug, Deserialize)]
pub struct MainReading {
    pub temp: f64,
    pub humidity: f64,
    pub pressure: f64,
}

#[derive(Debug, Deserialize)]
pub struct WindReading {
    /// m/s
    pub speed: f64,
}

#[derive(Debug, Deserialize)]
pub struct CloudReading {
    pub all: f64,
}

#[derive(Debug, Deserialize)]
pub struct RainReading {
    #[serde(rename = "1h")]
    pub one_hour: Option<f64>,
}

/// 天气读数 → 首回合环境数据
pub fn to_scenario_data(weather: &CurrentWeather) -> ScenarioData {
    ScenarioData {
        temperature: weather.main.temp.round(),
        rainfall: weather
            .rain
            .as_ref()
            .and_then(|r| r.one_hour)
            .unwrap_or(0.0),
        soil_moisture: 50.0,
        ndvi: 0.65,
        humidity: weather.main.humidity,
        wind_speed: (weather.wind.speed * 3.6).round(),
        cloud_cover: weather.clouds.all,
        pressure: weather.main.pressure,
    }
    .sanitized()
}

pub struct OpenWeatherProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    retry: RetryPolicy,
}

impl OpenWeatherProvider {
    pub fn new(section: &WeatherSection, retry: RetryPolicy) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(section.timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: section.base_url.trim_end_matches('/').to_string(),
            api_key: std::env::var("OPENWEATHER_API_KEY").ok(),
            retry,
        }
    }

    async fn fetch(&self, city: &str, api_key: &str) -> Result<CurrentWeather, WeatherError> {
        let url = format!("{}/weather", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("q", city), ("appid", api_key), ("units", "metric"), ("lang", "ar")])
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(WeatherError::Status {
                status: status.as_u16(),
            });
        }
        Ok(response.json::<CurrentWeather>().await?)
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn current(&self, city: &str) -> Result<ScenarioData, WeatherError> {
        let api_key = self.api_key.as_deref().ok_or(WeatherError::MissingApiKey)?;
        tracing::info!(city, "Fetching current weather");
        let weather = self
            .retry
            .run("weather", || self.fetch(city, api_key))
            .await?;
        Ok(to_scenario_data(&weather))
    }
}
