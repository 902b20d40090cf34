//! 农场数据模型：统计值、土壤 / 作物、玩家动作、环境快照、情景与结果

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 作物名（自由文本，如「القمح」「الأرز」）
pub type CropName = String;

/// 土壤类型（封闭集合）
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SoilType {
    #[default]
    Silty,
    Sandy,
    Chalky,
    Saline,
    Rocky,
}

impl SoilType {
    pub const ALL: [SoilType; 5] = [
        SoilType::Silty,
        SoilType::Sandy,
        SoilType::Chalky,
        SoilType::Saline,
        SoilType::Rocky,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SoilType::Silty => "SILTY",
            SoilType::Sandy => "SANDY",
            SoilType::Chalky => "CHALKY",
            SoilType::Saline => "SALINE",
            SoilType::Rocky => "ROCKY",
        }
    }

    /// 图像提示词中使用的土壤外观描述
    pub fn visual_description(&self) -> &'static str {
        match self {
            SoilType::Silty => "The soil is silty, appearing dark, fertile, and well-structured, capable of retaining moisture well.",
            SoilType::Sandy => "The soil is sandy, looking light-colored and granular, with a texture that suggests it drains water quickly.",
            SoilType::Chalky => "The soil is chalky, with a pale, stony appearance. It might look dry and alkaline.",
            SoilType::Saline => "The soil is saline, with subtle white, crystalline patches on the surface, indicating high salt content.",
            SoilType::Rocky => "The soil is rocky, visibly mixed with many small to medium-sized stones and pebbles, making it look rugged and less fertile.",
        }
    }
}

impl fmt::Display for SoilType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown soil type: {0}")]
pub struct UnknownSoilType(pub String);

impl FromStr for SoilType {
    type Err = UnknownSoilType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        SoilType::ALL
            .into_iter()
            .find(|soil| soil.as_str() == upper)
            .ok_or_else(|| UnknownSoilType(s.to_string()))
    }
}

/// 玩家每回合可选的动作
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    Irrigate,
    Fertilize,
    PestControl,
    Conserve,
}

impl Action {
    pub const ALL: [Action; 4] = [
        Action::Irrigate,
        Action::Fertilize,
        Action::PestControl,
        Action::Conserve,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Irrigate => "IRRIGATE",
            Action::Fertilize => "FERTILIZE",
            Action::PestControl => "PEST_CONTROL",
            Action::Conserve => "CONSERVE",
        }
    }

    /// 小写、下划线换空格（"pest control"），用于兜底叙述
    pub fn label(&self) -> String {
        self.as_str().to_ascii_lowercase().replace('_', " ")
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown action: {0}")]
pub struct UnknownAction(pub String);

impl FromStr for Action {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace([' ', '-'], "_");
        Action::ALL
            .into_iter()
            .find(|action| action.as_str() == normalized)
            .ok_or_else(|| UnknownAction(s.to_string()))
    }
}

/// 农场统计：三项 0-100 的数值 + 土壤 / 作物身份
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FarmStats {
    pub crop_health: f64,
    pub soil_moisture: f64,
    pub water_reserves: f64,
    pub soil_type: SoilType,
    pub crop_type: CropName,
}

impl FarmStats {
    pub fn new(
        crop_health: f64,
        soil_moisture: f64,
        water_reserves: f64,
        soil_type: SoilType,
        crop_type: impl Into<CropName>,
    ) -> Self {
        Self {
            crop_health,
            soil_moisture,
            water_reserves,
            soil_type,
            crop_type: crop_type.into(),
        }
    }

    /// 三项数值截断到 [0, 100]
    pub fn clamped(mut self) -> Self {
        self.crop_health = clamp_percent(self.crop_health);
        self.soil_moisture = clamp_percent(self.soil_moisture);
        self.water_reserves = clamp_percent(self.water_reserves);
        self
    }

    /// 作物已死亡（终局条件之一）
    pub fn is_depleted(&self) -> bool {
        self.crop_health <= 0.0
    }

    /// 土壤与作物身份是否与另一份统计一致
    pub fn same_identity(&self, other: &FarmStats) -> bool {
        self.soil_type == other.soil_type && self.crop_type == other.crop_type
    }

    /// 结算页展示分数：cropHealth×10 + soilMoisture×2.5 + waterReserves×2.5，四舍五入
    pub fn final_score(&self) -> i64 {
        (self.crop_health * 10.0 + self.soil_moisture * 2.5 + self.water_reserves * 2.5).round()
            as i64
    }
}

pub(crate) fn clamp_percent(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}

/// 情景附带的环境快照（不可变；玩家可提交本地编辑后的副本）
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioData {
    /// 摄氏度
    pub temperature: f64,
    /// 毫米
    pub rainfall: f64,
    pub soil_moisture: f64,
    /// 0-1
    pub ndvi: f64,
    pub humidity: f64,
    /// km/h
    pub wind_speed: f64,
    pub cloud_cover: f64,
    /// hPa
    pub pressure: f64,
}

impl ScenarioData {
    /// 中等取值的中性快照（兜底情景与「自动」开局使用）
    pub fn neutral() -> Self {
        Self {
            temperature: 25.0,
            rainfall: 2.0,
            soil_moisture: 55.0,
            ndvi: 0.7,
            humidity: 60.0,
            wind_speed: 10.0,
            cloud_cover: 20.0,
            pressure: 1012.0,
        }
    }

    /// 范围修正：百分比截断到 [0, 100]，ndvi 截断到 [0, 1]，降雨与风速不为负
    pub fn sanitized(mut self) -> Self {
        self.ndvi = self.ndvi.clamp(0.0, 1.0);
        self.soil_moisture = clamp_percent(self.soil_moisture);
        self.humidity = clamp_percent(self.humidity);
        self.cloud_cover = clamp_percent(self.cloud_cover);
        self.rainfall = self.rainfall.max(0.0);
        self.wind_speed = self.wind_speed.max(0.0);
        self
    }
}

/// 当前回合的挑战
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub narrative: String,
    pub challenge: String,
    pub data: ScenarioData,
}

impl Scenario {
    /// 以编辑后的数据生成提交副本，原情景不变
    pub fn with_data(&self, data: ScenarioData) -> Scenario {
        Scenario {
            narrative: self.narrative.clone(),
            challenge: self.challenge.clone(),
            data,
        }
    }
}

/// 动作作用于情景的结果
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outcome {
    pub narrative: String,
    pub updated_stats: FarmStats,
}

/// 一个已完成回合的记录
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub round: u32,
    pub scenario: Scenario,
    pub action: Action,
    pub outcome: Outcome,
}
