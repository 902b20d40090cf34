//! 农场领域：数据模型、历史账本、作物 / 城市目录、赛后报告

pub mod catalog;
pub mod ledger;
pub mod report;
pub mod types;

pub use ledger::{HistoryLedger, OutOfOrderEntry};
pub use report::GameReport;
pub use types::{
    Action, CropName, FarmStats, HistoryEntry, Outcome, Scenario, ScenarioData, SoilType,
    UnknownAction, UnknownSoilType,
};
