//! 赛后报告：由最终统计与历史账本派生的展示值

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::farm::{Action, FarmStats, HistoryEntry, HistoryLedger};

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameReport {
    pub final_stats: FarmStats,
    pub rounds_played: usize,
    /// 作物存活即为胜利
    pub is_win: bool,
    pub score: i64,
    pub action_counts: BTreeMap<Action, usize>,
    pub history: Vec<HistoryEntry>,
    pub tips: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

impl GameReport {
    pub fn build(final_stats: &FarmStats, ledger: &HistoryLedger, tips: &[String]) -> Self {
        let action_counts = Action::ALL
            .into_iter()
            .map(|a| (a, ledger.count_action(a)))
            .filter(|(_, n)| *n > 0)
            .collect();

        Self {
            final_stats: final_stats.clone(),
            rounds_played: ledger.len(),
            is_win: !final_stats.is_depleted(),
            score: final_stats.final_score(),
            action_counts,
            history: ledger.entries().to_vec(),
            tips: tips.to_vec(),
            generated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::farm::SoilType;

    #[test]
    fn test_report_from_empty_ledger() {
        let stats = FarmStats::new(0.0, 30.0, 10.0, SoilType::Saline, "الأرز");
        let report = GameReport::build(&stats, &HistoryLedger::new(), &[]);
        assert!(!report.is_win);
        assert_eq!(report.rounds_played, 0);
        assert_eq!(report.score, 100);
        assert!(report.action_counts.is_empty());
    }
}
