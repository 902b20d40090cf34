//! 回合历史账本：只追加、按回合编号索引
//!
//! 每完成一个回合追加一次，插入后不再修改或重排；它是结算建议与赛后报告的唯一输入。

use serde::Serialize;
use thiserror::Error;

use crate::farm::{Action, HistoryEntry};

/// 追加的记录回合号与账本长度不匹配
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("history entry for round {got} is out of order (expected round {expected})")]
pub struct OutOfOrderEntry {
    pub expected: u32,
    pub got: u32,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct HistoryLedger {
    entries: Vec<HistoryEntry>,
}

impl HistoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// 下一条记录应携带的回合号（history[i].round == i + 1）
    pub fn next_round(&self) -> u32 {
        self.entries.len() as u32 + 1
    }

    /// 追加一条记录；回合号不连续时拒绝且账本不变
    pub fn append(&mut self, entry: HistoryEntry) -> Result<(), OutOfOrderEntry> {
        let expected = self.next_round();
        if entry.round != expected {
            return Err(OutOfOrderEntry {
                expected,
                got: entry.round,
            });
        }
        self.entries.push(entry);
        Ok(())
    }

    /// 某动作在本局中被选择的次数
    pub fn count_action(&self, action: Action) -> usize {
        self.entries.iter().filter(|e| e.action == action).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::farm::{FarmStats, Outcome, Scenario, ScenarioData, SoilType};

    fn entry(round: u32, action: Action) -> HistoryEntry {
        let stats = FarmStats::new(70.0, 60.0, 80.0, SoilType::Silty, "القمح");
        HistoryEntry {
            round,
            scenario: Scenario {
                narrative: "n".into(),
                challenge: "c".into(),
                data: ScenarioData::neutral(),
            },
            action,
            outcome: Outcome {
                narrative: "o".into(),
                updated_stats: stats,
            },
        }
    }

    #[test]
    fn test_append_in_order() {
        let mut ledger = HistoryLedger::new();
        ledger.append(entry(1, Action::Irrigate)).unwrap();
        ledger.append(entry(2, Action::Conserve)).unwrap();
        assert_eq!(ledger.len(), 2);
        for (i, e) in ledger.entries().iter().enumerate() {
            assert_eq!(e.round, i as u32 + 1);
        }
        assert_eq!(ledger.next_round(), 3);
        assert_eq!(ledger.count_action(Action::Irrigate), 1);
    }

    #[test]
    fn test_out_of_order_rejected_without_mutation() {
        let mut ledger = HistoryLedger::new();
        ledger.append(entry(1, Action::Irrigate)).unwrap();
        let err = ledger.append(entry(3, Action::Fertilize)).unwrap_err();
        assert_eq!(err, OutOfOrderEntry { expected: 2, got: 3 });
        assert_eq!(ledger.len(), 1);
    }
}
