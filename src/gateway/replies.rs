//! 生成器回复的结构与 JSON 提取

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::farm::ScenarioData;
use crate::llm::LlmError;

#[derive(Debug, Deserialize)]
pub(crate) struct ScenarioReply {
    pub narrative: String,
    pub challenge: String,
    pub data: ScenarioData,
}

/// 种子开局只生成文字，数据由调用方提供
#[derive(Debug, Deserialize)]
pub(crate) struct ScenarioTextReply {
    pub narrative: String,
    pub challenge: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OutcomeReply {
    pub narrative: String,
    pub updated_stats: StatsReply,
}

/// soilType / cropType 以原始字符串接收，缺省或取值异常都不影响解析
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StatsReply {
    pub crop_health: f64,
    pub soil_moisture: f64,
    pub water_reserves: f64,
    #[serde(default)]
    pub soil_type: Option<String>,
    #[serde(default)]
    pub crop_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TipsReply {
    #[serde(default)]
    pub tips: Vec<String>,
}

/// 从模型输出中取出 JSON 对象（容忍 ```json 代码块与前后多余文字）
pub(crate) fn parse_json<T: DeserializeOwned>(raw: &str) -> Result<T, LlmError> {
    let trimmed = raw.trim();
    let body = match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => return Err(LlmError::malformed(format!("no JSON object in reply: {}", preview(trimmed)))),
    };
    serde_json::from_str(body).map_err(|e| LlmError::malformed(format!("{e}: {}", preview(body))))
}

fn preview(s: &str) -> String {
    s.chars().take(120).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fenced_json() {
        let raw = "```json\n{\"tips\": [\"a\", \"b\"]}\n```";
        let reply: TipsReply = parse_json(raw).unwrap();
        assert_eq!(reply.tips, vec!["a", "b"]);
    }

    #[test]
    fn test_parse_rejects_prose() {
        let err = parse_json::<TipsReply>("sorry, I can't help").unwrap_err();
        assert_eq!(err.kind, crate::llm::LlmErrorKind::Malformed);
        assert!(!err.retryable);
    }

    #[test]
    fn test_outcome_without_crop_type() {
        let raw = r#"{"narrative":"ok","updatedStats":{"cropHealth":72,"soilMoisture":65,"waterReserves":75,"soilType":"SILTY"}}"#;
        let reply: OutcomeReply = parse_json(raw).unwrap();
        assert_eq!(reply.updated_stats.crop_health, 72.0);
        assert!(reply.updated_stats.crop_type.is_none());
    }
}
