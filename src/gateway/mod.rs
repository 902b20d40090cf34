//! 内容网关：情景 / 种子情景 / 结果 / 图像 / 结算建议
//!
//! 每个操作都经过 RetryPolicy；重试耗尽或遇到不可重试错误时返回本地确定性兜底值，
//! 外部全部不可用时游戏也不会卡住。RoundOrchestrator 只通过 ContentService 使用网关。

pub mod prompts;
mod replies;

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::core::{GameError, RetryPolicy};
use crate::farm::{Action, FarmStats, HistoryEntry, Outcome, Scenario, ScenarioData, SoilType};
use crate::llm::{ImageClient, LlmClient, LlmError, Message};

use replies::{parse_json, OutcomeReply, ScenarioReply, ScenarioTextReply, TipsReply};

/// 图像生成请求（后台任务持有，故为 owned）
#[derive(Clone, Debug)]
pub struct ImageRequest {
    pub scenario: Scenario,
    /// None → create；Some → 以它为底图 edit
    pub previous: Option<String>,
    pub outcome_narrative: String,
    pub crop_type: String,
    pub soil_type: SoilType,
}

/// 编排器依赖的内容服务
///
/// 情景与结果返回 Result：网关实现自身总是兜底成功，Err 只代表兜底都无法构造的编排级故障。
/// 图像与建议在签名上就不会失败。
#[async_trait]
pub trait ContentService: Send + Sync {
    async fn generate_scenario(
        &self,
        history: &[HistoryEntry],
        stats: &FarmStats,
    ) -> Result<Scenario, GameError>;

    async fn generate_scenario_from_seed(
        &self,
        seed: &ScenarioData,
        soil_type: SoilType,
        crop_type: &str,
    ) -> Result<Scenario, GameError>;

    async fn compute_outcome(
        &self,
        stats: &FarmStats,
        scenario: &Scenario,
        action: Action,
    ) -> Result<Outcome, GameError>;

    /// 返回新图像；失败时返回上一张（首张则为 None）
    async fn generate_image(&self, request: &ImageRequest) -> Option<String>;

    /// 失败时返回空列表
    async fn generate_tips(&self, final_stats: &FarmStats, history: &[HistoryEntry]) -> Vec<String>;
}

pub fn fallback_scenario() -> Scenario {
    Scenario {
        narrative: "القمر الصناعي فيه مشكلة ومش عارفين نجيب آخر تقرير للطقس. السما شكلها صافية دلوقتي، بس قلبك حاسس بحاجة.".to_string(),
        challenge: "خد قرارك بمعلومات ناقصة.".to_string(),
        data: ScenarioData::neutral(),
    }
}

pub fn fallback_seed_scenario(seed: &ScenarioData) -> Scenario {
    Scenario {
        narrative: "القمر الصناعي فيه مشكلة، بس إحنا هنعتمد على البيانات اللي أنت دخلتها. الجو حسب كلامك، محتاج تركيز.".to_string(),
        challenge: "خد قرارك بناءً على البيانات اللي أدخلتها.".to_string(),
        data: *seed,
    }
}

/// 结果兜底：统计原样保留，只给出通用叙述
pub fn fallback_outcome(stats: &FarmStats, action: Action) -> Outcome {
    Outcome {
        narrative: format!(
            "بسبب مشكلة في السيستم، النتيجة بالظبط مش محسوبة. أنت التزمت بـ {}، وربنا يستر.",
            action.label()
        ),
        updated_stats: stats.clone(),
    }
}

/// 基于 LlmClient + ImageClient 的网关实现
pub struct ContentGateway {
    llm: Arc<dyn LlmClient>,
    images: Arc<dyn ImageClient>,
    retry: RetryPolicy,
}

impl ContentGateway {
    pub fn new(llm: Arc<dyn LlmClient>, images: Arc<dyn ImageClient>, retry: RetryPolicy) -> Self {
        Self { llm, images, retry }
    }

    async fn complete_json<T: DeserializeOwned>(
        &self,
        label: &str,
        prompt: String,
    ) -> Result<T, LlmError> {
        let messages = [Message::system(prompts::SYSTEM_PROMPT), Message::user(prompt)];
        tracing::debug!(backend = self.llm.name(), label, "Requesting completion");
        let raw = self
            .retry
            .run(label, || self.llm.complete(&messages))
            .await?;
        parse_json(&raw)
    }

    async fn request_image(&self, request: &ImageRequest) -> Result<Option<String>, LlmError> {
        let prompt = prompts::image_prompt(request);
        match &request.previous {
            None => {
                self.retry
                    .run("image.create", || self.images.create(&prompt))
                    .await
            }
            Some(previous) => {
                let edited = self
                    .retry
                    .run("image.edit", || self.images.edit(previous, &prompt))
                    .await?;
                // 编辑没有产出图像时保留原图，避免画面突然变空
                Ok(edited.or_else(|| Some(previous.clone())))
            }
        }
    }
}

#[async_trait]
impl ContentService for ContentGateway {
    async fn generate_scenario(
        &self,
        history: &[HistoryEntry],
        stats: &FarmStats,
    ) -> Result<Scenario, GameError> {
        let prompt = prompts::scenario_prompt(history, stats);
        match self.complete_json::<ScenarioReply>("scenario", prompt).await {
            Ok(reply) => Ok(Scenario {
                narrative: reply.narrative,
                challenge: reply.challenge,
                data: reply.data.sanitized(),
            }),
            Err(e) => {
                tracing::warn!(error = %e, "Scenario generation failed, using fallback scenario");
                Ok(fallback_scenario())
            }
        }
    }

    async fn generate_scenario_from_seed(
        &self,
        seed: &ScenarioData,
        soil_type: SoilType,
        crop_type: &str,
    ) -> Result<Scenario, GameError> {
        let prompt = prompts::seed_scenario_prompt(seed, soil_type, crop_type);
        match self
            .complete_json::<ScenarioTextReply>("scenario.seed", prompt)
            .await
        {
            Ok(reply) => Ok(Scenario {
                narrative: reply.narrative,
                challenge: reply.challenge,
                data: *seed,
            }),
            Err(e) => {
                tracing::warn!(error = %e, "Seeded scenario generation failed, using fallback text");
                Ok(fallback_seed_scenario(seed))
            }
        }
    }

    async fn compute_outcome(
        &self,
        stats: &FarmStats,
        scenario: &Scenario,
        action: Action,
    ) -> Result<Outcome, GameError> {
        let prompt = prompts::outcome_prompt(stats, scenario, action);
        let reply = match self.complete_json::<OutcomeReply>("outcome", prompt).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(error = %e, %action, "Outcome computation failed, stats left unchanged");
                return Ok(fallback_outcome(stats, action));
            }
        };

        let returned = reply.updated_stats;
        if returned.crop_type.is_none() {
            tracing::debug!("Outcome omitted cropType, filled from input");
        }
        let soil_drifted = returned
            .soil_type
            .as_deref()
            .is_some_and(|s| !s.eq_ignore_ascii_case(stats.soil_type.as_str()));
        let crop_drifted = returned
            .crop_type
            .as_deref()
            .is_some_and(|c| c != stats.crop_type);
        if soil_drifted || crop_drifted {
            tracing::warn!(
                soil = ?returned.soil_type,
                crop = ?returned.crop_type,
                "Outcome changed farm identity, keeping input soil and crop"
            );
        }

        let updated_stats = FarmStats::new(
            returned.crop_health,
            returned.soil_moisture,
            returned.water_reserves,
            stats.soil_type,
            stats.crop_type.clone(),
        )
        .clamped();

        Ok(Outcome {
            narrative: reply.narrative,
            updated_stats,
        })
    }

    async fn generate_image(&self, request: &ImageRequest) -> Option<String> {
        match self.request_image(request).await {
            Ok(image) => image,
            Err(e) => {
                tracing::warn!(error = %e, "Image generation failed, keeping previous image");
                request.previous.clone()
            }
        }
    }

    async fn generate_tips(&self, final_stats: &FarmStats, history: &[HistoryEntry]) -> Vec<String> {
        let prompt = prompts::tips_prompt(final_stats, history);
        match self.complete_json::<TipsReply>("tips", prompt).await {
            Ok(reply) => reply
                .tips
                .into_iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
            Err(e) => {
                tracing::warn!(error = %e, "Tips generation failed, returning no tips");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ImageCall, ScriptedImages, ScriptedLlm};

    fn stats() -> FarmStats {
        FarmStats::new(70.0, 60.0, 80.0, SoilType::Silty, "القمح")
    }

    fn gateway(llm: ScriptedLlm, images: ScriptedImages) -> ContentGateway {
        ContentGateway::new(Arc::new(llm), Arc::new(images), RetryPolicy::none())
    }

    fn image_request(previous: Option<&str>) -> ImageRequest {
        ImageRequest {
            scenario: fallback_scenario(),
            previous: previous.map(String::from),
            outcome_narrative: "ok".into(),
            crop_type: "القمح".into(),
            soil_type: SoilType::Silty,
        }
    }

    #[tokio::test]
    async fn test_all_operations_fall_back_on_hard_failure() {
        let gw = gateway(
            ScriptedLlm::failing(LlmError::request("boom")),
            ScriptedImages::failing(LlmError::request("boom")),
        );
        let s = stats();

        let scenario = gw.generate_scenario(&[], &s).await.unwrap();
        assert_eq!(scenario, fallback_scenario());

        let seed = ScenarioData {
            temperature: 40.0,
            ..ScenarioData::neutral()
        };
        let seeded = gw
            .generate_scenario_from_seed(&seed, SoilType::Sandy, "الأرز")
            .await
            .unwrap();
        assert_eq!(seeded.data, seed);

        let outcome = gw
            .compute_outcome(&s, &scenario, Action::Irrigate)
            .await
            .unwrap();
        assert_eq!(outcome.updated_stats, s);
        assert!(outcome.narrative.contains("irrigate"));

        assert_eq!(gw.generate_image(&image_request(None)).await, None);
        assert_eq!(
            gw.generate_image(&image_request(Some("data:old"))).await,
            Some("data:old".to_string())
        );

        assert!(gw.generate_tips(&s, &[]).await.is_empty());
    }

    #[tokio::test]
    async fn test_outcome_preserves_identity_when_crop_omitted() {
        let reply = r#"{"narrative":"good","updatedStats":{"cropHealth":72,"soilMoisture":65,"waterReserves":75,"soilType":"SILTY"}}"#;
        let gw = gateway(ScriptedLlm::new([Ok(reply.to_string())]), ScriptedImages::new([]));
        let s = stats();

        let outcome = gw
            .compute_outcome(&s, &fallback_scenario(), Action::Irrigate)
            .await
            .unwrap();
        assert_eq!(outcome.updated_stats.crop_type, "القمح");
        assert_eq!(outcome.updated_stats.soil_type, SoilType::Silty);
        assert_eq!(outcome.updated_stats.crop_health, 72.0);
    }

    #[tokio::test]
    async fn test_outcome_overrides_drifted_identity_and_clamps() {
        let reply = r#"{"narrative":"x","updatedStats":{"cropHealth":130,"soilMoisture":-4,"waterReserves":50,"soilType":"ROCKY","cropType":"القطن"}}"#;
        let gw = gateway(ScriptedLlm::new([Ok(reply.to_string())]), ScriptedImages::new([]));

        let outcome = gw
            .compute_outcome(&stats(), &fallback_scenario(), Action::Fertilize)
            .await
            .unwrap();
        assert_eq!(outcome.updated_stats.soil_type, SoilType::Silty);
        assert_eq!(outcome.updated_stats.crop_type, "القمح");
        assert_eq!(outcome.updated_stats.crop_health, 100.0);
        assert_eq!(outcome.updated_stats.soil_moisture, 0.0);
    }

    #[tokio::test]
    async fn test_malformed_scenario_falls_back() {
        let gw = gateway(
            ScriptedLlm::new([Ok("{\"narrative\": \"missing fields\"}".to_string())]),
            ScriptedImages::new([]),
        );
        let scenario = gw.generate_scenario(&[], &stats()).await.unwrap();
        assert_eq!(scenario, fallback_scenario());
    }

    #[tokio::test]
    async fn test_seed_data_passes_through_unchanged() {
        let reply = r#"{"narrative":"hot","challenge":"save water","data":{"temperature":1}}"#;
        let gw = gateway(ScriptedLlm::new([Ok(reply.to_string())]), ScriptedImages::new([]));
        let seed = ScenarioData {
            temperature: 41.0,
            ndvi: 0.3,
            ..ScenarioData::neutral()
        };

        let scenario = gw
            .generate_scenario_from_seed(&seed, SoilType::Chalky, "العنب")
            .await
            .unwrap();
        assert_eq!(scenario.narrative, "hot");
        assert_eq!(scenario.data, seed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_then_success_is_retried() {
        let reply = r#"{"tips":["  وفّر المية  ", ""]}"#;
        let llm = Arc::new(ScriptedLlm::new([
            Err(LlmError::rate_limited("429")),
            Ok(reply.to_string()),
        ]));
        let gw = ContentGateway::new(
            llm.clone(),
            Arc::new(ScriptedImages::new([])),
            RetryPolicy::default(),
        );

        let tips = gw.generate_tips(&stats(), &[]).await;
        assert_eq!(tips, vec!["وفّر المية"]);
        assert_eq!(llm.calls(), 2);
    }

    #[tokio::test]
    async fn test_image_create_then_edit_modes() {
        let images = Arc::new(ScriptedImages::new([Ok(Some("data:first".into())), Ok(None)]));
        let gw = ContentGateway::new(
            Arc::new(ScriptedLlm::new([])),
            images.clone(),
            RetryPolicy::none(),
        );

        let first = gw.generate_image(&image_request(None)).await;
        assert_eq!(first.as_deref(), Some("data:first"));

        // 编辑未返回图像 → 保留原图
        let second = gw.generate_image(&image_request(first.as_deref())).await;
        assert_eq!(second.as_deref(), Some("data:first"));

        assert_eq!(
            images.calls().await,
            vec![ImageCall::Create, ImageCall::Edit("data:first".into())]
        );
    }
}
