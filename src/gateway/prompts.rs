//! 提示词构建：情景、种子情景、结果、结算建议、图像（create / edit）

use std::fmt::Write;

use crate::farm::{Action, FarmStats, HistoryEntry, Scenario, ScenarioData, SoilType};
use crate::gateway::ImageRequest;

pub const SYSTEM_PROMPT: &str = "You are the sustainable-agriculture expert of the farming game \"Get Ready for Green\". \
Write every narrative, challenge and tip in colloquial Egyptian Arabic. \
Always answer with a single JSON object and nothing else.";

/// 首张图像生成时作为「上一回合结果」的占位叙述
pub const NEW_FARM_CONTEXT: &str = "A new farm is established.";

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max_chars).collect();
        out.push_str("...");
        out
    }
}

fn stats_block(stats: &FarmStats) -> String {
    format!(
        "- crop health: {}%\n- soil moisture: {}%\n- water reserves: {}%\n- soil type: {}\n- crop: {}",
        stats.crop_health, stats.soil_moisture, stats.water_reserves, stats.soil_type, stats.crop_type
    )
}

fn data_block(data: &ScenarioData) -> String {
    format!(
        "temperature {}°C, rainfall {}mm, soil moisture {}%, NDVI {}, humidity {}%, wind {} km/h, cloud cover {}%, pressure {} hPa",
        data.temperature,
        data.rainfall,
        data.soil_moisture,
        data.ndvi,
        data.humidity,
        data.wind_speed,
        data.cloud_cover,
        data.pressure
    )
}

const SCENARIO_DATA_SCHEMA: &str = "\"data\": {\"temperature\": number, \"rainfall\": number, \"soilMoisture\": number (0-100), \
\"ndvi\": number (0-1), \"humidity\": number (0-100), \"windSpeed\": number, \"cloudCover\": number (0-100), \"pressure\": number}";

pub fn scenario_prompt(history: &[HistoryEntry], stats: &FarmStats) -> String {
    let last_action = history
        .last()
        .map(|h| h.action.as_str())
        .unwrap_or("NONE");

    let mut summary = String::new();
    if history.is_empty() {
        summary.push_str("This is the first round.");
    } else {
        for h in history {
            let _ = writeln!(
                summary,
                "Round {}: faced \"{}\", chose {}, which led to \"{}\"",
                h.round,
                h.scenario.challenge,
                h.action,
                truncate(&h.outcome.narrative, 100)
            );
        }
    }

    format!(
        "Create the next educational round for the player.\n\n\
Current farm stats:\n{stats}\n\n\
Previous rounds:\n{summary}\n\n\
Tie the new sustainability challenge to the soil type and the crop. \
Let the player's last decision ({last_action}) influence the new weather: organic FERTILIZE or biological PEST_CONTROL \
may improve biodiversity slightly, wise IRRIGATE may raise humidity, CONSERVE improves soil health gradually.\n\n\
Reply as JSON: {{\"narrative\": string, \"challenge\": string, {SCENARIO_DATA_SCHEMA}}}. Keep the data consistent with the narrative.",
        stats = stats_block(stats),
    )
}

pub fn seed_scenario_prompt(seed: &ScenarioData, soil_type: SoilType, crop_type: &str) -> String {
    format!(
        "This is the first round. The player entered this data to start a realistic, sustainability-focused simulation:\n\
{data}\nSoil type: {soil_type}\nCrop: {crop_type}\n\n\
Write an opening scenario fully consistent with that data.\n\
Reply as JSON: {{\"narrative\": string, \"challenge\": string}}.",
        data = data_block(seed),
    )
}

pub fn outcome_prompt(stats: &FarmStats, scenario: &Scenario, action: Action) -> String {
    format!(
        "Analyse the result of the player's decision.\n\n\
Current farm stats:\n{stats}\n\n\
Current scenario:\n- narrative: \"{narrative}\"\n- challenge: \"{challenge}\"\n- data: {data}\n\n\
Player decision: {action}\n\
(IRRIGATE = wise water use, FERTILIZE = organic fertiliser, PEST_CONTROL = biological methods, CONSERVE = soil and water conservation.)\n\n\
Explain why the decision produced these results given the crop ({crop}), the soil ({soil}) and the weather, \
and end the narrative with a tailored sustainability tip. \
Compute realistic new values between 0 and 100. soilType and cropType must stay exactly as they are.\n\
Reply as JSON: {{\"narrative\": string, \"updatedStats\": {{\"cropHealth\": number, \"soilMoisture\": number, \
\"waterReserves\": number, \"soilType\": string, \"cropType\": string}}}}.",
        stats = stats_block(stats),
        narrative = scenario.narrative,
        challenge = scenario.challenge,
        data = data_block(&scenario.data),
        crop = stats.crop_type,
        soil = stats.soil_type,
    )
}

pub fn tips_prompt(final_stats: &FarmStats, history: &[HistoryEntry]) -> String {
    let decisions = if history.is_empty() {
        "The player made no decisions.".to_string()
    } else {
        history
            .iter()
            .map(|h| {
                format!(
                    "- Round {}: faced \"{}\" and chose \"{}\".",
                    h.round,
                    truncate(&h.scenario.challenge, 50),
                    h.action
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "The game is over. Give the player personal advice.\n\n\
Final stats:\n- crop health: {}%\n- soil moisture: {}%\n- water reserves: {}%\n\n\
Decisions:\n{decisions}\n\n\
Write 2 to 3 short, actionable, encouraging tips tied to these results and to sustainability.\n\
Reply as JSON: {{\"tips\": [string]}}.",
        final_stats.crop_health, final_stats.soil_moisture, final_stats.water_reserves,
    )
}

pub fn image_prompt(request: &ImageRequest) -> String {
    let data = &request.scenario.data;
    let soil = request.soil_type.visual_description();
    let weather = format!(
        "a temperature of {}°C, rainfall of {}mm, wind speed of {} km/h, cloud cover of {}%",
        data.temperature, data.rainfall, data.wind_speed, data.cloud_cover
    );

    match request.previous {
        None => format!(
            "A photorealistic, vibrant, wide-angle cinematic shot of a modern sustainable farm in rural Egypt, \
with fields of {crop}. The image must visually represent this situation: \"{narrative}\".\n\
- Soil: {soil}\n\
- Crop health (NDVI {ndvi:.2}): near 1.0 is lush and green, near 0 is sparse and yellow.\n\
- Soil moisture ({moisture}%): high looks dark and wet, low looks dry and cracked.\n\
- Weather: {weather}.\n\
Highly realistic and detailed, emphasising ecological balance.",
            crop = request.crop_type,
            narrative = request.scenario.narrative,
            ndvi = data.ndvi,
            moisture = data.soil_moisture,
        ),
        Some(_) => format!(
            "Edit the provided image to reflect a change in the farm's condition. The farm is growing {crop}. \
The previous action resulted in this outcome: \"{outcome}\".\n\
- Soil: {soil}\n\
- Crop health (NDVI {ndvi:.2}): higher is greener and more lush, lower is sparse or yellowish.\n\
- Soil moisture ({moisture}%): higher is darker and wetter, lower is drier and possibly cracked.\n\
- Weather: {weather}.\n\
Preserve the original composition and perspective; changes should be noticeable but realistic.",
            crop = request.crop_type,
            outcome = request.outcome_narrative,
            ndvi = data.ndvi,
            moisture = data.soil_moisture,
        ),
    }
}
