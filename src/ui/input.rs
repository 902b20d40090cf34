//! 输入解析
//!
//! 把一行玩家输入转成 Input：可直接发给运行时的 Command，或需要在本地处理的请求
//! （真实天气查询、报告、帮助、退出）。
//!
//! ```text
//! start                                  看完教程
//! auto [SOIL] [crop]                     自动开局
//! manual [SOIL] [crop] [field=value ...] 手动输入首回合数据
//! city <name> [SOIL] [crop]              真实天气开局
//! irrigate|fertilize|pest_control|conserve [field=value ...]
//! retry | restart | report | crops | help | quit
//! ```

use thiserror::Error;

use crate::core::{Command, GameSetup};
use crate::farm::{catalog, Action, ScenarioData, SoilType};

#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Send(Command),
    /// 先查询城市天气，再以结果作为种子开局
    RealWeather {
        city: &'static str,
        soil_type: Option<SoilType>,
        crop_type: Option<String>,
    },
    Report,
    /// 列出作物目录与可选城市
    Catalog,
    Help,
    Quit,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputError {
    #[error("empty input")]
    Empty,

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("unknown city: {0}")]
    UnknownCity(String),

    #[error("invalid field: {0} (expected name=number)")]
    BadField(String),
}

/// 手动开局表单的初始值
pub fn manual_defaults() -> ScenarioData {
    ScenarioData {
        temperature: 28.0,
        rainfall: 0.0,
        soil_moisture: 50.0,
        ndvi: 0.65,
        humidity: 60.0,
        wind_speed: 15.0,
        cloud_cover: 20.0,
        pressure: 1012.0,
    }
}

pub fn parse_line(line: &str, current: Option<&ScenarioData>) -> Result<Input, InputError> {
    let mut words = line.split_whitespace();
    let head = words.next().ok_or(InputError::Empty)?.to_ascii_lowercase();
    let rest: Vec<&str> = words.collect();

    let input = match head.as_str() {
        "start" | "ok" => Input::Send(Command::AcknowledgeTutorial),
        "auto" => {
            let (soil_type, crop_type, _) = split_setup(&rest);
            Input::Send(Command::Configure(GameSetup {
                soil_type,
                crop_type,
                seed: None,
            }))
        }
        "manual" => {
            let (soil_type, crop_type, fields) = split_setup(&rest);
            let seed = apply_fields(manual_defaults(), &fields)?;
            Input::Send(Command::Configure(GameSetup {
                soil_type,
                crop_type,
                seed: Some(seed),
            }))
        }
        "city" => {
            let name = rest
                .first()
                .ok_or_else(|| InputError::UnknownCity(String::new()))?;
            let city = catalog::find_city(name).ok_or_else(|| InputError::UnknownCity(name.to_string()))?;
            let (soil_type, crop_type, _) = split_setup(&rest[1..]);
            Input::RealWeather {
                city: city.name_en,
                soil_type,
                crop_type,
            }
        }
        "retry" => Input::Send(Command::RetryScenario),
        "restart" => Input::Send(Command::Restart),
        "report" => Input::Report,
        "crops" | "cities" => Input::Catalog,
        "help" | "?" => Input::Help,
        "quit" | "exit" | "/quit" | "/exit" => Input::Quit,
        other => {
            let action: Action = other
                .parse()
                .map_err(|_| InputError::UnknownCommand(other.to_string()))?;
            let edited = if rest.is_empty() {
                None
            } else {
                let base = current.copied().unwrap_or_else(ScenarioData::neutral);
                Some(apply_fields(base, &rest)?)
            };
            Input::Send(Command::Act { action, edited })
        }
    };
    Ok(input)
}

/// 拆出可选的土壤、作物与其余 field=value 片段
fn split_setup<'a>(words: &[&'a str]) -> (Option<SoilType>, Option<String>, Vec<&'a str>) {
    let mut soil_type = None;
    let mut crop = Vec::new();
    let mut fields = Vec::new();
    for word in words {
        if word.contains('=') {
            fields.push(*word);
        } else if soil_type.is_none() && crop.is_empty() {
            match word.parse::<SoilType>() {
                Ok(soil) => soil_type = Some(soil),
                Err(_) => crop.push(*word),
            }
        } else {
            crop.push(*word);
        }
    }
    let crop_type = (!crop.is_empty()).then(|| crop.join(" "));
    (soil_type, crop_type, fields)
}

fn apply_fields(mut data: ScenarioData, fields: &[&str]) -> Result<ScenarioData, InputError> {
    for field in fields {
        let (name, value) = field
            .split_once('=')
            .ok_or_else(|| InputError::BadField(field.to_string()))?;
        let value: f64 = value
            .parse()
            .map_err(|_| InputError::BadField(field.to_string()))?;
        let slot = match name.to_ascii_lowercase().as_str() {
            "temperature" | "temp" => &mut data.temperature,
            "rainfall" | "rain" => &mut data.rainfall,
            "soilmoisture" | "moisture" => &mut data.soil_moisture,
            "ndvi" => &mut data.ndvi,
            "humidity" => &mut data.humidity,
            "windspeed" | "wind" => &mut data.wind_speed,
            "cloudcover" | "clouds" => &mut data.cloud_cover,
            "pressure" => &mut data.pressure,
            _ => return Err(InputError::BadField(field.to_string())),
        };
        *slot = value;
    }
    Ok(data)
}

pub const HELP: &str = "\
start                                   acknowledge the tutorial
auto [SOIL] [crop]                      start with a generated first round
manual [SOIL] [crop] [field=value ...]  start with your own first-round data
city <name> [SOIL] [crop]               start with the city's current weather
irrigate | fertilize | pest_control | conserve [field=value ...]
retry                                   retry loading the scenario
restart                                 play again after the game ends
report                                  show the final report
crops                                   list crops and cities
quit";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_with_edited_fields() {
        let current = ScenarioData::neutral();
        let input = parse_line("irrigate temp=35 wind=5", Some(&current)).unwrap();
        let Input::Send(Command::Act { action, edited }) = input else {
            panic!("expected an action, got {input:?}");
        };
        assert_eq!(action, Action::Irrigate);
        let edited = edited.unwrap();
        assert_eq!(edited.temperature, 35.0);
        assert_eq!(edited.wind_speed, 5.0);
        assert_eq!(edited.humidity, current.humidity);
    }

    #[test]
    fn test_plain_action_has_no_edits() {
        let input = parse_line("PEST_CONTROL", None).unwrap();
        assert_eq!(
            input,
            Input::Send(Command::Act {
                action: Action::PestControl,
                edited: None
            })
        );
    }

    #[test]
    fn test_manual_setup_parses_soil_crop_and_seed() {
        let input = parse_line("manual sandy الأرز rain=3", None).unwrap();
        let Input::Send(Command::Configure(setup)) = input else {
            panic!("expected configure, got {input:?}");
        };
        assert_eq!(setup.soil_type, Some(SoilType::Sandy));
        assert_eq!(setup.crop_type.as_deref(), Some("الأرز"));
        let seed = setup.seed.unwrap();
        assert_eq!(seed.rainfall, 3.0);
        assert_eq!(seed.temperature, 28.0);
    }

    #[test]
    fn test_city_lookup() {
        let input = parse_line("city aswan", None).unwrap();
        assert_eq!(
            input,
            Input::RealWeather {
                city: "Aswan",
                soil_type: None,
                crop_type: None
            }
        );
        assert_eq!(
            parse_line("city Atlantis", None),
            Err(InputError::UnknownCity("Atlantis".into()))
        );
    }

    #[test]
    fn test_rejects_bad_input() {
        assert_eq!(parse_line("   ", None), Err(InputError::Empty));
        assert!(matches!(parse_line("dance", None), Err(InputError::UnknownCommand(_))));
        assert!(matches!(
            parse_line("conserve temp=hot", None),
            Err(InputError::BadField(_))
        ));
    }
}
