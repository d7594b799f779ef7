use std::path::Path;

use serde::{Deserialize, Serialize};

/// Pixel ranges the linear flow scales map into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleConfig {
    pub min_radius: f64,
    pub max_radius: f64,
    pub min_link_width: f64,
    pub max_link_width: f64,
}

impl Default for ScaleConfig {
    fn default() -> Self {
        Self {
            min_radius: 10.0,
            max_radius: 40.0,
            min_link_width: 2.0,
            max_link_width: 20.0,
        }
    }
}

/// Tangent weights for link curve control points. The major weight lands on
/// the axis chosen by the relative vertical position of the endpoints, see
/// `geometry::link_controls`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveConfig {
    pub major: f64,
    pub minor: f64,
}

impl Default for CurveConfig {
    fn default() -> Self {
        Self {
            major: 0.4,
            minor: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleConfig {
    pub source_color: String,
    pub target_color: String,
    pub link_color: String,
    pub circle_opacity: f64,
    pub background: Option<String>,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            source_color: "#c9784c".to_string(),
            target_color: "#3f7f93".to_string(),
            link_color: "#8a8a8a".to_string(),
            circle_opacity: 1.0,
            background: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub scale: ScaleConfig,
    pub curve: CurveConfig,
    pub style: StyleConfig,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    min_radius: Option<f64>,
    max_radius: Option<f64>,
    min_link_width: Option<f64>,
    max_link_width: Option<f64>,
    curve_major: Option<f64>,
    curve_minor: Option<f64>,
    source_color: Option<String>,
    target_color: Option<String>,
    link_color: Option<String>,
    circle_opacity: Option<f64>,
    background: Option<String>,
}

fn overlay(mut config: EngineConfig, parsed: ConfigFile) -> EngineConfig {
    if let Some(v) = parsed.min_radius {
        config.scale.min_radius = v;
    }
    if let Some(v) = parsed.max_radius {
        config.scale.max_radius = v;
    }
    if let Some(v) = parsed.min_link_width {
        config.scale.min_link_width = v;
    }
    if let Some(v) = parsed.max_link_width {
        config.scale.max_link_width = v;
    }
    if let Some(v) = parsed.curve_major {
        config.curve.major = v;
    }
    if let Some(v) = parsed.curve_minor {
        config.curve.minor = v;
    }
    if let Some(v) = parsed.source_color {
        config.style.source_color = v;
    }
    if let Some(v) = parsed.target_color {
        config.style.target_color = v;
    }
    if let Some(v) = parsed.link_color {
        config.style.link_color = v;
    }
    if let Some(v) = parsed.circle_opacity {
        config.style.circle_opacity = v;
    }
    if let Some(v) = parsed.background {
        config.style.background = Some(v);
    }
    config
}

/// Defaults overlaid with any values present in a JSON override file.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<EngineConfig> {
    let config = EngineConfig::default();
    let Some(path) = path else {
        return Ok(config);
    };

    let contents = std::fs::read_to_string(path)?;
    let parsed: ConfigFile = serde_json::from_str(&contents)?;
    Ok(overlay(config, parsed))
}
