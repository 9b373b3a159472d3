//! Configuration parsing
//!
//! Supports TOML (primary) and JSON (optional) formats.

use contracts::{LineBlueprint, TrackError};

/// Configuration file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML format (recommended)
    Toml,
    /// JSON format
    Json,
}

impl ConfigFormat {
    /// Infer format from file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Parse TOML configuration
pub fn parse_toml(content: &str) -> Result<LineBlueprint, TrackError> {
    toml::from_str(content).map_err(|e| TrackError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse JSON configuration
pub fn parse_json(content: &str) -> Result<LineBlueprint, TrackError> {
    serde_json::from_str(content).map_err(|e| TrackError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse configuration according to format
pub fn parse(content: &str, format: ConfigFormat) -> Result<LineBlueprint, TrackError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_toml_minimal() {
        let content = r#"
[line]
belt_speed = 0.366
default_total_distance = 12.8

[[cameras]]
id = "usb_local"
stage = "cam0"
transport = "local"

[[cameras]]
id = "rpi_usb1"
stage = "cam1"

[[transitions]]
from = "scanner"
to = "cam0"
avg_travel_s = 2.5
margin_s = 3.0

[[routes]]
code = "XSEA"
stages = ["scanner", "cam0", "cam1"]
pickup_stages = ["cam1"]
total_distance = 9.47
"#;
        let result = parse_toml(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let bp = result.unwrap();
        assert_eq!(bp.line.belt_speed, 0.366);
        assert_eq!(bp.cameras.len(), 2);
        assert_eq!(bp.routes[0].code, "XSEA");
        // sync block omitted entirely, defaults apply
        assert_eq!(bp.sync.window_s, 0.5);
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "line": { "belt_speed": 0.366, "default_total_distance": 12.8 },
            "cameras": [
                { "id": "usb_local", "stage": "cam0", "transport": "local" }
            ],
            "transitions": [
                { "from": "scanner", "to": "cam0", "avg_travel_s": 2.5, "margin_s": 3.0 }
            ],
            "routes": [{
                "code": "XSEB",
                "stages": ["scanner", "cam0"],
                "pickup_stages": ["cam0"],
                "total_distance": 12.8
            }]
        }"#;
        let result = parse_json(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let content = "invalid toml [[[";
        let result = parse_toml(content);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, TrackError::ConfigParse { .. }));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ConfigFormat::from_extension("toml"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("TOML"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("json"),
            Some(ConfigFormat::Json)
        );
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
