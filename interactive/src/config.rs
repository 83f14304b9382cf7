use std::path::{Path, PathBuf};

use mapedit::{EditorConfig, ViewConfig, ZoomAnchor};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("unsupported config format: {0}")]
    UnsupportedFormat(String),
    #[error("invalid log level `{0}`")]
    LogLevel(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub broker_uri: String,
    pub client_id: String,
    /// MQTT topic prefix the ROS topics are mirrored under.
    pub topic_prefix: String,
    pub map_topic: String,
    pub pose_topic: String,
    pub keep_alive_secs: u64,
    /// Use the built-in demo map instead of a broker.
    pub offline: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            broker_uri: "tcp://localhost:1883".to_string(),
            client_id: "patrol-dashboard".to_string(),
            topic_prefix: "ros".to_string(),
            map_topic: "/map".to_string(),
            pose_topic: "/amcl_pose".to_string(),
            keep_alive_secs: 20,
            offline: false,
        }
    }
}

/// Per-viewport overrides, applied on top of that viewport's preset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewOverrides {
    pub min_scale: Option<f64>,
    pub max_scale: Option<f64>,
    pub initial_scale: Option<f64>,
    pub zoom_sensitivity: Option<f64>,
    pub zoom_anchor: Option<ZoomAnchor>,
}

impl ViewOverrides {
    pub fn apply(&self, base: ViewConfig) -> ViewConfig {
        ViewConfig {
            min_scale: self.min_scale.unwrap_or(base.min_scale),
            max_scale: self.max_scale.unwrap_or(base.max_scale),
            initial_scale: self.initial_scale.unwrap_or(base.initial_scale),
            zoom_sensitivity: self.zoom_sensitivity.unwrap_or(base.zoom_sensitivity),
            zoom_anchor: self.zoom_anchor.unwrap_or(base.zoom_anchor),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub bridge: BridgeConfig,
    pub editor: EditorConfig,
    pub editor_view: ViewOverrides,
    pub minimap_view: ViewOverrides,
    pub route_path: PathBuf,
    pub log_level: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            bridge: BridgeConfig::default(),
            editor: EditorConfig::default(),
            editor_view: ViewOverrides::default(),
            minimap_view: ViewOverrides::default(),
            route_path: PathBuf::from("patrol_route.json"),
            log_level: "info".to_string(),
        }
    }
}

impl DashboardConfig {
    /// Loads a config file. Only `.toml` is understood.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        match extension.to_lowercase().as_str() {
            "toml" => Self::from_toml_str(&std::fs::read_to_string(path)?),
            _ => Err(ConfigError::UnsupportedFormat(extension.to_string())),
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn editor_view(&self) -> ViewConfig {
        self.editor_view.apply(ViewConfig::editor())
    }

    pub fn minimap_view(&self) -> ViewConfig {
        self.minimap_view.apply(ViewConfig::minimap())
    }

    pub fn log_level(&self) -> Result<tracing::Level, ConfigError> {
        self.log_level
            .parse()
            .map_err(|_| ConfigError::LogLevel(self.log_level.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = DashboardConfig::from_toml_str("").unwrap();
        assert_eq!(config.bridge.broker_uri, "tcp://localhost:1883");
        assert_eq!(config.bridge.map_topic, "/map");
        assert_eq!(config.minimap_view().min_scale, 5.0);
        assert_eq!(config.minimap_view().max_scale, 30.0);
        assert_eq!(config.editor.waypoint_hit_radius, 12.0);
        assert_eq!(config.log_level().unwrap(), tracing::Level::INFO);
    }

    #[test]
    fn sections_override_fields() {
        let config = DashboardConfig::from_toml_str(
            r#"
            route_path = "route.json"
            log_level = "debug"

            [bridge]
            broker_uri = "tcp://robot:1883"
            offline = true

            [editor_view]
            zoom_anchor = "cursor"
            max_scale = 12.0

            [minimap_view]
            initial_scale = 20.0
            "#,
        )
        .unwrap();
        assert_eq!(config.bridge.broker_uri, "tcp://robot:1883");
        assert_eq!(config.bridge.pose_topic, "/amcl_pose");
        assert!(config.bridge.offline);
        let editor_view = config.editor_view();
        assert_eq!(editor_view.zoom_anchor, ZoomAnchor::Cursor);
        assert_eq!(editor_view.max_scale, 12.0);
        assert_eq!(editor_view.min_scale, ViewConfig::editor().min_scale);
        // Unset minimap fields keep the minimap preset, not the editor one.
        let minimap_view = config.minimap_view();
        assert_eq!(minimap_view.initial_scale, 20.0);
        assert_eq!(minimap_view.min_scale, 5.0);
        assert_eq!(config.route_path, PathBuf::from("route.json"));
        assert_eq!(config.log_level().unwrap(), tracing::Level::DEBUG);
    }

    #[test]
    fn rejects_other_formats() {
        assert!(matches!(
            DashboardConfig::load("dashboard.yaml"),
            Err(ConfigError::UnsupportedFormat(ext)) if ext == "yaml"
        ));
    }

    #[test]
    fn bad_log_level_is_reported() {
        let config = DashboardConfig::from_toml_str(r#"log_level = "chatty""#).unwrap();
        assert!(matches!(config.log_level(), Err(ConfigError::LogLevel(_))));
    }
}
