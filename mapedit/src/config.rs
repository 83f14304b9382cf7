//! Tuning parameters for viewports and the editor.
//!
//! All fields default, so a host config file only needs to list what it
//! overrides.

use serde::{Deserialize, Serialize};

use crate::view::ZoomAnchor;

/// Pointer tolerances, in canvas pixels.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Matches the drawn waypoint marker.
    pub waypoint_hit_radius: f64,
    pub zone_vertex_hit_radius: f64,
    /// A keepout click this close to the previous vertex click is taken as
    /// the second press of a double-click.
    pub double_click_slop: f64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            waypoint_hit_radius: 12.0,
            zone_vertex_hit_radius: 8.0,
            double_click_slop: 4.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub min_scale: f64,
    pub max_scale: f64,
    pub initial_scale: f64,
    /// Scale change per unit of wheel delta.
    pub zoom_sensitivity: f64,
    pub zoom_anchor: ZoomAnchor,
}

impl ViewConfig {
    /// Tightly zoomed overview in the pilot dashboard corner.
    pub fn minimap() -> Self {
        Self {
            min_scale: 5.0,
            max_scale: 30.0,
            initial_scale: 10.0,
            zoom_sensitivity: 0.02,
            zoom_anchor: ZoomAnchor::Center,
        }
    }

    /// Full-size patrol planning map.
    pub fn editor() -> Self {
        Self {
            min_scale: 0.25,
            max_scale: 40.0,
            initial_scale: 1.0,
            zoom_sensitivity: 0.01,
            zoom_anchor: ZoomAnchor::Center,
        }
    }
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self::editor()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_view_config_keeps_defaults() {
        let config: ViewConfig =
            serde_json::from_str(r#"{"max_scale": 12.0, "zoom_anchor": "cursor"}"#).unwrap();
        assert_eq!(config.max_scale, 12.0);
        assert_eq!(config.min_scale, ViewConfig::editor().min_scale);
        assert_eq!(config.zoom_anchor, ZoomAnchor::Cursor);
    }
}
