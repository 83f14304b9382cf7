//! Patrol route export, in the shape downstream robot consumers read.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::RouteError;
use crate::geometry::WorldPos;
use crate::model::{EntityId, KeepoutZone, MapModel, Point};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RouteWaypoint {
    /// 1-based visit order.
    pub order: usize,
    pub x: f64,
    pub y: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RouteZone {
    pub id: String,
    pub points: Vec<WorldPos>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct RouteExport {
    pub waypoints: Vec<RouteWaypoint>,
    #[serde(default)]
    pub keepout_zones: Vec<RouteZone>,
}

impl RouteExport {
    /// Snapshot of the model. Zones still under construction are left out.
    pub fn from_model(model: &MapModel) -> Self {
        RouteExport {
            waypoints: model
                .waypoints()
                .iter()
                .enumerate()
                .map(|(i, p)| RouteWaypoint {
                    order: i + 1,
                    x: p.x,
                    y: p.y,
                })
                .collect(),
            keepout_zones: model
                .zones()
                .iter()
                .filter(|z| z.completed)
                .map(|z| RouteZone {
                    id: z.id.to_string(),
                    points: z.points.iter().map(Point::pos).collect(),
                })
                .collect(),
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, RouteError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn parse(s: &str) -> Result<Self, RouteError> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn load(path: &Path) -> Result<Self, RouteError> {
        Self::parse(&fs::read_to_string(path)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), RouteError> {
        fs::write(path, self.to_json_pretty()?)?;
        info!(
            path = %path.display(),
            waypoints = self.waypoints.len(),
            zones = self.keepout_zones.len(),
            "route saved"
        );
        Ok(())
    }

    /// Replaces the model's waypoints and zones. Waypoints are ordered by
    /// `order`; imported zones are complete and get fresh ids.
    pub fn apply_to(&self, model: &mut MapModel) {
        let mut waypoints = self.waypoints.clone();
        waypoints.sort_by_key(|w| w.order);
        let waypoints = waypoints
            .into_iter()
            .map(|w| Point::new(WorldPos::new(w.x, w.y)))
            .collect();
        let zones = self
            .keepout_zones
            .iter()
            .map(|z| KeepoutZone {
                id: EntityId::fresh(),
                points: z.points.iter().copied().map(Point::new).collect(),
                completed: true,
            })
            .collect();
        model.replace_entities(waypoints, zones);
    }
}
