//! The shared map model: occupancy raster metadata plus the editable
//! patrol waypoints and keepout zones.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::geometry::WorldPos;

static NEXT_ENTITY_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier for a point or zone. Stable for the entity's
/// lifetime and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(u64);

impl EntityId {
    pub fn fresh() -> Self {
        EntityId(NEXT_ENTITY_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A georeferenced point, in world meters.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub id: EntityId,
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(pos: WorldPos) -> Self {
        Point {
            id: EntityId::fresh(),
            x: pos.x,
            y: pos.y,
        }
    }

    pub fn pos(&self) -> WorldPos {
        WorldPos::new(self.x, self.y)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeepoutZone {
    pub id: EntityId,
    pub points: Vec<Point>,
    /// `false` while the polygon is still being built (open polyline).
    pub completed: bool,
}

impl KeepoutZone {
    /// Closed zones with at least a triangle are filled and count as
    /// obstacles. Anything smaller is a degenerate outline.
    pub fn is_fillable(&self) -> bool {
        self.completed && self.points.len() >= 3
    }

    pub fn point(&self, id: EntityId) -> Option<&Point> {
        self.points.iter().find(|p| p.id == id)
    }
}

/// World-frame position of the raster's bottom-left cell.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct Origin {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Occupancy grid metadata and raster, as received from the bridge.
///
/// Cell values are `-1` unknown, `0` free, `100` occupied. They are
/// display inputs only and never recomputed here.
#[derive(Debug, Clone, PartialEq)]
pub struct MapInfo {
    /// Meters per cell. Always finite and positive.
    pub resolution: f64,
    pub width: u32,
    pub height: u32,
    pub origin: Origin,
    /// Row-major cells, `width * height` long.
    pub data: Vec<i8>,
}

/// Any point the editor can address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointRef {
    Waypoint(EntityId),
    ZoneVertex { zone: EntityId, point: EntityId },
}

/// Single owner of the session's map, waypoints and zones.
///
/// Every mutation bumps [`MapModel::revision`], which viewports use to
/// decide whether to redraw.
#[derive(Debug, Default)]
pub struct MapModel {
    map: Option<MapInfo>,
    waypoints: Vec<Point>,
    zones: Vec<KeepoutZone>,
    revision: u64,
    map_generation: u64,
}

impl MapModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Bumped only when the map itself is replaced.
    pub fn map_generation(&self) -> u64 {
        self.map_generation
    }

    fn touch(&mut self) {
        self.revision += 1;
    }

    pub fn map(&self) -> Option<&MapInfo> {
        self.map.as_ref()
    }

    /// Replaces the map wholesale. Waypoints and zones are left alone.
    pub fn set_map(&mut self, map: MapInfo) {
        info!(
            width = map.width,
            height = map.height,
            resolution = map.resolution,
            "map replaced"
        );
        self.map = Some(map);
        self.map_generation += 1;
        self.touch();
    }

    /// Patrol visit order.
    pub fn waypoints(&self) -> &[Point] {
        &self.waypoints
    }

    pub fn waypoint(&self, id: EntityId) -> Option<&Point> {
        self.waypoints.iter().find(|p| p.id == id)
    }

    pub fn zones(&self) -> &[KeepoutZone] {
        &self.zones
    }

    pub fn zone(&self, id: EntityId) -> Option<&KeepoutZone> {
        self.zones.iter().find(|z| z.id == id)
    }

    fn zone_mut(&mut self, id: EntityId) -> Option<&mut KeepoutZone> {
        self.zones.iter_mut().find(|z| z.id == id)
    }

    /// The zone still under construction, if any.
    pub fn active_zone(&self) -> Option<&KeepoutZone> {
        self.zones.iter().find(|z| !z.completed)
    }

    pub fn position_of(&self, target: PointRef) -> Option<WorldPos> {
        match target {
            PointRef::Waypoint(id) => self.waypoint(id).map(Point::pos),
            PointRef::ZoneVertex { zone, point } => {
                self.zone(zone).and_then(|z| z.point(point)).map(Point::pos)
            }
        }
    }

    pub fn contains(&self, target: PointRef) -> bool {
        self.position_of(target).is_some()
    }

    /// Appends a waypoint at the end of the visit order.
    pub fn add_waypoint(&mut self, pos: WorldPos) -> EntityId {
        let point = Point::new(pos);
        let id = point.id;
        debug!(%id, x = pos.x, y = pos.y, "waypoint added");
        self.waypoints.push(point);
        self.touch();
        id
    }

    /// Returns `false` if no waypoint has this id.
    pub fn remove_waypoint(&mut self, id: EntityId) -> bool {
        let before = self.waypoints.len();
        self.waypoints.retain(|p| p.id != id);
        let removed = self.waypoints.len() != before;
        if removed {
            debug!(%id, "waypoint removed");
            self.touch();
        }
        removed
    }

    pub fn update_waypoint_position(&mut self, id: EntityId, pos: WorldPos) -> bool {
        match self.waypoints.iter_mut().find(|p| p.id == id) {
            Some(point) => {
                point.x = pos.x;
                point.y = pos.y;
                self.touch();
                true
            }
            None => false,
        }
    }

    /// Starts a new, incomplete zone with one vertex.
    ///
    /// The model does not prevent several incomplete zones; the editor
    /// only ever keeps one active.
    pub fn begin_keepout_zone(&mut self, first: WorldPos) -> EntityId {
        let zone = KeepoutZone {
            id: EntityId::fresh(),
            points: vec![Point::new(first)],
            completed: false,
        };
        let id = zone.id;
        debug!(%id, "keepout zone started");
        self.zones.push(zone);
        self.touch();
        id
    }

    /// Appends a vertex to an incomplete zone. Stale ids and completed
    /// zones are ignored.
    pub fn append_to_zone(&mut self, zone_id: EntityId, pos: WorldPos) -> Option<EntityId> {
        let zone = self.zone_mut(zone_id).filter(|z| !z.completed)?;
        let point = Point::new(pos);
        let id = point.id;
        zone.points.push(point);
        self.touch();
        Some(id)
    }

    /// Marks a zone closed. Completing an already completed zone changes
    /// nothing; returns `false` only for unknown ids.
    pub fn complete_zone(&mut self, zone_id: EntityId) -> bool {
        let Some(zone) = self.zone_mut(zone_id) else {
            return false;
        };
        if !zone.completed {
            zone.completed = true;
            debug!(id = %zone_id, vertices = zone.points.len(), "keepout zone completed");
            self.touch();
        }
        true
    }

    pub fn remove_zone(&mut self, zone_id: EntityId) -> bool {
        let before = self.zones.len();
        self.zones.retain(|z| z.id != zone_id);
        let removed = self.zones.len() != before;
        if removed {
            debug!(id = %zone_id, "keepout zone removed");
            self.touch();
        }
        removed
    }

    pub fn update_zone_point_position(
        &mut self,
        zone_id: EntityId,
        point_id: EntityId,
        pos: WorldPos,
    ) -> bool {
        let Some(point) = self
            .zone_mut(zone_id)
            .and_then(|z| z.points.iter_mut().find(|p| p.id == point_id))
        else {
            return false;
        };
        point.x = pos.x;
        point.y = pos.y;
        self.touch();
        true
    }

    pub fn update_position(&mut self, target: PointRef, pos: WorldPos) -> bool {
        match target {
            PointRef::Waypoint(id) => self.update_waypoint_position(id, pos),
            PointRef::ZoneVertex { zone, point } => {
                self.update_zone_point_position(zone, point, pos)
            }
        }
    }

    /// Drops every waypoint and zone. The map stays.
    pub fn clear_all(&mut self) {
        self.waypoints.clear();
        self.zones.clear();
        info!("waypoints and keepout zones cleared");
        self.touch();
    }

    /// Replaces all entities at once, e.g. from an imported route.
    pub fn replace_entities(&mut self, waypoints: Vec<Point>, zones: Vec<KeepoutZone>) {
        self.waypoints = waypoints;
        self.zones = zones;
        self.touch();
    }
}
