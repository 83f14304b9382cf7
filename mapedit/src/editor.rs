//! Pointer-driven editing of waypoints and keepout zones.
//!
//! The editor turns normalized pointer and key events into [`MapModel`]
//! mutations. It holds no entity data itself, only ids, and re-validates
//! them against the model on every event so that entities removed
//! elsewhere (clear-all, the other viewport) never leave it stuck.

use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::config::EditorConfig;
use crate::coords::CoordinateMapper;
use crate::geometry::{CanvasPos, WorldPos};
use crate::model::{EntityId, MapModel, PointRef};
use crate::view::ViewState;

/// Active tool, chosen by the host toolbar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tool {
    #[default]
    Select,
    Waypoint,
    Keepout,
    /// Pointer drags pan the view; handled by the viewport, not the editor.
    Pan,
}

impl Tool {
    pub const ALL: [Tool; 4] = [Tool::Select, Tool::Waypoint, Tool::Keepout, Tool::Pan];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tool::Select => "select",
            Tool::Waypoint => "waypoint",
            Tool::Keepout => "keepout",
            Tool::Pan => "pan",
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTool(pub String);

impl fmt::Display for UnknownTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown tool `{}`", self.0)
    }
}

impl std::error::Error for UnknownTool {}

impl FromStr for Tool {
    type Err = UnknownTool;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tool::ALL
            .into_iter()
            .find(|tool| tool.as_str() == s)
            .ok_or_else(|| UnknownTool(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    Down,
    Move,
    Up,
    /// Pointer left the surface without a release. Treated as `Up`.
    Leave,
}

/// Device-independent pointer input, in canvas pixels relative to the
/// drawing surface. Mouse and first-touch input map onto the same events.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub pos: CanvasPos,
    pub kind: PointerKind,
    pub is_double_click: bool,
}

impl PointerEvent {
    pub fn new(kind: PointerKind, pos: CanvasPos) -> Self {
        Self {
            pos,
            kind,
            is_double_click: false,
        }
    }

    pub fn down(pos: CanvasPos) -> Self {
        Self::new(PointerKind::Down, pos)
    }

    pub fn moved(pos: CanvasPos) -> Self {
        Self::new(PointerKind::Move, pos)
    }

    pub fn up(pos: CanvasPos) -> Self {
        Self::new(PointerKind::Up, pos)
    }

    pub fn leave(pos: CanvasPos) -> Self {
        Self::new(PointerKind::Leave, pos)
    }

    pub fn double_click(pos: CanvasPos) -> Self {
        Self {
            pos,
            kind: PointerKind::Up,
            is_double_click: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKey {
    Delete,
    Backspace,
    Escape,
}

/// Point being dragged. The grab offset is frozen for the whole gesture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragState {
    pub target: PointRef,
    /// Pointer minus point position at grab time, in world meters, so the
    /// point keeps its distance to the pointer instead of snapping to it.
    pub grab_offset: WorldPos,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EditorState {
    Idle,
    BuildingZone(EntityId),
    Dragging(DragState),
}

/// Finds the point under `pos`: waypoints first, then zone vertices.
/// First match within its radius wins.
pub fn hit_test(
    model: &MapModel,
    mapper: &CoordinateMapper<'_>,
    pos: CanvasPos,
    config: &EditorConfig,
) -> Option<PointRef> {
    if !mapper.has_map() {
        return None;
    }
    let within = |world: WorldPos, radius: f64| {
        mapper.world_to_screen(world).distance(pos) <= radius
    };

    if let Some(p) = model
        .waypoints()
        .iter()
        .find(|p| within(p.pos(), config.waypoint_hit_radius))
    {
        return Some(PointRef::Waypoint(p.id));
    }

    model.zones().iter().find_map(|zone| {
        zone.points
            .iter()
            .find(|p| within(p.pos(), config.zone_vertex_hit_radius))
            .map(|p| PointRef::ZoneVertex {
                zone: zone.id,
                point: p.id,
            })
    })
}

#[derive(Debug, Clone, Default)]
pub struct GeometryEditor {
    config: EditorConfig,
    active_zone: Option<EntityId>,
    drag: Option<DragState>,
    selection: Option<PointRef>,
    /// Canvas position of the last accepted vertex of `active_zone`.
    last_zone_click: Option<CanvasPos>,
}

impl GeometryEditor {
    pub fn new(config: EditorConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn state(&self) -> EditorState {
        match (self.drag, self.active_zone) {
            (Some(drag), _) => EditorState::Dragging(drag),
            (None, Some(zone)) => EditorState::BuildingZone(zone),
            (None, None) => EditorState::Idle,
        }
    }

    pub fn selection(&self) -> Option<PointRef> {
        self.selection
    }

    pub fn active_zone(&self) -> Option<EntityId> {
        self.active_zone
    }

    /// Drops references to entities that no longer exist in the model.
    fn reconcile(&mut self, model: &MapModel) {
        if let Some(zone) = self.active_zone {
            if !model.zone(zone).map(|z| !z.completed).unwrap_or(false) {
                self.active_zone = None;
                self.last_zone_click = None;
            }
        }
        if let Some(drag) = self.drag {
            if !model.contains(drag.target) {
                self.drag = None;
            }
        }
        if let Some(selected) = self.selection {
            if !model.contains(selected) {
                self.selection = None;
            }
        }
    }

    /// Ends any drag in progress. The point keeps its last position.
    pub fn cancel_drag(&mut self) -> bool {
        match self.drag.take() {
            Some(drag) => {
                debug!(target = ?drag.target, "drag ended");
                true
            }
            None => false,
        }
    }

    /// Forgets selection, drag and the zone under construction, without
    /// touching the model. Used after the host clears everything.
    pub fn reset(&mut self) {
        self.active_zone = None;
        self.last_zone_click = None;
        self.drag = None;
        self.selection = None;
    }

    /// Applies one pointer event. Returns `true` when the model or the
    /// selection changed and the overlay should be redrawn.
    pub fn handle_pointer(
        &mut self,
        model: &mut MapModel,
        view: &ViewState,
        tool: Tool,
        event: PointerEvent,
    ) -> bool {
        self.reconcile(model);

        if event.is_double_click && tool == Tool::Keepout {
            return self.complete_active_zone(model);
        }

        match event.kind {
            PointerKind::Down => self.pointer_down(model, view, tool, event.pos),
            PointerKind::Move => self.pointer_move(model, view, event.pos),
            PointerKind::Up | PointerKind::Leave => self.cancel_drag(),
        }
    }

    fn pointer_down(
        &mut self,
        model: &mut MapModel,
        view: &ViewState,
        tool: Tool,
        pos: CanvasPos,
    ) -> bool {
        let mapper = CoordinateMapper::new(model.map(), view);
        match tool {
            Tool::Waypoint => {
                let Some(world) = mapper.try_screen_to_world(pos) else {
                    debug!("waypoint click ignored, no map yet");
                    return false;
                };
                model.add_waypoint(world);
                true
            }
            Tool::Keepout => {
                let Some(world) = mapper.try_screen_to_world(pos) else {
                    debug!("keepout click ignored, no map yet");
                    return false;
                };
                self.add_zone_vertex(model, pos, world)
            }
            Tool::Select => {
                let hit = hit_test(model, &mapper, pos, &self.config);
                let changed = hit != self.selection;
                self.selection = hit;
                let (Some(target), Some(pointer_world)) = (hit, mapper.try_screen_to_world(pos))
                else {
                    return changed;
                };
                let Some(point_world) = model.position_of(target) else {
                    return changed;
                };
                debug!(?target, "drag started");
                self.drag = Some(DragState {
                    target,
                    grab_offset: pointer_world - point_world,
                });
                true
            }
            Tool::Pan => false,
        }
    }

    fn add_zone_vertex(&mut self, model: &mut MapModel, pos: CanvasPos, world: WorldPos) -> bool {
        let Some(zone_id) = self.active_zone else {
            self.active_zone = Some(model.begin_keepout_zone(world));
            self.last_zone_click = Some(pos);
            return true;
        };

        // Both presses of a double-click arrive as clicks; only the first
        // one becomes a vertex.
        if let Some(last) = self.last_zone_click {
            if last.distance(pos) <= self.config.double_click_slop {
                return false;
            }
        }

        let appended = model.append_to_zone(zone_id, world).is_some();
        if appended {
            self.last_zone_click = Some(pos);
        }
        appended
    }

    fn pointer_move(&mut self, model: &mut MapModel, view: &ViewState, pos: CanvasPos) -> bool {
        let Some(drag) = self.drag else {
            return false;
        };
        let mapper = CoordinateMapper::new(model.map(), view);
        let Some(pointer_world) = mapper.try_screen_to_world(pos) else {
            return false;
        };
        if model.update_position(drag.target, pointer_world - drag.grab_offset) {
            true
        } else {
            self.drag = None;
            false
        }
    }

    fn complete_active_zone(&mut self, model: &mut MapModel) -> bool {
        self.last_zone_click = None;
        match self.active_zone.take() {
            Some(zone) => model.complete_zone(zone),
            None => false,
        }
    }

    /// Delete/Backspace removes the selected waypoint; zone vertices are
    /// not deletable. Escape abandons the zone under construction.
    pub fn handle_key(&mut self, model: &mut MapModel, key: EditKey) -> bool {
        self.reconcile(model);
        match key {
            EditKey::Delete | EditKey::Backspace => match self.selection {
                Some(PointRef::Waypoint(id)) => {
                    self.drag = None;
                    self.selection = None;
                    model.remove_waypoint(id)
                }
                _ => false,
            },
            EditKey::Escape => {
                self.drag = None;
                self.last_zone_click = None;
                match self.active_zone.take() {
                    Some(zone) => model.remove_zone(zone),
                    None => false,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::model::{MapInfo, Origin};

    fn model_with_map() -> MapModel {
        let mut model = MapModel::new();
        model.set_map(MapInfo {
            resolution: 0.05,
            width: 400,
            height: 400,
            origin: Origin {
                x: -10.0,
                y: -10.0,
                z: 0.0,
            },
            data: vec![0; 400 * 400],
        });
        model
    }

    fn click(editor: &mut GeometryEditor, model: &mut MapModel, view: &ViewState, tool: Tool, x: f64, y: f64) {
        let pos = CanvasPos::new(x, y);
        editor.handle_pointer(model, view, tool, PointerEvent::down(pos));
        editor.handle_pointer(model, view, tool, PointerEvent::up(pos));
    }

    #[test]
    fn tool_names_parse() {
        assert_eq!("keepout".parse::<Tool>(), Ok(Tool::Keepout));
        assert_eq!(Tool::Waypoint.to_string(), "waypoint");
        assert!("lasso".parse::<Tool>().is_err());
    }

    #[test]
    fn clicks_without_map_do_nothing() {
        let mut model = MapModel::new();
        let mut editor = GeometryEditor::default();
        let view = ViewState::identity();
        for tool in [Tool::Waypoint, Tool::Keepout, Tool::Select] {
            click(&mut editor, &mut model, &view, tool, 50.0, 50.0);
        }
        assert!(model.waypoints().is_empty());
        assert!(model.zones().is_empty());
        assert_eq!(editor.state(), EditorState::Idle);
    }

    #[test]
    fn every_waypoint_click_appends() {
        let mut model = model_with_map();
        let mut editor = GeometryEditor::default();
        let view = ViewState::identity();
        click(&mut editor, &mut model, &view, Tool::Waypoint, 10.0, 10.0);
        click(&mut editor, &mut model, &view, Tool::Waypoint, 90.0, 10.0);
        click(&mut editor, &mut model, &view, Tool::Waypoint, 90.0, 90.0);
        assert_eq!(model.waypoints().len(), 3);
        assert_eq!(editor.state(), EditorState::Idle);
        assert!(model.waypoints()[1].x > model.waypoints()[0].x);
    }

    #[test]
    fn keepout_clicks_build_then_double_click_completes() {
        let mut model = model_with_map();
        let mut editor = GeometryEditor::default();
        let view = ViewState::identity();
        click(&mut editor, &mut model, &view, Tool::Keepout, 10.0, 10.0);
        let zone = match editor.state() {
            EditorState::BuildingZone(zone) => zone,
            other => panic!("expected zone build, got {other:?}"),
        };
        click(&mut editor, &mut model, &view, Tool::Keepout, 60.0, 10.0);
        click(&mut editor, &mut model, &view, Tool::Keepout, 60.0, 60.0);
        // Second press of the double-click, a pixel off.
        click(&mut editor, &mut model, &view, Tool::Keepout, 61.0, 59.0);
        editor.handle_pointer(
            &mut model,
            &view,
            Tool::Keepout,
            PointerEvent::double_click(CanvasPos::new(60.0, 60.0)),
        );
        let zone = model.zone(zone).unwrap();
        assert!(zone.completed);
        assert_eq!(zone.points.len(), 3);
        assert_eq!(editor.state(), EditorState::Idle);

        // Next click starts a fresh zone.
        click(&mut editor, &mut model, &view, Tool::Keepout, 200.0, 200.0);
        assert_eq!(model.zones().len(), 2);
    }

    #[test]
    fn close_keepout_clicks_at_high_zoom_each_add_a_vertex() {
        let mut model = model_with_map();
        let mut editor = GeometryEditor::default();
        // 40 canvas pixels per raster cell.
        let view = ViewState::new(0.0, 0.0, 40.0);
        click(&mut editor, &mut model, &view, Tool::Keepout, 4000.0, 4000.0);
        click(&mut editor, &mut model, &view, Tool::Keepout, 4030.0, 4000.0);
        click(&mut editor, &mut model, &view, Tool::Keepout, 4030.0, 4030.0);
        let zone = editor.active_zone().unwrap();
        assert_eq!(model.zone(zone).unwrap().points.len(), 3);
    }

    #[test]
    fn jittered_double_click_adds_no_vertex_when_zoomed_out() {
        let mut model = model_with_map();
        let mut editor = GeometryEditor::default();
        let view = ViewState::new(0.0, 0.0, 0.25);
        click(&mut editor, &mut model, &view, Tool::Keepout, 10.0, 10.0);
        click(&mut editor, &mut model, &view, Tool::Keepout, 60.0, 10.0);
        click(&mut editor, &mut model, &view, Tool::Keepout, 60.0, 60.0);
        // Second press lands 2px away, several raster cells off at this zoom.
        click(&mut editor, &mut model, &view, Tool::Keepout, 62.0, 60.0);
        let zone = editor.active_zone().unwrap();
        editor.handle_pointer(
            &mut model,
            &view,
            Tool::Keepout,
            PointerEvent::double_click(CanvasPos::new(62.0, 60.0)),
        );
        let zone = model.zone(zone).unwrap();
        assert!(zone.completed);
        assert_eq!(zone.points.len(), 3);
    }

    #[test]
    fn double_click_without_active_zone_is_noop() {
        let mut model = model_with_map();
        let mut editor = GeometryEditor::default();
        let view = ViewState::identity();
        let changed = editor.handle_pointer(
            &mut model,
            &view,
            Tool::Keepout,
            PointerEvent::double_click(CanvasPos::new(5.0, 5.0)),
        );
        assert!(!changed);
        assert!(model.zones().is_empty());
    }

    #[test]
    fn waypoints_win_hit_test_ties() {
        let mut model = model_with_map();
        let view = ViewState::identity();
        let mut editor = GeometryEditor::default();
        click(&mut editor, &mut model, &view, Tool::Keepout, 100.0, 100.0);
        click(&mut editor, &mut model, &view, Tool::Waypoint, 102.0, 100.0);
        let mapper = CoordinateMapper::new(model.map(), &view);
        let hit = hit_test(&model, &mapper, CanvasPos::new(101.0, 100.0), editor.config());
        assert!(matches!(hit, Some(PointRef::Waypoint(_))));
    }

    #[test]
    fn zone_vertices_use_smaller_radius() {
        let mut model = model_with_map();
        let view = ViewState::identity();
        let mut editor = GeometryEditor::default();
        click(&mut editor, &mut model, &view, Tool::Keepout, 100.0, 100.0);
        let mapper = CoordinateMapper::new(model.map(), &view);
        let config = EditorConfig::default();
        assert!(hit_test(&model, &mapper, CanvasPos::new(107.0, 100.0), &config).is_some());
        assert!(hit_test(&model, &mapper, CanvasPos::new(110.0, 100.0), &config).is_none());
    }

    #[test]
    fn drag_preserves_grab_offset() {
        let mut model = model_with_map();
        let view = ViewState::new(0.0, 0.0, 2.0);
        let mut editor = GeometryEditor::default();
        click(&mut editor, &mut model, &view, Tool::Waypoint, 200.0, 200.0);
        let before = model.waypoints()[0].pos();

        // Grab 5px right and 3px below the drawn marker.
        let marker = CoordinateMapper::new(model.map(), &view).world_to_screen(before);
        let grab = CanvasPos::new(marker.x + 5.0, marker.y + 3.0);
        assert!(editor.handle_pointer(&mut model, &view, Tool::Select, PointerEvent::down(grab)));
        assert!(matches!(editor.state(), EditorState::Dragging(_)));

        let (dx, dy) = (40.0, -24.0);
        editor.handle_pointer(
            &mut model,
            &view,
            Tool::Select,
            PointerEvent::moved(CanvasPos::new(grab.x + dx / 2.0, grab.y + dy / 2.0)),
        );
        editor.handle_pointer(
            &mut model,
            &view,
            Tool::Select,
            PointerEvent::moved(CanvasPos::new(grab.x + dx, grab.y + dy)),
        );
        editor.handle_pointer(&mut model, &view, Tool::Select, PointerEvent::up(grab));

        let after = model.waypoints()[0].pos();
        // Canvas Y grows down, world Y grows up.
        assert_abs_diff_eq!(after.x - before.x, dx / 2.0 * 0.05, epsilon = 1e-9);
        assert_abs_diff_eq!(after.y - before.y, -dy / 2.0 * 0.05, epsilon = 1e-9);
        assert_eq!(editor.state(), EditorState::Idle);
        assert!(editor.selection().is_some());
    }

    #[test]
    fn leave_ends_drag() {
        let mut model = model_with_map();
        let view = ViewState::identity();
        let mut editor = GeometryEditor::default();
        click(&mut editor, &mut model, &view, Tool::Waypoint, 50.0, 50.0);
        editor.handle_pointer(&mut model, &view, Tool::Select, PointerEvent::down(CanvasPos::new(50.0, 50.0)));
        editor.handle_pointer(&mut model, &view, Tool::Select, PointerEvent::moved(CanvasPos::new(60.0, 50.0)));
        editor.handle_pointer(&mut model, &view, Tool::Select, PointerEvent::leave(CanvasPos::new(-1.0, 50.0)));
        assert_eq!(editor.state(), EditorState::Idle);
        let pos = model.waypoints()[0].pos();
        editor.handle_pointer(&mut model, &view, Tool::Select, PointerEvent::moved(CanvasPos::new(90.0, 90.0)));
        assert_eq!(model.waypoints()[0].pos(), pos);
    }

    #[test]
    fn dragging_deleted_point_is_noop() {
        let mut model = model_with_map();
        let view = ViewState::identity();
        let mut editor = GeometryEditor::default();
        click(&mut editor, &mut model, &view, Tool::Waypoint, 50.0, 50.0);
        editor.handle_pointer(&mut model, &view, Tool::Select, PointerEvent::down(CanvasPos::new(50.0, 50.0)));
        let id = model.waypoints()[0].id;
        model.remove_waypoint(id);
        let changed = editor.handle_pointer(&mut model, &view, Tool::Select, PointerEvent::moved(CanvasPos::new(70.0, 50.0)));
        assert!(!changed);
        assert!(model.waypoints().is_empty());
        assert_eq!(editor.state(), EditorState::Idle);
        assert_eq!(editor.selection(), None);
    }

    #[test]
    fn delete_removes_selected_waypoint_only() {
        let mut model = model_with_map();
        let view = ViewState::identity();
        let mut editor = GeometryEditor::default();
        click(&mut editor, &mut model, &view, Tool::Waypoint, 50.0, 50.0);
        click(&mut editor, &mut model, &view, Tool::Keepout, 150.0, 150.0);
        click(&mut editor, &mut model, &view, Tool::Select, 150.0, 150.0);
        assert!(matches!(editor.selection(), Some(PointRef::ZoneVertex { .. })));
        assert!(!editor.handle_key(&mut model, EditKey::Delete));
        assert_eq!(model.zones()[0].points.len(), 1);

        click(&mut editor, &mut model, &view, Tool::Select, 50.0, 50.0);
        assert!(editor.handle_key(&mut model, EditKey::Backspace));
        assert!(model.waypoints().is_empty());
        assert_eq!(editor.selection(), None);
    }

    #[test]
    fn clicking_empty_space_clears_selection() {
        let mut model = model_with_map();
        let view = ViewState::identity();
        let mut editor = GeometryEditor::default();
        click(&mut editor, &mut model, &view, Tool::Waypoint, 50.0, 50.0);
        click(&mut editor, &mut model, &view, Tool::Select, 50.0, 50.0);
        assert!(editor.selection().is_some());
        click(&mut editor, &mut model, &view, Tool::Select, 300.0, 300.0);
        assert_eq!(editor.selection(), None);
    }

    #[test]
    fn escape_abandons_zone_under_construction() {
        let mut model = model_with_map();
        let view = ViewState::identity();
        let mut editor = GeometryEditor::default();
        click(&mut editor, &mut model, &view, Tool::Keepout, 10.0, 10.0);
        click(&mut editor, &mut model, &view, Tool::Keepout, 40.0, 10.0);
        assert!(editor.handle_key(&mut model, EditKey::Escape));
        assert!(model.zones().is_empty());
        assert_eq!(editor.state(), EditorState::Idle);
    }

    #[test]
    fn cleared_model_releases_active_zone() {
        let mut model = model_with_map();
        let view = ViewState::identity();
        let mut editor = GeometryEditor::default();
        click(&mut editor, &mut model, &view, Tool::Keepout, 10.0, 10.0);
        model.clear_all();
        click(&mut editor, &mut model, &view, Tool::Keepout, 40.0, 40.0);
        assert_eq!(model.zones().len(), 1);
        assert_eq!(model.zones()[0].points.len(), 1);
    }
}
