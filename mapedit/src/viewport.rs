//! One map viewport: its own pan/zoom plus an editor, over the shared
//! model.

use tracing::debug;

use crate::config::{EditorConfig, ViewConfig};
use crate::coords::CoordinateMapper;
use crate::editor::{EditKey, GeometryEditor, PointerEvent, PointerKind, Tool};
use crate::error::RenderError;
use crate::geometry::{CanvasPos, WorldPos};
use crate::model::MapModel;
use crate::pose::RobotPose;
use crate::render::{render_overlay, RenderOptions, RobotMarker, Surface};
use crate::view::ViewTransform;

#[derive(Debug, Clone)]
pub struct Viewport {
    view: ViewTransform,
    editor: GeometryEditor,
    editable: bool,
    tool: Tool,
    robot_marker: RobotMarker,
}

impl Viewport {
    /// Read-only viewport: every pointer drag pans.
    pub fn viewer(view: &ViewConfig) -> Self {
        Self {
            view: ViewTransform::from_config(view),
            editor: GeometryEditor::default(),
            editable: false,
            tool: Tool::Pan,
            robot_marker: RobotMarker::HeadingLine,
        }
    }

    pub fn editor(view: &ViewConfig, editor: EditorConfig) -> Self {
        Self {
            view: ViewTransform::from_config(view),
            editor: GeometryEditor::new(editor),
            editable: true,
            tool: Tool::Select,
            robot_marker: RobotMarker::Triangle,
        }
    }

    pub fn view(&self) -> &ViewTransform {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut ViewTransform {
        &mut self.view
    }

    pub fn geometry_editor(&self) -> &GeometryEditor {
        &self.editor
    }

    pub fn is_editable(&self) -> bool {
        self.editable
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    /// Switching tools ends any drag in progress. A zone under
    /// construction stays active.
    pub fn set_tool(&mut self, tool: Tool) {
        if tool == self.tool {
            return;
        }
        debug!(from = %self.tool, to = %tool, "tool changed");
        self.editor.cancel_drag();
        self.view.end_drag();
        self.tool = tool;
    }

    fn pans(&self) -> bool {
        !self.editable || self.tool == Tool::Pan
    }

    /// Primary-button pointer input. Returns `true` if a redraw is needed.
    pub fn handle_pointer(&mut self, model: &mut MapModel, event: PointerEvent) -> bool {
        if self.pans() {
            return self.pan_gesture(event);
        }
        self.editor
            .handle_pointer(model, self.view.state(), self.tool, event)
    }

    /// Pointer input that pans regardless of the tool (secondary or
    /// middle button drags).
    pub fn pan_gesture(&mut self, event: PointerEvent) -> bool {
        match event.kind {
            PointerKind::Down => {
                self.view.begin_drag(event.pos);
                false
            }
            PointerKind::Move => self.view.drag_to(event.pos),
            PointerKind::Up | PointerKind::Leave => {
                self.view.end_drag();
                false
            }
        }
    }

    pub fn handle_wheel(&mut self, wheel_delta: f64, cursor: Option<CanvasPos>) -> bool {
        self.view.handle_wheel(wheel_delta, cursor)
    }

    pub fn handle_key(&mut self, model: &mut MapModel, key: EditKey) -> bool {
        if !self.editable {
            return false;
        }
        self.editor.handle_key(model, key)
    }

    /// Drops editor state after the model was cleared or replaced.
    pub fn reset_editor(&mut self) {
        self.editor.reset();
    }

    pub fn set_viewport_size(&mut self, width: f64, height: f64) {
        self.view.set_viewport_size(width, height);
    }

    /// Fits the current map, if any, into the viewport.
    pub fn fit(&mut self, model: &MapModel) -> bool {
        match model.map() {
            Some(map) => self.view.fit_map(map.width, map.height),
            None => false,
        }
    }

    /// Centres the view on a world position. Needs a map.
    pub fn follow(&mut self, model: &MapModel, world: WorldPos) -> bool {
        let mapper = CoordinateMapper::new(model.map(), self.view.state());
        if !mapper.has_map() {
            return false;
        }
        let px = mapper.world_to_map_pixel(world);
        self.view.center_on(px);
        true
    }

    pub fn world_to_screen(&self, model: &MapModel, world: WorldPos) -> CanvasPos {
        CoordinateMapper::new(model.map(), self.view.state()).world_to_screen(world)
    }

    pub fn screen_to_world(&self, model: &MapModel, pos: CanvasPos) -> WorldPos {
        CoordinateMapper::new(model.map(), self.view.state()).screen_to_world(pos)
    }

    pub fn render<S: Surface + ?Sized>(
        &self,
        surface: &mut S,
        model: &MapModel,
        pose: Option<&RobotPose>,
    ) -> Result<(), RenderError> {
        let options = RenderOptions {
            editable: self.editable,
            selection: self.editor.selection(),
            placeholder: !self.editable,
            robot_marker: self.robot_marker,
        };
        render_overlay(surface, model, self.view.state(), pose, &options)
    }
}
