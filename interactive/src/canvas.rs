//! egui glue for the map viewports: a [`Surface`] over an egui painter,
//! the occupancy raster texture, and pointer/wheel translation.

use eframe::{
    egui::{self, Align2, FontId, PointerButton, Pos2, Rect, Response, Sense, TextureOptions},
    epaint::{Color32, ColorImage, Shape, TextureHandle},
};
use mapedit::{
    coords::map_pixel_to_canvas,
    render::{occupancy_rgba, Color, Dash, Stroke, Surface},
    CanvasPos, EditKey, MapModel, MapPixel, PointerEvent, PointerKind, RobotPose, Viewport,
};
use tracing::error;

fn color32(c: Color) -> Color32 {
    Color32::from_rgba_unmultiplied(c.r, c.g, c.b, c.a)
}

fn stroke32(s: Stroke) -> egui::Stroke {
    egui::Stroke::new(s.width as f32, color32(s.color))
}

/// Paints into one allocated rect. Canvas coordinates are relative to the
/// rect's top-left corner.
pub struct EguiSurface<'a> {
    painter: &'a egui::Painter,
    rect: Rect,
}

impl<'a> EguiSurface<'a> {
    pub fn new(painter: &'a egui::Painter, rect: Rect) -> Self {
        Self { painter, rect }
    }

    fn pos(&self, p: CanvasPos) -> Pos2 {
        self.rect.min + egui::vec2(p.x as f32, p.y as f32)
    }

    fn path(&self, points: &[CanvasPos]) -> Vec<Pos2> {
        points.iter().map(|p| self.pos(*p)).collect()
    }
}

impl Surface for EguiSurface<'_> {
    fn size(&self) -> Option<(f64, f64)> {
        let size = self.rect.size();
        (size.x > 0.0 && size.y > 0.0).then(|| (size.x as f64, size.y as f64))
    }

    /// egui starts every frame blank; the raster is painted before the
    /// overlay, so there is nothing to erase.
    fn clear(&mut self) {}

    // Fill is convex-only in egui; concave zones still get a correct outline.
    fn polygon(&mut self, points: &[CanvasPos], fill: Option<Color>, stroke: Stroke) {
        let path = self.path(points);
        match fill {
            Some(fill) => {
                self.painter
                    .add(Shape::convex_polygon(path, color32(fill), stroke32(stroke)));
            }
            None => {
                self.painter.add(Shape::closed_line(path, stroke32(stroke)));
            }
        }
    }

    fn polyline(&mut self, points: &[CanvasPos], stroke: Stroke, dash: Dash) {
        let path = self.path(points);
        match dash {
            Dash::Solid => {
                self.painter.add(Shape::line(path, stroke32(stroke)));
            }
            Dash::Dashed { on, off } => {
                self.painter.extend(Shape::dashed_line(
                    &path,
                    stroke32(stroke),
                    on as f32,
                    off as f32,
                ));
            }
        }
    }

    fn circle(&mut self, center: CanvasPos, radius: f64, fill: Option<Color>, stroke: Option<Stroke>) {
        self.painter.circle(
            self.pos(center),
            radius as f32,
            fill.map(color32).unwrap_or(Color32::TRANSPARENT),
            stroke.map(stroke32).unwrap_or(egui::Stroke::NONE),
        );
    }

    fn text(&mut self, pos: CanvasPos, text: &str, size: f64, color: Color) {
        self.painter.text(
            self.pos(pos),
            Align2::CENTER_CENTER,
            text,
            FontId::proportional(size as f32),
            color32(color),
        );
    }
}

/// The occupancy raster as a GPU texture, rebuilt when the map changes.
#[derive(Default)]
pub struct MapTexture {
    texture: Option<(u64, TextureHandle)>,
}

impl MapTexture {
    fn get(&mut self, ctx: &egui::Context, model: &MapModel) -> Option<&TextureHandle> {
        let map = model.map()?;
        let generation = model.map_generation();
        let stale = !matches!(&self.texture, Some((g, _)) if *g == generation);
        if stale {
            let image = ColorImage::from_rgba_unmultiplied(
                [map.width as usize, map.height as usize],
                &occupancy_rgba(map),
            );
            let handle = ctx.load_texture("occupancy_grid", image, TextureOptions::NEAREST);
            self.texture = Some((generation, handle));
        }
        self.texture.as_ref().map(|(_, h)| h)
    }
}

/// Per-canvas pointer bookkeeping between frames.
#[derive(Default)]
pub struct MapCanvas {
    texture: MapTexture,
    /// Primary button went down on this canvas and has not been released.
    primary_captured: bool,
    pan_captured: bool,
    /// A fresh map needs fitting once the canvas size is known.
    pub needs_fit: bool,
    /// Last pointer position over the canvas, for coordinate readouts.
    pub hover: Option<CanvasPos>,
}

impl MapCanvas {
    /// Allocates `size`, feeds input to `viewport`, and draws raster and
    /// overlay.
    pub fn show(
        &mut self,
        ui: &mut egui::Ui,
        size: egui::Vec2,
        viewport: &mut Viewport,
        model: &mut MapModel,
        pose: Option<&RobotPose>,
    ) -> Response {
        let (response, painter) = ui.allocate_painter(size, Sense::click_and_drag());
        let rect = response.rect;
        viewport.set_viewport_size(rect.width() as f64, rect.height() as f64);
        if self.needs_fit && viewport.fit(model) {
            self.needs_fit = false;
        }

        self.handle_input(ui, &response, viewport, model);

        painter.rect_filled(rect, 0.0, Color32::from_rgb(0x0f, 0x17, 0x2a));
        if let Some(map) = model.map() {
            let (w, h) = (map.width as f64, map.height as f64);
            let view = *viewport.view().state();
            if let Some(texture) = self.texture.get(ui.ctx(), model) {
                let min = map_pixel_to_canvas(MapPixel::new(0.0, 0.0), &view);
                let max = map_pixel_to_canvas(MapPixel::new(w, h), &view);
                let map_rect = Rect::from_min_max(
                    rect.min + egui::vec2(min.x as f32, min.y as f32),
                    rect.min + egui::vec2(max.x as f32, max.y as f32),
                );
                painter.image(
                    texture.id(),
                    map_rect,
                    Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                    Color32::WHITE,
                );
            }
        }

        let mut surface = EguiSurface::new(&painter, rect);
        if let Err(err) = viewport.render(&mut surface, model, pose) {
            error!(error = %err, "overlay render failed");
        }
        response
    }

    fn handle_input(
        &mut self,
        ui: &egui::Ui,
        response: &Response,
        viewport: &mut Viewport,
        model: &mut MapModel,
    ) {
        let rect = response.rect;
        let to_canvas = |p: Pos2| CanvasPos::new((p.x - rect.min.x) as f64, (p.y - rect.min.y) as f64);

        let (pointer, primary_down, primary_up, pan_down, pan_up, moving, scroll) = ui.input(|i| {
            (
                i.pointer.interact_pos(),
                i.pointer.primary_pressed(),
                i.pointer.primary_released(),
                i.pointer.button_pressed(PointerButton::Secondary)
                    || i.pointer.button_pressed(PointerButton::Middle),
                i.pointer.button_released(PointerButton::Secondary)
                    || i.pointer.button_released(PointerButton::Middle),
                i.pointer.is_moving(),
                i.scroll_delta,
            )
        });
        let Some(pointer) = pointer else {
            self.hover = None;
            return;
        };
        let pos = to_canvas(pointer);
        let inside = rect.contains(pointer);
        self.hover = inside.then_some(pos);

        if response.hovered() && primary_down {
            self.primary_captured = true;
            viewport.handle_pointer(model, PointerEvent::down(pos));
        }
        if response.hovered() && pan_down {
            self.pan_captured = true;
            viewport.pan_gesture(PointerEvent::down(pos));
        }

        if moving && (inside || self.primary_captured) {
            viewport.handle_pointer(model, PointerEvent::moved(pos));
        }
        if moving && self.pan_captured {
            viewport.pan_gesture(PointerEvent::moved(pos));
        }

        if self.primary_captured && (primary_up || !inside) {
            let kind = if primary_up {
                PointerKind::Up
            } else {
                PointerKind::Leave
            };
            self.primary_captured = false;
            viewport.handle_pointer(model, PointerEvent::new(kind, pos));
        }
        if self.pan_captured && pan_up {
            self.pan_captured = false;
            viewport.pan_gesture(PointerEvent::up(pos));
        }

        if response.double_clicked() {
            viewport.handle_pointer(model, PointerEvent::double_click(pos));
        }

        // egui reports wheel-up as positive; the view expects wheel-down
        // positive.
        if response.hovered() && scroll.y != 0.0 {
            viewport.handle_wheel(-scroll.y as f64, Some(pos));
        }

        if viewport.is_editable() && !ui.ctx().wants_keyboard_input() {
            let keys = [
                (egui::Key::Delete, EditKey::Delete),
                (egui::Key::Backspace, EditKey::Backspace),
                (egui::Key::Escape, EditKey::Escape),
            ];
            for (key, edit_key) in keys {
                if ui.input(|i| i.key_pressed(key)) {
                    viewport.handle_key(model, edit_key);
                }
            }
        }
    }
}
