//! Pan/zoom state for one map viewport.

use serde::{Deserialize, Serialize};

use crate::config::ViewConfig;
use crate::geometry::{CanvasPos, MapPixel};

/// Smallest scale the transform will ever hold, whatever the configured
/// bounds say. Keeps the canvas → raster inversion defined.
const MIN_POSITIVE_SCALE: f64 = 1e-6;

/// Affine map-raster → canvas transform: `canvas = pan + pixel * scale`.
///
/// Scale is uniform in practice but stored per axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewState {
    pan_offset_x: f64,
    pan_offset_y: f64,
    scale_x: f64,
    scale_y: f64,
}

impl ViewState {
    /// A non-finite or non-positive scale is replaced so the state is
    /// always invertible.
    pub fn new(pan_offset_x: f64, pan_offset_y: f64, scale: f64) -> Self {
        let scale = sanitize_scale(scale);
        Self {
            pan_offset_x,
            pan_offset_y,
            scale_x: scale,
            scale_y: scale,
        }
    }

    pub fn identity() -> Self {
        Self::new(0.0, 0.0, 1.0)
    }

    pub fn pan_offset_x(&self) -> f64 {
        self.pan_offset_x
    }

    pub fn pan_offset_y(&self) -> f64 {
        self.pan_offset_y
    }

    pub fn scale_x(&self) -> f64 {
        self.scale_x
    }

    pub fn scale_y(&self) -> f64 {
        self.scale_y
    }

    pub fn scale(&self) -> f64 {
        self.scale_x
    }
}

impl Default for ViewState {
    fn default() -> Self {
        Self::identity()
    }
}

fn sanitize_scale(scale: f64) -> f64 {
    if scale.is_finite() {
        scale.max(MIN_POSITIVE_SCALE)
    } else {
        1.0
    }
}

/// Point the zoom keeps fixed on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoomAnchor {
    #[default]
    Center,
    Cursor,
}

/// Inclusive `[min, max]` zoom range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleBounds {
    min: f64,
    max: f64,
}

impl ScaleBounds {
    /// A non-finite bound collapses onto the other one; the result is then
    /// lifted above zero and ordered, so `min <= max` always holds.
    pub fn new(min: f64, max: f64) -> Self {
        let (min, max) = match (min.is_finite(), max.is_finite()) {
            (true, true) => (min, max),
            (true, false) => (min, min),
            (false, true) => (max, max),
            (false, false) => (1.0, 1.0),
        };
        let (min, max) = (sanitize_scale(min), sanitize_scale(max));
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn clamp(&self, scale: f64) -> f64 {
        if scale.is_nan() {
            return self.min;
        }
        scale.clamp(self.min, self.max)
    }
}

/// Owns the [`ViewState`] of one viewport and the gestures that move it.
///
/// Scale bounds are enforced here, on every mutation, so readers never see
/// an out-of-range or degenerate scale.
#[derive(Debug, Clone)]
pub struct ViewTransform {
    state: ViewState,
    bounds: ScaleBounds,
    sensitivity: f64,
    anchor: ZoomAnchor,
    viewport: (f64, f64),
    drag_last: Option<CanvasPos>,
}

impl ViewTransform {
    pub fn new(bounds: ScaleBounds, initial_scale: f64) -> Self {
        Self {
            state: ViewState::new(0.0, 0.0, bounds.clamp(initial_scale)),
            bounds,
            sensitivity: 0.01,
            anchor: ZoomAnchor::Center,
            viewport: (0.0, 0.0),
            drag_last: None,
        }
    }

    pub fn from_config(config: &ViewConfig) -> Self {
        let mut view = Self::new(
            ScaleBounds::new(config.min_scale, config.max_scale),
            config.initial_scale,
        );
        view.sensitivity = config.zoom_sensitivity;
        view.anchor = config.zoom_anchor;
        view
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn bounds(&self) -> ScaleBounds {
        self.bounds
    }

    pub fn anchor(&self) -> ZoomAnchor {
        self.anchor
    }

    pub fn viewport_size(&self) -> (f64, f64) {
        self.viewport
    }

    /// Hosts call this whenever the drawing surface is resized.
    pub fn set_viewport_size(&mut self, width: f64, height: f64) {
        self.viewport = (width.max(0.0), height.max(0.0));
    }

    fn viewport_center(&self) -> CanvasPos {
        CanvasPos::new(self.viewport.0 / 2.0, self.viewport.1 / 2.0)
    }

    /// Sets the scale, keeping `anchor` over the same raster position.
    fn rescale_about(&mut self, anchor: CanvasPos, new_scale: f64) -> bool {
        let new_scale = self.bounds.clamp(new_scale);
        let old = self.state;
        if new_scale == old.scale_x && new_scale == old.scale_y {
            return false;
        }
        let content_x = (anchor.x - old.pan_offset_x) / old.scale_x;
        let content_y = (anchor.y - old.pan_offset_y) / old.scale_y;
        self.state = ViewState {
            pan_offset_x: anchor.x - content_x * new_scale,
            pan_offset_y: anchor.y - content_y * new_scale,
            scale_x: new_scale,
            scale_y: new_scale,
        };
        true
    }

    /// `scale - wheel_delta * sensitivity`, clamped, about the viewport
    /// centre. Positive deltas (wheel down) zoom out.
    pub fn zoom_by(&mut self, wheel_delta: f64, sensitivity: f64) -> bool {
        let target = self.state.scale_x - wheel_delta * sensitivity;
        self.rescale_about(self.viewport_center(), target)
    }

    /// Like [`ViewTransform::zoom_by`] but keeps `cursor` fixed instead.
    pub fn zoom_at(&mut self, cursor: CanvasPos, wheel_delta: f64, sensitivity: f64) -> bool {
        let target = self.state.scale_x - wheel_delta * sensitivity;
        self.rescale_about(cursor, target)
    }

    /// Wheel entry point: uses the configured sensitivity and anchor.
    pub fn handle_wheel(&mut self, wheel_delta: f64, cursor: Option<CanvasPos>) -> bool {
        match (self.anchor, cursor) {
            (ZoomAnchor::Cursor, Some(cursor)) => {
                self.zoom_at(cursor, wheel_delta, self.sensitivity)
            }
            _ => self.zoom_by(wheel_delta, self.sensitivity),
        }
    }

    /// No clamping: the map may be panned fully out of view.
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.state.pan_offset_x += dx;
        self.state.pan_offset_y += dy;
    }

    pub fn is_dragging(&self) -> bool {
        self.drag_last.is_some()
    }

    pub fn begin_drag(&mut self, pos: CanvasPos) {
        self.drag_last = Some(pos);
    }

    /// Pans by the movement since the previous drag position.
    pub fn drag_to(&mut self, pos: CanvasPos) -> bool {
        let Some(last) = self.drag_last else {
            return false;
        };
        let delta = pos - last;
        self.pan_by(delta.x, delta.y);
        self.drag_last = Some(pos);
        delta.x != 0.0 || delta.y != 0.0
    }

    pub fn end_drag(&mut self) {
        self.drag_last = None;
    }

    /// Scales a `width × height` raster to fit the viewport, preserving
    /// aspect ratio, and centres it.
    pub fn fit_map(&mut self, width: u32, height: u32) -> bool {
        let (vw, vh) = self.viewport;
        if width == 0 || height == 0 || vw <= 0.0 || vh <= 0.0 {
            return false;
        }
        let scale = self
            .bounds
            .clamp((vw / width as f64).min(vh / height as f64));
        self.state = ViewState {
            pan_offset_x: (vw - width as f64 * scale) / 2.0,
            pan_offset_y: (vh - height as f64 * scale) / 2.0,
            scale_x: scale,
            scale_y: scale,
        };
        true
    }

    /// Pans so `px` sits at the viewport centre.
    pub fn center_on(&mut self, px: MapPixel) {
        let center = self.viewport_center();
        self.state.pan_offset_x = center.x - px.x * self.state.scale_x;
        self.state.pan_offset_y = center.y - px.y * self.state.scale_y;
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    fn minimap() -> ViewTransform {
        let mut view = ViewTransform::new(ScaleBounds::new(5.0, 30.0), 10.0);
        view.set_viewport_size(200.0, 200.0);
        view
    }

    #[test]
    fn zoom_never_leaves_bounds() {
        let mut view = minimap();
        for delta in [1e6, -1e6, 250.0, -3.0, 1e9, f64::MAX, -f64::MAX] {
            view.zoom_by(delta, 0.05);
            let s = view.state().scale();
            assert!((5.0..=30.0).contains(&s), "scale {s} escaped bounds");
            assert_eq!(view.state().scale_x(), view.state().scale_y());
        }
    }

    #[test]
    fn zoom_keeps_viewport_center_fixed() {
        let mut view = minimap();
        view.pan_by(13.0, -7.0);
        let center = CanvasPos::new(100.0, 100.0);
        let before = crate::coords::canvas_to_map_pixel(center, view.state());
        assert!(view.zoom_by(-100.0, 0.1));
        let after = crate::coords::canvas_to_map_pixel(center, view.state());
        assert_abs_diff_eq!(before.x, after.x, epsilon = 1e-9);
        assert_abs_diff_eq!(before.y, after.y, epsilon = 1e-9);
    }

    #[test]
    fn cursor_zoom_keeps_cursor_fixed() {
        let mut view = minimap();
        let cursor = CanvasPos::new(30.0, 170.0);
        let before = crate::coords::canvas_to_map_pixel(cursor, view.state());
        assert!(view.zoom_at(cursor, -50.0, 0.1));
        let after = crate::coords::canvas_to_map_pixel(cursor, view.state());
        assert_abs_diff_eq!(before.x, after.x, epsilon = 1e-9);
        assert_abs_diff_eq!(before.y, after.y, epsilon = 1e-9);
    }

    #[test]
    fn zoom_at_bound_reports_no_change() {
        let mut view = minimap();
        view.zoom_by(-1e6, 1.0);
        assert!(!view.zoom_by(-10.0, 1.0));
    }

    #[test]
    fn drag_pans_by_incremental_deltas() {
        let mut view = minimap();
        let start = *view.state();
        view.begin_drag(CanvasPos::new(10.0, 10.0));
        view.drag_to(CanvasPos::new(15.0, 12.0));
        view.drag_to(CanvasPos::new(20.0, 4.0));
        view.end_drag();
        assert!(!view.drag_to(CanvasPos::new(500.0, 500.0)));
        assert_abs_diff_eq!(view.state().pan_offset_x() - start.pan_offset_x(), 10.0);
        assert_abs_diff_eq!(view.state().pan_offset_y() - start.pan_offset_y(), -6.0);
    }

    #[test]
    fn independent_transforms_do_not_interact() {
        let mut a = minimap();
        let b = minimap();
        a.pan_by(40.0, 40.0);
        a.zoom_by(-100.0, 0.1);
        assert_eq!(*b.state(), ViewState::new(0.0, 0.0, 10.0));
    }

    #[test]
    fn fit_map_letterboxes() {
        let mut view = ViewTransform::new(ScaleBounds::new(0.1, 10.0), 1.0);
        view.set_viewport_size(800.0, 400.0);
        assert!(view.fit_map(400, 400));
        assert_abs_diff_eq!(view.state().scale(), 1.0);
        assert_abs_diff_eq!(view.state().pan_offset_x(), 200.0);
        assert_abs_diff_eq!(view.state().pan_offset_y(), 0.0);
    }

    #[test]
    fn center_on_puts_pixel_mid_viewport() {
        let mut view = minimap();
        view.center_on(MapPixel::new(200.0, 150.0));
        let c = crate::coords::map_pixel_to_canvas(MapPixel::new(200.0, 150.0), view.state());
        assert_abs_diff_eq!(c.x, 100.0);
        assert_abs_diff_eq!(c.y, 100.0);
    }

    #[test]
    fn degenerate_scales_are_sanitized() {
        assert!(ViewState::new(0.0, 0.0, 0.0).scale() > 0.0);
        assert!(ViewState::new(0.0, 0.0, -4.0).scale() > 0.0);
        assert_eq!(ViewState::new(0.0, 0.0, f64::NAN).scale(), 1.0);
        let bounds = ScaleBounds::new(30.0, 5.0);
        assert_eq!((bounds.min(), bounds.max()), (5.0, 30.0));
    }

    #[test]
    fn non_finite_bounds_stay_ordered() {
        for (min, max) in [
            (5.0, f64::INFINITY),
            (f64::NAN, 30.0),
            (f64::NEG_INFINITY, 0.5),
            (f64::NAN, f64::NAN),
            (-3.0, 2.0),
        ] {
            let bounds = ScaleBounds::new(min, max);
            assert!(bounds.min() <= bounds.max(), "{min}..{max}");
            assert!(bounds.min() > 0.0);
            let s = bounds.clamp(12.0);
            assert!((bounds.min()..=bounds.max()).contains(&s));
        }
        assert_eq!(ScaleBounds::new(5.0, f64::INFINITY).clamp(10.0), 5.0);
        assert_eq!(ScaleBounds::new(f64::NAN, 30.0).clamp(10.0), 30.0);

        let view = ViewTransform::new(ScaleBounds::new(5.0, f64::INFINITY), 10.0);
        assert_eq!(view.state().scale(), 5.0);
    }
}
