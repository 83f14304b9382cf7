//! Draws the model overlay onto a host-provided [`Surface`].
//!
//! Rendering only reads the model. Every position goes through
//! [`CoordinateMapper`], so the overlay lines up with the raster under any
//! pan/zoom.

use tracing::trace;

use crate::coords::CoordinateMapper;
use crate::error::RenderError;
use crate::geometry::CanvasPos;
use crate::model::{KeepoutZone, MapInfo, MapModel, PointRef};
use crate::pose::RobotPose;
use crate::view::ViewState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const WAYPOINT: Color = Color::rgb(0x3b, 0x82, 0xf6);
    pub const WAYPOINT_SELECTED: Color = Color::rgb(0x60, 0xa5, 0xfa);
    pub const ZONE_FILL: Color = Color::rgba(255, 0, 0, 77);
    pub const ZONE_STROKE: Color = Color::rgba(255, 0, 0, 204);
    pub const ZONE_VERTEX: Color = Color::rgb(255, 0, 0);
    pub const ZONE_VERTEX_SELECTED: Color = Color::rgb(255, 160, 160);
    pub const ROBOT: Color = Color::rgb(0x3b, 0x82, 0xf6);
    pub const ROBOT_HEADING: Color = Color::rgb(0x1e, 0x40, 0xaf);
    pub const ROBOT_MINI: Color = Color::rgb(0, 255, 0);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    pub width: f64,
    pub color: Color,
}

impl Stroke {
    pub const fn new(width: f64, color: Color) -> Self {
        Self { width, color }
    }
}

/// Line pattern, in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Dash {
    Solid,
    Dashed { on: f64, off: f64 },
}

/// A 2D drawing target in canvas pixels, Y down.
pub trait Surface {
    /// Pixel size of the surface, or `None` if it cannot be drawn on.
    fn size(&self) -> Option<(f64, f64)>;
    fn clear(&mut self);
    /// Closed polygon.
    fn polygon(&mut self, points: &[CanvasPos], fill: Option<Color>, stroke: Stroke);
    /// Open polyline.
    fn polyline(&mut self, points: &[CanvasPos], stroke: Stroke, dash: Dash);
    fn circle(&mut self, center: CanvasPos, radius: f64, fill: Option<Color>, stroke: Option<Stroke>);
    /// Text centred on `pos`.
    fn text(&mut self, pos: CanvasPos, text: &str, size: f64, color: Color);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RobotMarker {
    /// Body circle with a heading triangle.
    #[default]
    Triangle,
    /// Small dot with a heading line, for the mini-map.
    HeadingLine,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderOptions {
    /// Edit mode draws large numbered markers and zone vertices.
    pub editable: bool,
    pub selection: Option<PointRef>,
    /// Draw a neutral robot marker at the viewport centre until a pose
    /// arrives.
    pub placeholder: bool,
    pub robot_marker: RobotMarker,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            editable: true,
            selection: None,
            placeholder: false,
            robot_marker: RobotMarker::Triangle,
        }
    }
}

/// Marker sizes for one display mode.
struct Style {
    waypoint_radius: f64,
    label_size: f64,
    line_width: f64,
    path_dash: Dash,
}

impl Style {
    fn for_mode(editable: bool) -> Self {
        if editable {
            Style {
                waypoint_radius: 12.0,
                label_size: 12.0,
                line_width: 2.0,
                path_dash: Dash::Dashed { on: 5.0, off: 5.0 },
            }
        } else {
            Style {
                waypoint_radius: 3.0,
                label_size: 8.0,
                line_width: 1.0,
                path_dash: Dash::Dashed { on: 2.0, off: 2.0 },
            }
        }
    }
}

const ZONE_VERTEX_RADIUS: f64 = 4.0;

/// Clears `surface` and draws zones, waypoints with their path, and the
/// robot pose.
pub fn render_overlay<S: Surface + ?Sized>(
    surface: &mut S,
    model: &MapModel,
    view: &ViewState,
    pose: Option<&RobotPose>,
    options: &RenderOptions,
) -> Result<(), RenderError> {
    let (width, height) = surface.size().ok_or(RenderError::SurfaceUnavailable)?;
    surface.clear();

    let mapper = CoordinateMapper::new(model.map(), view);
    let style = Style::for_mode(options.editable);

    if mapper.has_map() {
        for zone in model.zones() {
            draw_zone(surface, &mapper, zone, &style, options);
        }
        draw_waypoints(surface, &mapper, model, &style, options);
    }

    match (pose, mapper.has_map()) {
        (Some(pose), true) => {
            let center = mapper.world_to_screen(pose.world_pos());
            draw_robot(surface, center, pose.yaw(), options.robot_marker);
        }
        _ if options.placeholder => {
            let center = CanvasPos::new(width / 2.0, height / 2.0);
            draw_robot(
                surface,
                center,
                std::f64::consts::FRAC_PI_2,
                options.robot_marker,
            );
        }
        _ => {}
    }

    trace!(revision = model.revision(), "overlay rendered");
    Ok(())
}

fn draw_zone<S: Surface + ?Sized>(
    surface: &mut S,
    mapper: &CoordinateMapper<'_>,
    zone: &KeepoutZone,
    style: &Style,
    options: &RenderOptions,
) {
    if zone.points.is_empty() {
        return;
    }
    let points: Vec<CanvasPos> = zone
        .points
        .iter()
        .map(|p| mapper.world_to_screen(p.pos()))
        .collect();
    let stroke = Stroke::new(style.line_width, Color::ZONE_STROKE);

    if zone.is_fillable() {
        surface.polygon(&points, Some(Color::ZONE_FILL), stroke);
    } else if zone.completed && points.len() == 2 {
        surface.polygon(&points, None, stroke);
    } else if points.len() > 1 {
        surface.polyline(&points, stroke, Dash::Solid);
    }

    if !options.editable {
        return;
    }
    for (point, pos) in zone.points.iter().zip(&points) {
        let selected = options.selection
            == Some(PointRef::ZoneVertex {
                zone: zone.id,
                point: point.id,
            });
        let color = if selected {
            Color::ZONE_VERTEX_SELECTED
        } else {
            Color::ZONE_VERTEX
        };
        surface.circle(*pos, ZONE_VERTEX_RADIUS, Some(color), None);
    }
}

fn draw_waypoints<S: Surface + ?Sized>(
    surface: &mut S,
    mapper: &CoordinateMapper<'_>,
    model: &MapModel,
    style: &Style,
    options: &RenderOptions,
) {
    let points: Vec<CanvasPos> = model
        .waypoints()
        .iter()
        .map(|p| mapper.world_to_screen(p.pos()))
        .collect();

    if points.len() > 1 {
        surface.polyline(
            &points,
            Stroke::new(style.line_width, Color::WAYPOINT),
            style.path_dash,
        );
    }

    for (index, (point, pos)) in model.waypoints().iter().zip(&points).enumerate() {
        let selected = options.selection == Some(PointRef::Waypoint(point.id));
        let fill = if selected {
            Color::WAYPOINT_SELECTED
        } else {
            Color::WAYPOINT
        };
        surface.circle(
            *pos,
            style.waypoint_radius,
            Some(fill),
            Some(Stroke::new(style.line_width, Color::WHITE)),
        );
        surface.text(*pos, &(index + 1).to_string(), style.label_size, Color::WHITE);
    }
}

/// `yaw` is in the world frame; canvas Y points down, so the heading's Y
/// component is negated.
fn draw_robot<S: Surface + ?Sized>(surface: &mut S, center: CanvasPos, yaw: f64, marker: RobotMarker) {
    let (sin, cos) = yaw.sin_cos();
    let rotate = |fwd: f64, left: f64| {
        CanvasPos::new(
            center.x + fwd * cos - left * sin,
            center.y - (fwd * sin + left * cos),
        )
    };

    match marker {
        RobotMarker::Triangle => {
            surface.circle(center, 8.0, Some(Color::ROBOT), None);
            let triangle = [rotate(12.0, 0.0), rotate(-6.0, -6.0), rotate(-6.0, 6.0)];
            surface.polygon(
                &triangle,
                Some(Color::ROBOT_HEADING),
                Stroke::new(0.0, Color::ROBOT_HEADING),
            );
            surface.circle(center, 8.0, None, Some(Stroke::new(2.0, Color::WHITE)));
        }
        RobotMarker::HeadingLine => {
            surface.circle(
                center,
                4.0,
                Some(Color::ROBOT_MINI),
                Some(Stroke::new(1.0, Color::WHITE)),
            );
            surface.polyline(
                &[center, rotate(8.0, 0.0)],
                Stroke::new(2.0, Color::ROBOT_MINI),
                Dash::Solid,
            );
        }
    }
}

/// Grey level for one occupancy cell.
pub fn occupancy_shade(value: i8) -> u8 {
    match value {
        v if v < 0 => 128,
        0 => 255,
        v if v >= 100 => 0,
        v => (255 - (v as u16 * 255 / 100)) as u8,
    }
}

/// RGBA bytes for the raster, row-major as stored. Row 0 is the top of
/// the image.
pub fn occupancy_rgba(map: &MapInfo) -> Vec<u8> {
    map.data
        .iter()
        .flat_map(|&cell| {
            let shade = occupancy_shade(cell);
            [shade, shade, shade, 255]
        })
        .collect()
}
