//! World ⇄ map-raster ⇄ canvas conversions.
//!
//! Every component goes through these functions; nothing else re-derives
//! the flip or the pan/zoom algebra.
//!
//! The world → raster stage quantizes to whole cells (a lossy round trip
//! bounded by one cell). The raster ⇄ canvas stage is an exact affine map.

use crate::geometry::{CanvasPos, MapPixel, WorldPos};
use crate::model::MapInfo;
use crate::view::ViewState;

/// Absorbs float noise so that a cell corner produced by
/// [`map_pixel_to_world`] floors back to the same cell.
const CELL_EPSILON: f64 = 1e-9;

/// Quantizes a world position to its raster cell, flipping Y so row 0 is
/// the top of the image.
pub fn world_to_map_pixel(world: WorldPos, map: &MapInfo) -> MapPixel {
    let col = ((world.x - map.origin.x) / map.resolution + CELL_EPSILON).floor();
    let row_from_bottom = ((world.y - map.origin.y) / map.resolution + CELL_EPSILON).floor();
    MapPixel::new(col, map.height as f64 - row_from_bottom - 1.0)
}

/// Inverse of [`world_to_map_pixel`]: undoes the flip and scales back to
/// meters. Whole-cell inputs land on the cell's lower-left world corner.
pub fn map_pixel_to_world(px: MapPixel, map: &MapInfo) -> WorldPos {
    let flipped_y = map.height as f64 - px.y - 1.0;
    WorldPos::new(
        px.x * map.resolution + map.origin.x,
        flipped_y * map.resolution + map.origin.y,
    )
}

pub fn map_pixel_to_canvas(px: MapPixel, view: &ViewState) -> CanvasPos {
    CanvasPos::new(
        view.pan_offset_x() + px.x * view.scale_x(),
        view.pan_offset_y() + px.y * view.scale_y(),
    )
}

pub fn canvas_to_map_pixel(pos: CanvasPos, view: &ViewState) -> MapPixel {
    MapPixel::new(
        (pos.x - view.pan_offset_x()) / view.scale_x(),
        (pos.y - view.pan_offset_y()) / view.scale_y(),
    )
}

pub fn world_to_canvas(world: WorldPos, map: &MapInfo, view: &ViewState) -> CanvasPos {
    map_pixel_to_canvas(world_to_map_pixel(world, map), view)
}

pub fn canvas_to_world(pos: CanvasPos, map: &MapInfo, view: &ViewState) -> WorldPos {
    map_pixel_to_world(canvas_to_map_pixel(pos, view), map)
}

/// Binds a view to the (possibly not yet received) map.
///
/// The plain accessors fall back to the origin when no map has arrived so
/// that readouts and drawing never fail. Anything that would write a
/// position into the model must use the `try_` variants and do nothing on
/// `None`.
#[derive(Debug, Clone, Copy)]
pub struct CoordinateMapper<'a> {
    map: Option<&'a MapInfo>,
    view: &'a ViewState,
}

impl<'a> CoordinateMapper<'a> {
    pub fn new(map: Option<&'a MapInfo>, view: &'a ViewState) -> Self {
        Self { map, view }
    }

    pub fn has_map(&self) -> bool {
        self.map.is_some()
    }

    pub fn view(&self) -> &ViewState {
        self.view
    }

    pub fn try_world_to_screen(&self, world: WorldPos) -> Option<CanvasPos> {
        self.map.map(|map| world_to_canvas(world, map, self.view))
    }

    pub fn try_screen_to_world(&self, pos: CanvasPos) -> Option<WorldPos> {
        self.map.map(|map| canvas_to_world(pos, map, self.view))
    }

    pub fn world_to_screen(&self, world: WorldPos) -> CanvasPos {
        self.try_world_to_screen(world).unwrap_or_default()
    }

    pub fn screen_to_world(&self, pos: CanvasPos) -> WorldPos {
        self.try_screen_to_world(pos).unwrap_or_default()
    }

    pub fn world_to_map_pixel(&self, world: WorldPos) -> MapPixel {
        self.map
            .map(|map| world_to_map_pixel(world, map))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::model::Origin;

    fn sample_map() -> MapInfo {
        MapInfo {
            resolution: 0.05,
            width: 400,
            height: 400,
            origin: Origin {
                x: -10.0,
                y: -10.0,
                z: 0.0,
            },
            data: vec![0; 400 * 400],
        }
    }

    #[test]
    fn world_round_trip_error_is_below_one_cell() {
        let map = sample_map();
        let mut x = -9.99;
        while x < 9.99 {
            let mut y = -9.99;
            while y < 9.99 {
                let back = map_pixel_to_world(world_to_map_pixel(WorldPos::new(x, y), &map), &map);
                assert!((back.x - x).abs() < map.resolution, "x={x} back={}", back.x);
                assert!((back.y - y).abs() < map.resolution, "y={y} back={}", back.y);
                y += 0.173;
            }
            x += 0.137;
        }
    }

    #[test]
    fn canvas_round_trip_is_exact() {
        let views = [
            ViewState::new(0.0, 0.0, 1.0),
            ViewState::new(-35.5, 120.25, 7.3),
            ViewState::new(812.0, -3.0, 0.25),
        ];
        for view in views.iter() {
            for &(x, y) in [(0.0, 0.0), (12.5, 399.0), (-40.0, 7.75)].iter() {
                let px = MapPixel::new(x, y);
                let back = canvas_to_map_pixel(map_pixel_to_canvas(px, view), view);
                assert_abs_diff_eq!(back.x, px.x, epsilon = 1e-9);
                assert_abs_diff_eq!(back.y, px.y, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn flip_is_consistent_on_boundary_rows() {
        let map = sample_map();
        for row in [0.0, (map.height - 1) as f64] {
            for col in [0.0, 17.0, (map.width - 1) as f64] {
                let px = MapPixel::new(col, row);
                let world = map_pixel_to_world(px, &map);
                assert_eq!(world_to_map_pixel(world, &map), px);
            }
        }
        // Top row of the image is the far end of world Y.
        let top = map_pixel_to_world(MapPixel::new(0.0, 0.0), &map);
        assert_abs_diff_eq!(top.y, -10.0 + 399.0 * 0.05, epsilon = 1e-9);
        let bottom = map_pixel_to_world(MapPixel::new(0.0, 399.0), &map);
        assert_abs_diff_eq!(bottom.y, -10.0, epsilon = 1e-9);
    }

    #[test]
    fn map_origin_lands_on_bottom_left_cell() {
        let map = sample_map();
        let px = world_to_map_pixel(WorldPos::new(-10.0, -10.0), &map);
        assert_eq!(px, MapPixel::new(0.0, 399.0));
    }

    #[test]
    fn mapper_falls_back_without_map() {
        let view = ViewState::new(10.0, 10.0, 2.0);
        let mapper = CoordinateMapper::new(None, &view);
        assert!(!mapper.has_map());
        assert_eq!(mapper.world_to_screen(WorldPos::new(3.0, 4.0)), CanvasPos::default());
        assert_eq!(mapper.screen_to_world(CanvasPos::new(50.0, 50.0)), WorldPos::default());
        assert!(mapper.try_screen_to_world(CanvasPos::new(50.0, 50.0)).is_none());
    }

    #[test]
    fn composite_conversions_chain_both_stages() {
        let map = sample_map();
        let view = ViewState::new(5.0, -5.0, 2.0);
        let canvas = world_to_canvas(WorldPos::new(0.0, 0.0), &map, &view);
        // (0,0) world → cell (200, 199) → canvas (5 + 400, -5 + 398)
        assert_abs_diff_eq!(canvas.x, 405.0, epsilon = 1e-9);
        assert_abs_diff_eq!(canvas.y, 393.0, epsilon = 1e-9);
        let world = canvas_to_world(canvas, &map, &view);
        assert_abs_diff_eq!(world.x, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(world.y, 0.0, epsilon = 1e-9);
    }
}
