//! Point types for the three coordinate frames the map widgets juggle.
//!
//! Keeping them as distinct types means a world position can never be
//! handed to a function expecting canvas pixels without an explicit
//! conversion through [`crate::coords`].

use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

/// Position in the robot's world frame, in meters. Y grows "up".
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WorldPos {
    pub x: f64,
    pub y: f64,
}

impl WorldPos {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl Add for WorldPos {
    type Output = WorldPos;

    fn add(self, rhs: WorldPos) -> WorldPos {
        WorldPos::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for WorldPos {
    type Output = WorldPos;

    fn sub(self, rhs: WorldPos) -> WorldPos {
        WorldPos::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Position on the occupancy raster, in cells. Y grows "down" (row index).
///
/// Values produced by [`crate::coords::world_to_map_pixel`] are whole
/// numbers; values produced from canvas positions may be fractional.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MapPixel {
    pub x: f64,
    pub y: f64,
}

impl MapPixel {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Position on a drawing surface, in device pixels. Y grows "down".
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CanvasPos {
    pub x: f64,
    pub y: f64,
}

impl CanvasPos {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_squared(&self, other: CanvasPos) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    pub fn distance(&self, other: CanvasPos) -> f64 {
        self.distance_squared(other).sqrt()
    }
}

impl Add for CanvasPos {
    type Output = CanvasPos;

    fn add(self, rhs: CanvasPos) -> CanvasPos {
        CanvasPos::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for CanvasPos {
    type Output = CanvasPos;

    fn sub(self, rhs: CanvasPos) -> CanvasPos {
        CanvasPos::new(self.x - rhs.x, self.y - rhs.y)
    }
}
