use serde::{Deserialize, Serialize};

use crate::geometry::WorldPos;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Orientation {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Default for Orientation {
    fn default() -> Self {
        Orientation {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            w: 1.0,
        }
    }
}

impl Orientation {
    /// Heading about the world Z axis, in radians.
    pub fn yaw(&self) -> f64 {
        (2.0 * (self.w * self.z + self.x * self.y))
            .atan2(1.0 - 2.0 * (self.y * self.y + self.z * self.z))
    }
}

/// Latest localization estimate. Transient: each message replaces the last.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct RobotPose {
    pub position: Position,
    pub orientation: Orientation,
}

impl RobotPose {
    pub fn world_pos(&self) -> WorldPos {
        WorldPos::new(self.position.x, self.position.y)
    }

    pub fn yaw(&self) -> f64 {
        self.orientation.yaw()
    }
}
