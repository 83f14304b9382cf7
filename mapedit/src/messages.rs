//! Decoding of the JSON messages the bridge delivers.
//!
//! Only the fields the map widgets read are modelled; everything else in
//! the payload is ignored.

use serde::Deserialize;
use serde_json::Value;

use crate::error::MessageError;
use crate::model::{MapInfo, Origin};
use crate::pose::{Orientation, Position, RobotPose};

pub const OCCUPANCY_GRID_TYPE: &str = "nav_msgs/msg/OccupancyGrid";
pub const POSE_WITH_COVARIANCE_TYPE: &str = "geometry_msgs/msg/PoseWithCovarianceStamped";

/// Which decoder a subscription feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    OccupancyGrid,
    Pose,
}

impl MessageKind {
    pub fn from_type_tag(tag: &str) -> Result<Self, MessageError> {
        match tag {
            OCCUPANCY_GRID_TYPE => Ok(MessageKind::OccupancyGrid),
            POSE_WITH_COVARIANCE_TYPE => Ok(MessageKind::Pose),
            other => Err(MessageError::UnknownType(other.to_string())),
        }
    }

    pub fn type_tag(&self) -> &'static str {
        match self {
            MessageKind::OccupancyGrid => OCCUPANCY_GRID_TYPE,
            MessageKind::Pose => POSE_WITH_COVARIANCE_TYPE,
        }
    }
}

#[derive(Deserialize)]
struct OccupancyGridMsg {
    info: GridInfo,
    data: Vec<i8>,
}

#[derive(Deserialize)]
struct GridInfo {
    resolution: f64,
    width: u32,
    height: u32,
    origin: GridOrigin,
}

#[derive(Deserialize)]
struct GridOrigin {
    position: Position,
}

#[derive(Deserialize)]
struct PoseWithCovarianceStampedMsg {
    pose: PoseWithCovariance,
}

#[derive(Deserialize)]
struct PoseWithCovariance {
    pose: PoseMsg,
}

#[derive(Deserialize)]
struct PoseMsg {
    position: Position,
    orientation: Orientation,
}

/// Strips a rosbridge `{"op": "publish", "msg": ...}` envelope if present.
pub fn unwrap_envelope(payload: &Value) -> &Value {
    match (payload.get("op").and_then(Value::as_str), payload.get("msg")) {
        (Some("publish"), Some(msg)) => msg,
        _ => payload,
    }
}

pub fn decode_map(payload: &Value) -> Result<MapInfo, MessageError> {
    let msg = OccupancyGridMsg::deserialize(unwrap_envelope(payload))?;
    let info = msg.info;
    if !(info.resolution.is_finite() && info.resolution > 0.0) {
        return Err(MessageError::Resolution(info.resolution));
    }
    if info.width == 0 || info.height == 0 {
        return Err(MessageError::EmptyMap {
            width: info.width,
            height: info.height,
        });
    }
    let expected = info.width as usize * info.height as usize;
    if msg.data.len() != expected {
        return Err(MessageError::RasterSize {
            expected,
            actual: msg.data.len(),
        });
    }
    Ok(MapInfo {
        resolution: info.resolution,
        width: info.width,
        height: info.height,
        origin: Origin {
            x: info.origin.position.x,
            y: info.origin.position.y,
            z: info.origin.position.z,
        },
        data: msg.data,
    })
}

pub fn decode_pose(payload: &Value) -> Result<RobotPose, MessageError> {
    let msg = PoseWithCovarianceStampedMsg::deserialize(unwrap_envelope(payload))?;
    Ok(RobotPose {
        position: msg.pose.pose.position,
        orientation: msg.pose.pose.orientation,
    })
}
