//! The per-session shared context handed to every viewport.

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::MessageError;
use crate::messages::{decode_map, decode_pose, MessageKind};
use crate::model::MapModel;
use crate::pose::RobotPose;

/// Owns the map model and the latest robot pose for one session.
///
/// Hosts create one at startup and pass it by reference to each viewport
/// call; dropping it ends the session.
#[derive(Debug, Default)]
pub struct Session {
    pub model: MapModel,
    pose: Option<RobotPose>,
    pose_updates: u64,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pose(&self) -> Option<&RobotPose> {
        self.pose.as_ref()
    }

    pub fn pose_updates(&self) -> u64 {
        self.pose_updates
    }

    pub fn set_pose(&mut self, pose: RobotPose) {
        self.pose = Some(pose);
        self.pose_updates += 1;
    }

    /// Decodes and applies one inbound message.
    pub fn try_apply(&mut self, kind: MessageKind, payload: &Value) -> Result<(), MessageError> {
        match kind {
            MessageKind::OccupancyGrid => {
                let map = decode_map(payload)?;
                self.model.set_map(map);
            }
            MessageKind::Pose => {
                let pose = decode_pose(payload)?;
                debug!(x = pose.position.x, y = pose.position.y, "pose update");
                self.set_pose(pose);
            }
        }
        Ok(())
    }

    /// Like [`Session::try_apply`], but malformed messages are logged and
    /// dropped, leaving the session untouched. Returns whether anything
    /// changed.
    pub fn apply(&mut self, topic: &str, kind: MessageKind, payload: &Value) -> bool {
        match self.try_apply(kind, payload) {
            Ok(()) => true,
            Err(err) => {
                warn!(topic, error = %err, "dropping malformed message");
                false
            }
        }
    }
}
