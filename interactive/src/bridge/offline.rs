use std::collections::VecDeque;

use mapedit::MessageKind;
use serde_json::json;
use tracing::info;

use super::*;

pub const DEMO_MAP_SIZE: u32 = 400;
pub const DEMO_MAP_RESOLUTION: f64 = 0.05;

const OCCUPIED: i8 = 100;
const FREE: i8 = 0;

/// Outer walls plus two obstacle blocks, in raster cells.
pub fn demo_map_cell(x: u32, y: u32) -> i8 {
    let n = DEMO_MAP_SIZE;
    let wall = x < 5 || x > n - 5 || y < 5 || y > n - 5;
    let block_a = x > 100 && x < 120 && y > 100 && y < 200;
    let block_b = x > 250 && x < 300 && y > 150 && y < 250;
    if wall || block_a || block_b {
        OCCUPIED
    } else {
        FREE
    }
}

/// Occupancy-grid message for the built-in demo map.
pub fn demo_map_message() -> serde_json::Value {
    let n = DEMO_MAP_SIZE;
    let data: Vec<i8> = (0..n)
        .flat_map(|y| (0..n).map(move |x| demo_map_cell(x, y)))
        .collect();
    json!({
        "header": {"frame_id": "map"},
        "info": {
            "resolution": DEMO_MAP_RESOLUTION,
            "width": n,
            "height": n,
            "origin": {
                "position": {"x": -10.0, "y": -10.0, "z": 0.0},
                "orientation": {"x": 0.0, "y": 0.0, "z": 0.0, "w": 1.0}
            }
        },
        "data": data
    })
}

/// Bridge stand-in for running without a robot. Answers a map
/// subscription with the demo map once; never publishes poses.
#[derive(Default)]
pub struct OfflineBridge {
    subscriptions: Subscriptions,
    queue: VecDeque<BridgeMessage>,
}

impl OfflineBridge {
    pub fn new() -> Self {
        info!("running with the offline demo map");
        Self::default()
    }
}

impl Bridge for OfflineBridge {
    fn subscribe(&mut self, topic: &str, msg_type: &str) -> Result<Subscription, BridgeError> {
        let kind = MessageKind::from_type_tag(msg_type)?;
        if kind == MessageKind::OccupancyGrid {
            self.queue.push_back(BridgeMessage {
                topic: topic.to_string(),
                kind,
                payload: demo_map_message(),
            });
        }
        Ok(self.subscriptions.add(topic, kind))
    }

    fn unsubscribe(&mut self, subscription: Subscription) {
        if let Some(entry) = self.subscriptions.remove(subscription) {
            if !self.subscriptions.is_subscribed(&entry.topic) {
                self.queue.retain(|m| m.topic != entry.topic);
            }
        }
    }

    fn try_recv(&mut self) -> Option<BridgeMessage> {
        self.queue.pop_front()
    }

    fn description(&self) -> &str {
        "offline demo map"
    }

    fn is_connected(&self) -> bool {
        true
    }
}
