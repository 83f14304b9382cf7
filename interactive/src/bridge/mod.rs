use mapedit::{MessageError, MessageKind};
use thiserror::Error;

pub mod mqtt;
pub mod offline;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("MQTT error: {0}")]
    Mqtt(#[from] paho_mqtt::Error),
    #[error(transparent)]
    Message(#[from] MessageError),
}

/// Handle returned by [`Bridge::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

/// One inbound message, still undecoded.
#[derive(Debug, Clone)]
pub struct BridgeMessage {
    pub topic: String,
    pub kind: MessageKind,
    pub payload: serde_json::Value,
}

/// The middleware connection, as seen from the UI thread.
///
/// `try_recv` never blocks; hosts drain it once per frame. Messages come
/// out in arrival order.
pub trait Bridge {
    fn subscribe(&mut self, topic: &str, msg_type: &str) -> Result<Subscription, BridgeError>;
    fn unsubscribe(&mut self, subscription: Subscription);
    fn try_recv(&mut self) -> Option<BridgeMessage>;
    fn description(&self) -> &str;
    fn is_connected(&self) -> bool;
}

#[derive(Debug, Clone)]
pub struct SubscriptionEntry {
    pub id: Subscription,
    pub topic: String,
    pub kind: MessageKind,
}

/// Topic table shared by the bridge implementations.
#[derive(Debug, Default)]
pub struct Subscriptions {
    next_id: u64,
    entries: Vec<SubscriptionEntry>,
}

impl Subscriptions {
    pub fn add(&mut self, topic: &str, kind: MessageKind) -> Subscription {
        self.next_id += 1;
        let id = Subscription(self.next_id);
        self.entries.push(SubscriptionEntry {
            id,
            topic: topic.to_string(),
            kind,
        });
        id
    }

    pub fn remove(&mut self, id: Subscription) -> Option<SubscriptionEntry> {
        let idx = self.entries.iter().position(|e| e.id == id)?;
        Some(self.entries.remove(idx))
    }

    pub fn find(&self, topic: &str) -> Option<&SubscriptionEntry> {
        self.entries.iter().find(|e| e.topic == topic)
    }

    pub fn is_subscribed(&self, topic: &str) -> bool {
        self.find(topic).is_some()
    }

    /// Distinct subscribed topics.
    pub fn topics(&self) -> Vec<&str> {
        let mut topics: Vec<&str> = self.entries.iter().map(|e| e.topic.as_str()).collect();
        topics.sort_unstable();
        topics.dedup();
        topics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_stays_subscribed_until_last_handle_goes() {
        let mut subs = Subscriptions::default();
        let a = subs.add("/map", MessageKind::OccupancyGrid);
        let b = subs.add("/map", MessageKind::OccupancyGrid);
        assert_ne!(a, b);
        assert_eq!(subs.topics(), vec!["/map"]);
        subs.remove(a);
        assert!(subs.is_subscribed("/map"));
        subs.remove(b);
        assert!(!subs.is_subscribed("/map"));
        assert!(subs.remove(b).is_none());
    }
}
