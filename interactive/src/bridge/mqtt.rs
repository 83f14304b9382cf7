use std::time::{Duration, Instant};

use mapedit::MessageKind;
use tracing::{debug, info, warn};

use super::*;
use crate::config::BridgeConfig;

const RECONNECT_INTERVAL: Duration = Duration::from_secs(3);

pub type MqttConnection = (
    paho_mqtt::Client,
    paho_mqtt::Receiver<Option<paho_mqtt::Message>>,
);

/// MQTT topic a ROS topic is mirrored on, e.g. `/map` → `ros/map`.
pub fn mqtt_topic(prefix: &str, ros_topic: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    let topic = ros_topic.trim_start_matches('/');
    if prefix.is_empty() {
        topic.to_string()
    } else {
        format!("{}/{}", prefix, topic)
    }
}

pub struct MqttBridge {
    connection: MqttConnection,
    prefix: String,
    subscriptions: Subscriptions,
    broker_uri: String,
    description: String,
    n_msgs: usize,
    last_reconnect: Option<Instant>,
}

impl MqttBridge {
    pub fn connect(config: &BridgeConfig) -> Result<Self, BridgeError> {
        let create_opts = paho_mqtt::CreateOptionsBuilder::new()
            .server_uri(&config.broker_uri)
            .client_id(&config.client_id)
            .finalize();
        let conn_opts = paho_mqtt::ConnectOptionsBuilder::new()
            .keep_alive_interval(Duration::from_secs(config.keep_alive_secs))
            .clean_session(true)
            .finalize();

        let client = paho_mqtt::Client::new(create_opts)?;
        let rx = client.start_consuming();
        client.connect(conn_opts)?;
        info!(broker = %config.broker_uri, "connected to MQTT broker");

        Ok(MqttBridge {
            connection: (client, rx),
            prefix: config.topic_prefix.clone(),
            subscriptions: Subscriptions::default(),
            broker_uri: config.broker_uri.clone(),
            description: format!("MQTT:{}", config.broker_uri),
            n_msgs: 0,
            last_reconnect: None,
        })
    }

    fn incr_messages(&mut self) {
        self.n_msgs += 1;
        self.description = format!("MQTT:{} ({} msgs)", self.broker_uri, self.n_msgs);
    }

    /// Retries the connection at most every few seconds and restores the
    /// topic subscriptions, which a clean session drops.
    fn maybe_reconnect(&mut self) {
        if self.connection.0.is_connected() {
            return;
        }
        let now = Instant::now();
        if let Some(last) = self.last_reconnect {
            if now.duration_since(last) < RECONNECT_INTERVAL {
                return;
            }
        }
        self.last_reconnect = Some(now);

        match self.connection.0.reconnect() {
            Ok(_) => {
                info!(broker = %self.broker_uri, "reconnected");
                for topic in self.subscriptions.topics() {
                    let mqtt_topic = mqtt_topic(&self.prefix, topic);
                    if let Err(err) = self.connection.0.subscribe(&mqtt_topic, 0) {
                        warn!(topic = %mqtt_topic, error = %err, "resubscribe failed");
                    }
                }
            }
            Err(err) => warn!(broker = %self.broker_uri, error = %err, "reconnect failed"),
        }
    }

    fn decode(&mut self, msg: paho_mqtt::Message) -> Option<BridgeMessage> {
        let entry = match self
            .subscriptions
            .topics()
            .into_iter()
            .find(|t| mqtt_topic(&self.prefix, t) == msg.topic())
            .and_then(|t| self.subscriptions.find(t))
        {
            Some(entry) => entry.clone(),
            None => {
                warn!(topic = msg.topic(), "message on unknown topic");
                return None;
            }
        };

        let payload: serde_json::Value = match serde_json::from_str(&msg.payload_str()) {
            Ok(j) => j,
            Err(err) => {
                warn!(topic = msg.topic(), error = %err, "JSON parse error");
                return None;
            }
        };

        self.incr_messages();
        Some(BridgeMessage {
            topic: entry.topic,
            kind: entry.kind,
            payload,
        })
    }
}

impl Bridge for MqttBridge {
    fn subscribe(&mut self, topic: &str, msg_type: &str) -> Result<Subscription, BridgeError> {
        let kind = MessageKind::from_type_tag(msg_type)?;
        if !self.subscriptions.is_subscribed(topic) {
            let mqtt_topic = mqtt_topic(&self.prefix, topic);
            self.connection.0.subscribe(&mqtt_topic, 0)?;
            debug!(topic, mqtt_topic = %mqtt_topic, "subscribed");
        }
        Ok(self.subscriptions.add(topic, kind))
    }

    fn unsubscribe(&mut self, subscription: Subscription) {
        let Some(entry) = self.subscriptions.remove(subscription) else {
            return;
        };
        if self.subscriptions.is_subscribed(&entry.topic) {
            return;
        }
        let mqtt_topic = mqtt_topic(&self.prefix, &entry.topic);
        if let Err(err) = self.connection.0.unsubscribe(&mqtt_topic) {
            warn!(topic = %mqtt_topic, error = %err, "unsubscribe failed");
        }
    }

    fn try_recv(&mut self) -> Option<BridgeMessage> {
        loop {
            match self.connection.1.try_recv() {
                Ok(Some(msg)) => {
                    if let Some(decoded) = self.decode(msg) {
                        return Some(decoded);
                    }
                }
                // The consumer yields `None` when the connection drops.
                Ok(None) => {
                    warn!(broker = %self.broker_uri, "connection lost");
                    self.maybe_reconnect();
                    return None;
                }
                Err(_) => {
                    self.maybe_reconnect();
                    return None;
                }
            }
        }
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn is_connected(&self) -> bool {
        self.connection.0.is_connected()
    }
}
