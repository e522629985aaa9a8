use serde::{Deserialize, Serialize};

/// Default destination for envelopes that do not name one
pub const DEFAULT_QUEUE: &str = "roundtrip.demo.queue";
/// Exchange the demo queue is bound to
pub const EXCHANGE_NAME: &str = "roundtrip.demo.exchange";
/// Routing key used for every publish
pub const ROUTING_KEY: &str = "roundtrip.demo.key";

/// Harness configuration.
///
/// Broker connection parameters are carried for the external transport's
/// benefit; the harness itself only consumes the destination and routing
/// key. Built from CLI arguments by the demo binary, constructed directly
/// in tests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Broker host the transport should connect to
    pub broker_host: String,
    /// Broker port
    pub broker_port: u16,
    /// Destination used when an envelope has none
    pub default_destination: String,
    /// Routing key attached to every publish
    pub routing_key: String,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            broker_host: "localhost".to_string(),
            broker_port: 5672,
            default_destination: DEFAULT_QUEUE.to_string(),
            routing_key: ROUTING_KEY.to_string(),
        }
    }
}

impl HarnessConfig {
    /// Configuration summary for logging and observers
    pub fn describe(&self) -> serde_json::Value {
        serde_json::json!({
            "host": self.broker_host,
            "port": self.broker_port,
            "queues": [self.default_destination],
            "exchanges": [EXCHANGE_NAME],
            "routingKey": self.routing_key,
        })
    }
}
