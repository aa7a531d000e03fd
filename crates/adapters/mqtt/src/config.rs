//! MQTT transport configuration.

use serde::Deserialize;

/// Configuration for the MQTT command channel.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    /// MQTT broker hostname or IP address.
    pub broker_host: String,
    /// MQTT broker port.
    pub broker_port: u16,
    /// MQTT client identifier prefix; each connection appends a sequence
    /// number so concurrent invocations never share an id.
    pub client_id: String,
    /// Keep-alive interval in seconds.
    pub keep_alive_secs: u16,
    /// How long to wait for the broker handshake before failing the batch,
    /// in seconds.
    pub connect_timeout_secs: u64,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker_host: "localhost".to_string(),
            broker_port: 1883,
            client_id: "grainhub".to_string(),
            keep_alive_secs: 30,
            connect_timeout_secs: 5,
        }
    }
}
