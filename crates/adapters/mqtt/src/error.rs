//! MQTT adapter error types.

use grainhub_domain::error::HubError;

/// Errors specific to the MQTT command channel.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// The broker connection failed or dropped.
    #[error("broker connection failed")]
    Connection(#[from] rumqttc::ConnectionError),

    /// The broker handshake did not complete within the configured bound.
    #[error("broker connect timed out after {0} seconds")]
    ConnectTimeout(u64),

    /// Published messages were not acknowledged before the bound elapsed.
    #[error("publish acknowledgements timed out after {0} seconds")]
    AckTimeout(u64),

    /// The rumqttc client rejected a request.
    #[error("MQTT client error")]
    Client(#[from] rumqttc::ClientError),
}

impl From<ChannelError> for HubError {
    fn from(err: ChannelError) -> Self {
        Self::Channel(Box::new(err))
    }
}
