//! Configuration for the BLE serial link.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use roverlink_core::ChannelConfig;

use crate::protocol::SerialProfile;

/// Tunables for the BLE serial link task.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BleLinkConfig {
    /// Serial profile to scan for and bind to.
    pub profile: SerialProfile,
    /// Ceiling on one connect-and-resolve attempt. `None` leaves the
    /// attempt open until the caller disconnects.
    pub connect_timeout: Option<Duration>,
    /// Buffer sizes for the request and event channels.
    pub channels: ChannelConfig,
}

impl Default for BleLinkConfig {
    fn default() -> Self {
        BleLinkConfig {
            profile: SerialProfile::default(),
            connect_timeout: None,
            channels: ChannelConfig::default(),
        }
    }
}

impl BleLinkConfig {
    pub fn new() -> Self {
        BleLinkConfig::default()
    }

    pub fn with_profile(mut self, profile: SerialProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn with_channels(mut self, channels: ChannelConfig) -> Self {
        self.channels = channels;
        self
    }
}
