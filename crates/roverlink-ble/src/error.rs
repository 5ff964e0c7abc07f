//! Error types for the BLE serial link.

use thiserror::Error;
use uuid::Uuid;

/// Errors raised by the BLE serial link and its adapter seam.
///
/// Resolution-step failures stay inside the link task; callers only see
/// their effect as a connection that never comes up.
#[derive(Error, Debug, Clone)]
pub enum BleLinkError {
    /// No usable Bluetooth adapter on this host.
    #[error("no Bluetooth adapter available: {0}")]
    AdapterUnavailable(String),

    #[error("scan failed: {0}")]
    ScanFailed(String),

    #[error("connection failed: {0}")]
    ConnectFailed(String),

    #[error("connection attempt timed out")]
    ConnectTimeout,

    #[error("connection attempt cancelled")]
    AttemptCancelled,

    #[error("service discovery failed: {0}")]
    DiscoveryFailed(String),

    /// The device does not expose the expected serial service.
    #[error("serial service {uuid} not found on device")]
    ServiceNotFound { uuid: Uuid },

    /// The serial service is missing one of its channels.
    #[error("characteristic {uuid} not found in serial service")]
    CharacteristicNotFound { uuid: Uuid },

    #[error("subscribing to the notify characteristic failed: {0}")]
    SubscribeFailed(String),

    #[error("write failed: {0}")]
    WriteFailed(String),

    #[error("adapter event stream failed: {0}")]
    EventStreamFailed(String),
}
