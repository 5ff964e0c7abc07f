//! Serial-over-GATT profile identifiers.
//!
//! A serial bridge exposes one service with one characteristic per
//! direction: the central writes frames to `write` and receives
//! notifications on `notify`. The RedBearLab BLE Mini triple is the
//! default; UART bridges speaking the Nordic profile are covered by
//! [`SerialProfile::nordic_uart`].

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ----------------------------------------------------------------------------
// RedBearLab serial service
// ----------------------------------------------------------------------------

/// RedBearLab serial service.
pub const RBL_SERVICE_UUID: Uuid = Uuid::from_u128(0x713D0000_503E_4C75_BA94_3148F18D941E);

/// Characteristic the device notifies inbound bytes on.
pub const RBL_NOTIFY_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0x713D0002_503E_4C75_BA94_3148F18D941E);

/// Characteristic outbound frames are written to.
pub const RBL_WRITE_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0x713D0003_503E_4C75_BA94_3148F18D941E);

// ----------------------------------------------------------------------------
// Nordic UART service
// ----------------------------------------------------------------------------

/// Nordic UART service.
pub const NUS_SERVICE_UUID: Uuid = Uuid::from_u128(0x6E400001_B5A3_F393_E0A9_E50E24DCCA9E);

/// Nordic UART RX characteristic; the central writes to it.
pub const NUS_WRITE_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0x6E400002_B5A3_F393_E0A9_E50E24DCCA9E);

/// Nordic UART TX characteristic; the device notifies on it.
pub const NUS_NOTIFY_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0x6E400003_B5A3_F393_E0A9_E50E24DCCA9E);

// ----------------------------------------------------------------------------
// Profiles
// ----------------------------------------------------------------------------

/// UUID triple a serial bridge exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialProfile {
    /// Service advertised by the bridge; scanning filters on it.
    pub service: Uuid,
    /// Characteristic frames are written to.
    pub write: Uuid,
    /// Characteristic inbound bytes arrive on.
    pub notify: Uuid,
}

impl SerialProfile {
    /// RedBearLab BLE Mini serial profile.
    pub const fn redbear() -> Self {
        SerialProfile {
            service: RBL_SERVICE_UUID,
            write: RBL_WRITE_CHARACTERISTIC_UUID,
            notify: RBL_NOTIFY_CHARACTERISTIC_UUID,
        }
    }

    /// Nordic UART serial profile.
    pub const fn nordic_uart() -> Self {
        SerialProfile {
            service: NUS_SERVICE_UUID,
            write: NUS_WRITE_CHARACTERISTIC_UUID,
            notify: NUS_NOTIFY_CHARACTERISTIC_UUID,
        }
    }
}

impl Default for SerialProfile {
    fn default() -> Self {
        SerialProfile::redbear()
    }
}
