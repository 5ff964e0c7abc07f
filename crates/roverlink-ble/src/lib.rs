//! Bluetooth Low Energy serial link for roverlink.
//!
//! Drives a single BLE serial bridge: scan for the profile's service,
//! bind its write and notify characteristics, then move framed text in
//! both directions. The state machine lives in one task; applications
//! hold a [`BleLinkHandle`] and consume link events.
//!
//! ## Architecture
//!
//! - [`BleLinkConfig`] - Profile selection, attempt timeout, channel sizing
//! - [`SerialProfile`] - Service/characteristic UUID triples
//! - [`SerialCentral`] / [`SerialDevice`] - Adapter seam; `btleplug` lives
//!   behind it
//! - [`BleSerialLink`] / [`BleLinkHandle`] - The owning task and its
//!   request surface
//!
//! ## Usage
//!
//! ```rust,no_run
//! use roverlink_ble::{BleLinkConfig, BleSerialLink};
//! use roverlink_core::{Command, LinkSession, SchedulerConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut link = BleSerialLink::start(BleLinkConfig::default()).await?;
//! let mut events = link.take_events().ok_or("events already taken")?;
//! let mut session = LinkSession::new(link.handle(), SchedulerConfig::default());
//!
//! link.handle().begin_connecting().await?;
//! while let Some(event) = events.recv().await {
//!     session.handle_event(&event).await;
//!     session.enqueue(Command::drive_speed(40));
//! }
//! # Ok(())
//! # }
//! ```

mod central;
mod config;
mod error;
mod link;
mod protocol;

// Public API exports
pub use central::{BtleplugCentral, BtleplugDevice, CentralSignal, SerialCentral, SerialDevice};
pub use config::BleLinkConfig;
pub use error::BleLinkError;
pub use link::{BleLinkHandle, BleSerialLink};
pub use protocol::{
    SerialProfile, NUS_NOTIFY_CHARACTERISTIC_UUID, NUS_SERVICE_UUID, NUS_WRITE_CHARACTERISTIC_UUID,
    RBL_NOTIFY_CHARACTERISTIC_UUID, RBL_SERVICE_UUID, RBL_WRITE_CHARACTERISTIC_UUID,
};

// Re-export the transport trait for convenience
pub use roverlink_core::LinkTransport;
