//! Adapter seam: scanning, discovery, and the GATT serial channels.
//!
//! The link task only talks to [`SerialCentral`] and [`SerialDevice`], so
//! the state machine runs against a scripted adapter in tests.
//! [`BtleplugCentral`] is the live implementation over the first system
//! Bluetooth adapter.

use async_trait::async_trait;
use btleplug::api::{
    Central, CentralEvent, Characteristic, Manager as _, Peripheral as _, ScanFilter, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::stream::{BoxStream, StreamExt};
use tracing::debug;
use uuid::Uuid;

use crate::error::BleLinkError;
use crate::protocol::SerialProfile;

// ----------------------------------------------------------------------------
// Seam traits
// ----------------------------------------------------------------------------

/// Signals the adapter surfaces to the link task.
#[derive(Debug)]
pub enum CentralSignal<D> {
    /// A device advertising the filtered service appeared.
    DeviceDiscovered(D),
    /// The adapter reported a device connection as gone.
    DeviceDisconnected(String),
}

/// Scanning side of a BLE central.
#[async_trait]
pub trait SerialCentral: Send + 'static {
    type Device: SerialDevice;

    async fn start_scan(&mut self, service: Uuid) -> Result<(), BleLinkError>;
    async fn stop_scan(&mut self) -> Result<(), BleLinkError>;

    /// Next adapter signal; `None` means the adapter stream ended.
    async fn next_signal(&mut self) -> Option<CentralSignal<Self::Device>>;
}

/// One discovered device and its serial channels.
#[async_trait]
pub trait SerialDevice: Send + 'static {
    /// Stable identifier used to match disconnect signals.
    fn id(&self) -> String;

    async fn connect(&mut self) -> Result<(), BleLinkError>;
    async fn disconnect(&mut self) -> Result<(), BleLinkError>;

    /// Discovers services and binds the profile's write and notify
    /// characteristics.
    async fn resolve_channels(&mut self, profile: &SerialProfile) -> Result<(), BleLinkError>;

    /// Subscribes to the notify characteristic and returns its payload
    /// stream. Requires resolved channels.
    async fn subscribe(&mut self) -> Result<BoxStream<'static, Vec<u8>>, BleLinkError>;

    /// Writes one frame without waiting for a peer acknowledgement.
    /// Requires resolved channels.
    async fn write(&mut self, payload: &[u8]) -> Result<(), BleLinkError>;
}

// ----------------------------------------------------------------------------
// btleplug central
// ----------------------------------------------------------------------------

/// Live central over the first system Bluetooth adapter.
pub struct BtleplugCentral {
    adapter: Adapter,
    events: BoxStream<'static, CentralEvent>,
    filter_service: Option<Uuid>,
}

impl BtleplugCentral {
    /// Binds the first available system adapter.
    pub async fn new() -> Result<Self, BleLinkError> {
        let manager = Manager::new()
            .await
            .map_err(|e| BleLinkError::AdapterUnavailable(e.to_string()))?;
        let adapters = manager
            .adapters()
            .await
            .map_err(|e| BleLinkError::AdapterUnavailable(e.to_string()))?;
        let adapter = adapters
            .into_iter()
            .next()
            .ok_or_else(|| BleLinkError::AdapterUnavailable("no adapters found".to_string()))?;
        let events = adapter
            .events()
            .await
            .map_err(|e| BleLinkError::EventStreamFailed(e.to_string()))?;
        Ok(BtleplugCentral {
            adapter,
            events,
            filter_service: None,
        })
    }

    /// Whether a discovered peripheral advertises the filtered service.
    /// Some platforms deliver unfiltered discovery events, so the
    /// advertisement is checked again here.
    async fn advertises_service(peripheral: &Peripheral, service: Uuid) -> bool {
        match peripheral.properties().await {
            Ok(Some(properties)) => properties.services.contains(&service),
            _ => false,
        }
    }
}

#[async_trait]
impl SerialCentral for BtleplugCentral {
    type Device = BtleplugDevice;

    async fn start_scan(&mut self, service: Uuid) -> Result<(), BleLinkError> {
        let scan_filter = ScanFilter {
            services: vec![service],
        };
        self.adapter
            .start_scan(scan_filter)
            .await
            .map_err(|e| BleLinkError::ScanFailed(e.to_string()))?;
        self.filter_service = Some(service);
        Ok(())
    }

    async fn stop_scan(&mut self) -> Result<(), BleLinkError> {
        self.filter_service = None;
        self.adapter
            .stop_scan()
            .await
            .map_err(|e| BleLinkError::ScanFailed(e.to_string()))
    }

    async fn next_signal(&mut self) -> Option<CentralSignal<BtleplugDevice>> {
        while let Some(event) = self.events.next().await {
            match event {
                CentralEvent::DeviceDiscovered(id) => {
                    let peripheral = match self.adapter.peripheral(&id).await {
                        Ok(peripheral) => peripheral,
                        Err(error) => {
                            debug!(%error, "discovered peripheral not retrievable");
                            continue;
                        }
                    };
                    if let Some(service) = self.filter_service {
                        if !Self::advertises_service(&peripheral, service).await {
                            continue;
                        }
                    }
                    return Some(CentralSignal::DeviceDiscovered(BtleplugDevice::new(
                        peripheral,
                    )));
                }
                CentralEvent::DeviceDisconnected(id) => {
                    return Some(CentralSignal::DeviceDisconnected(format!("{id:?}")));
                }
                _ => continue,
            }
        }
        None
    }
}

// ----------------------------------------------------------------------------
// btleplug device
// ----------------------------------------------------------------------------

/// Live device handle plus its resolved serial channels.
pub struct BtleplugDevice {
    peripheral: Peripheral,
    channels: Option<SerialChannels>,
}

struct SerialChannels {
    write: Characteristic,
    notify: Characteristic,
}

impl BtleplugDevice {
    fn new(peripheral: Peripheral) -> Self {
        BtleplugDevice {
            peripheral,
            channels: None,
        }
    }
}

#[async_trait]
impl SerialDevice for BtleplugDevice {
    fn id(&self) -> String {
        format!("{:?}", self.peripheral.id())
    }

    async fn connect(&mut self) -> Result<(), BleLinkError> {
        self.peripheral
            .connect()
            .await
            .map_err(|e| BleLinkError::ConnectFailed(e.to_string()))
    }

    async fn disconnect(&mut self) -> Result<(), BleLinkError> {
        self.channels = None;
        self.peripheral
            .disconnect()
            .await
            .map_err(|e| BleLinkError::ConnectFailed(e.to_string()))
    }

    async fn resolve_channels(&mut self, profile: &SerialProfile) -> Result<(), BleLinkError> {
        self.peripheral
            .discover_services()
            .await
            .map_err(|e| BleLinkError::DiscoveryFailed(e.to_string()))?;
        let service = self
            .peripheral
            .services()
            .into_iter()
            .find(|s| s.uuid == profile.service)
            .ok_or(BleLinkError::ServiceNotFound {
                uuid: profile.service,
            })?;
        let write = service
            .characteristics
            .iter()
            .find(|c| c.uuid == profile.write)
            .cloned()
            .ok_or(BleLinkError::CharacteristicNotFound {
                uuid: profile.write,
            })?;
        let notify = service
            .characteristics
            .iter()
            .find(|c| c.uuid == profile.notify)
            .cloned()
            .ok_or(BleLinkError::CharacteristicNotFound {
                uuid: profile.notify,
            })?;
        self.channels = Some(SerialChannels { write, notify });
        Ok(())
    }

    async fn subscribe(&mut self) -> Result<BoxStream<'static, Vec<u8>>, BleLinkError> {
        let notify = match &self.channels {
            Some(channels) => channels.notify.clone(),
            None => {
                return Err(BleLinkError::SubscribeFailed(
                    "channels not resolved".to_string(),
                ))
            }
        };
        self.peripheral
            .subscribe(&notify)
            .await
            .map_err(|e| BleLinkError::SubscribeFailed(e.to_string()))?;
        let notifications = self
            .peripheral
            .notifications()
            .await
            .map_err(|e| BleLinkError::SubscribeFailed(e.to_string()))?;
        let uuid = notify.uuid;
        Ok(notifications
            .filter_map(move |n| futures::future::ready((n.uuid == uuid).then_some(n.value)))
            .boxed())
    }

    async fn write(&mut self, payload: &[u8]) -> Result<(), BleLinkError> {
        let write = match &self.channels {
            Some(channels) => channels.write.clone(),
            None => return Err(BleLinkError::WriteFailed("channels not resolved".to_string())),
        };
        self.peripheral
            .write(&write, payload, WriteType::WithoutResponse)
            .await
            .map_err(|e| BleLinkError::WriteFailed(e.to_string()))
    }
}
