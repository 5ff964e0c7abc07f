//! BLE serial link task and handle.
//!
//! One task owns the adapter and the connection state machine; everything
//! else talks to it through [`BleLinkHandle`]. Adapter signals, attempt
//! completions, and inbound notifications all funnel into the same select
//! loop, so state transitions are strictly sequential and at most one
//! connection attempt is ever in flight.

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use roverlink_core::{
    frame, link_event_channel, LinkError, LinkEvent, LinkEventReceiver, LinkEventSender,
    LinkResult, LinkTransport,
};

use crate::central::{BtleplugCentral, CentralSignal, SerialCentral, SerialDevice};
use crate::config::BleLinkConfig;
use crate::error::BleLinkError;
use crate::protocol::SerialProfile;

// ----------------------------------------------------------------------------
// Requests and state
// ----------------------------------------------------------------------------

enum LinkRequest {
    BeginConnecting,
    Disconnect,
    SendFrame {
        text: String,
        reply: oneshot::Sender<LinkResult<()>>,
    },
    Shutdown,
}

/// Everything a finished resolution attempt hands back.
struct ReadyDevice<D> {
    device: D,
    inbound: BoxStream<'static, Vec<u8>>,
}

enum LinkState<D> {
    Idle,
    Scanning,
    Resolving {
        device_id: String,
        attempt: JoinHandle<Result<ReadyDevice<D>, BleLinkError>>,
        // Dropping this tells the attempt to release the device and bail.
        cancel: oneshot::Sender<()>,
    },
    Ready {
        device_id: String,
        device: D,
        forwarder: JoinHandle<()>,
    },
}

impl<D> LinkState<D> {
    fn name(&self) -> &'static str {
        match self {
            LinkState::Idle => "idle",
            LinkState::Scanning => "scanning",
            LinkState::Resolving { .. } => "resolving",
            LinkState::Ready { .. } => "ready",
        }
    }
}

enum Action<D> {
    Attempt(Result<ReadyDevice<D>, BleLinkError>),
    Request(Option<LinkRequest>),
    Signal(Option<CentralSignal<D>>),
    Inbound(Option<Vec<u8>>),
}

// ----------------------------------------------------------------------------
// Link task
// ----------------------------------------------------------------------------

struct LinkTask<C: SerialCentral> {
    central: C,
    config: BleLinkConfig,
    state: LinkState<C::Device>,
    requests: mpsc::Receiver<LinkRequest>,
    events: LinkEventSender,
    inbound_tx: mpsc::Sender<Vec<u8>>,
    inbound_rx: mpsc::Receiver<Vec<u8>>,
}

impl<C: SerialCentral> LinkTask<C> {
    async fn run(mut self) {
        debug!("ble link task started");
        loop {
            let attempt = match &mut self.state {
                LinkState::Resolving { attempt, .. } => Some(attempt),
                _ => None,
            };
            // Biased: a settled attempt must be consumed before anything
            // else may observe or replace the resolving state.
            let action = tokio::select! {
                biased;
                outcome = wait_attempt(attempt) => Action::Attempt(outcome),
                request = self.requests.recv() => Action::Request(request),
                signal = self.central.next_signal() => Action::Signal(signal),
                payload = self.inbound_rx.recv() => Action::Inbound(payload),
            };
            match action {
                Action::Attempt(outcome) => self.on_attempt_settled(outcome).await,
                Action::Request(Some(LinkRequest::BeginConnecting)) => {
                    self.on_begin_connecting().await;
                }
                Action::Request(Some(LinkRequest::Disconnect)) => self.on_disconnect().await,
                Action::Request(Some(LinkRequest::SendFrame { text, reply })) => {
                    let result = self.on_send_frame(&text).await;
                    let _ = reply.send(result);
                }
                Action::Request(Some(LinkRequest::Shutdown)) | Action::Request(None) => {
                    self.on_disconnect().await;
                    break;
                }
                Action::Signal(Some(CentralSignal::DeviceDiscovered(device))) => {
                    self.on_device_discovered(device).await;
                }
                Action::Signal(Some(CentralSignal::DeviceDisconnected(device_id))) => {
                    self.on_device_lost(&device_id).await;
                }
                Action::Signal(None) => {
                    warn!("adapter event stream ended");
                    self.on_disconnect().await;
                    break;
                }
                Action::Inbound(Some(payload)) => self.on_inbound(payload).await,
                Action::Inbound(None) => {}
            }
        }
        debug!("ble link task stopped");
    }

    async fn on_begin_connecting(&mut self) {
        if !matches!(self.state, LinkState::Idle) {
            debug!(state = self.state.name(), "begin_connecting ignored");
            return;
        }
        match self.central.start_scan(self.config.profile.service).await {
            Ok(()) => {
                info!(service = %self.config.profile.service, "scanning for serial device");
                self.state = LinkState::Scanning;
            }
            Err(error) => warn!(%error, "scan start failed"),
        }
    }

    async fn on_device_discovered(&mut self, device: C::Device) {
        if !matches!(self.state, LinkState::Scanning) {
            debug!(state = self.state.name(), "extra discovery ignored");
            return;
        }
        if let Err(error) = self.central.stop_scan().await {
            debug!(%error, "stop scan failed");
        }
        let device_id = device.id();
        info!(%device_id, "serial device discovered, connecting");
        let (cancel, cancelled) = oneshot::channel();
        let attempt = tokio::spawn(resolve_device(
            device,
            self.config.profile,
            self.config.connect_timeout,
            cancelled,
        ));
        self.state = LinkState::Resolving {
            device_id,
            attempt,
            cancel,
        };
    }

    async fn on_attempt_settled(&mut self, outcome: Result<ReadyDevice<C::Device>, BleLinkError>) {
        let device_id = match &self.state {
            LinkState::Resolving { device_id, .. } => device_id.clone(),
            _ => return,
        };
        match outcome {
            Ok(ready) => {
                let forwarder = spawn_forwarder(ready.inbound, self.inbound_tx.clone());
                self.state = LinkState::Ready {
                    device_id: device_id.clone(),
                    device: ready.device,
                    forwarder,
                };
                info!(%device_id, "serial link ready");
                self.emit(LinkEvent::ConnectionChanged { connected: true })
                    .await;
            }
            Err(error) => {
                warn!(%device_id, %error, "resolution failed");
                self.state = LinkState::Idle;
            }
        }
    }

    async fn on_device_lost(&mut self, lost_id: &str) {
        let ours = matches!(
            &self.state,
            LinkState::Ready { device_id, .. } if device_id == lost_id
        );
        if !ours {
            return;
        }
        info!(device_id = lost_id, "serial device disconnected");
        if let LinkState::Ready { forwarder, .. } =
            std::mem::replace(&mut self.state, LinkState::Idle)
        {
            forwarder.abort();
        }
        self.emit(LinkEvent::ConnectionChanged { connected: false })
            .await;
    }

    async fn on_disconnect(&mut self) {
        match std::mem::replace(&mut self.state, LinkState::Idle) {
            LinkState::Idle => {}
            LinkState::Scanning => {
                if let Err(error) = self.central.stop_scan().await {
                    debug!(%error, "stop scan failed");
                }
            }
            LinkState::Resolving {
                device_id,
                attempt,
                cancel,
            } => {
                drop(cancel);
                // The attempt may have settled before the cancel landed;
                // a device it handed back still has to be released.
                if let Ok(Ok(mut ready)) = attempt.await {
                    if let Err(error) = ready.device.disconnect().await {
                        debug!(%error, "release after abandoned attempt");
                    }
                }
                debug!(%device_id, "connection attempt abandoned");
            }
            LinkState::Ready {
                device_id,
                mut device,
                forwarder,
            } => {
                forwarder.abort();
                self.emit(LinkEvent::ConnectionChanged { connected: false })
                    .await;
                if let Err(error) = device.disconnect().await {
                    debug!(%error, "device disconnect failed");
                }
                info!(%device_id, "serial link closed");
            }
        }
    }

    async fn on_send_frame(&mut self, text: &str) -> LinkResult<()> {
        match &mut self.state {
            LinkState::Ready { device, .. } => device
                .write(text.as_bytes())
                .await
                .map_err(|error| LinkError::write_failed(error.to_string())),
            _ => Err(LinkError::NotConnected),
        }
    }

    async fn on_inbound(&mut self, payload: Vec<u8>) {
        if !matches!(self.state, LinkState::Ready { .. }) {
            return;
        }
        let text = String::from_utf8_lossy(&payload).into_owned();
        self.emit(LinkEvent::TextReceived { text }).await;
    }

    // &mut: the task future must stay Send, and a shared borrow held
    // across the send would require LinkTask<C>: Sync.
    async fn emit(&mut self, event: LinkEvent) {
        if self.events.send(event).await.is_err() {
            debug!("event receiver dropped");
        }
    }
}

async fn wait_attempt<D>(
    attempt: Option<&mut JoinHandle<Result<ReadyDevice<D>, BleLinkError>>>,
) -> Result<ReadyDevice<D>, BleLinkError> {
    match attempt {
        Some(handle) => match handle.await {
            Ok(outcome) => outcome,
            Err(join_error) => Err(BleLinkError::ConnectFailed(format!(
                "resolution task failed: {join_error}"
            ))),
        },
        None => std::future::pending().await,
    }
}

/// Connects and binds the serial channels. On any failure, timeout, or
/// cancellation the device is released before the attempt returns, so an
/// abandoned attempt leaves no half-open connection behind.
async fn resolve_device<D: SerialDevice>(
    mut device: D,
    profile: SerialProfile,
    connect_timeout: Option<Duration>,
    mut cancelled: oneshot::Receiver<()>,
) -> Result<ReadyDevice<D>, BleLinkError> {
    let resolve = async {
        match connect_timeout {
            Some(limit) => match timeout(limit, try_resolve(&mut device, &profile)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(BleLinkError::ConnectTimeout),
            },
            None => try_resolve(&mut device, &profile).await,
        }
    };
    let outcome = tokio::select! {
        outcome = resolve => outcome,
        _ = &mut cancelled => Err(BleLinkError::AttemptCancelled),
    };
    match outcome {
        Ok(inbound) => Ok(ReadyDevice { device, inbound }),
        Err(error) => {
            if let Err(release_error) = device.disconnect().await {
                debug!(%release_error, "release after failed resolution");
            }
            Err(error)
        }
    }
}

async fn try_resolve<D: SerialDevice>(
    device: &mut D,
    profile: &SerialProfile,
) -> Result<BoxStream<'static, Vec<u8>>, BleLinkError> {
    device.connect().await?;
    device.resolve_channels(profile).await?;
    device.subscribe().await
}

fn spawn_forwarder(
    mut inbound: BoxStream<'static, Vec<u8>>,
    tx: mpsc::Sender<Vec<u8>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(payload) = inbound.next().await {
            if tx.send(payload).await.is_err() {
                break;
            }
        }
    })
}

// ----------------------------------------------------------------------------
// Public surface
// ----------------------------------------------------------------------------

/// A running BLE serial link.
pub struct BleSerialLink {
    handle: BleLinkHandle,
    events: Option<LinkEventReceiver>,
    task: JoinHandle<()>,
}

impl BleSerialLink {
    /// Starts the link over the first system Bluetooth adapter.
    pub async fn start(config: BleLinkConfig) -> Result<Self, BleLinkError> {
        let central = BtleplugCentral::new().await?;
        Ok(BleSerialLink::start_with_central(central, config))
    }

    /// Starts the link over a caller-provided central.
    pub fn start_with_central<C: SerialCentral>(central: C, config: BleLinkConfig) -> Self {
        let (requests_tx, requests_rx) = mpsc::channel(config.channels.request_buffer);
        let (events_tx, events_rx) = link_event_channel(&config.channels);
        let (inbound_tx, inbound_rx) = mpsc::channel(config.channels.event_buffer);
        let task = LinkTask {
            central,
            config,
            state: LinkState::Idle,
            requests: requests_rx,
            events: events_tx,
            inbound_tx,
            inbound_rx,
        };
        let task = tokio::spawn(task.run());
        BleSerialLink {
            handle: BleLinkHandle {
                requests: requests_tx,
            },
            events: Some(events_rx),
            task,
        }
    }

    /// Cloneable handle for issuing requests.
    pub fn handle(&self) -> BleLinkHandle {
        self.handle.clone()
    }

    /// Takes the event receiver; yields `None` after the first call.
    pub fn take_events(&mut self) -> Option<LinkEventReceiver> {
        self.events.take()
    }

    /// Stops the link task, disconnecting first if connected.
    pub async fn shutdown(self) {
        let _ = self.handle.requests.send(LinkRequest::Shutdown).await;
        let _ = self.task.await;
    }
}

/// Cloneable request surface of a running link.
///
/// Implements [`LinkTransport`], so a scheduler binds to it without
/// seeing the BLE stack underneath.
#[derive(Debug, Clone)]
pub struct BleLinkHandle {
    requests: mpsc::Sender<LinkRequest>,
}

impl BleLinkHandle {
    /// Asks the link to scan for and bind a serial device. A no-op unless
    /// idle; the outcome arrives as a [`LinkEvent`], or not at all.
    pub async fn begin_connecting(&self) -> LinkResult<()> {
        self.requests
            .send(LinkRequest::BeginConnecting)
            .await
            .map_err(|_| LinkError::Closed)
    }

    /// Disconnects, abandoning any in-flight attempt.
    pub async fn disconnect(&self) -> LinkResult<()> {
        self.requests
            .send(LinkRequest::Disconnect)
            .await
            .map_err(|_| LinkError::Closed)
    }

    /// Sends one framed line. The frame limit is enforced before anything
    /// is handed over; completion means the adapter accepted the write,
    /// not that the peer did.
    pub async fn send_text(&self, text: &str) -> LinkResult<()> {
        frame::ensure_within_limit(text)?;
        let (reply_tx, reply_rx) = oneshot::channel();
        self.requests
            .send(LinkRequest::SendFrame {
                text: text.to_string(),
                reply: reply_tx,
            })
            .await
            .map_err(|_| LinkError::Closed)?;
        reply_rx.await.map_err(|_| LinkError::Closed)?
    }

    /// Asks the link task to exit.
    pub async fn shutdown(&self) {
        let _ = self.requests.send(LinkRequest::Shutdown).await;
    }
}

#[async_trait]
impl LinkTransport for BleLinkHandle {
    async fn send_text(&mut self, text: &str) -> LinkResult<()> {
        BleLinkHandle::send_text(self, text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    use futures::channel::mpsc::{unbounded, UnboundedReceiver};
    use tokio::time::sleep;
    use uuid::Uuid;

    // ------------------------------------------------------------------
    // Scripted central and device
    // ------------------------------------------------------------------

    #[derive(Clone, Copy)]
    struct FakeScript {
        connect_ok: bool,
        connect_hangs: bool,
        has_service: bool,
        has_write: bool,
        has_notify: bool,
        subscribe_ok: bool,
    }

    impl Default for FakeScript {
        fn default() -> Self {
            FakeScript {
                connect_ok: true,
                connect_hangs: false,
                has_service: true,
                has_write: true,
                has_notify: true,
                subscribe_ok: true,
            }
        }
    }

    struct FakeShared {
        connects: Mutex<usize>,
        disconnects: Mutex<usize>,
        writes: Mutex<Vec<Vec<u8>>>,
        fail_writes: AtomicBool,
        notify_tx: futures::channel::mpsc::UnboundedSender<Vec<u8>>,
    }

    impl FakeShared {
        fn connects(&self) -> usize {
            *self.connects.lock().unwrap()
        }

        fn disconnects(&self) -> usize {
            *self.disconnects.lock().unwrap()
        }

        fn writes(&self) -> Vec<Vec<u8>> {
            self.writes.lock().unwrap().clone()
        }

        fn push_notification(&self, payload: &[u8]) {
            self.notify_tx.unbounded_send(payload.to_vec()).unwrap();
        }
    }

    struct FakeDevice {
        id: String,
        script: FakeScript,
        shared: Arc<FakeShared>,
        notify_rx: Option<UnboundedReceiver<Vec<u8>>>,
    }

    fn device(script: FakeScript) -> (FakeDevice, Arc<FakeShared>) {
        let (notify_tx, notify_rx) = unbounded();
        let shared = Arc::new(FakeShared {
            connects: Mutex::new(0),
            disconnects: Mutex::new(0),
            writes: Mutex::new(Vec::new()),
            fail_writes: AtomicBool::new(false),
            notify_tx,
        });
        let device = FakeDevice {
            id: "robot-1".to_string(),
            script,
            shared: shared.clone(),
            notify_rx: Some(notify_rx),
        };
        (device, shared)
    }

    #[async_trait]
    impl SerialDevice for FakeDevice {
        fn id(&self) -> String {
            self.id.clone()
        }

        async fn connect(&mut self) -> Result<(), BleLinkError> {
            if self.script.connect_hangs {
                futures::future::pending::<()>().await;
            }
            *self.shared.connects.lock().unwrap() += 1;
            if self.script.connect_ok {
                Ok(())
            } else {
                Err(BleLinkError::ConnectFailed("refused".to_string()))
            }
        }

        async fn disconnect(&mut self) -> Result<(), BleLinkError> {
            *self.shared.disconnects.lock().unwrap() += 1;
            Ok(())
        }

        async fn resolve_channels(&mut self, profile: &SerialProfile) -> Result<(), BleLinkError> {
            if !self.script.has_service {
                return Err(BleLinkError::ServiceNotFound {
                    uuid: profile.service,
                });
            }
            if !self.script.has_write {
                return Err(BleLinkError::CharacteristicNotFound {
                    uuid: profile.write,
                });
            }
            if !self.script.has_notify {
                return Err(BleLinkError::CharacteristicNotFound {
                    uuid: profile.notify,
                });
            }
            Ok(())
        }

        async fn subscribe(&mut self) -> Result<BoxStream<'static, Vec<u8>>, BleLinkError> {
            if !self.script.subscribe_ok {
                return Err(BleLinkError::SubscribeFailed("scripted".to_string()));
            }
            match self.notify_rx.take() {
                Some(rx) => Ok(rx.boxed()),
                None => Err(BleLinkError::SubscribeFailed(
                    "already subscribed".to_string(),
                )),
            }
        }

        async fn write(&mut self, payload: &[u8]) -> Result<(), BleLinkError> {
            if self.shared.fail_writes.load(Ordering::SeqCst) {
                return Err(BleLinkError::WriteFailed("radio fault".to_string()));
            }
            self.shared.writes.lock().unwrap().push(payload.to_vec());
            Ok(())
        }
    }

    struct FakeCentral {
        signals: mpsc::UnboundedReceiver<CentralSignal<FakeDevice>>,
    }

    #[async_trait]
    impl SerialCentral for FakeCentral {
        type Device = FakeDevice;

        async fn start_scan(&mut self, _service: Uuid) -> Result<(), BleLinkError> {
            Ok(())
        }

        async fn stop_scan(&mut self) -> Result<(), BleLinkError> {
            Ok(())
        }

        async fn next_signal(&mut self) -> Option<CentralSignal<FakeDevice>> {
            self.signals.recv().await
        }
    }

    // ------------------------------------------------------------------
    // Rig
    // ------------------------------------------------------------------

    struct Rig {
        link: BleSerialLink,
        handle: BleLinkHandle,
        events: LinkEventReceiver,
        signals: mpsc::UnboundedSender<CentralSignal<FakeDevice>>,
    }

    fn rig() -> Rig {
        rig_with(BleLinkConfig::default())
    }

    fn rig_with(config: BleLinkConfig) -> Rig {
        let (signals, signal_rx) = mpsc::unbounded_channel();
        let central = FakeCentral { signals: signal_rx };
        let mut link = BleSerialLink::start_with_central(central, config);
        let handle = link.handle();
        let events = link.take_events().expect("events available");
        Rig {
            link,
            handle,
            events,
            signals,
        }
    }

    async fn next_event(events: &mut LinkEventReceiver) -> LinkEvent {
        timeout(Duration::from_secs(1), events.recv())
            .await
            .expect("timed out waiting for link event")
            .expect("event channel closed")
    }

    async fn assert_no_event(events: &mut LinkEventReceiver) {
        sleep(Duration::from_millis(50)).await;
        assert!(events.try_recv().is_err(), "unexpected link event");
    }

    async fn connect_happy(rig: &mut Rig) -> Arc<FakeShared> {
        let (fake, shared) = device(FakeScript::default());
        rig.handle.begin_connecting().await.unwrap();
        rig.signals
            .send(CentralSignal::DeviceDiscovered(fake))
            .unwrap();
        assert_eq!(
            next_event(&mut rig.events).await,
            LinkEvent::ConnectionChanged { connected: true }
        );
        shared
    }

    // ------------------------------------------------------------------
    // Connection scenarios
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn full_resolution_reports_connected_once() {
        let mut rig = rig();
        let shared = connect_happy(&mut rig).await;
        assert_eq!(shared.connects(), 1);
        assert_no_event(&mut rig.events).await;
        rig.link.shutdown().await;
    }

    #[tokio::test]
    async fn failed_resolution_returns_to_idle_silently() {
        let scripts = [
            FakeScript {
                connect_ok: false,
                ..FakeScript::default()
            },
            FakeScript {
                has_service: false,
                ..FakeScript::default()
            },
            FakeScript {
                has_write: false,
                ..FakeScript::default()
            },
            FakeScript {
                has_notify: false,
                ..FakeScript::default()
            },
            FakeScript {
                subscribe_ok: false,
                ..FakeScript::default()
            },
        ];
        for script in scripts {
            let mut rig = rig();
            let (fake, shared) = device(script);
            rig.handle.begin_connecting().await.unwrap();
            rig.signals
                .send(CentralSignal::DeviceDiscovered(fake))
                .unwrap();
            assert_no_event(&mut rig.events).await;
            // A failed attempt always releases the device.
            assert_eq!(shared.disconnects(), 1);
            rig.link.shutdown().await;
        }
    }

    #[tokio::test]
    async fn failed_attempt_is_retriable() {
        let mut rig = rig();
        let (broken, _) = device(FakeScript {
            has_service: false,
            ..FakeScript::default()
        });
        rig.handle.begin_connecting().await.unwrap();
        rig.signals
            .send(CentralSignal::DeviceDiscovered(broken))
            .unwrap();
        assert_no_event(&mut rig.events).await;

        connect_happy(&mut rig).await;
        rig.link.shutdown().await;
    }

    #[tokio::test]
    async fn send_after_failed_resolution_is_not_connected() {
        let mut rig = rig();
        let (broken, _) = device(FakeScript {
            connect_ok: false,
            ..FakeScript::default()
        });
        rig.handle.begin_connecting().await.unwrap();
        rig.signals
            .send(CentralSignal::DeviceDiscovered(broken))
            .unwrap();
        assert_no_event(&mut rig.events).await;

        let error = rig.handle.send_text("ds 1\n").await.unwrap_err();
        assert!(matches!(error, LinkError::NotConnected));
        rig.link.shutdown().await;
    }

    #[tokio::test]
    async fn device_loss_reports_disconnected_once() {
        let mut rig = rig();
        connect_happy(&mut rig).await;

        rig.signals
            .send(CentralSignal::DeviceDisconnected("robot-1".to_string()))
            .unwrap();
        assert_eq!(
            next_event(&mut rig.events).await,
            LinkEvent::ConnectionChanged { connected: false }
        );

        // Duplicate adapter reports must not produce duplicate events.
        rig.signals
            .send(CentralSignal::DeviceDisconnected("robot-1".to_string()))
            .unwrap();
        assert_no_event(&mut rig.events).await;
        rig.link.shutdown().await;
    }

    #[tokio::test]
    async fn unrelated_device_loss_is_ignored() {
        let mut rig = rig();
        connect_happy(&mut rig).await;

        rig.signals
            .send(CentralSignal::DeviceDisconnected("stranger".to_string()))
            .unwrap();
        assert_no_event(&mut rig.events).await;
        rig.link.shutdown().await;
    }

    #[tokio::test]
    async fn explicit_disconnect_releases_the_device() {
        let mut rig = rig();
        let shared = connect_happy(&mut rig).await;

        rig.handle.disconnect().await.unwrap();
        assert_eq!(
            next_event(&mut rig.events).await,
            LinkEvent::ConnectionChanged { connected: false }
        );
        sleep(Duration::from_millis(20)).await;
        assert_eq!(shared.disconnects(), 1);

        // The adapter's own disconnect report arrives later; still quiet.
        rig.signals
            .send(CentralSignal::DeviceDisconnected("robot-1".to_string()))
            .unwrap();
        assert_no_event(&mut rig.events).await;
        rig.link.shutdown().await;
    }

    #[tokio::test]
    async fn begin_connecting_while_active_is_a_noop() {
        let mut rig = rig();
        connect_happy(&mut rig).await;

        rig.handle.begin_connecting().await.unwrap();
        let (second, second_shared) = device(FakeScript::default());
        rig.signals
            .send(CentralSignal::DeviceDiscovered(second))
            .unwrap();
        assert_no_event(&mut rig.events).await;
        assert_eq!(second_shared.connects(), 0);
        rig.link.shutdown().await;
    }

    #[tokio::test]
    async fn disconnect_during_scan_is_silent() {
        let mut rig = rig();
        rig.handle.begin_connecting().await.unwrap();
        rig.handle.disconnect().await.unwrap();
        assert_no_event(&mut rig.events).await;

        connect_happy(&mut rig).await;
        rig.link.shutdown().await;
    }

    #[tokio::test]
    async fn disconnect_during_resolution_releases_the_device() {
        let mut rig = rig();
        let (hanging, shared) = device(FakeScript {
            connect_hangs: true,
            ..FakeScript::default()
        });
        rig.handle.begin_connecting().await.unwrap();
        rig.signals
            .send(CentralSignal::DeviceDiscovered(hanging))
            .unwrap();
        sleep(Duration::from_millis(20)).await;

        rig.handle.disconnect().await.unwrap();
        assert_no_event(&mut rig.events).await;
        assert_eq!(shared.disconnects(), 1);

        connect_happy(&mut rig).await;
        rig.link.shutdown().await;
    }

    #[tokio::test]
    async fn connect_timeout_abandons_the_attempt() {
        let mut rig = rig_with(
            BleLinkConfig::default().with_connect_timeout(Duration::from_millis(100)),
        );
        let (hanging, shared) = device(FakeScript {
            connect_hangs: true,
            ..FakeScript::default()
        });
        rig.handle.begin_connecting().await.unwrap();
        rig.signals
            .send(CentralSignal::DeviceDiscovered(hanging))
            .unwrap();

        sleep(Duration::from_millis(200)).await;
        assert!(rig.events.try_recv().is_err());
        assert_eq!(shared.disconnects(), 1);

        connect_happy(&mut rig).await;
        rig.link.shutdown().await;
    }

    // ------------------------------------------------------------------
    // Frame transfer
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn frames_reach_the_wire() {
        let mut rig = rig();
        let shared = connect_happy(&mut rig).await;

        rig.handle.send_text("ds -37\n").await.unwrap();
        assert_eq!(shared.writes(), vec![b"ds -37\n".to_vec()]);
        rig.link.shutdown().await;
    }

    #[tokio::test]
    async fn send_before_connect_fails() {
        let rig = rig();
        let error = rig.handle.send_text("ds 10\n").await.unwrap_err();
        assert!(matches!(error, LinkError::NotConnected));
        rig.link.shutdown().await;
    }

    #[tokio::test]
    async fn oversized_payload_is_rejected_without_a_write() {
        let mut rig = rig();
        let shared = connect_happy(&mut rig).await;

        let oversized = "x".repeat(21);
        let error = rig.handle.send_text(&oversized).await.unwrap_err();
        assert!(matches!(
            error,
            LinkError::PayloadTooLarge { len: 21, max: 20 }
        ));
        assert!(shared.writes().is_empty());
        rig.link.shutdown().await;
    }

    #[tokio::test]
    async fn write_failure_surfaces_and_the_link_survives() {
        let mut rig = rig();
        let shared = connect_happy(&mut rig).await;

        shared.fail_writes.store(true, Ordering::SeqCst);
        let error = rig.handle.send_text("ds 1\n").await.unwrap_err();
        assert!(matches!(error, LinkError::WriteFailed(_)));

        shared.fail_writes.store(false, Ordering::SeqCst);
        rig.handle.send_text("ds 2\n").await.unwrap();
        assert_eq!(shared.writes(), vec![b"ds 2\n".to_vec()]);
        rig.link.shutdown().await;
    }

    #[tokio::test]
    async fn notifications_surface_as_text() {
        let mut rig = rig();
        let shared = connect_happy(&mut rig).await;

        shared.push_notification(b"pong 1\n");
        assert_eq!(
            next_event(&mut rig.events).await,
            LinkEvent::TextReceived {
                text: "pong 1\n".to_string()
            }
        );
        rig.link.shutdown().await;
    }

    // ------------------------------------------------------------------
    // Shutdown
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn shutdown_while_connected_reports_disconnected() {
        let mut rig = rig();
        let shared = connect_happy(&mut rig).await;

        rig.link.shutdown().await;
        assert_eq!(
            next_event(&mut rig.events).await,
            LinkEvent::ConnectionChanged { connected: false }
        );
        assert_eq!(shared.disconnects(), 1);

        let error = rig.handle.begin_connecting().await.unwrap_err();
        assert!(matches!(error, LinkError::Closed));
    }
}
