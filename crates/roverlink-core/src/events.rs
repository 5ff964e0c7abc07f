//! Events surfaced by a link to the application layer.

use tokio::sync::mpsc;

use crate::config::ChannelConfig;

/// Connection and inbound-text notifications from a link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// The link reached or left the connected state.
    ConnectionChanged { connected: bool },
    /// One inbound notification decoded as text, passed through verbatim.
    TextReceived { text: String },
}

pub type LinkEventSender = mpsc::Sender<LinkEvent>;
pub type LinkEventReceiver = mpsc::Receiver<LinkEvent>;

/// Creates the event channel between a link task and the application.
pub fn link_event_channel(config: &ChannelConfig) -> (LinkEventSender, LinkEventReceiver) {
    mpsc::channel(config.event_buffer)
}
