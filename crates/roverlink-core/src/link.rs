//! Link transport capability used by the scheduler.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::errors::{LinkError, LinkResult};
use crate::frame;

/// Write side of a serial link.
///
/// Completion of [`send_text`](LinkTransport::send_text) means the payload
/// was handed to the link, not that the peer received it. Loss shows up as
/// a stale robot, which the keep-alive covers.
#[async_trait]
pub trait LinkTransport: Send {
    async fn send_text(&mut self, text: &str) -> LinkResult<()>;
}

/// In-memory link that records outbound frames.
///
/// Stands in for a live link in tests and dry runs. Cloned handles share
/// one record.
#[derive(Debug, Clone, Default)]
pub struct MemoryLink {
    sent: Arc<Mutex<Vec<String>>>,
    fail_next: Arc<Mutex<Option<LinkError>>>,
}

impl MemoryLink {
    pub fn new() -> Self {
        MemoryLink::default()
    }

    /// Frames sent so far, oldest first.
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }

    /// Drains and returns the recorded frames.
    pub fn take_sent(&self) -> Vec<String> {
        self.sent
            .lock()
            .map(|mut sent| std::mem::take(&mut *sent))
            .unwrap_or_default()
    }

    /// Makes the next send fail with the given error.
    pub fn fail_next(&self, error: LinkError) {
        if let Ok(mut slot) = self.fail_next.lock() {
            *slot = Some(error);
        }
    }
}

#[async_trait]
impl LinkTransport for MemoryLink {
    async fn send_text(&mut self, text: &str) -> LinkResult<()> {
        frame::ensure_within_limit(text)?;
        if let Ok(mut slot) = self.fail_next.lock() {
            if let Some(error) = slot.take() {
                return Err(error);
            }
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(text.to_string());
        }
        Ok(())
    }
}
