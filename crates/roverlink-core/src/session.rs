//! Scheduler lifecycle bound to connection state.

use tracing::trace;

use crate::command::Command;
use crate::config::SchedulerConfig;
use crate::events::LinkEvent;
use crate::link::LinkTransport;
use crate::scheduler::{spawn_scheduler, SchedulerHandle};

/// Owns the scheduler-per-connection lifecycle.
///
/// Feed it every [`LinkEvent`]: a scheduler is spawned over a clone of
/// the link when the connection comes up and shut down when it drops.
/// Commands enqueued while disconnected are dropped, not buffered.
#[derive(Debug)]
pub struct LinkSession<L>
where
    L: LinkTransport + Clone + Send + 'static,
{
    link: L,
    config: SchedulerConfig,
    scheduler: Option<SchedulerHandle>,
}

impl<L> LinkSession<L>
where
    L: LinkTransport + Clone + Send + 'static,
{
    pub fn new(link: L, config: SchedulerConfig) -> Self {
        LinkSession {
            link,
            config,
            scheduler: None,
        }
    }

    /// Reacts to a connection transition; inbound text is left to the
    /// caller.
    pub async fn handle_event(&mut self, event: &LinkEvent) {
        match event {
            LinkEvent::ConnectionChanged { connected: true } => {
                if self.scheduler.is_none() {
                    self.scheduler = Some(spawn_scheduler(self.link.clone(), &self.config));
                }
            }
            LinkEvent::ConnectionChanged { connected: false } => {
                if let Some(mut scheduler) = self.scheduler.take() {
                    scheduler.shutdown().await;
                }
            }
            LinkEvent::TextReceived { .. } => {}
        }
    }

    /// Queues a command on the active scheduler. Returns `false` while
    /// disconnected; such commands are dropped.
    pub fn enqueue(&self, command: Command) -> bool {
        match &self.scheduler {
            Some(scheduler) => scheduler.enqueue(command),
            None => {
                trace!(name = %command.name(), "dropping command while disconnected");
                false
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        self.scheduler.as_ref().is_some_and(|s| s.is_active())
    }

    /// Shuts down any active scheduler.
    pub async fn shutdown(&mut self) {
        if let Some(mut scheduler) = self.scheduler.take() {
            scheduler.shutdown().await;
        }
    }
}
