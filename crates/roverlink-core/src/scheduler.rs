//! Priority command scheduler.
//!
//! One command leaves per pacing interval. Bursty producers are absorbed
//! by the merging queue; silence is covered by a keep-alive so the robot's
//! failsafe knows the operator is still there.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, warn};

use crate::command::Command;
use crate::config::SchedulerConfig;
use crate::errors::LinkResult;
use crate::frame;
use crate::link::LinkTransport;
use crate::queue::CommandQueue;

// ----------------------------------------------------------------------------
// Scheduler Core
// ----------------------------------------------------------------------------

/// Deterministic scheduler state: queue, keep-alive countdown, disposal.
///
/// Driven externally, one [`tick`](CommandScheduler::tick) per pacing
/// interval. The timer lives in [`spawn_scheduler`]; driving `tick`
/// directly keeps tests clock-free.
#[derive(Debug)]
pub struct CommandScheduler<L: LinkTransport> {
    link: L,
    queue: CommandQueue,
    keepalive_ticks: u32,
    ticks_until_keepalive: u32,
    disposed: bool,
}

impl<L: LinkTransport> CommandScheduler<L> {
    pub fn new(link: L, config: &SchedulerConfig) -> Self {
        // A zero threshold would turn every idle tick into a heartbeat.
        let keepalive_ticks = config.keepalive_interval_ticks.max(1);
        CommandScheduler {
            link,
            queue: CommandQueue::new(),
            keepalive_ticks,
            ticks_until_keepalive: keepalive_ticks,
            disposed: false,
        }
    }

    /// Merges a command into the pending queue.
    pub fn enqueue(&mut self, command: Command) {
        self.queue.enqueue(command);
    }

    /// One pacing tick: transmit the front command, or count down to a
    /// keep-alive while the queue is empty.
    ///
    /// Returns the command transmitted this tick, if any. The countdown
    /// resets only after a successful transmission; a failed command is
    /// not re-queued.
    pub async fn tick(&mut self) -> LinkResult<Option<Command>> {
        if self.disposed {
            return Ok(None);
        }
        let command = match self.queue.pop_front() {
            Some(command) => command,
            None => {
                self.ticks_until_keepalive = self.ticks_until_keepalive.saturating_sub(1);
                if self.ticks_until_keepalive > 0 {
                    return Ok(None);
                }
                Command::keep_alive()
            }
        };
        self.transmit(command).await?;
        self.ticks_until_keepalive = self.keepalive_ticks;
        Ok(Some(command))
    }

    async fn transmit(&mut self, command: Command) -> LinkResult<()> {
        let text = frame::encode(&command);
        self.link.send_text(&text).await?;
        debug!(command = %command, "transmitted");
        Ok(())
    }

    /// Stops the scheduler. Idempotent; later ticks transmit nothing,
    /// even with commands still queued.
    pub fn dispose(&mut self) {
        self.disposed = true;
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Commands currently waiting.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

// ----------------------------------------------------------------------------
// Scheduler Task
// ----------------------------------------------------------------------------

enum SchedulerRequest {
    Enqueue(Command),
    Shutdown { done: oneshot::Sender<()> },
}

/// Handle to a running scheduler task.
///
/// Enqueueing never blocks the caller; the pacing timer lives inside the
/// task. Dropping the handle also shuts the task down.
#[derive(Debug)]
pub struct SchedulerHandle {
    requests: mpsc::UnboundedSender<SchedulerRequest>,
    task: Option<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Queues a command for transmission. Returns `false` once the task
    /// has shut down.
    pub fn enqueue(&self, command: Command) -> bool {
        self.requests
            .send(SchedulerRequest::Enqueue(command))
            .is_ok()
    }

    /// Whether the scheduler task is still running.
    pub fn is_active(&self) -> bool {
        !self.requests.is_closed()
    }

    /// Stops the timer and waits for the task to exit. Idempotent; no
    /// transmission happens after this returns.
    pub async fn shutdown(&mut self) {
        if let Some(task) = self.task.take() {
            let (done, finished) = oneshot::channel();
            if self
                .requests
                .send(SchedulerRequest::Shutdown { done })
                .is_ok()
            {
                let _ = finished.await;
            }
            let _ = task.await;
        }
    }
}

/// Spawns the timer-driven scheduler task over a link.
pub fn spawn_scheduler<L>(link: L, config: &SchedulerConfig) -> SchedulerHandle
where
    L: LinkTransport + Send + 'static,
{
    let (requests, inbox) = mpsc::unbounded_channel();
    let scheduler = CommandScheduler::new(link, config);
    let task = tokio::spawn(run_scheduler(scheduler, inbox, config.command_interval));
    SchedulerHandle {
        requests,
        task: Some(task),
    }
}

async fn run_scheduler<L: LinkTransport>(
    mut scheduler: CommandScheduler<L>,
    mut inbox: mpsc::UnboundedReceiver<SchedulerRequest>,
    interval: Duration,
) {
    // First tick one full interval after start, matching the pacing gap.
    let mut ticker = time::interval_at(time::Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    debug!(?interval, "scheduler started");
    loop {
        tokio::select! {
            request = inbox.recv() => match request {
                Some(SchedulerRequest::Enqueue(command)) => scheduler.enqueue(command),
                Some(SchedulerRequest::Shutdown { done }) => {
                    scheduler.dispose();
                    let _ = done.send(());
                    break;
                }
                None => {
                    scheduler.dispose();
                    break;
                }
            },
            _ = ticker.tick() => {
                if let Err(error) = scheduler.tick().await {
                    warn!(%error, "command transmission failed");
                }
            }
        }
    }
    debug!("scheduler stopped");
}
