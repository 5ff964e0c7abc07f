//! Command transport core for a remotely operated robot.
//!
//! Reduces operator intents to one paced, priority-ordered command stream
//! and hands each command to a pluggable link transport. Link crates plug
//! in underneath; this crate never touches a radio.
//!
//! ## Architecture
//!
//! - [`command`] - Command names, priorities, and the reserved vocabulary
//! - [`frame`] - Wire-line encoding and the per-write frame limit
//! - [`queue`] - Merging, priority-ordered pending queue
//! - [`scheduler`] - Paced transmission with keep-alive coverage
//! - [`link`] - The `LinkTransport` capability and an in-memory link
//! - [`events`] - Connection and inbound-text events
//! - [`session`] - Scheduler lifecycle bound to connection state
//!
//! ## Usage
//!
//! ```rust,no_run
//! use roverlink_core::{Command, LinkEvent, LinkSession, MemoryLink, SchedulerConfig};
//!
//! # async fn example() {
//! let link = MemoryLink::new();
//! let mut session = LinkSession::new(link.clone(), SchedulerConfig::default());
//!
//! // A connected link gets a scheduler; commands flow one per interval.
//! session
//!     .handle_event(&LinkEvent::ConnectionChanged { connected: true })
//!     .await;
//! session.enqueue(Command::drive_speed(40));
//!
//! session.shutdown().await;
//! # }
//! ```

pub mod command;
pub mod config;
pub mod errors;
pub mod events;
pub mod frame;
pub mod link;
pub mod queue;
pub mod scheduler;
pub mod session;

// Public API exports
pub use command::{Command, CommandName, InvalidCommandName, Priority};
pub use config::{ChannelConfig, SchedulerConfig};
pub use errors::{LinkError, LinkResult};
pub use events::{link_event_channel, LinkEvent, LinkEventReceiver, LinkEventSender};
pub use frame::MAX_FRAME_BYTES;
pub use link::{LinkTransport, MemoryLink};
pub use queue::CommandQueue;
pub use scheduler::{spawn_scheduler, CommandScheduler, SchedulerHandle};
pub use session::LinkSession;
