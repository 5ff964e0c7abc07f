//! Configuration for the command scheduler and channel sizing.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Pacing and keep-alive settings for the command scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Gap between transmissions; at most one command leaves per interval.
    pub command_interval: Duration,
    /// Idle intervals to wait before transmitting a keep-alive.
    pub keepalive_interval_ticks: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            command_interval: Duration::from_millis(50),
            keepalive_interval_ticks: 10,
        }
    }
}

impl SchedulerConfig {
    pub fn with_command_interval(mut self, interval: Duration) -> Self {
        self.command_interval = interval;
        self
    }

    pub fn with_keepalive_interval_ticks(mut self, ticks: u32) -> Self {
        self.keepalive_interval_ticks = ticks;
        self
    }
}

/// Buffer sizes for the channels between tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Capacity of link event channels toward the application.
    pub event_buffer: usize,
    /// Capacity of request channels into owning tasks.
    pub request_buffer: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        ChannelConfig {
            event_buffer: 32,
            request_buffer: 32,
        }
    }
}

impl ChannelConfig {
    pub fn with_event_buffer(mut self, capacity: usize) -> Self {
        self.event_buffer = capacity;
        self
    }

    pub fn with_request_buffer(mut self, capacity: usize) -> Self {
        self.request_buffer = capacity;
        self
    }
}
