//! Command model for the robot wire protocol.
//!
//! A command pairs a two-letter opcode with a signed value, e.g. `ds -37`
//! drives the chassis backwards at 37% speed. The scheduler treats names
//! opaquely; only the keep-alive opcode has reserved meaning to it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ----------------------------------------------------------------------------
// Command Names
// ----------------------------------------------------------------------------

/// Two-letter opcode identifying what a command controls.
///
/// Names are case-sensitive and compared byte-for-byte. The firmware's
/// reserved vocabulary is exposed as associated constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommandName([u8; 2]);

impl CommandName {
    /// Chassis speed in percent, negative for reverse (`ds`).
    pub const DRIVE_SPEED: CommandName = CommandName(*b"ds");
    /// Chassis turn rate in percent, negative for left (`dt`).
    pub const DRIVE_TURN: CommandName = CommandName(*b"dt");
    /// Left motor throttle (`ml`).
    pub const MOTOR_LEFT: CommandName = CommandName(*b"ml");
    /// Right motor throttle (`mr`).
    pub const MOTOR_RIGHT: CommandName = CommandName(*b"mr");
    /// Failsafe release after an emergency stop (`ef`).
    pub const RELEASE_FAILSAFE: CommandName = CommandName(*b"ef");
    /// Keep-alive heartbeat (`ka`).
    pub const KEEP_ALIVE: CommandName = CommandName(*b"ka");

    /// Builds a name from its two raw bytes.
    pub const fn from_bytes(bytes: [u8; 2]) -> Self {
        CommandName(bytes)
    }

    /// The raw opcode bytes.
    pub const fn as_bytes(&self) -> [u8; 2] {
        self.0
    }
}

impl fmt::Display for CommandName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.0[0] as char, self.0[1] as char)
    }
}

/// Error returned when parsing a command name from text fails.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid command name {0:?}: expected exactly two ASCII letters or digits")]
pub struct InvalidCommandName(pub String);

impl FromStr for CommandName {
    type Err = InvalidCommandName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.as_bytes() {
            [a, b] if a.is_ascii_alphanumeric() && b.is_ascii_alphanumeric() => {
                Ok(CommandName([*a, *b]))
            }
            _ => Err(InvalidCommandName(s.to_string())),
        }
    }
}

// ----------------------------------------------------------------------------
// Priority
// ----------------------------------------------------------------------------

/// Scheduling tier of a command.
///
/// Higher tiers transmit first; commands within one tier keep arrival
/// order.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Priority {
    /// Routine traffic, e.g. repeated joystick samples.
    #[default]
    Normal,
    /// Operator intents that should preempt routine traffic.
    High,
    /// Safety-relevant commands such as a full stop.
    Critical,
}

// ----------------------------------------------------------------------------
// Commands
// ----------------------------------------------------------------------------

/// A single robot command: opcode, signed value, scheduling tier.
///
/// Commands are immutable once built; the queue replaces entries rather
/// than mutating them when a newer value arrives for the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    name: CommandName,
    value: i32,
    priority: Priority,
}

impl Command {
    /// Creates a command at [`Priority::Normal`].
    pub fn new(name: CommandName, value: i32) -> Self {
        Command::with_priority(name, value, Priority::Normal)
    }

    /// Creates a command at an explicit priority.
    pub fn with_priority(name: CommandName, value: i32, priority: Priority) -> Self {
        Command {
            name,
            value,
            priority,
        }
    }

    /// The keep-alive heartbeat, `ka 0`.
    pub fn keep_alive() -> Self {
        Command::new(CommandName::KEEP_ALIVE, 0)
    }

    /// Chassis speed in percent, negative for reverse.
    pub fn drive_speed(percent: i32) -> Self {
        Command::with_priority(CommandName::DRIVE_SPEED, percent, Priority::High)
    }

    /// Chassis turn rate in percent, negative for left.
    pub fn drive_turn(percent: i32) -> Self {
        Command::with_priority(CommandName::DRIVE_TURN, percent, Priority::High)
    }

    /// Left motor throttle in percent.
    pub fn motor_left(percent: i32) -> Self {
        Command::with_priority(CommandName::MOTOR_LEFT, percent, Priority::High)
    }

    /// Right motor throttle in percent.
    pub fn motor_right(percent: i32) -> Self {
        Command::with_priority(CommandName::MOTOR_RIGHT, percent, Priority::High)
    }

    /// Releases the firmware failsafe after an emergency stop, `ef 0`.
    pub fn release_failsafe() -> Self {
        Command::with_priority(CommandName::RELEASE_FAILSAFE, 0, Priority::High)
    }

    /// Zeroes both motors at [`Priority::Critical`], jumping all queued
    /// traffic.
    pub fn full_stop() -> [Self; 2] {
        [
            Command::with_priority(CommandName::MOTOR_LEFT, 0, Priority::Critical),
            Command::with_priority(CommandName::MOTOR_RIGHT, 0, Priority::Critical),
        ]
    }

    pub fn name(&self) -> CommandName {
        self.name
    }

    pub fn value(&self) -> i32 {
        self.value
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.value)
    }
}
