//! Pending command queue with merge-by-name and priority ordering.

use smallvec::SmallVec;

use crate::command::Command;

/// Ordered set of commands awaiting transmission.
///
/// Holds at most one entry per command name, sorted by priority tier with
/// arrival order preserved within a tier. Bursty producers collapse to the
/// latest value instead of growing the queue.
#[derive(Debug, Default)]
pub struct CommandQueue {
    entries: SmallVec<[Command; 8]>,
}

impl CommandQueue {
    pub fn new() -> Self {
        CommandQueue::default()
    }

    /// Merges a command into the queue.
    ///
    /// An entry with the same name and priority is replaced in place, so
    /// the update keeps its turn. A priority change re-inserts the entry
    /// at its new tier. New names go in front of the first strictly lower
    /// tier.
    pub fn enqueue(&mut self, command: Command) {
        if let Some(existing) = self
            .entries
            .iter()
            .position(|c| c.name() == command.name())
        {
            if self.entries[existing].priority() == command.priority() {
                self.entries[existing] = command;
                return;
            }
            self.entries.remove(existing);
        }
        let at = self
            .entries
            .iter()
            .position(|c| c.priority() < command.priority())
            .unwrap_or(self.entries.len());
        self.entries.insert(at, command);
    }

    /// Removes and returns the next command to transmit.
    pub fn pop_front(&mut self) -> Option<Command> {
        if self.entries.is_empty() {
            None
        } else {
            Some(self.entries.remove(0))
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
