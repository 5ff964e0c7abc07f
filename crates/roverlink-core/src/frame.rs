//! Text framing for the serial wire protocol.
//!
//! Every command crosses the link as one short line, `"{name} {value}\n"`.
//! Lines must fit the transport's per-write ceiling; the check runs before
//! anything reaches a link.

use crate::command::Command;
use crate::errors::{LinkError, LinkResult};

/// Hard per-write limit of the outbound serial channel, in encoded bytes.
pub const MAX_FRAME_BYTES: usize = 20;

/// Encodes a command as its wire line, e.g. `"ds -37\n"`.
pub fn encode(command: &Command) -> String {
    format!("{} {}\n", command.name(), command.value())
}

/// Checks a payload against [`MAX_FRAME_BYTES`].
pub fn ensure_within_limit(text: &str) -> LinkResult<()> {
    let len = text.len();
    if len > MAX_FRAME_BYTES {
        return Err(LinkError::PayloadTooLarge {
            len,
            max: MAX_FRAME_BYTES,
        });
    }
    Ok(())
}
