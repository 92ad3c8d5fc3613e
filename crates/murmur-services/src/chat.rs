//! Outbound chat.

use murmur_core::MessageEnvelope;

use crate::context::{ChatContext, SendError};

/// Send a chat line typed by the local user.
///
/// Surrounding whitespace is trimmed and blank lines are dropped without
/// error. The line is echoed to our own transcript before it is broadcast,
/// so it shows up without waiting on the gossip round trip.
pub fn send_message(ctx: &ChatContext, text: &str) -> Result<(), SendError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(());
    }

    ctx.presentation()
        .append_transcript_line(text, &ctx.local().username);

    ctx.broadcast_envelope(&MessageEnvelope::chat(text))
}
