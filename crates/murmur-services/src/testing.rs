//! Test doubles shared by the unit tests in this crate.

use std::sync::{Arc, Mutex};

use murmur_core::codec;
use murmur_core::MessageEnvelope;

use crate::context::{ChatContext, LocalIdentity};
use crate::presentation::MemoryPresentation;
use crate::substrate::{BroadcastError, Broadcaster};

/// Keeps every payload it is asked to broadcast.
#[derive(Default)]
pub struct RecordingBroadcaster {
    sent: Mutex<Vec<Vec<u8>>>,
}

impl RecordingBroadcaster {
    pub fn envelopes(&self) -> Vec<MessageEnvelope> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|b| codec::decode(b).expect("broadcast payload should decode"))
            .collect()
    }
}

impl Broadcaster for RecordingBroadcaster {
    fn broadcast(&self, payload: Vec<u8>) -> Result<(), BroadcastError> {
        self.sent.lock().unwrap().push(payload);
        Ok(())
    }
}

/// Refuses everything, like a substrate that has shut down.
pub struct ClosedBroadcaster;

impl Broadcaster for ClosedBroadcaster {
    fn broadcast(&self, _payload: Vec<u8>) -> Result<(), BroadcastError> {
        Err(BroadcastError::Closed)
    }
}

pub struct Harness {
    pub ctx: Arc<ChatContext>,
    pub sent: Arc<RecordingBroadcaster>,
    pub presentation: Arc<MemoryPresentation>,
}

/// Context for local peer `C:3` named `carol`.
pub fn harness() -> Harness {
    let sent = Arc::new(RecordingBroadcaster::default());
    let presentation = Arc::new(MemoryPresentation::new());
    let ctx = ChatContext::new(
        LocalIdentity::new("C:3", "carol"),
        sent.clone(),
        presentation.clone(),
    );
    Harness {
        ctx,
        sent,
        presentation,
    }
}

pub fn closed_harness() -> (Arc<ChatContext>, Arc<MemoryPresentation>) {
    let presentation = Arc::new(MemoryPresentation::new());
    let ctx = ChatContext::new(
        LocalIdentity::new("C:3", "carol"),
        Arc::new(ClosedBroadcaster),
        presentation.clone(),
    );
    (ctx, presentation)
}
