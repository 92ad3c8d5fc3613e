//! Routes received broadcasts by envelope kind.

use std::collections::HashMap;
use std::sync::Arc;

use murmur_core::codec;
use murmur_core::{MessageEnvelope, PeerAddress};

use crate::context::ChatContext;
use crate::reconcile::broadcast_identities;
use crate::substrate::BroadcastObserver;

/// Broadcast handler registered with the substrate.
pub struct Router {
    ctx: Arc<ChatContext>,
}

impl Router {
    pub fn new(ctx: Arc<ChatContext>) -> Self {
        Self { ctx }
    }

    /// Decode and dispatch one broadcast. Malformed input is logged and
    /// dropped; nothing here fails the caller.
    pub fn route(&self, sender: &PeerAddress, payload: &[u8]) {
        tracing::trace!(sender = %sender, bytes = payload.len(), "broadcast received");

        let envelope = match codec::decode(payload) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(sender = %sender, error = %e, "dropping undecodable broadcast");
                self.ctx
                    .notice(format!("Failed to receive message from {sender}: {e}"));
                return;
            }
        };

        match envelope {
            MessageEnvelope::IdentityBatch { identities } => self.on_identity_batch(identities),
            MessageEnvelope::IdentityRequest { address } => self.on_identity_request(&address),
            MessageEnvelope::Chat { text } => self.on_chat(sender, &text),
        }
    }

    fn on_identity_batch(&self, identities: HashMap<PeerAddress, String>) {
        tracing::debug!(count = identities.len(), "received identity batch");
        if let Err(e) = self.ctx.directory().apply_identity_batch(&identities) {
            tracing::warn!(error = %e, "rejected identity batch");
            self.ctx.notice(format!("Ignored identity batch: {e}"));
        }
    }

    fn on_identity_request(&self, address: &PeerAddress) {
        let local = &self.ctx.local().address;
        tracing::debug!(requested = %address, local = %local, "received identity request");
        if address != local {
            return;
        }

        match broadcast_identities(&self.ctx) {
            Ok(()) => {
                tracing::info!("broadcast known identities in reply to request");
                self.ctx.notice("Successfully broadcast usernames to the group");
            }
            Err(e) => {
                tracing::warn!(error = %e, "identity reply failed");
                self.ctx
                    .notice(format!("Tried to broadcast usernames but failed: {e}"));
            }
        }
    }

    fn on_chat(&self, sender: &PeerAddress, text: &str) {
        let name = self.ctx.directory().display_name(sender);
        self.ctx.presentation().append_transcript_line(text, &name);
    }
}

impl BroadcastObserver for Router {
    fn on_broadcast(&self, sender: &PeerAddress, payload: &[u8]) {
        self.route(sender, payload);
    }
}
