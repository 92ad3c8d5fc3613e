//! Identity reconciliation: fills in names the directory does not know yet.
//!
//! Once per interval the reconciler picks one peer with an unknown name and
//! broadcasts an `IdentityRequest` naming it. The substrate cannot reach a
//! single peer directly, so the request goes to everyone and only the named
//! peer answers, by broadcasting every name it knows. A failed broadcast is
//! logged and the next tick tries again.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::{self, Instant, MissedTickBehavior};

use murmur_core::{MessageEnvelope, PeerAddress};

use crate::context::{ChatContext, SendError};

/// Ask the peer at `address` to broadcast its known names.
pub fn request_identities(ctx: &ChatContext, address: &PeerAddress) -> Result<(), SendError> {
    tracing::debug!(peer = %address, "sending identity request");
    ctx.broadcast_envelope(&MessageEnvelope::identity_request(address.clone()))
}

/// Broadcast every name we know, ourselves included.
pub fn broadcast_identities(ctx: &ChatContext) -> Result<(), SendError> {
    let identities = ctx.directory().snapshot_known_identities();
    tracing::debug!(count = identities.len(), "broadcasting known identities");
    ctx.broadcast_envelope(&MessageEnvelope::identity_batch(identities))
}

/// One reconciliation step. Returns the peer a request was issued for.
pub fn reconcile_tick(ctx: &ChatContext) -> Option<PeerAddress> {
    tracing::debug!("checking for peers with a missing name");

    let missing = ctx.directory().find_any_incomplete()?;
    if let Err(e) = request_identities(ctx, &missing) {
        tracing::warn!(peer = %missing, error = %e, "identity request failed");
        ctx.notice(format!("Error requesting missing usernames: {e}"));
    }
    Some(missing)
}

/// The periodic reconciliation task.
pub struct Reconciler {
    ctx: Arc<ChatContext>,
    interval: Duration,
    shutdown: broadcast::Receiver<()>,
}

impl Reconciler {
    pub fn new(
        ctx: Arc<ChatContext>,
        interval: Duration,
        shutdown: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            ctx,
            interval,
            shutdown,
        }
    }

    /// Tick until shutdown is signalled or its sender is dropped. The first
    /// check happens one full interval after start.
    pub async fn run(mut self) {
        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            interval_secs = self.interval.as_secs_f64(),
            "identity reconciler starting"
        );

        loop {
            tokio::select! {
                _ = self.shutdown.recv() => {
                    tracing::info!("identity reconciler shutting down");
                    return;
                }
                _ = ticker.tick() => {
                    reconcile_tick(&self.ctx);
                }
            }
        }
    }
}
