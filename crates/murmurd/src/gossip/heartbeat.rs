//! Heartbeat broadcast.
//!
//! Periodically sends a heartbeat frame to every member and contact. The
//! payload lists the members we know, which is how peers that only share a
//! seed discover each other.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::net::UdpSocket;
use tokio::sync::broadcast;
use tokio::time;

use murmur_core::wire::{encode_frame, encode_member_list, FrameKind};

use super::Membership;

/// Build the heartbeat datagram for the current membership.
pub fn heartbeat_frame(membership: &Membership) -> Result<Vec<u8>> {
    let members = membership.member_addresses();
    let payload = encode_member_list(&members);
    Ok(encode_frame(FrameKind::Heartbeat, membership.local(), &payload)?)
}

/// Runs until shutdown.
pub async fn heartbeat_loop(
    socket: Arc<UdpSocket>,
    membership: Arc<Membership>,
    interval: Duration,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let mut ticker = time::interval(interval);

    tracing::info!(
        interval_ms = interval.as_millis() as u64,
        "heartbeat starting"
    );

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("heartbeat shutting down");
                return Ok(());
            }
            _ = ticker.tick() => {}
        }

        let frame = match heartbeat_frame(&membership) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!(error = %e, "failed to build heartbeat");
                continue;
            }
        };

        for target in membership.heartbeat_targets() {
            match socket.send_to(&frame, target).await {
                Ok(n) => tracing::trace!(bytes = n, %target, "heartbeat sent"),
                Err(e) => tracing::debug!(error = %e, %target, "heartbeat send failed"),
            }
        }
    }
}
