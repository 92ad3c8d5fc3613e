//! Frame listener and member expiry.
//!
//! The listener parses every datagram on the node socket, refreshes the
//! sender's liveness, learns addresses from heartbeats and hands broadcast
//! payloads to the router. A separate expiry task removes silent members.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::net::UdpSocket;
use tokio::sync::broadcast;

use murmur_core::wire::{decode_frame, decode_member_list, FrameKind, MAX_DATAGRAM};
use murmur_services::BroadcastObserver;

use super::Membership;

/// Handle one received datagram. Malformed frames are dropped.
pub fn handle_datagram(
    membership: &Membership,
    observer: &dyn BroadcastObserver,
    datagram: &[u8],
    source: SocketAddr,
) {
    let frame = match decode_frame(datagram) {
        Ok(f) => f,
        Err(e) => {
            tracing::trace!(%source, error = %e, "dropping malformed frame");
            return;
        }
    };

    // our own frames can come back through a seed that lists us
    if frame.origin == *membership.local() {
        tracing::trace!("ignoring own frame");
        return;
    }

    membership.observe(&frame.origin, source);

    match frame.kind {
        FrameKind::Heartbeat => {
            for address in decode_member_list(frame.payload) {
                membership.add_contact(address, false);
            }
        }
        FrameKind::Broadcast => {
            observer.on_broadcast(&frame.origin, frame.payload);
        }
    }
}

/// Receive frames until shutdown.
pub async fn listener_loop(
    socket: Arc<UdpSocket>,
    membership: Arc<Membership>,
    observer: Arc<dyn BroadcastObserver>,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let mut buf = vec![0u8; MAX_DATAGRAM];

    tracing::info!(local = %membership.local(), "frame listener starting");

    loop {
        let (len, source) = tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("frame listener shutting down");
                return Ok(());
            }
            r = socket.recv_from(&mut buf) => match r {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!(error = %e, "recv_from failed");
                    continue;
                }
            },
        };

        handle_datagram(&membership, observer.as_ref(), &buf[..len], source);
    }
}

/// Remove members that have not been heard from within `ttl`.
pub async fn expiry_loop(
    membership: Arc<Membership>,
    ttl: Duration,
    check_interval: Duration,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let mut interval = tokio::time::interval(check_interval);

    loop {
        tokio::select! {
            _ = shutdown.recv() => return Ok(()),
            _ = interval.tick() => {}
        }

        let removed = membership.expire(ttl);
        if !removed.is_empty() {
            tracing::debug!(
                removed = removed.len(),
                remaining = membership.member_count(),
                "expired silent members"
            );
        }
    }
}
