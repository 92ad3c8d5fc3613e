//! Capability traits at the seam with the membership substrate.
//!
//! The substrate owns discovery, liveness and delivery. It reports
//! membership changes to a [`MembershipObserver`], hands every received
//! broadcast to a [`BroadcastObserver`], and exposes its send primitive as a
//! [`Broadcaster`]. Implementations are registered by injection at startup.

use murmur_core::{Peer, PeerAddress};

/// Receives membership changes. Implemented by the directory.
pub trait MembershipObserver: Send + Sync {
    /// A peer (possibly ourselves) became reachable.
    fn on_peer_reachable(&self, peer: &Peer);

    /// A peer stopped answering. May arrive for peers never registered.
    fn on_peer_unreachable(&self, peer: &Peer);
}

/// Receives broadcast payloads. Implemented by the router.
pub trait BroadcastObserver: Send + Sync {
    /// `payload` is the raw bytes exactly as broadcast by `sender`.
    fn on_broadcast(&self, sender: &PeerAddress, payload: &[u8]);
}

/// Best-effort fan-out to every peer. No ordering, no delivery receipt.
pub trait Broadcaster: Send + Sync {
    fn broadcast(&self, payload: Vec<u8>) -> Result<(), BroadcastError>;
}

#[derive(Debug, thiserror::Error)]
pub enum BroadcastError {
    #[error("broadcast channel closed")]
    Closed,
    #[error("payload of {0} bytes exceeds the broadcast limit")]
    Oversized(usize),
}
