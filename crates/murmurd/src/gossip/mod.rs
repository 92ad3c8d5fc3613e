//! Gossip substrate. Discovers peers, tracks their liveness and carries
//! broadcasts between them over UDP.
//!
//! Every node heartbeats to everything it knows about: live members plus
//! contacts (the seed peer and addresses learned from other heartbeats).
//! The first frame from an unseen origin makes it a member and raises
//! `on_peer_reachable`; a member that stays silent past the TTL is removed
//! and raises `on_peer_unreachable`. Both callbacks run while the member's
//! map entry is locked, so the observer sees joins and expiries of one peer
//! in the order they were applied. Observers must not call back into
//! `Membership`.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use murmur_core::{Peer, PeerAddress};
use murmur_services::MembershipObserver;

pub mod heartbeat;
pub mod listener;
pub mod send_worker;

/// A live peer.
#[derive(Debug, Clone)]
pub struct Member {
    /// Where frames for this peer are sent.
    pub socket: SocketAddr,
    /// Last time any frame arrived from this peer. Used for TTL expiry.
    pub last_seen: Instant,
}

/// An address we heartbeat to but have not heard from yet.
#[derive(Debug, Clone)]
struct Contact {
    socket: SocketAddr,
    added: Instant,
    /// The seed is kept forever so a partitioned node can rejoin.
    seed: bool,
}

/// Membership state shared by the heartbeat, listener, expiry and send tasks.
pub struct Membership {
    local: PeerAddress,
    members: DashMap<PeerAddress, Member>,
    contacts: DashMap<PeerAddress, Contact>,
    observer: Arc<dyn MembershipObserver>,
}

impl Membership {
    pub fn new(local: PeerAddress, observer: Arc<dyn MembershipObserver>) -> Self {
        Self {
            local,
            members: DashMap::new(),
            contacts: DashMap::new(),
            observer,
        }
    }

    pub fn local(&self) -> &PeerAddress {
        &self.local
    }

    /// Report ourselves as a reachable peer.
    pub fn announce_self(&self) {
        self.observer.on_peer_reachable(&Peer::new(self.local.clone()));
    }

    /// Remember an address to heartbeat to. Ignores ourselves, existing
    /// members and addresses that are not `ip:port`.
    pub fn add_contact(&self, address: PeerAddress, seed: bool) -> bool {
        if address == self.local || self.is_member(&address) {
            return false;
        }
        let socket = match address.as_str().parse::<SocketAddr>() {
            Ok(s) => s,
            Err(_) => {
                tracing::trace!(peer = %address, "ignoring unparseable contact address");
                return false;
            }
        };
        match self.contacts.entry(address) {
            Entry::Occupied(_) => false,
            Entry::Vacant(v) => {
                tracing::debug!(peer = %v.key(), seed, "new contact");
                v.insert(Contact {
                    socket,
                    added: Instant::now(),
                    seed,
                });
                true
            }
        }
    }

    /// Record a frame from `origin`, received from `source`. Returns true if
    /// the origin just became a member.
    pub fn observe(&self, origin: &PeerAddress, source: SocketAddr) -> bool {
        let socket = origin.as_str().parse().unwrap_or(source);
        match self.members.entry(origin.clone()) {
            Entry::Occupied(mut e) => {
                e.get_mut().last_seen = Instant::now();
                false
            }
            Entry::Vacant(v) => {
                let _member = v.insert(Member {
                    socket,
                    last_seen: Instant::now(),
                });
                self.contacts.remove_if(origin, |_, c| !c.seed);
                tracing::info!(peer = %origin, "peer reachable");
                self.observer.on_peer_reachable(&Peer::new(origin.clone()));
                true
            }
        }
    }

    /// Drop members silent for longer than `ttl`, and non-seed contacts that
    /// never answered within it. Returns the members removed.
    pub fn expire(&self, ttl: Duration) -> Vec<PeerAddress> {
        let stale: Vec<PeerAddress> = self
            .members
            .iter()
            .filter(|e| e.value().last_seen.elapsed() >= ttl)
            .map(|e| e.key().clone())
            .collect();

        let mut removed = Vec::new();
        for address in stale {
            let Entry::Occupied(e) = self.members.entry(address.clone()) else {
                continue;
            };
            // heard from again since the scan
            if e.get().last_seen.elapsed() < ttl {
                continue;
            }
            tracing::info!(peer = %address, "peer unreachable");
            self.observer.on_peer_unreachable(&Peer::new(address.clone()));
            e.remove();
            removed.push(address);
        }

        let before = self.contacts.len();
        self.contacts
            .retain(|_, c| c.seed || c.added.elapsed() < ttl);
        let pruned = before - self.contacts.len();
        if pruned > 0 {
            tracing::debug!(pruned, "dropped unanswered contacts");
        }

        removed
    }

    /// Sockets of live members.
    pub fn member_sockets(&self) -> Vec<SocketAddr> {
        self.members.iter().map(|e| e.value().socket).collect()
    }

    /// Everything a heartbeat goes to: members and contacts.
    pub fn heartbeat_targets(&self) -> Vec<SocketAddr> {
        let mut targets = self.member_sockets();
        for c in self.contacts.iter() {
            if !targets.contains(&c.value().socket) {
                targets.push(c.value().socket);
            }
        }
        targets
    }

    /// Addresses advertised in our heartbeats, ourselves included.
    pub fn member_addresses(&self) -> Vec<PeerAddress> {
        let mut addrs: Vec<PeerAddress> = self.members.iter().map(|e| e.key().clone()).collect();
        addrs.push(self.local.clone());
        addrs
    }

    pub fn is_member(&self, address: &PeerAddress) -> bool {
        self.members.contains_key(address)
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }
}

/// Resolve a `host:port` seed. IPv4 is preferred since the gossip socket is
/// bound to an IPv4 wildcard.
pub async fn resolve_seed(seed: &str) -> anyhow::Result<SocketAddr> {
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host(seed)
        .await
        .with_context(|| format!("failed to resolve seed peer {seed}"))?
        .collect();
    addrs
        .iter()
        .find(|a| a.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
        .with_context(|| format!("seed peer {seed} resolved to no addresses"))
}
