//! Multi-node integration tests.
//!
//! Nodes are wired to an in-memory [`Hub`] standing in for the gossip
//! substrate. Broadcasts are queued and delivered to every other node when
//! the test calls [`Hub::pump`], so delivery order is deterministic and the
//! tests can interleave membership changes between rounds.
//!
//! Timer-driven tests run with tokio's paused clock.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use murmur_core::{Peer, PeerAddress};
use murmur_services::{
    BroadcastError, BroadcastObserver, Broadcaster, ChatContext, LocalIdentity,
    MemoryPresentation, MembershipObserver, Router,
};

mod chat;
mod membership;
mod reconciliation;

// ── Harness ───────────────────────────────────────────────────────────────────

pub struct Node {
    pub ctx: Arc<ChatContext>,
    pub router: Arc<Router>,
    pub presentation: Arc<MemoryPresentation>,
}

impl Node {
    pub fn address(&self) -> &PeerAddress {
        &self.ctx.local().address
    }

    /// Name this node currently shows for `address`.
    pub fn name_of(&self, address: &str) -> String {
        self.ctx.directory().display_name(&PeerAddress::new(address))
    }

    pub fn is_complete(&self) -> bool {
        self.ctx.directory().find_any_incomplete().is_none()
    }
}

#[derive(Default)]
pub struct Hub {
    nodes: Mutex<Vec<Arc<Node>>>,
    queue: Mutex<VecDeque<(PeerAddress, Vec<u8>)>>,
    /// Nodes whose broadcasts fail, as if their substrate had shut down.
    closed: Mutex<Vec<PeerAddress>>,
}

struct HubLink {
    hub: Arc<Hub>,
    sender: PeerAddress,
}

impl Broadcaster for HubLink {
    fn broadcast(&self, payload: Vec<u8>) -> Result<(), BroadcastError> {
        if self.hub.closed.lock().unwrap().contains(&self.sender) {
            return Err(BroadcastError::Closed);
        }
        self.hub
            .queue
            .lock()
            .unwrap()
            .push_back((self.sender.clone(), payload));
        Ok(())
    }
}

impl Hub {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Start a node and make it and the existing nodes reachable to each
    /// other, the way the substrate reports a join.
    pub fn join(self: &Arc<Self>, address: &str, username: &str) -> Arc<Node> {
        let presentation = Arc::new(MemoryPresentation::new());
        let link = Arc::new(HubLink {
            hub: self.clone(),
            sender: PeerAddress::new(address),
        });
        let ctx = ChatContext::new(
            LocalIdentity::new(address, username),
            link,
            presentation.clone(),
        );
        let node = Arc::new(Node {
            router: Arc::new(Router::new(ctx.clone())),
            ctx,
            presentation,
        });

        node.ctx
            .directory()
            .on_peer_reachable(&Peer::new(address));

        let existing = self.nodes.lock().unwrap().clone();
        for other in &existing {
            other
                .ctx
                .directory()
                .on_peer_reachable(&Peer::new(address));
            node.ctx
                .directory()
                .on_peer_reachable(&Peer::new(other.address().clone()));
        }

        self.nodes.lock().unwrap().push(node.clone());
        node
    }

    /// Drop a node and report it unreachable to the rest.
    pub fn leave(&self, address: &str) {
        let address = PeerAddress::new(address);
        let remaining: Vec<Arc<Node>> = {
            let mut nodes = self.nodes.lock().unwrap();
            nodes.retain(|n| *n.address() != address);
            nodes.clone()
        };
        for node in remaining {
            node.ctx
                .directory()
                .on_peer_unreachable(&Peer::new(address.clone()));
        }
        self.queue.lock().unwrap().retain(|(s, _)| *s != address);
    }

    pub fn close(&self, address: &str) {
        self.closed.lock().unwrap().push(PeerAddress::new(address));
    }

    /// Deliver queued broadcasts, including the replies they trigger, until
    /// the queue is empty. Returns how many broadcasts were delivered.
    pub fn pump(&self) -> usize {
        let mut delivered = 0;
        loop {
            let next = self.queue.lock().unwrap().pop_front();
            let Some((sender, payload)) = next else {
                return delivered;
            };
            let nodes = self.nodes.lock().unwrap().clone();
            for node in nodes.iter().filter(|n| *n.address() != sender) {
                node.router.on_broadcast(&sender, &payload);
            }
            delivered += 1;
        }
    }

    pub fn pending(&self) -> usize {
        self.queue.lock().unwrap().len()
    }

    pub fn nodes(&self) -> Vec<Arc<Node>> {
        self.nodes.lock().unwrap().clone()
    }

    /// Every node's view of every address, for convergence checks.
    pub fn views(&self) -> HashMap<PeerAddress, HashMap<PeerAddress, String>> {
        self.nodes()
            .iter()
            .map(|n| (n.address().clone(), n.ctx.directory().snapshot_known_identities()))
            .collect()
    }
}
