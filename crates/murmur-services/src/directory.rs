//! Membership directory: who is in the room and what we call them.
//!
//! Keyed on `PeerAddress`. Entries appear when the substrate reports a peer
//! reachable and disappear when it reports the peer unreachable; identity
//! batches only ever rename peers that are already present. Names are
//! last-write-wins in receipt order, there is no versioning.
//!
//! Every operation takes the one lock around the map, so the substrate's
//! callbacks, the router, the reconciliation task and outbound sends can
//! all touch the directory concurrently.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use murmur_core::{Peer, PeerAddress};

use crate::context::LocalIdentity;
use crate::presentation::{Presentation, RosterEntry};
use crate::substrate::MembershipObserver;

/// Per-peer state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityRecord {
    peer: Peer,
    /// Empty until learned.
    display_name: String,
}

impl IdentityRecord {
    pub fn new(peer: Peer) -> Self {
        Self {
            peer,
            display_name: String::new(),
        }
    }

    pub fn with_name(peer: Peer, display_name: impl Into<String>) -> Self {
        Self {
            peer,
            display_name: display_name.into(),
        }
    }

    pub fn peer(&self) -> &Peer {
        &self.peer
    }

    /// The learned name, empty if unknown.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn is_complete(&self) -> bool {
        !self.display_name.is_empty()
    }

    /// Name for display: the learned name, else the transport address.
    pub fn name(&self) -> &str {
        if self.display_name.is_empty() {
            self.peer.address().as_str()
        } else {
            &self.display_name
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("received an empty identity batch")]
    EmptyBatch,
}

pub struct Directory {
    local: LocalIdentity,
    records: RwLock<HashMap<PeerAddress, IdentityRecord>>,
    presentation: Arc<dyn Presentation>,
}

impl Directory {
    pub fn new(local: LocalIdentity, presentation: Arc<dyn Presentation>) -> Self {
        Self {
            local,
            records: RwLock::new(HashMap::new()),
            presentation,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<PeerAddress, IdentityRecord>> {
        self.records.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<PeerAddress, IdentityRecord>> {
        self.records.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or replace the record for `peer`. Our own address gets our
    /// configured name straight away.
    pub fn add_peer(&self, peer: &Peer) {
        let address = peer.address().clone();
        let record = if address == self.local.address {
            IdentityRecord::with_name(peer.clone(), self.local.username.clone())
        } else {
            IdentityRecord::new(peer.clone())
        };

        let roster = {
            let mut records = self.write();
            records.insert(address, record);
            self.build_roster(&records)
        };
        self.presentation.refresh_roster(&roster);
    }

    /// Remove the record for `peer` if present. Absent peers are not an error.
    pub fn remove_peer(&self, peer: &Peer) -> bool {
        let (removed, roster) = {
            let mut records = self.write();
            let removed = records.remove(peer.address()).is_some();
            (removed, self.build_roster(&records))
        };
        self.presentation.refresh_roster(&roster);
        removed
    }

    /// Overwrite names for peers we already know. Unknown addresses are
    /// skipped: membership only comes from reachability events.
    ///
    /// Returns how many records were updated.
    pub fn apply_identity_batch(
        &self,
        batch: &HashMap<PeerAddress, String>,
    ) -> Result<usize, DirectoryError> {
        if batch.is_empty() {
            return Err(DirectoryError::EmptyBatch);
        }

        let (updated, roster) = {
            let mut records = self.write();
            let mut updated = 0;
            for (address, name) in batch {
                if let Some(record) = records.get_mut(address) {
                    record.display_name = name.clone();
                    updated += 1;
                }
            }
            (updated, self.build_roster(&records))
        };

        tracing::debug!(
            received = batch.len(),
            updated,
            "applied identity batch"
        );
        self.presentation.refresh_roster(&roster);
        Ok(updated)
    }

    /// Every name we know, plus ourselves even if our own entry is missing
    /// or blank.
    pub fn snapshot_known_identities(&self) -> HashMap<PeerAddress, String> {
        let mut known: HashMap<PeerAddress, String> = self
            .read()
            .iter()
            .filter(|(_, r)| r.is_complete())
            .map(|(a, r)| (a.clone(), r.display_name.clone()))
            .collect();
        known.insert(self.local.address.clone(), self.local.username.clone());
        known
    }

    /// Some peer whose name is still unknown. Which one is unspecified when
    /// several are missing.
    pub fn find_any_incomplete(&self) -> Option<PeerAddress> {
        self.read()
            .iter()
            .find(|(_, r)| !r.is_complete())
            .map(|(a, _)| a.clone())
    }

    /// Name to show for `address`: the learned name if there is one,
    /// otherwise the address itself. Unknown peers get the address too.
    pub fn display_name(&self, address: &PeerAddress) -> String {
        self.read()
            .get(address)
            .map(|r| r.name().to_string())
            .unwrap_or_else(|| address.to_string())
    }

    pub fn get(&self, address: &PeerAddress) -> Option<IdentityRecord> {
        self.read().get(address).cloned()
    }

    pub fn contains(&self, address: &PeerAddress) -> bool {
        self.read().contains_key(address)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Roster sorted by display name, then address.
    pub fn roster(&self) -> Vec<RosterEntry> {
        self.build_roster(&self.read())
    }

    /// Push the current roster to the presentation.
    pub fn refresh(&self) {
        let roster = self.roster();
        self.presentation.refresh_roster(&roster);
    }

    fn build_roster(&self, records: &HashMap<PeerAddress, IdentityRecord>) -> Vec<RosterEntry> {
        let mut roster: Vec<RosterEntry> = records
            .iter()
            .map(|(address, record)| RosterEntry {
                address: address.clone(),
                display_name: record.name().to_string(),
                is_local: *address == self.local.address,
            })
            .collect();
        roster.sort_by(|a, b| {
            a.display_name
                .cmp(&b.display_name)
                .then_with(|| a.address.cmp(&b.address))
        });
        roster
    }
}

impl MembershipObserver for Directory {
    fn on_peer_reachable(&self, peer: &Peer) {
        tracing::debug!(peer = %peer.address(), "adding a new node");
        self.add_peer(peer);
    }

    fn on_peer_unreachable(&self, peer: &Peer) {
        tracing::debug!(peer = %peer.address(), "removing a node");
        self.remove_peer(peer);
    }
}
