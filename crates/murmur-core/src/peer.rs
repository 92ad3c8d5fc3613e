//! Peer addressing.
//!
//! A `PeerAddress` is the `host:port` string the substrate uses to reach a
//! peer. It is the key for every identity lookup and never changes once a
//! peer has been assigned one.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Transport endpoint identifier, e.g. `"192.168.0.10:9999"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerAddress(String);

impl PeerAddress {
    pub fn new(addr: impl Into<String>) -> Self {
        Self(addr.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for PeerAddress {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for PeerAddress {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for PeerAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Handle to a peer as reported by the membership substrate.
///
/// The directory keeps one of these per record but does not own the peer's
/// lifecycle; it is only used to re-derive the transport address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peer {
    address: PeerAddress,
}

impl Peer {
    pub fn new(address: impl Into<PeerAddress>) -> Self {
        Self {
            address: address.into(),
        }
    }

    pub fn address(&self) -> &PeerAddress {
        &self.address
    }
}
