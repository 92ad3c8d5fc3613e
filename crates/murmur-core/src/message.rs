//! Broadcast envelope schema.
//!
//! Every broadcast carries exactly one `MessageEnvelope`. On the wire the
//! envelope is a flat JSON object:
//!
//! ```text
//! {"type": 1, "body": "hello", "usernames": null}
//! ```
//!
//! `type` selects which of `body` / `usernames` is meaningful; the other
//! field is ignored on receipt. There is no version field: every peer is
//! assumed to share this one schema.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::peer::PeerAddress;

/// Message kind discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageKind {
    Chat = 1,
    IdentityBatch = 2,
    IdentityRequest = 3,
}

impl MessageKind {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Chat),
            2 => Some(Self::IdentityBatch),
            3 => Some(Self::IdentityRequest),
            _ => None,
        }
    }
}

/// A typed broadcast envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WireMessage", into = "WireMessage")]
pub enum MessageEnvelope {
    /// Free chat text from the sender.
    Chat { text: String },

    /// Address -> display name pairings known by the sender.
    IdentityBatch {
        identities: HashMap<PeerAddress, String>,
    },

    /// Fan-out request: the peer at `address` should broadcast its batch.
    /// Every other recipient ignores it.
    IdentityRequest { address: PeerAddress },
}

impl MessageEnvelope {
    pub fn chat(text: impl Into<String>) -> Self {
        Self::Chat { text: text.into() }
    }

    pub fn identity_batch(identities: HashMap<PeerAddress, String>) -> Self {
        Self::IdentityBatch { identities }
    }

    pub fn identity_request(address: PeerAddress) -> Self {
        Self::IdentityRequest { address }
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Chat { .. } => MessageKind::Chat,
            Self::IdentityBatch { .. } => MessageKind::IdentityBatch,
            Self::IdentityRequest { .. } => MessageKind::IdentityRequest,
        }
    }
}

/// Envelope `type` value that does not name a known kind.
#[derive(Debug, thiserror::Error)]
#[error("unknown message type {0}")]
pub struct UnknownKind(pub u8);

// ── Wire form ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireMessage {
    #[serde(rename = "type")]
    kind: u8,

    #[serde(default)]
    body: String,

    /// Only filled for identity batches; `null` otherwise.
    #[serde(default)]
    usernames: Option<HashMap<PeerAddress, String>>,
}

impl From<MessageEnvelope> for WireMessage {
    fn from(envelope: MessageEnvelope) -> Self {
        let kind = envelope.kind() as u8;
        match envelope {
            MessageEnvelope::Chat { text } => Self {
                kind,
                body: text,
                usernames: None,
            },
            MessageEnvelope::IdentityBatch { identities } => Self {
                kind,
                body: String::new(),
                usernames: Some(identities),
            },
            MessageEnvelope::IdentityRequest { address } => Self {
                kind,
                body: address.as_str().to_string(),
                usernames: None,
            },
        }
    }
}

impl TryFrom<WireMessage> for MessageEnvelope {
    type Error = UnknownKind;

    fn try_from(wire: WireMessage) -> Result<Self, Self::Error> {
        let kind = MessageKind::from_u8(wire.kind).ok_or(UnknownKind(wire.kind))?;
        Ok(match kind {
            MessageKind::Chat => Self::Chat { text: wire.body },
            MessageKind::IdentityBatch => Self::IdentityBatch {
                identities: wire.usernames.unwrap_or_default(),
            },
            MessageKind::IdentityRequest => Self::IdentityRequest {
                address: PeerAddress::from(wire.body),
            },
        })
    }
}
