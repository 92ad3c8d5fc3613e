//! Explicit shared context, built once at startup and handed to the
//! directory, the router and the reconciliation task.

use std::sync::Arc;

use murmur_core::codec::{self, CodecError};
use murmur_core::{MessageEnvelope, PeerAddress};

use crate::directory::Directory;
use crate::presentation::Presentation;
use crate::substrate::{BroadcastError, Broadcaster};

/// Who we are: our advertised address and configured display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalIdentity {
    pub address: PeerAddress,
    pub username: String,
}

impl LocalIdentity {
    pub fn new(address: impl Into<PeerAddress>, username: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            username: username.into(),
        }
    }
}

/// Failure to put an envelope on the wire.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error(transparent)]
    Encode(#[from] CodecError),
    #[error(transparent)]
    Broadcast(#[from] BroadcastError),
}

pub struct ChatContext {
    local: LocalIdentity,
    directory: Arc<Directory>,
    broadcaster: Arc<dyn Broadcaster>,
    presentation: Arc<dyn Presentation>,
}

impl ChatContext {
    /// Build the context and its directory.
    pub fn new(
        local: LocalIdentity,
        broadcaster: Arc<dyn Broadcaster>,
        presentation: Arc<dyn Presentation>,
    ) -> Arc<Self> {
        let directory = Arc::new(Directory::new(local.clone(), presentation.clone()));
        Arc::new(Self {
            local,
            directory,
            broadcaster,
            presentation,
        })
    }

    pub fn local(&self) -> &LocalIdentity {
        &self.local
    }

    pub fn directory(&self) -> &Arc<Directory> {
        &self.directory
    }

    pub fn presentation(&self) -> &Arc<dyn Presentation> {
        &self.presentation
    }

    /// Encode an envelope and hand it to the substrate.
    pub fn broadcast_envelope(&self, envelope: &MessageEnvelope) -> Result<(), SendError> {
        let bytes = codec::encode(envelope)?;
        tracing::trace!(kind = ?envelope.kind(), bytes = bytes.len(), "broadcasting envelope");
        self.broadcaster.broadcast(bytes)?;
        Ok(())
    }

    /// Surface a line in the user's log pane.
    pub fn notice(&self, line: impl AsRef<str>) {
        self.presentation.append_log_line(line.as_ref());
    }
}
