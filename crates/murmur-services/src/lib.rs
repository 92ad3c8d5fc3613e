//! murmur-services — the membership directory and the identity
//! reconciliation protocol built on top of it.
//!
//! The gossip substrate and the display surface are collaborators: they are
//! reached only through the traits in [`substrate`] and [`presentation`].

pub mod chat;
pub mod context;
pub mod directory;
pub mod presentation;
pub mod reconcile;
pub mod router;
pub mod substrate;

#[cfg(test)]
pub(crate) mod testing;

pub use chat::send_message;
pub use context::{ChatContext, LocalIdentity, SendError};
pub use directory::{Directory, DirectoryError, IdentityRecord};
pub use presentation::{MemoryPresentation, Presentation, RosterEntry};
pub use reconcile::{broadcast_identities, reconcile_tick, request_identities, Reconciler};
pub use router::Router;
pub use substrate::{BroadcastError, BroadcastObserver, Broadcaster, MembershipObserver};
