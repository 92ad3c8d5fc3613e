//! Send worker: dequeues outbound broadcasts, frames them and sends a copy to
//! every live member.

use std::sync::Arc;

use bytes::Bytes;
use tokio::net::UdpSocket;
use tokio::sync::{broadcast, mpsc};

use murmur_core::wire::{encode_frame, FrameKind, HEADER_LEN, MAX_DATAGRAM};
use murmur_core::PeerAddress;
use murmur_services::{BroadcastError, Broadcaster};

use super::Membership;

/// [`Broadcaster`] handed to the chat context. Only queues; the worker does
/// the I/O.
pub struct UdpBroadcaster {
    tx: mpsc::UnboundedSender<Bytes>,
    limit: usize,
}

impl UdpBroadcaster {
    pub fn new(tx: mpsc::UnboundedSender<Bytes>, local: &PeerAddress) -> Self {
        Self {
            tx,
            limit: MAX_DATAGRAM - HEADER_LEN - local.as_str().len(),
        }
    }

    /// Largest payload that still fits in one datagram.
    pub fn limit(&self) -> usize {
        self.limit
    }
}

impl Broadcaster for UdpBroadcaster {
    fn broadcast(&self, payload: Vec<u8>) -> Result<(), BroadcastError> {
        if payload.len() > self.limit {
            return Err(BroadcastError::Oversized(payload.len()));
        }
        self.tx
            .send(Bytes::from(payload))
            .map_err(|_| BroadcastError::Closed)
    }
}

pub struct SendWorker {
    socket: Arc<UdpSocket>,
    membership: Arc<Membership>,
    rx: mpsc::UnboundedReceiver<Bytes>,
    shutdown: broadcast::Receiver<()>,
}

impl SendWorker {
    pub fn new(
        socket: Arc<UdpSocket>,
        membership: Arc<Membership>,
        rx: mpsc::UnboundedReceiver<Bytes>,
        shutdown: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            socket,
            membership,
            rx,
            shutdown,
        }
    }

    pub async fn run(mut self) -> anyhow::Result<()> {
        loop {
            tokio::select! {
                _ = self.shutdown.recv() => {
                    tracing::info!("send worker shutting down");
                    return Ok(());
                }

                msg = self.rx.recv() => {
                    let payload = match msg {
                        Some(p) => p,
                        None => {
                            tracing::info!("broadcaster dropped, send worker exiting");
                            return Ok(());
                        }
                    };
                    self.send_to_members(&payload).await;
                }
            }
        }
    }

    async fn send_to_members(&self, payload: &[u8]) {
        let frame = match encode_frame(FrameKind::Broadcast, self.membership.local(), payload) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!(error = %e, "failed to frame broadcast");
                return;
            }
        };

        let targets = self.membership.member_sockets();
        if targets.is_empty() {
            tracing::debug!("no members to broadcast to");
            return;
        }

        for target in targets {
            if let Err(e) = self.socket.send_to(&frame, target).await {
                tracing::debug!(error = %e, %target, "broadcast send failed");
            }
        }
        tracing::trace!(bytes = frame.len(), "broadcast sent");
    }
}
