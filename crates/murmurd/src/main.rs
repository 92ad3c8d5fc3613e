//! murmurd — gossip chat node.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use anyhow::{Context, Result};
use bytes::Bytes;
use tokio::io::BufReader;
use tokio::net::UdpSocket;
use tokio::sync::{broadcast, mpsc};

use murmur_core::config::MurmurConfig;
use murmur_core::PeerAddress;
use murmur_services::{ChatContext, LocalIdentity, Reconciler, Router};

mod cli;
mod console;
mod gossip;

use console::ConsolePresentation;
use gossip::send_worker::{SendWorker, UdpBroadcaster};
use gossip::{heartbeat, listener, Membership};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    // Load config
    let mut config = MurmurConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        MurmurConfig::default()
    });
    if !cli::apply_args(&mut config, std::env::args().skip(1))? {
        println!("{}", cli::USAGE);
        return Ok(());
    }
    config.validate().context("invalid configuration")?;

    let port = config.network.listen_port;
    let local_ip = advertise_ip(&config);
    let local = PeerAddress::new(SocketAddr::new(local_ip, port).to_string());
    tracing::info!(%local, username = %config.identity.username, "murmurd starting");

    // Bind gossip socket
    let socket = Arc::new(
        UdpSocket::bind(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port))
            .await
            .with_context(|| format!("failed to bind gossip socket on port {port}"))?,
    );

    // Outbound broadcast queue
    let (broadcast_tx, broadcast_rx) = mpsc::unbounded_channel::<Bytes>();
    let broadcaster = Arc::new(UdpBroadcaster::new(broadcast_tx, &local));
    tracing::debug!(limit = broadcaster.limit(), "broadcast payload limit");

    // Shared state
    let console = Arc::new(ConsolePresentation::stdout());
    let ctx = ChatContext::new(
        LocalIdentity::new(local.clone(), config.identity.username.clone()),
        broadcaster,
        console.clone(),
    );
    let router = Arc::new(Router::new(ctx.clone()));
    let membership = Arc::new(Membership::new(local.clone(), ctx.directory().clone()));

    if !config.network.seed_peer.is_empty() {
        let seed = gossip::resolve_seed(&config.network.seed_peer).await?;
        membership.add_contact(PeerAddress::new(seed.to_string()), true);
        tracing::info!(seed = %config.network.seed_peer, %seed, "joining through seed peer");
    }

    // ── Shutdown channel ─────────────────────────────────────────────────────
    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("shutdown signal received");
            let _ = shutdown.send(());
        });
    }

    ctx.directory().refresh();
    membership.announce_self();

    // ── Spawn tasks ──────────────────────────────────────────────────────────

    let heartbeat_task = tokio::spawn(heartbeat::heartbeat_loop(
        socket.clone(),
        membership.clone(),
        config.network.heartbeat_interval(),
        shutdown_tx.subscribe(),
    ));

    let listener_task = tokio::spawn(listener::listener_loop(
        socket.clone(),
        membership.clone(),
        router,
        shutdown_tx.subscribe(),
    ));

    let expiry_task = tokio::spawn(listener::expiry_loop(
        membership.clone(),
        config.network.peer_ttl(),
        config.network.heartbeat_interval(),
        shutdown_tx.subscribe(),
    ));

    let send_worker_task = tokio::spawn(
        SendWorker::new(socket, membership, broadcast_rx, shutdown_tx.subscribe()).run(),
    );

    let reconciler_task = tokio::spawn(
        Reconciler::new(
            ctx.clone(),
            config.reconcile.interval(),
            shutdown_tx.subscribe(),
        )
        .run(),
    );

    let input_task = tokio::spawn(console::input_loop(
        BufReader::new(tokio::io::stdin()),
        ctx,
        console,
        shutdown_tx.clone(),
    ));

    // ── Wait for exit ────────────────────────────────────────────────────────

    let mut shutdown_rx = shutdown_tx.subscribe();

    tokio::select! {
        _ = shutdown_rx.recv()   => tracing::info!("shutting down"),
        r = heartbeat_task       => tracing::error!("heartbeat exited: {:?}", r),
        r = listener_task        => tracing::error!("listener exited: {:?}", r),
        r = expiry_task          => tracing::error!("expiry task exited: {:?}", r),
        r = send_worker_task     => tracing::error!("send worker exited: {:?}", r),
        r = reconciler_task      => tracing::error!("reconciler exited: {:?}", r),
        r = input_task           => tracing::info!("input loop exited: {:?}", r),
    }

    Ok(())
}

/// The address other peers reach us on: `advertise_host` when set, else the
/// interface the OS would route outbound traffic through.
fn advertise_ip(config: &MurmurConfig) -> IpAddr {
    if !config.network.advertise_host.is_empty() {
        match config.network.advertise_host.parse() {
            Ok(ip) => return ip,
            Err(e) => tracing::warn!(
                host = %config.network.advertise_host,
                error = %e,
                "advertise_host is not an IP address, detecting instead"
            ),
        }
    }

    // connect() on UDP sends nothing; it only selects the outbound interface
    let outbound_ip = || -> std::io::Result<IpAddr> {
        let socket = std::net::UdpSocket::bind("0.0.0.0:0")?;
        socket.connect("8.8.8.8:80")?;
        Ok(socket.local_addr()?.ip())
    };

    match outbound_ip() {
        Ok(ip) => {
            tracing::info!(%ip, "local address");
            ip
        }
        Err(e) => {
            tracing::warn!(error = %e, "local address detection failed, using loopback");
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        }
    }
}
