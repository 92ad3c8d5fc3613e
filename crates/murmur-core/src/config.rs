//! Configuration system for murmur.
//!
//! Resolution order: command-line flags → environment variables → config
//! file → defaults. Flags are applied by the daemon on top of [`MurmurConfig::load`].
//!
//! Config file location:
//!   1. $MURMUR_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/murmur/config.toml
//!   3. ~/.config/murmur/config.toml

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MurmurConfig {
    pub identity: IdentityConfig,
    pub network: NetworkConfig,
    pub reconcile: ReconcileConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Friendly name presented to other peers instead of our address. Required.
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// UDP port other peers reach us on. Required, 0 is rejected.
    pub listen_port: u16,
    /// `host:port` of one running peer. Empty = start a new cluster.
    pub seed_peer: String,
    /// Host part of our advertised address. Empty = auto-detect.
    pub advertise_host: String,
    /// How often we announce liveness to known peers.
    pub heartbeat_millis: u64,
    /// A member silent for this long is reported unreachable.
    pub peer_ttl_millis: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Seconds between checks for peers with an unknown name.
    pub interval_secs: u64,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            listen_port: 0,
            seed_peer: String::new(),
            advertise_host: String::new(),
            heartbeat_millis: 500,
            peer_ttl_millis: 5_000,
        }
    }
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self { interval_secs: 15 }
    }
}

impl NetworkConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_millis.max(1))
    }

    pub fn peer_ttl(&self) -> Duration {
        Duration::from_millis(self.peer_ttl_millis)
    }
}

impl ReconcileConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("murmur")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("username is required")]
    MissingUsername,
    #[error("listen port is required")]
    MissingListenPort,
    #[error("seed peer {0:?} is not a host:port address")]
    InvalidSeedPeer(String),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl MurmurConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_file(&Self::file_path())?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse a config file. A missing file yields the defaults.
    pub fn load_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(MurmurConfig::default());
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFailed(path.to_path_buf(), e))?;
        toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.to_path_buf(), e))
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("MURMUR_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Apply MURMUR_* env var overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("MURMUR_IDENTITY__USERNAME") {
            self.identity.username = v;
        }
        if let Ok(v) = std::env::var("MURMUR_NETWORK__LISTEN_PORT") {
            if let Ok(p) = v.parse() {
                self.network.listen_port = p;
            }
        }
        if let Ok(v) = std::env::var("MURMUR_NETWORK__SEED_PEER") {
            self.network.seed_peer = v;
        }
        if let Ok(v) = std::env::var("MURMUR_NETWORK__ADVERTISE_HOST") {
            self.network.advertise_host = v;
        }
        if let Ok(v) = std::env::var("MURMUR_RECONCILE__INTERVAL_SECS") {
            if let Ok(s) = v.parse() {
                self.reconcile.interval_secs = s;
            }
        }
    }

    /// Reject configs the daemon cannot start with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.identity.username.trim().is_empty() {
            return Err(ConfigError::MissingUsername);
        }
        if self.network.listen_port == 0 {
            return Err(ConfigError::MissingListenPort);
        }
        if !self.network.seed_peer.is_empty() && !is_host_port(&self.network.seed_peer) {
            return Err(ConfigError::InvalidSeedPeer(self.network.seed_peer.clone()));
        }
        Ok(())
    }
}

/// `ip:port`, `[v6]:port` or `hostname:port`. Host names are resolved at
/// startup, not here.
fn is_host_port(s: &str) -> bool {
    if s.parse::<SocketAddr>().is_ok() {
        return true;
    }
    match s.rsplit_once(':') {
        Some((host, port)) => {
            !host.is_empty()
                && !host.contains(':')
                && port.parse::<u16>().map_or(false, |p| p != 0)
        }
        None => false,
    }
}
