//! Command-line flags, applied over the loaded config.
//!
//! `--username`, `--listen-port` and `--peer`, plus the short spellings
//! `-username`, `-listenport` and `-client`. Values follow the flag either
//! as the next argument or after `=`.

use anyhow::{bail, Context, Result};

use murmur_core::config::MurmurConfig;

pub const USAGE: &str =
    "usage: murmurd --username NAME --listen-port PORT [--peer HOST:PORT]";

/// Apply flags to `config`. Returns false if help was requested.
pub fn apply_args<I>(config: &mut MurmurConfig, args: I) -> Result<bool>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        let (flag, inline) = match arg.split_once('=') {
            Some((f, v)) => (f.to_string(), Some(v.to_string())),
            None => (arg.clone(), None),
        };

        let mut value = |name: &str| -> Result<String> {
            match inline.clone() {
                Some(v) => Ok(v),
                None => args
                    .next()
                    .with_context(|| format!("{name} needs a value")),
            }
        };

        match flag.as_str() {
            "-h" | "--help" => return Ok(false),
            "--username" | "-username" => {
                config.identity.username = value(&flag)?;
            }
            "--listen-port" | "-listenport" => {
                let raw = value(&flag)?;
                config.network.listen_port = raw
                    .parse()
                    .with_context(|| format!("invalid port {raw:?}"))?;
            }
            "--peer" | "-client" => {
                config.network.seed_peer = value(&flag)?;
            }
            other => bail!("unknown argument {other:?}\n{USAGE}"),
        }
    }

    Ok(true)
}
