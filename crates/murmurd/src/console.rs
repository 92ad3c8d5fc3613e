//! Line-oriented console presentation.
//!
//! Transcript lines and roster updates go to stdout. Log-pane lines always
//! go to `tracing` under the `murmur::log` target and are echoed to stdout
//! only while `/logs` is toggled on.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::broadcast;

use murmur_services::{send_message, ChatContext, Presentation, RosterEntry};

pub struct ConsolePresentation {
    out: Mutex<Box<dyn Write + Send>>,
    show_logs: AtomicBool,
}

impl ConsolePresentation {
    pub fn stdout() -> Self {
        Self::with_writer(std::io::stdout())
    }

    pub fn with_writer(out: impl Write + Send + 'static) -> Self {
        Self {
            out: Mutex::new(Box::new(out)),
            show_logs: AtomicBool::new(false),
        }
    }

    fn emit(&self, line: &str) {
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        // a closed stdout is not worth failing over
        let _ = writeln!(out, "{line}");
        let _ = out.flush();
    }

    pub fn print_roster(&self, roster: &[RosterEntry]) {
        self.emit(&format_roster(roster));
    }

    /// Flip log echo and return the new state.
    pub fn toggle_logs(&self) -> bool {
        !self.show_logs.fetch_xor(true, Ordering::Relaxed)
    }
}

impl Presentation for ConsolePresentation {
    fn refresh_roster(&self, roster: &[RosterEntry]) {
        self.print_roster(roster);
    }

    fn append_transcript_line(&self, text: &str, display_name: &str) {
        self.emit(&format!("{display_name}: {text}"));
    }

    fn append_log_line(&self, text: &str) {
        tracing::info!(target: "murmur::log", "{text}");
        if self.show_logs.load(Ordering::Relaxed) {
            self.emit(&format!("[log] {text}"));
        }
    }
}

/// `* online (2): alice, carol (you)`
pub fn format_roster(roster: &[RosterEntry]) -> String {
    let names: Vec<String> = roster
        .iter()
        .map(|e| {
            if e.is_local {
                format!("{} (you)", e.display_name)
            } else {
                e.display_name.clone()
            }
        })
        .collect();
    format!("* online ({}): {}", roster.len(), names.join(", "))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Who,
    Logs,
    Quit,
    Say(String),
    Unknown(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        match trimmed {
            "/who" => Command::Who,
            "/logs" => Command::Logs,
            "/quit" => Command::Quit,
            s if s.starts_with('/') => Command::Unknown(s.to_string()),
            _ => Command::Say(line.to_string()),
        }
    }
}

/// Read user input until `/quit`, shutdown or end of input.
///
/// Lines are decoded lossily, so stray non-UTF-8 bytes never end the loop.
/// When input ends or fails the node keeps running headless until shutdown.
pub async fn input_loop<R>(
    reader: R,
    ctx: Arc<ChatContext>,
    console: Arc<ConsolePresentation>,
    shutdown_tx: broadcast::Sender<()>,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut shutdown = shutdown_tx.subscribe();
    let mut lines = reader.split(b'\n');

    loop {
        let read = tokio::select! {
            _ = shutdown.recv() => return Ok(()),
            read = lines.next_segment() => read,
        };

        let raw = match read {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                tracing::info!("input closed, running headless");
                let _ = shutdown.recv().await;
                return Ok(());
            }
            Err(e) => {
                tracing::warn!(error = %e, "input failed, running headless");
                let _ = shutdown.recv().await;
                return Ok(());
            }
        };
        let line = String::from_utf8_lossy(&raw);

        match Command::parse(&line) {
            Command::Who => console.print_roster(&ctx.directory().roster()),
            Command::Logs => {
                let on = console.toggle_logs();
                tracing::debug!(on, "log echo toggled");
            }
            Command::Quit => {
                tracing::info!("quit requested");
                let _ = shutdown_tx.send(());
                return Ok(());
            }
            Command::Unknown(cmd) => {
                ctx.notice(format!("Unknown command {cmd}; try /who, /logs or /quit"));
            }
            Command::Say(text) => {
                if let Err(e) = send_message(&ctx, &text) {
                    tracing::warn!(error = %e, "chat send failed");
                    ctx.notice(format!("Failed to send message: {e}"));
                }
            }
        }
    }
}
