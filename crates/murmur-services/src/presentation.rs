//! Presentation seam. How the core talks to whatever draws the chat.
//!
//! All three calls are fire-and-forget notifications; the core never waits
//! on rendering.

use std::sync::{Mutex, MutexGuard, PoisonError};

use murmur_core::PeerAddress;

/// One line of the roster as the directory sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    pub address: PeerAddress,
    /// Known name, or the address when the name is still unknown.
    pub display_name: String,
    pub is_local: bool,
}

pub trait Presentation: Send + Sync {
    /// Redraw the participant list.
    fn refresh_roster(&self, roster: &[RosterEntry]);

    /// Append a chat line to the transcript.
    fn append_transcript_line(&self, text: &str, display_name: &str);

    /// Append a line to the log pane.
    fn append_log_line(&self, text: &str);
}

/// Presentation that keeps everything in memory.
///
/// Used headless and by tests; `transcript()` renders lines as `name: text`.
#[derive(Default)]
pub struct MemoryPresentation {
    inner: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    roster: Vec<RosterEntry>,
    refreshes: usize,
    transcript: Vec<String>,
    logs: Vec<String>,
}

impl MemoryPresentation {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Roster from the most recent refresh.
    pub fn roster(&self) -> Vec<RosterEntry> {
        self.state().roster.clone()
    }

    /// Number of roster refreshes received.
    pub fn refresh_count(&self) -> usize {
        self.state().refreshes
    }

    pub fn transcript(&self) -> Vec<String> {
        self.state().transcript.clone()
    }

    pub fn logs(&self) -> Vec<String> {
        self.state().logs.clone()
    }
}

impl Presentation for MemoryPresentation {
    fn refresh_roster(&self, roster: &[RosterEntry]) {
        let mut state = self.state();
        state.roster = roster.to_vec();
        state.refreshes += 1;
    }

    fn append_transcript_line(&self, text: &str, display_name: &str) {
        self.state().transcript.push(format!("{display_name}: {text}"));
    }

    fn append_log_line(&self, text: &str) {
        self.state().logs.push(text.to_string());
    }
}
