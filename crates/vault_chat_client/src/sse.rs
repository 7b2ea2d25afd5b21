//! Line framing and `event:`/`data:` dispatch for the `/chat/stream` body.
//!
//! The backend speaks a reduced SSE dialect:
//!
//! ```text
//! event: token
//! data: "Hel"
//!
//! event: done
//! data: 3f2c...
//! ```
//!
//! Exactly one `data:` line is honoured per `event:` line. Consecutive `data:`
//! lines are dispatched as separate records, never concatenated.

use crate::messages::EventRecord;

/// Accumulates bytes across chunk boundaries and hands out complete lines.
///
/// The pending fragment is kept as raw bytes so a UTF-8 sequence split across
/// two chunks is only decoded once its line is complete.
#[derive(Debug, Default)]
pub struct LineAssembler {
    pending: Vec<u8>,
}

impl LineAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `chunk` and return every line it completes, in order, without
    /// the `\n` (or `\r\n`) terminator.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let Some(last_newline) = self.pending.iter().rposition(|&b| b == b'\n') else {
            return Vec::new();
        };

        let rest = self.pending.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.pending, rest);

        complete[..last_newline]
            .split(|&b| b == b'\n')
            .map(|line| {
                let line = line.strip_suffix(b"\r").unwrap_or(line);
                String::from_utf8_lossy(line).into_owned()
            })
            .collect()
    }

    /// Bytes received since the last newline.
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    /// End of input: drop whatever partial line is left. Returns the number of
    /// discarded bytes.
    pub fn finish(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        dropped
    }
}

/// What the dispatcher remembers between lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DispatcherState {
    /// No `event:` line seen since the last dispatch.
    #[default]
    Idle,
    /// An `event:` line named the type of the next `data:` line.
    Pending(String),
}

/// Two-line grammar: `event:` arms a type, `data:` emits a record and resets.
#[derive(Debug, Default)]
pub struct EventDispatcher {
    state: DispatcherState,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DispatcherState {
        &self.state
    }

    /// Feed one complete line. Returns a record only for `data:` lines.
    /// Anything else, blank separators included, is ignored.
    pub fn push_line(&mut self, line: &str) -> Option<EventRecord> {
        if let Some(event_type) = line.strip_prefix("event:") {
            self.state = DispatcherState::Pending(event_type.trim().to_string());
            return None;
        }

        let data = line.strip_prefix("data:")?;
        let event_type = match std::mem::take(&mut self.state) {
            DispatcherState::Pending(t) => t,
            DispatcherState::Idle => String::new(),
        };
        Some(EventRecord {
            event_type,
            data: data.trim().to_string(),
        })
    }
}
