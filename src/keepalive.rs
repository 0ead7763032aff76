//! Broker keep-alive
//!
//! The broker drops a client that sends nothing for longer than its keep-alive. Any
//! outgoing publish counts, so a heartbeat message is only needed when nothing else
//! went out for a full interval.
//!
//! # Usage
//! - Call [`Heartbeat::sent`] after every successful publish
//! - Publish a heartbeat whenever [`Heartbeat::is_due`] holds, then call `sent`

/// Tracks when the last message went out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Heartbeat {
    interval_ms: u64,
    last_sent_ms: u64,
}

impl Heartbeat {
    /// Starts counting at `now_ms`, usually right after the session came up
    pub const fn new(interval_ms: u64, now_ms: u64) -> Self {
        Self {
            interval_ms,
            last_sent_ms: now_ms,
        }
    }

    pub fn sent(&mut self, now_ms: u64) {
        self.last_sent_ms = self.last_sent_ms.max(now_ms);
    }

    pub fn is_due(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.last_sent_ms) >= self.interval_ms
    }
}
