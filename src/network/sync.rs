//! State Synchronization
//!
//! Per-room broadcast sequence numbers and ack round-trip measurement.
//! `stateSeq` increments exactly once per broadcast and never goes back,
//! including across game start.

use std::collections::BTreeMap;

/// Acks older than this many sequences behind an acked one are forgotten.
pub const ACK_RETENTION: u64 = 5;

/// Send times kept at most; oldest dropped first when clients never ack.
pub const MAX_PENDING: usize = 256;

/// Result of processing an ack.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AckOutcome {
    /// Sequence was recorded; round trip measured.
    Measured {
        /// `ack time - send time`.
        latency_ms: i64,
    },
    /// No send time for this sequence (never sent, or already pruned).
    UnknownSequence,
}

/// Sequence counter and send-time table for one room.
#[derive(Clone, Debug, Default)]
pub struct SyncTracker {
    state_seq: u64,
    sent_at: BTreeMap<u64, i64>,
}

impl SyncTracker {
    /// Fresh tracker, sequence 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequence of the latest broadcast.
    pub fn state_seq(&self) -> u64 {
        self.state_seq
    }

    /// Number of sequences awaiting ack.
    pub fn pending(&self) -> usize {
        self.sent_at.len()
    }

    /// Allocate the next sequence for a broadcast sent at `now_ms`.
    pub fn stamp(&mut self, now_ms: i64) -> u64 {
        self.state_seq += 1;
        self.sent_at.insert(self.state_seq, now_ms);
        while self.sent_at.len() > MAX_PENDING {
            self.sent_at.pop_first();
        }
        self.state_seq
    }

    /// Process an ack received at `now_ms`.
    ///
    /// The acked entry stays so other clients can ack it too; entries
    /// `ACK_RETENTION` or more behind it are pruned.
    pub fn acknowledge(&mut self, state_seq: u64, now_ms: i64) -> AckOutcome {
        let Some(sent) = self.sent_at.get(&state_seq).copied() else {
            return AckOutcome::UnknownSequence;
        };
        if let Some(horizon) = state_seq.checked_sub(ACK_RETENTION) {
            self.sent_at.retain(|seq, _| *seq > horizon);
        }
        AckOutcome::Measured {
            latency_ms: now_ms.saturating_sub(sent),
        }
    }
}

/// Wall clock in epoch milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
