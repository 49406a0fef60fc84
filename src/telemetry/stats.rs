//! Lock-free link counters shared between the receiver thread and callers.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Running totals for one gimbal link
#[derive(Debug, Default)]
pub struct LinkStats {
    frames_received: AtomicU64,
    frames_sent: AtomicU64,
    send_failures: AtomicU64,
    read_failures: AtomicU64,
    header_mismatches: AtomicU64,
    crc_failures: AtomicU64,
    invalid_state_codes: AtomicU64,
    reconnect_sequences: AtomicU64,
    reconnect_attempts: AtomicU64,
    reconnect_successes: AtomicU64,
}

/// Point-in-time copy of [`LinkStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LinkStatsSnapshot {
    pub captured_at: DateTime<Utc>,
    pub frames_received: u64,
    pub frames_sent: u64,
    pub send_failures: u64,
    pub read_failures: u64,
    pub header_mismatches: u64,
    pub crc_failures: u64,
    pub invalid_state_codes: u64,
    pub reconnect_sequences: u64,
    pub reconnect_attempts: u64,
    pub reconnect_successes: u64,
}

macro_rules! counter {
    ($record:ident, $field:ident) => {
        pub fn $record(&self) {
            self.$field.fetch_add(1, Ordering::Relaxed);
        }
    };
}

impl LinkStats {
    pub fn new() -> Self {
        Self::default()
    }

    counter!(record_frame_received, frames_received);
    counter!(record_frame_sent, frames_sent);
    counter!(record_send_failure, send_failures);
    counter!(record_read_failure, read_failures);
    counter!(record_header_mismatch, header_mismatches);
    counter!(record_crc_failure, crc_failures);
    counter!(record_invalid_state, invalid_state_codes);
    counter!(record_reconnect_sequence, reconnect_sequences);
    counter!(record_reconnect_attempt, reconnect_attempts);
    counter!(record_reconnect_success, reconnect_successes);

    /// Copy every counter
    ///
    /// Counters are read one by one, so a snapshot taken while the receiver
    /// is running may mix values from adjacent iterations.
    pub fn snapshot(&self) -> LinkStatsSnapshot {
        LinkStatsSnapshot {
            captured_at: Utc::now(),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
            read_failures: self.read_failures.load(Ordering::Relaxed),
            header_mismatches: self.header_mismatches.load(Ordering::Relaxed),
            crc_failures: self.crc_failures.load(Ordering::Relaxed),
            invalid_state_codes: self.invalid_state_codes.load(Ordering::Relaxed),
            reconnect_sequences: self.reconnect_sequences.load(Ordering::Relaxed),
            reconnect_attempts: self.reconnect_attempts.load(Ordering::Relaxed),
            reconnect_successes: self.reconnect_successes.load(Ordering::Relaxed),
        }
    }
}

impl LinkStatsSnapshot {
    /// Frames rejected for any reason (failed reads excluded)
    pub fn rejected_frames(&self) -> u64 {
        self.header_mismatches + self.crc_failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_stats_are_zero() {
        let snapshot = LinkStats::new().snapshot();
        assert_eq!(snapshot.frames_received, 0);
        assert_eq!(snapshot.reconnect_sequences, 0);
        assert_eq!(snapshot.rejected_frames(), 0);
    }

    #[test]
    fn test_counters_increment() {
        let stats = LinkStats::new();
        stats.record_frame_received();
        stats.record_frame_received();
        stats.record_crc_failure();
        stats.record_header_mismatch();
        stats.record_reconnect_attempt();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.frames_received, 2);
        assert_eq!(snapshot.crc_failures, 1);
        assert_eq!(snapshot.rejected_frames(), 2);
        assert_eq!(snapshot.reconnect_attempts, 1);
        assert_eq!(snapshot.reconnect_successes, 0);
    }

    #[test]
    fn test_snapshot_serializes() {
        let stats = LinkStats::new();
        stats.record_frame_sent();

        let json = serde_json::to_value(stats.snapshot()).unwrap();
        assert_eq!(json["frames_sent"], 1);
        assert!(json["captured_at"].is_string());
    }

    #[test]
    fn test_counters_from_many_threads() {
        let stats = std::sync::Arc::new(LinkStats::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let stats = stats.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        stats.record_read_failure();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(stats.snapshot().read_failures, 4000);
    }
}
