//! Bounded reopen of the serial transport after sustained read failure.

use std::time::Duration;
use tracing::{debug, info, warn};

use super::shutdown::Shutdown;
use crate::config::LinkConfig;
use crate::serial::SerialTransport;
use crate::telemetry::LinkStats;

/// How a reconnect sequence ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectOutcome {
    /// Port reopened on the given attempt (1-based)
    Reconnected { attempt: u32 },
    /// Every attempt failed; the port is left closed
    Exhausted,
    /// Shutdown was signaled before the sequence finished
    Aborted,
}

/// Retry policy for reopening the transport
///
/// Only the receiver thread runs this, so sequences never overlap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconnector {
    max_retry_count: u32,
    close_delay: Duration,
    retry_delay: Duration,
}

impl Reconnector {
    pub fn new(max_retry_count: u32, close_delay: Duration, retry_delay: Duration) -> Self {
        Self {
            max_retry_count,
            close_delay,
            retry_delay,
        }
    }

    pub fn from_config(config: &LinkConfig) -> Self {
        Self::new(
            config.max_retry_count,
            config.reconnect_close_delay(),
            config.reconnect_retry_delay(),
        )
    }

    /// Close and reopen `transport` until it opens or attempts run out
    ///
    /// Each attempt closes the port (close errors are ignored), waits the
    /// close delay, then reopens the same port. A failed reopen waits the
    /// retry delay before the next attempt. Shutdown abandons the sequence
    /// at the next check.
    pub fn reconnect<T: SerialTransport + ?Sized>(
        &self,
        transport: &T,
        shutdown: &Shutdown,
        stats: &LinkStats,
    ) -> ReconnectOutcome {
        stats.record_reconnect_sequence();
        let port = transport.port_name();

        for attempt in 1..=self.max_retry_count {
            if shutdown.is_signaled() {
                return ReconnectOutcome::Aborted;
            }

            warn!("Reconnecting serial {}, attempt {}/{}...", port, attempt, self.max_retry_count);
            stats.record_reconnect_attempt();

            if let Err(e) = transport.close() {
                debug!("Ignoring close error on {}: {}", port, e);
            }
            if !shutdown.sleep(self.close_delay) {
                return ReconnectOutcome::Aborted;
            }

            match transport.open() {
                Ok(()) => {
                    info!("Reconnected serial {} successfully", port);
                    stats.record_reconnect_success();
                    return ReconnectOutcome::Reconnected { attempt };
                }
                Err(e) => {
                    warn!("Reconnect failed: {}", e);
                    if !shutdown.sleep(self.retry_delay) {
                        return ReconnectOutcome::Aborted;
                    }
                }
            }
        }

        warn!(
            "Giving up on {} after {} reconnect attempts; will retry after further read errors",
            port, self.max_retry_count
        );
        ReconnectOutcome::Exhausted
    }
}
