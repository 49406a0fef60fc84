//! Background polling loop: reads device state frames, validates them,
//! updates [`DeviceState`], and reconnects after sustained failure.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::reconnect::{ReconnectOutcome, Reconnector};
use super::shutdown::Shutdown;
use super::state::{DeviceState, GimbalMode};
use crate::codec::decoder::{decode_state_frame, verify_state_frame};
use crate::codec::protocol::{StateFrameBytes, STATE_FRAME_LEN};
use crate::config::LinkConfig;
use crate::serial::SerialTransport;
use crate::telemetry::LinkStats;

/// Result of a single read-and-validate step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Valid frame; the device state now holds this mode
    Applied(GimbalMode),
    /// Transport returned fewer than 5 bytes or failed
    ReadFailed,
    /// Frame did not start with `'E','C'`
    BadMagic,
    /// Magic matched but the checksum did not
    BadCrc,
}

impl PollOutcome {
    pub fn is_error(&self) -> bool {
        !matches!(self, Self::Applied(_))
    }
}

/// Receiver loop state, owned by the receiver thread
pub struct Receiver<T: SerialTransport + ?Sized> {
    transport: Arc<T>,
    state: DeviceState,
    stats: Arc<LinkStats>,
    shutdown: Shutdown,
    reconnector: Reconnector,
    error_threshold: u32,
    read_error_backoff: Duration,
    error_count: u32,
    buffer: StateFrameBytes,
}

impl<T: SerialTransport + ?Sized> Receiver<T> {
    pub fn new(
        transport: Arc<T>,
        state: DeviceState,
        stats: Arc<LinkStats>,
        shutdown: Shutdown,
        config: &LinkConfig,
    ) -> Self {
        Self {
            transport,
            state,
            stats,
            shutdown,
            reconnector: Reconnector::from_config(config),
            error_threshold: config.error_threshold,
            read_error_backoff: config.read_error_backoff(),
            error_count: 0,
            buffer: [0u8; STATE_FRAME_LEN],
        }
    }

    /// Consecutive failed reads or rejected frames since the last valid one
    pub fn error_count(&self) -> u32 {
        self.error_count
    }

    /// Poll until shutdown is signaled
    pub fn run(mut self) {
        info!("Gimbal receiver started on {}", self.transport.port_name());

        while !self.shutdown.is_signaled() {
            self.step();
        }

        info!("Gimbal receiver stopped");
    }

    /// One loop iteration: poll, account for the outcome, reconnect if the
    /// error budget is spent
    pub fn step(&mut self) -> PollOutcome {
        let outcome = self.poll_once();

        if outcome.is_error() {
            self.error_count = self.error_count.saturating_add(1);
        } else {
            self.error_count = 0;
        }

        if outcome == PollOutcome::ReadFailed {
            self.shutdown.sleep(self.read_error_backoff);
        }

        if self.error_count > self.error_threshold && !self.shutdown.is_signaled() {
            warn!(
                "Too many errors ({} consecutive), attempting to reconnect...",
                self.error_count
            );
            self.error_count = 0;

            let outcome = self.reconnector.reconnect(&*self.transport, &self.shutdown, &self.stats);
            debug!("Reconnect sequence finished: {:?}", outcome);
            if outcome == ReconnectOutcome::Exhausted {
                warn!("Gimbal link degraded: serial port {} stays closed", self.transport.port_name());
            }
        }

        outcome
    }

    /// Read one frame and, if it is valid, apply its state
    pub fn poll_once(&mut self) -> PollOutcome {
        if !self.transport.read_exact(&mut self.buffer) {
            self.stats.record_read_failure();
            return PollOutcome::ReadFailed;
        }

        let frame = decode_state_frame(&self.buffer);
        if !frame.has_valid_magic() {
            self.stats.record_header_mismatch();
            return PollOutcome::BadMagic;
        }

        if !verify_state_frame(&self.buffer) {
            debug!("CRC16 check failed.");
            self.stats.record_crc_failure();
            return PollOutcome::BadCrc;
        }

        self.stats.record_frame_received();
        let mode = match GimbalMode::from_state_code(frame.state) {
            Some(mode) => mode,
            None => {
                warn!("Invalid state from gimbal: 0x{:02X}", frame.state);
                self.stats.record_invalid_state();
                GimbalMode::Idle
            }
        };

        self.state.set(mode);
        debug!("Received state: 0x{:02X}, mode: {}", frame.state, mode);
        PollOutcome::Applied(mode)
    }
}
