//! Trait abstraction for serial port operations to enable testing

use crate::error::Result;

/// Blocking serial transport used by the gimbal link
///
/// Implementations must let one thread read while another writes: the
/// receiver thread only calls [`read_exact`](SerialTransport::read_exact)
/// (plus `close`/`open` while reconnecting) and the control loop only calls
/// [`write`](SerialTransport::write). Any locking needed for that is the
/// transport's business; the link adds none of its own.
#[cfg_attr(test, mockall::automock)]
pub trait SerialTransport: Send + Sync {
    /// Open (or reopen) the configured port
    fn open(&self) -> Result<()>;

    /// Close the port. Closing an already closed port is not an error.
    fn close(&self) -> Result<()>;

    /// Fill `buf` completely
    ///
    /// Returns `true` only if exactly `buf.len()` bytes were read. Timeouts,
    /// short reads, I/O errors and a closed port all return `false`.
    fn read_exact(&self, buf: &mut [u8]) -> bool;

    /// Write all of `data` and flush it
    fn write(&self, data: &[u8]) -> Result<()>;

    /// Port identifier the transport was configured with
    fn port_name(&self) -> String;

    /// Whether the port is currently open
    fn is_open(&self) -> bool;
}
