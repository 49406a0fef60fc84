//! # Serial Communication Module
//!
//! Owns the physical port to the gimbal controller.
//!
//! This module handles:
//! - Opening the port at the configured baud rate (8N1, no flow control)
//! - Blocking exact-size reads with a read timeout
//! - Blocking writes of complete frames
//! - Closing and reopening the same port for reconnection

pub mod port_trait;

pub use port_trait::SerialTransport;

use crate::config::SerialConfig;
use crate::error::{GimbalLinkError, Result};
use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio_serial::SerialPort;
use tracing::{debug, info};

type PortHandle = Option<Box<dyn SerialPort>>;

/// Gimbal Serial Port Handler
///
/// Keeps two handles to the same device, one per direction, each behind its
/// own lock. The receiver thread blocks on the read handle while the control
/// loop writes through the other one.
pub struct GimbalSerial {
    /// Device path (e.g., /dev/ttyUSB0)
    device_path: String,
    /// Line speed
    baud_rate: u32,
    /// Upper bound on a single blocking read
    timeout: Duration,
    /// Handle used by the receiver thread
    reader: Mutex<PortHandle>,
    /// Cloned handle used by the sender
    writer: Mutex<PortHandle>,
    /// Tracked separately so callers never wait on a blocked reader
    open: AtomicBool,
}

impl std::fmt::Debug for GimbalSerial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GimbalSerial")
            .field("device_path", &self.device_path)
            .field("baud_rate", &self.baud_rate)
            .finish_non_exhaustive()
    }
}

impl GimbalSerial {
    /// Create a closed transport for the given port
    ///
    /// Nothing touches the device until [`SerialTransport::open`] is called.
    pub fn new(device_path: impl Into<String>, baud_rate: u32, timeout: Duration) -> Self {
        Self {
            device_path: device_path.into(),
            baud_rate,
            timeout,
            reader: Mutex::new(None),
            writer: Mutex::new(None),
            open: AtomicBool::new(false),
        }
    }

    /// Create a closed transport from the `[serial]` configuration section
    pub fn from_config(config: &SerialConfig) -> Self {
        Self::new(
            config.port.clone(),
            config.baud_rate,
            Duration::from_millis(config.timeout_ms),
        )
    }

    /// Open a specific serial port with 8N1 settings
    ///
    /// # Arguments
    ///
    /// * `path` - Device path (e.g., "/dev/ttyUSB0")
    /// * `baud_rate` - Line speed
    /// * `timeout` - Read timeout
    ///
    /// # Returns
    ///
    /// * `Result<Box<dyn SerialPort>>` - Opened serial port
    fn open_port(path: &str, baud_rate: u32, timeout: Duration) -> Result<Box<dyn SerialPort>> {
        tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .timeout(timeout)
            .open()
            .map_err(|e| GimbalLinkError::Serial(format!("Failed to open {}: {}", path, e)))
    }

    fn lock(handle: &Mutex<PortHandle>) -> MutexGuard<'_, PortHandle> {
        handle.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SerialTransport for GimbalSerial {
    fn open(&self) -> Result<()> {
        debug!("Opening serial port: {}", self.device_path);

        let port = Self::open_port(&self.device_path, self.baud_rate, self.timeout)?;
        let writer = port.try_clone().map_err(|e| {
            GimbalLinkError::Serial(format!("Failed to clone {}: {}", self.device_path, e))
        })?;

        *Self::lock(&self.reader) = Some(port);
        *Self::lock(&self.writer) = Some(writer);
        self.open.store(true, Ordering::Release);

        info!("Opened gimbal serial port {} at {} baud", self.device_path, self.baud_rate);
        Ok(())
    }

    fn close(&self) -> Result<()> {
        self.open.store(false, Ordering::Release);
        let reader = Self::lock(&self.reader).take();
        let writer = Self::lock(&self.writer).take();

        if reader.is_some() || writer.is_some() {
            debug!("Closed serial port: {}", self.device_path);
        }
        Ok(())
    }

    fn read_exact(&self, buf: &mut [u8]) -> bool {
        match Self::lock(&self.reader).as_mut() {
            Some(port) => port.read_exact(buf).is_ok(),
            None => false,
        }
    }

    fn write(&self, data: &[u8]) -> Result<()> {
        let mut writer = Self::lock(&self.writer);
        let port = writer.as_mut().ok_or_else(|| {
            GimbalLinkError::Serial(format!("Port {} is not open", self.device_path))
        })?;

        port.write_all(data)
            .map_err(|e| GimbalLinkError::Serial(format!("Failed to write frame: {}", e)))?;
        port.flush()
            .map_err(|e| GimbalLinkError::Serial(format!("Failed to flush serial port: {}", e)))?;

        Ok(())
    }

    fn port_name(&self) -> String {
        self.device_path.clone()
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encoder::encode_command_frame;

    /// Common gimbal controller baud rate
    const DEFAULT_BAUD_RATE: u32 = 115_200;

    fn closed_port() -> GimbalSerial {
        GimbalSerial::new("/dev/nonexistent_serial_device_12345", DEFAULT_BAUD_RATE, Duration::from_millis(20))
    }

    #[test]
    fn test_new_transport_is_closed() {
        let serial = closed_port();
        assert!(!serial.is_open());
        assert_eq!(serial.port_name(), "/dev/nonexistent_serial_device_12345");
        assert_eq!(serial.device_path, serial.port_name());
    }

    #[test]
    fn test_open_with_invalid_path_returns_error() {
        let serial = closed_port();
        let result = serial.open();

        match result {
            Err(GimbalLinkError::Serial(msg)) => {
                assert!(msg.contains("/dev/nonexistent_serial_device_12345"));
                assert!(msg.contains("Failed to open"));
            }
            other => panic!("Expected Serial error, got: {:?}", other),
        }
        assert!(!serial.is_open());
    }

    #[test]
    fn test_read_on_closed_port_fails() {
        let serial = closed_port();
        let mut buf = [0u8; 5];
        assert!(!serial.read_exact(&mut buf));
    }

    #[test]
    fn test_write_on_closed_port_fails() {
        let serial = closed_port();
        let result = serial.write(&encode_command_frame(0.0));

        match result {
            Err(GimbalLinkError::Serial(msg)) => assert!(msg.contains("not open")),
            other => panic!("Expected Serial error, got: {:?}", other),
        }
    }

    #[test]
    fn test_close_is_idempotent() {
        let serial = closed_port();
        assert!(serial.close().is_ok());
        assert!(serial.close().is_ok());
    }

    #[test]
    fn test_from_config() {
        let config = SerialConfig {
            port: "/dev/ttyUSB3".to_string(),
            baud_rate: 921_600,
            timeout_ms: 50,
        };
        let serial = GimbalSerial::from_config(&config);

        assert_eq!(serial.device_path, "/dev/ttyUSB3");
        assert_eq!(serial.baud_rate, 921_600);
        assert_eq!(serial.timeout, Duration::from_millis(50));
    }

    // Integration test - only runs if gimbal hardware is connected
    #[test]
    #[ignore] // Run with: GIMBAL_PORT=/dev/ttyUSB0 cargo test -- --ignored
    fn test_open_with_real_hardware() {
        let path = std::env::var("GIMBAL_PORT").unwrap_or_else(|_| "/dev/ttyUSB0".to_string());
        let serial = GimbalSerial::new(path, DEFAULT_BAUD_RATE, Duration::from_millis(100));

        match serial.open() {
            Ok(()) => {
                assert!(serial.is_open());
                let mut buf = [0u8; crate::codec::protocol::STATE_FRAME_LEN];
                println!("Read from gimbal: {}", serial.read_exact(&mut buf));
                assert!(serial.write(&encode_command_frame(0.0)).is_ok());
                serial.close().unwrap();
                assert!(!serial.is_open());
            }
            Err(e) => println!("No gimbal hardware detected (this is OK for CI/CD): {}", e),
        }
    }
}
