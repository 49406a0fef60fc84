//! # Gimbal Link
//!
//! Bidirectional link to the gimbal controller.
//!
//! A [`GimbalLink`] owns the serial transport and one background receiver
//! thread. The application thread sends yaw commands with
//! [`GimbalLink::send`] and reads the device mode with [`GimbalLink::mode`];
//! the receiver thread is the only writer of that mode. Dropping the link
//! stops and joins the thread before the port is closed.

pub mod receiver;
pub mod reconnect;
pub mod shutdown;
pub mod state;

pub use receiver::{PollOutcome, Receiver};
pub use reconnect::{ReconnectOutcome, Reconnector};
pub use shutdown::Shutdown;
pub use state::{DeviceState, GimbalMode};

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

use crate::codec::encoder::encode_command_frame;
use crate::config::{LinkConfig, SerialConfig};
use crate::error::Result;
use crate::serial::{GimbalSerial, SerialTransport};
use crate::telemetry::{LinkStats, LinkStatsSnapshot};

/// Gimbal serial link with a background receiver thread
pub struct GimbalLink<T: SerialTransport + 'static = GimbalSerial> {
    transport: Arc<T>,
    state: DeviceState,
    stats: Arc<LinkStats>,
    shutdown: Shutdown,
    receiver: Option<JoinHandle<()>>,
}

impl<T: SerialTransport + 'static> std::fmt::Debug for GimbalLink<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GimbalLink")
            .field("port", &self.transport.port_name())
            .field("mode", &self.state.get())
            .finish_non_exhaustive()
    }
}

impl GimbalLink<GimbalSerial> {
    /// Open the configured serial port and start the receiver thread
    ///
    /// # Arguments
    ///
    /// * `serial` - Port identifier, baud rate and read timeout
    /// * `link` - Receiver and reconnection tuning
    ///
    /// # Errors
    ///
    /// Returns error if the port cannot be opened or the thread cannot be
    /// spawned. No thread is left running in either case.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use gimbal_link::config::Config;
    /// use gimbal_link::gimbal::GimbalLink;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// let link = GimbalLink::open(&config.serial, &config.link)?;
    ///
    /// link.send(-37.5);
    /// println!("gimbal mode: {}", link.mode());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open(serial: &SerialConfig, link: &LinkConfig) -> Result<Self> {
        Self::with_transport(GimbalSerial::from_config(serial), link)
    }
}

impl<T: SerialTransport + 'static> GimbalLink<T> {
    /// Open `transport` and start the receiver thread
    pub fn with_transport(transport: T, config: &LinkConfig) -> Result<Self> {
        if let Err(e) = transport.open() {
            error!("Failed to open serial {}: {}", transport.port_name(), e);
            return Err(e);
        }

        let transport = Arc::new(transport);
        let state = DeviceState::new();
        let stats = Arc::new(LinkStats::new());
        let shutdown = Shutdown::new();

        let receiver = Receiver::new(
            Arc::clone(&transport),
            state.clone(),
            Arc::clone(&stats),
            shutdown.clone(),
            config,
        );

        let handle = match thread::Builder::new()
            .name("gimbal-receiver".to_string())
            .spawn(move || receiver.run())
        {
            Ok(handle) => handle,
            Err(e) => {
                error!("Failed to spawn gimbal receiver thread: {}", e);
                close_quietly(transport.as_ref());
                return Err(e.into());
            }
        };

        info!("Serial port {} opened, receiver thread started", transport.port_name());

        Ok(Self {
            transport,
            state,
            stats,
            shutdown,
            receiver: Some(handle),
        })
    }

    /// Last mode reported by the gimbal
    ///
    /// `Idle` until the first valid state frame arrives.
    pub fn mode(&self) -> GimbalMode {
        self.state.get()
    }

    /// Send a yaw correction to the gimbal
    ///
    /// Encodes one command frame and writes it once. Write failures are
    /// logged and dropped; the next call simply tries again with fresh data.
    pub fn send(&self, yaw_offset: f32) {
        let frame = encode_command_frame(yaw_offset);

        match self.transport.write(&frame) {
            Ok(()) => self.stats.record_frame_sent(),
            Err(e) => {
                self.stats.record_send_failure();
                warn!("Failed to write serial: {}", e);
            }
        }
    }

    /// Current link counters
    pub fn stats(&self) -> LinkStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn port_name(&self) -> String {
        self.transport.port_name()
    }

    /// Whether the underlying port is currently open
    ///
    /// `false` while the receiver is between reconnect attempts or after it
    /// gave up on a reconnect sequence.
    pub fn is_connected(&self) -> bool {
        self.transport.is_open()
    }
}

impl<T: SerialTransport + 'static> Drop for GimbalLink<T> {
    fn drop(&mut self) {
        debug!("Shutting down gimbal link on {}", self.transport.port_name());
        self.shutdown.signal();

        if let Some(handle) = self.receiver.take() {
            if let Err(e) = handle.join() {
                error!("Gimbal receiver thread panicked: {:?}", e);
            }
        }

        close_quietly(self.transport.as_ref());
        info!("Gimbal link closed");
    }
}

/// Close a transport being torn down; failures only matter for debugging
fn close_quietly<T: SerialTransport + ?Sized>(transport: &T) {
    if let Err(e) = transport.close() {
        debug!("Ignoring close error on {}: {}", transport.port_name(), e);
    }
}
