//! Device mode shared between the receiver thread and the application.

use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex};

use crate::codec::protocol::{STATE_CODE_ERROR, STATE_CODE_RUNNING};

/// Last known operating mode of the gimbal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GimbalMode {
    /// No valid state received yet, or the device reported an unknown code
    #[default]
    Idle,
    /// Device reported state code 0x01
    Running,
    /// Device reported state code 0x00
    Error,
}

impl GimbalMode {
    /// Map a device state code to a mode
    ///
    /// Returns `None` for codes the protocol does not define; the caller
    /// decides how to treat them.
    pub fn from_state_code(code: u8) -> Option<Self> {
        match code {
            STATE_CODE_ERROR => Some(Self::Error),
            STATE_CODE_RUNNING => Some(Self::Running),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Running => "RUNNING",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for GimbalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mutex-guarded [`GimbalMode`]
///
/// Cloning yields another handle to the same value. Only the receiver loop
/// calls [`set`](DeviceState::set); anyone may call [`get`](DeviceState::get).
#[derive(Debug, Clone, Default)]
pub struct DeviceState {
    mode: Arc<Mutex<GimbalMode>>,
}

impl DeviceState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> GimbalMode {
        // A poisoned lock still holds a whole GimbalMode
        *self.mode.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set(&self, mode: GimbalMode) {
        *self.mode.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = mode;
    }
}
