//! # Gimbal Link Library
//!
//! Serial link between a vision controller and a gimbal controller.
//!
//! This library provides the binary-framed, CRC16-checked protocol used to
//! stream yaw corrections to the gimbal and to track the operating mode the
//! gimbal reports back, with a background receiver thread that reconnects
//! the port after sustained failure.

pub mod config;
pub mod error;
pub mod codec;
pub mod gimbal;
pub mod serial;
pub mod telemetry;

pub use gimbal::{GimbalLink, GimbalMode};
