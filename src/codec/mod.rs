//! # Gimbal Frame Codec
//!
//! Wire protocol between the vision controller and the gimbal.
//!
//! This module handles:
//! - Yaw command frame encoding (8 bytes, `'V','C'` header)
//! - Device state frame decoding (5 bytes, `'E','C'` header)
//! - CRC16 (MCRF4XX) checksum calculation and verification

pub mod protocol;
pub mod encoder;
pub mod decoder;
pub mod crc;
