//! # Gimbal Frame Encoder
//!
//! Serializes outgoing yaw commands (and, for simulators and tests, device
//! state frames) into their fixed wire layouts.

use bytes::BufMut;

use super::crc::{crc16, CRC16_LEN};
use super::protocol::*;

/// Encode a yaw offset into a complete command frame
///
/// # Arguments
///
/// * `yaw_offset` - Horizontal correction to send to the gimbal
///
/// # Returns
///
/// * `CommandFrameBytes` - 8 bytes: `'V','C'`, yaw as little-endian `f32`,
///   CRC16 of the first 6 bytes
///
/// # Examples
///
/// ```
/// use gimbal_link::codec::encoder::encode_command_frame;
///
/// let frame = encode_command_frame(-37.5);
/// assert_eq!(&frame[..2], b"VC");
/// assert_eq!(frame.len(), 8);
/// ```
pub fn encode_command_frame(yaw_offset: f32) -> CommandFrameBytes {
    let mut frame = [0u8; COMMAND_FRAME_LEN];

    let mut body = &mut frame[..];
    body.put_slice(&COMMAND_FRAME_MAGIC);
    body.put_f32_le(yaw_offset);

    seal(&mut frame);
    frame
}

/// Encode a device state frame
///
/// The controller never sends these; the encoder exists so gimbal
/// simulators and tests can produce byte-exact device traffic.
pub fn encode_state_frame(state: u8) -> StateFrameBytes {
    let mut frame = [0u8; STATE_FRAME_LEN];

    let mut body = &mut frame[..];
    body.put_slice(&STATE_FRAME_MAGIC);
    body.put_u8(state);

    seal(&mut frame);
    frame
}

/// Write the CRC16 of everything before the checksum field into its tail
fn seal(frame: &mut [u8]) {
    let split = frame.len() - CRC16_LEN;
    let crc = crc16(&frame[..split]);
    let mut tail = &mut frame[split..];
    tail.put_u16_le(crc);
}
