//! # Gimbal Frame Decoder
//!
//! Splits fixed-size frames back into their fields. Decoding never fails:
//! buffers are fixed-size arrays, so the only questions left are whether
//! the magic and the checksum hold, and those are answered separately.

use bytes::Buf;

use super::crc::verify_crc16;
use super::protocol::*;

/// Decode the header and state of a device state frame
///
/// # Arguments
///
/// * `frame` - Exactly 5 bytes as read from the port
///
/// # Returns
///
/// * `StateFrame` - Header, raw state code and carried checksum
pub fn decode_state_frame(frame: &StateFrameBytes) -> StateFrame {
    let mut buf = &frame[..];

    let mut header = [0u8; MAGIC_LEN];
    buf.copy_to_slice(&mut header);
    let state = buf.get_u8();
    let crc = buf.get_u16_le();

    StateFrame { header, state, crc }
}

/// Decode a yaw command frame
///
/// Used by gimbal simulators and tests; the controller only sends these.
pub fn decode_command_frame(frame: &CommandFrameBytes) -> CommandFrame {
    let mut buf = &frame[..];

    let mut header = [0u8; MAGIC_LEN];
    buf.copy_to_slice(&mut header);
    let yaw_offset = buf.get_f32_le();
    let crc = buf.get_u16_le();

    CommandFrame { header, yaw_offset, crc }
}

/// Check the CRC16 of a device state frame
///
/// Recomputes the checksum over the first 3 bytes and compares it with the
/// trailing field. Returns `false` on mismatch.
pub fn verify_state_frame(frame: &StateFrameBytes) -> bool {
    verify_crc16(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encoder::{encode_command_frame, encode_state_frame};

    #[test]
    fn test_decode_state_frame_fields() {
        let frame = encode_state_frame(STATE_CODE_RUNNING);
        let decoded = decode_state_frame(&frame);

        assert!(decoded.has_valid_magic());
        assert_eq!(decoded.state, STATE_CODE_RUNNING);
        assert_eq!(decoded.crc, u16::from_le_bytes([frame[3], frame[4]]));
    }

    #[test]
    fn test_decode_state_frame_reports_bad_magic() {
        let mut frame = encode_state_frame(STATE_CODE_ERROR);
        frame[0] = b'X';

        let decoded = decode_state_frame(&frame);
        assert!(!decoded.has_valid_magic());
        assert_eq!(decoded.header, [b'X', b'C']);
    }

    #[test]
    fn test_verify_state_frame() {
        let frame = encode_state_frame(STATE_CODE_ERROR);
        assert!(verify_state_frame(&frame));
    }

    #[test]
    fn test_verify_state_frame_crc_error() {
        let mut frame = encode_state_frame(STATE_CODE_RUNNING);

        // Corrupt CRC
        frame[4] ^= 0xFF;
        assert!(!verify_state_frame(&frame));
    }

    #[test]
    fn test_verify_state_frame_payload_error() {
        let mut frame = encode_state_frame(STATE_CODE_RUNNING);

        // Flip state to "error" without updating the checksum
        frame[2] = STATE_CODE_ERROR;
        assert!(!verify_state_frame(&frame));
    }

    #[test]
    fn test_verify_all_zero_frame() {
        assert!(!verify_state_frame(&[0u8; STATE_FRAME_LEN]));
    }

    #[test]
    fn test_decode_command_frame() {
        let frame = encode_command_frame(-37.5);
        let decoded = decode_command_frame(&frame);

        assert!(decoded.has_valid_magic());
        assert_eq!(decoded.yaw_offset, -37.5);
        assert!(verify_crc16(&frame));
    }

    #[test]
    fn test_decode_every_state_code() {
        for state in 0..=u8::MAX {
            let frame = encode_state_frame(state);
            assert!(verify_state_frame(&frame));
            assert_eq!(decode_state_frame(&frame).state, state);
        }
    }
}
