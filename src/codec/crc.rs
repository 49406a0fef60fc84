//! # CRC16 Implementation
//!
//! CRC-16/MCRF4XX checksum shared with the gimbal firmware.
//!
//! **Polynomial**: 0x1021, reflected (0x8408)
//! **Initial Value**: 0xFFFF
//! **Final XOR**: none
//!
//! The checksum trails every frame as a little-endian `u16`.

/// Reflected CRC-16 polynomial
const CRC16_POLY_REFLECTED: u16 = 0x8408;

/// CRC16 initial value
pub const CRC16_INIT: u16 = 0xFFFF;

/// Size of the trailing checksum field in bytes
pub const CRC16_LEN: usize = 2;

/// Precomputed CRC16 lookup table
const CRC16_TABLE: [u16; 256] = generate_crc16_table();

/// Generate CRC16 lookup table at compile time
const fn generate_crc16_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;

    while i < 256 {
        let mut crc = i as u16;
        let mut j = 0;

        while j < 8 {
            if (crc & 0x0001) != 0 {
                crc = (crc >> 1) ^ CRC16_POLY_REFLECTED;
            } else {
                crc >>= 1;
            }
            j += 1;
        }

        table[i] = crc;
        i += 1;
    }

    table
}

/// Calculate the CRC16 of a byte slice
///
/// # Arguments
///
/// * `data` - Bytes covered by the checksum (header and payload)
///
/// # Returns
///
/// * `u16` - Calculated checksum
///
/// # Examples
///
/// ```
/// use gimbal_link::codec::crc::crc16;
///
/// assert_eq!(crc16(b"123456789"), 0x6F91);
/// ```
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc = CRC16_INIT;

    for &byte in data {
        crc = (crc >> 8) ^ CRC16_TABLE[((crc ^ byte as u16) & 0x00FF) as usize];
    }

    crc
}

/// Check the trailing CRC16 of a complete frame
///
/// Recomputes the checksum over everything except the last two bytes and
/// compares it with the little-endian value stored there. Frames too short
/// to carry a checksum are rejected.
pub fn verify_crc16(frame: &[u8]) -> bool {
    if frame.len() <= CRC16_LEN {
        return false;
    }

    let (body, tail) = frame.split_at(frame.len() - CRC16_LEN);
    crc16(body) == u16::from_le_bytes([tail[0], tail[1]])
}

/// Bitwise CRC16, used to check the lookup table
#[cfg(test)]
fn crc16_slow(data: &[u8]) -> u16 {
    let mut crc = CRC16_INIT;

    for &byte in data {
        crc ^= byte as u16;

        for _ in 0..8 {
            if (crc & 0x0001) != 0 {
                crc = (crc >> 1) ^ CRC16_POLY_REFLECTED;
            } else {
                crc >>= 1;
            }
        }
    }

    crc
}
