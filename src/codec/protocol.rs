//! # Gimbal Protocol Constants and Types
//!
//! Fixed wire layouts exchanged with the gimbal controller. Both frames
//! carry a two-byte magic header and end with a little-endian CRC16 over
//! every preceding byte. There is no length field, no padding and no
//! version negotiation.
//!
//! ```text
//! device -> controller (5 bytes):  'E' 'C' | state u8      | crc16 u16
//! controller -> device (8 bytes):  'V' 'C' | yaw f32 (LE)  | crc16 u16
//! ```

/// Magic header of frames sent by the gimbal
pub const STATE_FRAME_MAGIC: [u8; 2] = [b'E', b'C'];

/// Magic header of frames sent to the gimbal
pub const COMMAND_FRAME_MAGIC: [u8; 2] = [b'V', b'C'];

/// Size of the magic header
pub const MAGIC_LEN: usize = 2;

/// Total size of a device state frame
pub const STATE_FRAME_LEN: usize = 5;

/// Total size of a yaw command frame
pub const COMMAND_FRAME_LEN: usize = 8;

/// State code reported by the gimbal when it is in a fault condition
pub const STATE_CODE_ERROR: u8 = 0x00;

/// State code reported by the gimbal when it is operating
pub const STATE_CODE_RUNNING: u8 = 0x01;

/// Raw device state frame
pub type StateFrameBytes = [u8; STATE_FRAME_LEN];

/// Raw yaw command frame
pub type CommandFrameBytes = [u8; COMMAND_FRAME_LEN];

/// Decoded device state frame
///
/// Fields are reported as received; decoding does not judge them.
/// Use [`StateFrame::has_valid_magic`] and
/// [`crate::codec::decoder::verify_state_frame`] before trusting `state`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateFrame {
    /// Magic header bytes
    pub header: [u8; MAGIC_LEN],

    /// Raw device state code
    pub state: u8,

    /// Checksum carried by the frame
    pub crc: u16,
}

impl StateFrame {
    /// True when the header matches `'E','C'`
    pub fn has_valid_magic(&self) -> bool {
        self.header == STATE_FRAME_MAGIC
    }
}

/// Decoded yaw command frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommandFrame {
    /// Magic header bytes
    pub header: [u8; MAGIC_LEN],

    /// Horizontal offset of the target, in the units the gimbal expects
    pub yaw_offset: f32,

    /// Checksum carried by the frame
    pub crc: u16,
}

impl CommandFrame {
    /// True when the header matches `'V','C'`
    pub fn has_valid_magic(&self) -> bool {
        self.header == COMMAND_FRAME_MAGIC
    }
}
