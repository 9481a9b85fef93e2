//! SDP UUIDs
//!
//! SDP carries UUIDs in three widths. The width selects the data element type
//! descriptor used on the wire.

use super::SdpError;
use super::protocol::{ByteWriter, data_element};

/// UUID in one of the three SDP widths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, defmt::Format)]
pub enum Uuid {
    /// 16-bit short UUID
    Uuid16(u16),
    /// 32-bit short UUID
    Uuid32(u32),
    /// Full 128-bit UUID, big-endian bytes
    Uuid128([u8; 16]),
}

impl Uuid {
    /// Build a UUID from its big-endian value bytes.
    ///
    /// # Errors
    /// Returns `SdpError::InvalidUuidType` unless `bytes` is 2, 4 or 16 bytes long
    pub fn from_be_slice(bytes: &[u8]) -> Result<Self, SdpError> {
        match bytes.len() {
            2 => Ok(Self::Uuid16(u16::from_be_bytes([bytes[0], bytes[1]]))),
            4 => Ok(Self::Uuid32(u32::from_be_bytes([
                bytes[0], bytes[1], bytes[2], bytes[3],
            ]))),
            16 => {
                let mut value = [0u8; 16];
                value.copy_from_slice(bytes);
                Ok(Self::Uuid128(value))
            }
            _ => Err(SdpError::InvalidUuidType),
        }
    }

    /// Data element type descriptor for this width
    #[must_use]
    pub const fn descriptor(&self) -> u8 {
        match self {
            Self::Uuid16(_) => data_element::UUID16,
            Self::Uuid32(_) => data_element::UUID32,
            Self::Uuid128(_) => data_element::UUID128,
        }
    }

    /// Encoded size of the data element, descriptor included
    #[must_use]
    pub const fn encoded_size(&self) -> usize {
        1 + match self {
            Self::Uuid16(_) => 2,
            Self::Uuid32(_) => 4,
            Self::Uuid128(_) => 16,
        }
    }

    /// Write the UUID as a data element
    ///
    /// # Errors
    /// Returns `SdpError::BufferTooSmall` if `out` has no room
    pub fn encode<const N: usize>(&self, out: &mut ByteWriter<N>) -> Result<(), SdpError> {
        out.u8(self.descriptor())?;
        match self {
            Self::Uuid16(value) => out.be16(*value),
            Self::Uuid32(value) => out.be32(*value),
            Self::Uuid128(value) => out.bytes(value),
        }
    }
}
