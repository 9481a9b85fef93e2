//! Continuation State
//!
//! When a response does not fit in one PDU the server appends an opaque cookie
//! that the client echoes back in its next request to resume the transfer. The
//! client caches the cookie per session for the UUID currently being resolved.

use super::SdpError;
use super::protocol::{ByteReader, ByteWriter, read_sequence_length};
use crate::constants::MAX_PDU_CSTATE_LEN;

/// Continuation cookie as returned by the remote server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, defmt::Format)]
pub struct ContinuationState {
    length: u8,
    data: [u8; MAX_PDU_CSTATE_LEN],
}

impl ContinuationState {
    /// Empty continuation state, meaning "start of a fresh query"
    #[must_use]
    pub const fn new() -> Self {
        Self {
            length: 0,
            data: [0; MAX_PDU_CSTATE_LEN],
        }
    }

    /// Check a raw cookie against the maximum length
    ///
    /// # Errors
    /// Returns `SdpError::ContinuationTooLong` if the cookie is longer than
    /// `MAX_PDU_CSTATE_LEN`
    pub const fn validate(raw: &[u8]) -> Result<(), SdpError> {
        if raw.len() > MAX_PDU_CSTATE_LEN {
            return Err(SdpError::ContinuationTooLong);
        }
        Ok(())
    }

    /// Copy a validated cookie
    ///
    /// # Errors
    /// Returns `SdpError::ContinuationTooLong` if the cookie is too long
    pub fn from_bytes(raw: &[u8]) -> Result<Self, SdpError> {
        Self::validate(raw)?;
        let mut state = Self::new();
        state.data[..raw.len()].copy_from_slice(raw);
        state.length = u8::try_from(raw.len()).map_err(|_| SdpError::ContinuationTooLong)?;
        Ok(state)
    }

    /// Cookie length, 0 when no transfer is in progress
    #[must_use]
    pub const fn len(&self) -> usize {
        self.length as usize
    }

    /// Check if there is no cached cookie
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Cookie bytes
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.len()]
    }

    /// Drop the cached cookie
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// Write the cookie as `[length][bytes]`
    ///
    /// # Errors
    /// Returns `SdpError::BufferTooSmall` if `out` has no room
    pub fn encode<const N: usize>(&self, out: &mut ByteWriter<N>) -> Result<(), SdpError> {
        out.u8(self.length)?;
        out.bytes(self.as_slice())
    }
}

/// Read the total attribute byte count announced by the first fragment.
///
/// The total is only sent once, as the sequence header wrapping all attribute
/// lists in the first response of a query. With a cached cookie the response
/// is a follow-up fragment, nothing is consumed and 0 is returned. An
/// unrecognized sequence header also yields 0.
pub fn read_total(cached: &ContinuationState, reader: &mut ByteReader<'_>) -> u16 {
    if !cached.is_empty() {
        return 0;
    }

    match read_sequence_length(reader) {
        Ok(total) => {
            defmt::debug!("[SDP] Total {} octets of all attributes", total);
            total
        }
        Err(e) => {
            defmt::warn!("[SDP] Cannot read attribute total: {}", e);
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_long_cookie() {
        assert!(ContinuationState::validate(&[0u8; MAX_PDU_CSTATE_LEN]).is_ok());
        assert_eq!(
            ContinuationState::validate(&[0u8; MAX_PDU_CSTATE_LEN + 1]),
            Err(SdpError::ContinuationTooLong)
        );
        assert_eq!(
            ContinuationState::from_bytes(&[0xFF; 17]),
            Err(SdpError::ContinuationTooLong)
        );
    }

    #[test]
    fn test_cookie_is_kept_verbatim() {
        let state = ContinuationState::from_bytes(&[0x01, 0x02, 0x03]).unwrap();
        assert_eq!(state.len(), 3);
        assert_eq!(state.as_slice(), &[0x01, 0x02, 0x03]);

        let mut out = ByteWriter::<8>::new();
        state.encode(&mut out).unwrap();
        assert_eq!(out.as_slice(), &[0x03, 0x01, 0x02, 0x03]);
    }

    #[test]
    fn test_clear_returns_to_fresh_query() {
        let mut state = ContinuationState::from_bytes(&[0x09]).unwrap();
        state.clear();
        assert!(state.is_empty());

        let mut out = ByteWriter::<4>::new();
        state.encode(&mut out).unwrap();
        assert_eq!(out.as_slice(), &[0x00]);
    }

    #[test]
    fn test_read_total_first_fragment() {
        let data = [0x36, 0x01, 0x2C, 0x35, 0x04];
        let mut reader = ByteReader::new(&data);
        assert_eq!(read_total(&ContinuationState::new(), &mut reader), 300);
        assert_eq!(reader.position(), 3);
    }

    #[test]
    fn test_read_total_follow_up_fragment_consumes_nothing() {
        let cached = ContinuationState::from_bytes(&[0x01]).unwrap();
        let data = [0x36, 0x01, 0x2C];
        let mut reader = ByteReader::new(&data);
        assert_eq!(read_total(&cached, &mut reader), 0);
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn test_read_total_unknown_sequence() {
        let data = [0x37, 0x00, 0x00, 0x00, 0x10];
        let mut reader = ByteReader::new(&data);
        assert_eq!(read_total(&ContinuationState::new(), &mut reader), 0);
        assert_eq!(reader.position(), 1);
    }
}
