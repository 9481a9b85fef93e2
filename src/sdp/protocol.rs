//! SDP Protocol Encoding
//!
//! This module implements the SDP wire format: the 5-byte PDU header, data
//! element sequence length prefixes and the service search attribute request
//! built by the client. All multi-byte fields are big-endian.

use super::{SdpError, SdpErrorCode, SdpPduId, TransactionId, cstate::ContinuationState, uuid::Uuid};
use crate::constants::{MAX_REQUEST_SIZE, SDP_HEADER_SIZE};
use heapless::Vec;

/// Data element type descriptors used by this crate
pub mod data_element {
    /// Nil
    pub const NIL: u8 = 0x00;
    /// Unsigned 8-bit integer
    pub const UINT8: u8 = 0x08;
    /// Unsigned 16-bit integer
    pub const UINT16: u8 = 0x09;
    /// Unsigned 32-bit integer
    pub const UINT32: u8 = 0x0A;
    /// Signed 8-bit integer
    pub const INT8: u8 = 0x10;
    /// Signed 16-bit integer
    pub const INT16: u8 = 0x11;
    /// Signed 32-bit integer
    pub const INT32: u8 = 0x12;
    /// 16-bit UUID
    pub const UUID16: u8 = 0x19;
    /// 32-bit UUID
    pub const UUID32: u8 = 0x1A;
    /// 128-bit UUID
    pub const UUID128: u8 = 0x1C;
    /// Text string, 8-bit length prefix
    pub const TEXT_STR8: u8 = 0x25;
    /// Boolean
    pub const BOOL: u8 = 0x28;
    /// Sequence, 8-bit length prefix
    pub const SEQ8: u8 = 0x35;
    /// Sequence, 16-bit length prefix
    pub const SEQ16: u8 = 0x36;
    /// URL, 8-bit length prefix
    pub const URL_STR8: u8 = 0x45;
}

/// SDP PDU Header
///
/// All SDP messages start with this 5-byte header containing the opcode,
/// transaction ID, and parameter length. The opcode is kept raw so that
/// unknown opcodes can still be answered with an error response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub struct SdpPduHeader {
    /// PDU opcode
    pub opcode: u8,
    /// Transaction identifier
    pub transaction_id: TransactionId,
    /// Length of parameters following the header
    pub parameter_length: u16,
}

impl SdpPduHeader {
    /// Create new PDU header
    #[must_use]
    pub const fn new(opcode: u8, transaction_id: TransactionId, parameter_length: u16) -> Self {
        Self {
            opcode,
            transaction_id,
            parameter_length,
        }
    }

    /// Known PDU ID for the opcode, if any
    #[must_use]
    pub const fn pdu_id(&self) -> Option<SdpPduId> {
        SdpPduId::from_u8(self.opcode)
    }

    /// Encode header to bytes
    #[must_use]
    pub fn encode(&self) -> [u8; SDP_HEADER_SIZE] {
        let [tid_hi, tid_lo] = self.transaction_id.to_be_bytes();
        let [len_hi, len_lo] = self.parameter_length.to_be_bytes();
        [self.opcode, tid_hi, tid_lo, len_hi, len_lo]
    }

    /// Decode header from the start of a PDU
    ///
    /// # Errors
    /// Returns `SdpError::MalformedHeader` if the buffer is shorter than a header
    pub fn decode(data: &[u8]) -> Result<Self, SdpError> {
        if data.len() < SDP_HEADER_SIZE {
            return Err(SdpError::MalformedHeader);
        }

        Ok(Self {
            opcode: data[0],
            transaction_id: u16::from_be_bytes([data[1], data[2]]),
            parameter_length: u16::from_be_bytes([data[3], data[4]]),
        })
    }
}

/// Bounded big-endian writer over a fixed-capacity buffer
#[derive(Debug, Clone, Default)]
pub struct ByteWriter<const N: usize> {
    buf: Vec<u8, N>,
}

impl<const N: usize> ByteWriter<N> {
    /// Create an empty writer
    #[must_use]
    pub const fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Append one byte
    ///
    /// # Errors
    /// Returns `SdpError::BufferTooSmall` when full
    pub fn u8(&mut self, value: u8) -> Result<(), SdpError> {
        self.buf.push(value).map_err(|_| SdpError::BufferTooSmall)
    }

    /// Append a big-endian 16-bit value
    ///
    /// # Errors
    /// Returns `SdpError::BufferTooSmall` when full
    pub fn be16(&mut self, value: u16) -> Result<(), SdpError> {
        self.bytes(&value.to_be_bytes())
    }

    /// Append a big-endian 32-bit value
    ///
    /// # Errors
    /// Returns `SdpError::BufferTooSmall` when full
    pub fn be32(&mut self, value: u32) -> Result<(), SdpError> {
        self.bytes(&value.to_be_bytes())
    }

    /// Append raw bytes
    ///
    /// # Errors
    /// Returns `SdpError::BufferTooSmall` when the bytes do not fit
    pub fn bytes(&mut self, data: &[u8]) -> Result<(), SdpError> {
        self.buf
            .extend_from_slice(data)
            .map_err(|()| SdpError::BufferTooSmall)
    }

    /// Overwrite a previously written big-endian 16-bit value
    ///
    /// # Errors
    /// Returns `SdpError::BufferTooSmall` if `offset` is outside the written bytes
    pub fn patch_be16(&mut self, offset: usize, value: u16) -> Result<(), SdpError> {
        let slot = self
            .buf
            .get_mut(offset..offset + 2)
            .ok_or(SdpError::BufferTooSmall)?;
        slot.copy_from_slice(&value.to_be_bytes());
        Ok(())
    }

    /// Number of bytes written
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Check if nothing has been written
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Written bytes
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }
}

/// Big-endian reader that never reads past the end of its input
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    /// Start reading at the beginning of `data`
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Bytes consumed so far
    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Bytes not yet consumed
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Read one byte
    pub fn u8(&mut self) -> Option<u8> {
        let value = *self.data.get(self.pos)?;
        self.pos += 1;
        Some(value)
    }

    /// Read a big-endian 16-bit value
    pub fn be16(&mut self) -> Option<u16> {
        let bytes = self.take(2)?;
        Some(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    /// Read exactly `count` bytes
    pub fn take(&mut self, count: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(count)?;
        let bytes = self.data.get(self.pos..end)?;
        self.pos = end;
        Some(bytes)
    }

    /// Remaining unread bytes, without consuming them
    #[must_use]
    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }
}

/// Read a data element sequence header and return the length it declares.
///
/// Only 8-bit and 16-bit sized sequences are recognized.
///
/// # Errors
/// Returns `SdpError::UnknownSequenceType` for any other descriptor and
/// `SdpError::BufferTooSmall` if the input ends early
pub fn read_sequence_length(reader: &mut ByteReader<'_>) -> Result<u16, SdpError> {
    let seq = reader.u8().ok_or(SdpError::BufferTooSmall)?;
    match seq {
        data_element::SEQ8 => reader
            .u8()
            .map(u16::from)
            .ok_or(SdpError::BufferTooSmall),
        data_element::SEQ16 => reader.be16().ok_or(SdpError::BufferTooSmall),
        other => Err(SdpError::UnknownSequenceType(other)),
    }
}

/// Frame `params` behind an SDP header.
///
/// # Errors
/// Returns `SdpError::BufferTooSmall` if the PDU does not fit in `N` bytes
pub fn encode_pdu<const N: usize>(
    opcode: u8,
    transaction_id: TransactionId,
    params: &[u8],
) -> Result<ByteWriter<N>, SdpError> {
    let parameter_length = u16::try_from(params.len()).map_err(|_| SdpError::BufferTooSmall)?;
    let mut pdu = ByteWriter::new();
    pdu.bytes(&SdpPduHeader::new(opcode, transaction_id, parameter_length).encode())?;
    pdu.bytes(params)?;
    Ok(pdu)
}

/// Build an error response PDU
#[must_use]
pub fn encode_error_response(
    transaction_id: TransactionId,
    code: SdpErrorCode,
) -> [u8; SDP_HEADER_SIZE + 2] {
    let header = SdpPduHeader::new(SdpPduId::ErrorResponse as u8, transaction_id, 2).encode();
    let [code_hi, code_lo] = (code as u16).to_be_bytes();
    [
        header[0], header[1], header[2], header[3], header[4], code_hi, code_lo,
    ]
}

/// Build a service search attribute request for a single UUID.
///
/// The attribute ID list is always the full range `0x0000-0xFFFF`. The
/// continuation state is echoed verbatim; an empty one starts a fresh query.
///
/// # Errors
/// Returns `SdpError::BufferTooSmall` if the request does not fit
pub fn encode_service_search_attribute_request(
    transaction_id: TransactionId,
    uuid: &Uuid,
    max_attribute_bytes: u16,
    cstate: &ContinuationState,
) -> Result<ByteWriter<MAX_REQUEST_SIZE>, SdpError> {
    let mut pdu = ByteWriter::new();
    pdu.bytes(
        &SdpPduHeader::new(
            SdpPduId::ServiceSearchAttributeRequest as u8,
            transaction_id,
            0,
        )
        .encode(),
    )?;

    // Service search pattern: one UUID
    #[allow(clippy::cast_possible_truncation)]
    let pattern_len = uuid.encoded_size() as u8;
    pdu.u8(data_element::SEQ8)?;
    pdu.u8(pattern_len)?;
    uuid.encode(&mut pdu)?;

    pdu.be16(max_attribute_bytes)?;

    // Attribute ID list: one uint32 range covering every attribute
    pdu.u8(data_element::SEQ8)?;
    pdu.u8(0x05)?;
    pdu.u8(data_element::UINT32)?;
    pdu.be16(0x0000)?;
    pdu.be16(0xFFFF)?;

    cstate.encode(&mut pdu)?;

    #[allow(clippy::cast_possible_truncation)]
    let parameter_length = (pdu.len() - SDP_HEADER_SIZE) as u16;
    pdu.patch_be16(3, parameter_length)?;
    Ok(pdu)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pdu_header_encoding() {
        let header = SdpPduHeader::new(0x06, 0x1234, 0x5678);
        assert_eq!(header.encode(), [0x06, 0x12, 0x34, 0x56, 0x78]);
    }

    #[test]
    fn test_pdu_header_roundtrip() {
        for (opcode, tid, len) in [(0x01, 0x0000, 0x0002), (0x07, 0xFFFF, 0x00C8), (0x42, 1, 0)] {
            let header = SdpPduHeader::new(opcode, tid, len);
            assert_eq!(SdpPduHeader::decode(&header.encode()), Ok(header));
        }
    }

    #[test]
    fn test_pdu_header_too_short() {
        assert_eq!(
            SdpPduHeader::decode(&[0x07, 0x00, 0x01, 0x00]),
            Err(SdpError::MalformedHeader)
        );
    }

    #[test]
    fn test_unknown_opcode_is_kept_raw() {
        let header = SdpPduHeader::decode(&[0x42, 0x00, 0x01, 0x00, 0x00]).unwrap();
        assert_eq!(header.opcode, 0x42);
        assert_eq!(header.pdu_id(), None);
    }

    #[test]
    fn test_read_sequence_length() {
        let mut reader = ByteReader::new(&[0x35, 0x10, 0x36, 0x01, 0x02]);
        assert_eq!(read_sequence_length(&mut reader), Ok(0x10));
        assert_eq!(read_sequence_length(&mut reader), Ok(0x0102));
        assert_eq!(reader.remaining(), 0);

        let mut reader = ByteReader::new(&[0x37, 0x00, 0x00, 0x00, 0x01]);
        assert_eq!(
            read_sequence_length(&mut reader),
            Err(SdpError::UnknownSequenceType(0x37))
        );

        let mut reader = ByteReader::new(&[0x36, 0x01]);
        assert_eq!(
            read_sequence_length(&mut reader),
            Err(SdpError::BufferTooSmall)
        );
    }

    #[test]
    fn test_reader_never_reads_past_end() {
        let mut reader = ByteReader::new(&[0x01, 0x02, 0x03]);
        assert_eq!(reader.take(4), None);
        assert_eq!(reader.be16(), Some(0x0102));
        assert_eq!(reader.be16(), None);
        assert_eq!(reader.u8(), Some(0x03));
        assert_eq!(reader.u8(), None);
    }

    #[test]
    fn test_error_response_encoding() {
        let pdu = encode_error_response(0x0102, SdpErrorCode::InvalidPduSize);
        assert_eq!(pdu, [0x01, 0x01, 0x02, 0x00, 0x02, 0x00, 0x04]);
    }

    #[test]
    fn test_ssa_request_uuid16() {
        let pdu = encode_service_search_attribute_request(
            1,
            &Uuid::Uuid16(0x1101),
            0xFFFF,
            &ContinuationState::new(),
        )
        .unwrap();

        assert_eq!(
            pdu.as_slice(),
            &[
                0x06, 0x00, 0x01, 0x00, 0x0F, // header
                0x35, 0x03, 0x19, 0x11, 0x01, // search pattern
                0xFF, 0xFF, // max attribute bytes
                0x35, 0x05, 0x0A, 0x00, 0x00, 0xFF, 0xFF, // attribute range
                0x00, // continuation state
            ]
        );
    }

    #[test]
    fn test_ssa_request_with_continuation_and_uuid128() {
        let cstate = ContinuationState::from_bytes(&[0xAA, 0xBB]).unwrap();
        let pdu = encode_service_search_attribute_request(
            0x0203,
            &Uuid::Uuid128([0x11; 16]),
            0x0100,
            &cstate,
        )
        .unwrap();

        let bytes = pdu.as_slice();
        let header = SdpPduHeader::decode(bytes).unwrap();
        assert_eq!(header.transaction_id, 0x0203);
        assert_eq!(usize::from(header.parameter_length), bytes.len() - SDP_HEADER_SIZE);
        assert_eq!(&bytes[5..8], &[0x35, 0x11, 0x1C]);
        assert_eq!(&bytes[bytes.len() - 3..], &[0x02, 0xAA, 0xBB]);
    }
}
