//! `BondyBird` SDP Constants
//!
//! Limits, default values and wire identifiers used throughout the SDP engine.
//! Every table in the crate is sized from these values so the memory footprint
//! is known at compile time.

/// L2CAP Protocol Service Multiplexer reserved for SDP
pub const SDP_PSM: u16 = 0x0001;

/// Maximum number of simultaneous SDP peers (server contexts and client sessions each)
pub const MAX_CONNECTIONS: usize = 4;

/// Maximum number of discovery requests queued on a single client session
pub const MAX_PENDING_DISCOVERIES: usize = 8;

/// Maximum number of locally registered service records
pub const MAX_SERVICES: usize = 16;

/// Maximum number of attributes per service record
pub const MAX_ATTRIBUTES_PER_RECORD: usize = 16;

/// SDP PDU header length in bytes
pub const SDP_HEADER_SIZE: usize = 5;

/// Payload MTU of the SDP server
pub const SDP_DATA_MTU: u16 = 200;

/// Receive and transmit MTU of the SDP server, header included
#[allow(clippy::cast_possible_truncation)]
pub const SDP_MTU: u16 = SDP_DATA_MTU + SDP_HEADER_SIZE as u16;

/// Receive MTU of outgoing SDP client channels
pub const SDP_CLIENT_MTU: u16 = 64;

/// First service record handle handed out by the registry
pub const SDP_SERVICE_HANDLE_BASE: u32 = 0x0001_0000;

/// Maximum length of a continuation state cookie
pub const MAX_PDU_CSTATE_LEN: usize = 16;

/// Attribute byte count requested from the remote server
pub const MAX_ATTRIBUTE_BYTE_COUNT: u16 = 0xFFFF;

/// Size of an encoded service search attribute request, worst case
pub const MAX_REQUEST_SIZE: usize = SDP_HEADER_SIZE + 2 + 17 + 2 + 7 + 1 + MAX_PDU_CSTATE_LEN;

/// Depth of the event and request queues used by the processor
pub const EVENT_QUEUE_DEPTH: usize = 8;
