//! Service Discovery Protocol (SDP) Implementation
//!
//! This module provides the SDP engine: PDU encoding and decoding, continuation
//! state handling, the local service registry with its request dispatcher, and
//! the client sessions that resolve queued UUID searches on remote devices.

/// Service record handle type
pub type ServiceRecordHandle = u32;

/// Transaction ID for SDP requests/responses
pub type TransactionId = u16;

pub mod client;
pub mod cstate;
pub mod protocol;
pub mod record;
pub mod registry;
pub mod server;
pub mod uuid;

// Re-export commonly used types
pub use client::{DiscoverFlow, DiscoverHandler, DiscoverParams, DiscoverResult, SdpClient};
pub use cstate::ContinuationState;
pub use protocol::SdpPduHeader;
pub use record::{AttributeId, DataElement, ServiceAttribute, ServiceClassId, ServiceRecord};
pub use registry::ServiceRegistry;
pub use server::{HandlerEntry, RequestHandler, SdpServer};
pub use uuid::Uuid;

/// SDP Protocol Data Unit IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
#[repr(u8)]
pub enum SdpPduId {
    /// Error Response
    ErrorResponse = 0x01,
    /// Service Search Request
    ServiceSearchRequest = 0x02,
    /// Service Search Response
    ServiceSearchResponse = 0x03,
    /// Service Attribute Request
    ServiceAttributeRequest = 0x04,
    /// Service Attribute Response
    ServiceAttributeResponse = 0x05,
    /// Service Search Attribute Request
    ServiceSearchAttributeRequest = 0x06,
    /// Service Search Attribute Response
    ServiceSearchAttributeResponse = 0x07,
}

impl SdpPduId {
    /// Map a raw opcode to a known PDU ID
    #[must_use]
    pub const fn from_u8(opcode: u8) -> Option<Self> {
        match opcode {
            0x01 => Some(Self::ErrorResponse),
            0x02 => Some(Self::ServiceSearchRequest),
            0x03 => Some(Self::ServiceSearchResponse),
            0x04 => Some(Self::ServiceAttributeRequest),
            0x05 => Some(Self::ServiceAttributeResponse),
            0x06 => Some(Self::ServiceSearchAttributeRequest),
            0x07 => Some(Self::ServiceSearchAttributeResponse),
            _ => None,
        }
    }
}

/// SDP Error Codes carried in error response PDUs
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
#[repr(u16)]
pub enum SdpErrorCode {
    /// Invalid/unsupported SDP version
    InvalidVersion = 0x0001,
    /// Invalid Service Record Handle
    InvalidServiceRecordHandle = 0x0002,
    /// Invalid request syntax
    InvalidSyntax = 0x0003,
    /// Invalid PDU size
    InvalidPduSize = 0x0004,
    /// Invalid continuation state
    InvalidContinuationState = 0x0005,
    /// Insufficient resources to satisfy request
    InsufficientResources = 0x0006,
}

impl SdpErrorCode {
    /// Map a raw wire value to a known error code
    #[must_use]
    pub const fn from_u16(value: u16) -> Option<Self> {
        match value {
            0x0001 => Some(Self::InvalidVersion),
            0x0002 => Some(Self::InvalidServiceRecordHandle),
            0x0003 => Some(Self::InvalidSyntax),
            0x0004 => Some(Self::InvalidPduSize),
            0x0005 => Some(Self::InvalidContinuationState),
            0x0006 => Some(Self::InsufficientResources),
            _ => None,
        }
    }
}

/// SDP Error Types
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum SdpError {
    /// PDU is shorter than the SDP header
    MalformedHeader,
    /// Buffer too small for operation
    BufferTooSmall,
    /// UUID width is not 16, 32 or 128 bits
    InvalidUuidType,
    /// Data element sequence descriptor is neither 8-bit nor 16-bit sized
    UnknownSequenceType(u8),
    /// Continuation state exceeds the maximum cookie length
    ContinuationTooLong,
    /// Attribute list byte count is below the minimum
    InvalidAttributeLength,
    /// Discovery request parameters rejected
    InvalidParams,
    /// No free pool slot or buffer
    ResourceExhausted,
    /// Service registry is full
    TooManyServices,
    /// Service record lacks the reserved handle attribute
    InvalidRecord,
    /// Protocol error from remote device
    ProtocolError(SdpErrorCode),
}

impl From<SdpErrorCode> for SdpError {
    fn from(code: SdpErrorCode) -> Self {
        Self::ProtocolError(code)
    }
}

impl core::fmt::Display for SdpError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::MalformedHeader => write!(f, "SDP PDU shorter than header"),
            Self::BufferTooSmall => write!(f, "Buffer too small"),
            Self::InvalidUuidType => write!(f, "Unsupported UUID width"),
            Self::UnknownSequenceType(seq) => write!(f, "Sequence type 0x{seq:02x} not handled"),
            Self::ContinuationTooLong => write!(f, "Continuation state too long"),
            Self::InvalidAttributeLength => write!(f, "Invalid attributes data length"),
            Self::InvalidParams => write!(f, "Invalid discovery parameters"),
            Self::ResourceExhausted => write!(f, "No free SDP context"),
            Self::TooManyServices => write!(f, "Too many services registered"),
            Self::InvalidRecord => write!(f, "Service record has no handle attribute"),
            Self::ProtocolError(code) => write!(f, "SDP error response {code:?}"),
        }
    }
}
