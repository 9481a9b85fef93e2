//! SDP Service Record Management
//!
//! This module provides data structures for local service records: attributes
//! are kept as an ordered list of ID/data element pairs, the first of which is
//! always the record handle. Records can be written out as SDP attribute lists.

use super::protocol::{ByteWriter, data_element};
use super::{SdpError, ServiceRecordHandle, Uuid};
use crate::constants::MAX_ATTRIBUTES_PER_RECORD;
use heapless::Vec;

/// Attribute ID type
pub type AttributeId = u16;

/// Universal attribute IDs module
pub mod universal_attributes {
    /// Service Record Handle
    pub const SERVICE_RECORD_HANDLE: u16 = 0x0000;
    /// Service Class ID List
    pub const SERVICE_CLASS_ID_LIST: u16 = 0x0001;
    /// Service Record State
    pub const SERVICE_RECORD_STATE: u16 = 0x0002;
    /// Protocol Descriptor List
    pub const PROTOCOL_DESCRIPTOR_LIST: u16 = 0x0004;
    /// Browse Group List
    pub const BROWSE_GROUP_LIST: u16 = 0x0005;
    /// Service Name (English language base)
    pub const SERVICE_NAME: u16 = 0x0100;
}

/// Standard Bluetooth Service Classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
#[repr(u16)]
pub enum ServiceClassId {
    /// SDP Server Service
    ServiceDiscoveryServer = 0x1000,
    /// Public Browse Root
    PublicBrowseRoot = 0x1002,
    /// Serial Port Profile
    SerialPort = 0x1101,
    /// Object Push Profile
    ObjectPush = 0x1105,
    /// Headset Profile
    Headset = 0x1108,
    /// Audio Source
    AudioSource = 0x110A,
    /// Audio Sink
    AudioSink = 0x110B,
    /// A/V Remote Control Target
    AvRemoteControlTarget = 0x110C,
    /// A/V Remote Control
    AvRemoteControl = 0x110E,
    /// Hands-Free Profile
    HandsFree = 0x111E,
    /// Hands-Free Audio Gateway
    HandsFreeAudioGateway = 0x111F,
}

impl ServiceClassId {
    /// 16-bit UUID of the service class
    #[must_use]
    pub const fn to_uuid(self) -> Uuid {
        Uuid::Uuid16(self as u16)
    }
}

/// SDP Data Element
///
/// Value of a service record attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataElement {
    /// Nil (null value)
    Nil,
    /// Unsigned 8-bit integer
    UnsignedInt8(u8),
    /// Unsigned 16-bit integer
    UnsignedInt16(u16),
    /// Unsigned 32-bit integer
    UnsignedInt32(u32),
    /// Signed 8-bit integer
    SignedInt8(i8),
    /// Signed 16-bit integer
    SignedInt16(i16),
    /// Signed 32-bit integer
    SignedInt32(i32),
    /// UUID of any width
    Uuid(Uuid),
    /// Text string (UTF-8)
    TextString(Vec<u8, 64>),
    /// Boolean value
    Boolean(bool),
    /// URL string
    Url(Vec<u8, 64>),
    /// Sequence of UUIDs, as used by service class ID lists
    UuidList(Vec<Uuid, 8>),
}

/// Service Record Attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceAttribute {
    /// Attribute identifier
    pub id: AttributeId,
    /// Attribute value
    pub value: DataElement,
}

/// Service Record
///
/// The handle and registration index are assigned by the registry. The first
/// attribute is reserved for the encoded handle.
#[derive(Debug, Clone)]
pub struct ServiceRecord {
    /// Service record handle (assigned at registration)
    pub handle: ServiceRecordHandle,
    /// Registration order
    pub index: u8,
    /// Attributes in declaration order
    pub attributes: Vec<ServiceAttribute, MAX_ATTRIBUTES_PER_RECORD>,
}

impl DataElement {
    /// Create a new text string data element
    ///
    /// # Errors
    /// Returns error if string is too long
    pub fn text_string(text: &str) -> Result<Self, SdpError> {
        Vec::from_slice(text.as_bytes())
            .map(Self::TextString)
            .map_err(|()| SdpError::BufferTooSmall)
    }

    /// Get the encoded size of this data element
    #[must_use]
    pub fn encoded_size(&self) -> usize {
        match self {
            Self::Nil => 1,
            Self::UnsignedInt8(_) | Self::SignedInt8(_) | Self::Boolean(_) => 2,
            Self::UnsignedInt16(_) | Self::SignedInt16(_) => 3,
            Self::UnsignedInt32(_) | Self::SignedInt32(_) => 5,
            Self::Uuid(uuid) => uuid.encoded_size(),
            Self::TextString(bytes) | Self::Url(bytes) => 2 + bytes.len(),
            Self::UuidList(uuids) => 2 + uuids.iter().map(Uuid::encoded_size).sum::<usize>(),
        }
    }

    /// Write the data element in SDP wire form
    ///
    /// # Errors
    /// Returns `SdpError::BufferTooSmall` if `out` has no room
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn encode<const N: usize>(&self, out: &mut ByteWriter<N>) -> Result<(), SdpError> {
        match self {
            Self::Nil => out.u8(data_element::NIL),
            Self::UnsignedInt8(value) => {
                out.u8(data_element::UINT8)?;
                out.u8(*value)
            }
            Self::UnsignedInt16(value) => {
                out.u8(data_element::UINT16)?;
                out.be16(*value)
            }
            Self::UnsignedInt32(value) => {
                out.u8(data_element::UINT32)?;
                out.be32(*value)
            }
            Self::SignedInt8(value) => {
                out.u8(data_element::INT8)?;
                out.u8(*value as u8)
            }
            Self::SignedInt16(value) => {
                out.u8(data_element::INT16)?;
                out.be16(*value as u16)
            }
            Self::SignedInt32(value) => {
                out.u8(data_element::INT32)?;
                out.be32(*value as u32)
            }
            Self::Uuid(uuid) => uuid.encode(out),
            Self::TextString(bytes) => {
                out.u8(data_element::TEXT_STR8)?;
                out.u8(bytes.len() as u8)?;
                out.bytes(bytes)
            }
            Self::Boolean(value) => {
                out.u8(data_element::BOOL)?;
                out.u8(u8::from(*value))
            }
            Self::Url(bytes) => {
                out.u8(data_element::URL_STR8)?;
                out.u8(bytes.len() as u8)?;
                out.bytes(bytes)
            }
            Self::UuidList(uuids) => {
                out.u8(data_element::SEQ8)?;
                out.u8((self.encoded_size() - 2) as u8)?;
                for uuid in uuids {
                    uuid.encode(out)?;
                }
                Ok(())
            }
        }
    }
}

impl ServiceRecord {
    /// Create a record for one service class.
    ///
    /// The handle attribute is a placeholder until the record is registered.
    #[must_use]
    pub fn new(service_class: ServiceClassId) -> Self {
        let mut record = Self::empty();

        let mut classes = Vec::new();
        classes.push(service_class.to_uuid()).ok();

        record
            .attributes
            .push(ServiceAttribute {
                id: universal_attributes::SERVICE_RECORD_HANDLE,
                value: DataElement::UnsignedInt32(0),
            })
            .ok();
        record
            .attributes
            .push(ServiceAttribute {
                id: universal_attributes::SERVICE_CLASS_ID_LIST,
                value: DataElement::UuidList(classes),
            })
            .ok();

        record
    }

    /// Create a record without any attributes
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            handle: 0,
            index: 0,
            attributes: Vec::new(),
        }
    }

    /// Add or replace an attribute
    ///
    /// # Errors
    /// Returns `SdpError::BufferTooSmall` if the record is full
    pub fn add_attribute(&mut self, id: AttributeId, value: DataElement) -> Result<(), SdpError> {
        if let Some(existing) = self.attributes.iter_mut().find(|attr| attr.id == id) {
            existing.value = value;
            return Ok(());
        }

        self.attributes
            .push(ServiceAttribute { id, value })
            .map_err(|_| SdpError::BufferTooSmall)
    }

    /// Get attribute value
    #[must_use]
    pub fn get_attribute(&self, id: AttributeId) -> Option<&DataElement> {
        self.attributes
            .iter()
            .find(|attr| attr.id == id)
            .map(|attr| &attr.value)
    }

    /// Set service name
    ///
    /// # Errors
    /// Returns error if name is too long or the record is full
    pub fn set_service_name(&mut self, name: &str) -> Result<(), SdpError> {
        self.add_attribute(
            universal_attributes::SERVICE_NAME,
            DataElement::text_string(name)?,
        )
    }

    /// Check if the service class ID list contains `uuid`
    #[must_use]
    pub fn has_service_class(&self, uuid: &Uuid) -> bool {
        matches!(
            self.get_attribute(universal_attributes::SERVICE_CLASS_ID_LIST),
            Some(DataElement::UuidList(classes)) if classes.contains(uuid)
        )
    }

    /// Size of the attribute list without its sequence header
    #[must_use]
    pub fn attribute_list_size(&self) -> usize {
        self.attributes
            .iter()
            .map(|attr| 3 + attr.value.encoded_size())
            .sum()
    }

    /// Write every attribute as one data element sequence of ID/value pairs
    ///
    /// # Errors
    /// Returns `SdpError::BufferTooSmall` if `out` has no room
    pub fn encode_attribute_list<const N: usize>(
        &self,
        out: &mut ByteWriter<N>,
    ) -> Result<(), SdpError> {
        let size = self.attribute_list_size();
        if let Ok(size) = u8::try_from(size) {
            out.u8(data_element::SEQ8)?;
            out.u8(size)?;
        } else {
            out.u8(data_element::SEQ16)?;
            out.be16(u16::try_from(size).map_err(|_| SdpError::BufferTooSmall)?)?;
        }

        for attr in &self.attributes {
            out.u8(data_element::UINT16)?;
            out.be16(attr.id)?;
            attr.value.encode(out)?;
        }
        Ok(())
    }
}
