//! Local Service Registry
//!
//! Append-only database of the service records this device advertises. The
//! registry is an owned value handed to the server by reference; records are
//! registered during setup and are never removed.

use super::record::{DataElement, ServiceRecord, universal_attributes};
use super::{SdpError, ServiceRecordHandle};
use crate::constants::{MAX_SERVICES, SDP_SERVICE_HANDLE_BASE};
use heapless::Vec;

/// Service record database
#[derive(Debug, Default)]
pub struct ServiceRegistry {
    /// Records in registration order; the newest is last
    records: Vec<ServiceRecord, MAX_SERVICES>,
    /// Registration counter
    num_services: u8,
}

impl ServiceRegistry {
    /// Create an empty registry
    #[must_use]
    pub const fn new() -> Self {
        Self {
            records: Vec::new(),
            num_services: 0,
        }
    }

    /// Register a service record and return its handle.
    ///
    /// The handle is one past the most recently registered record's handle, or
    /// `SDP_SERVICE_HANDLE_BASE` for the first record. It is also written into
    /// the record's reserved first attribute.
    ///
    /// # Errors
    /// Returns `SdpError::InvalidRecord` if the record does not start with the
    /// handle attribute, or `SdpError::TooManyServices` if the registry is full
    pub fn register(&mut self, mut record: ServiceRecord) -> Result<ServiceRecordHandle, SdpError> {
        let Some(handle_attr) = record
            .attributes
            .first_mut()
            .filter(|attr| attr.id == universal_attributes::SERVICE_RECORD_HANDLE)
        else {
            defmt::warn!("[SDP SERVER] No service record handle attribute specified");
            return Err(SdpError::InvalidRecord);
        };

        if self.records.is_full() {
            return Err(SdpError::TooManyServices);
        }

        let handle = self
            .records
            .last()
            .map_or(SDP_SERVICE_HANDLE_BASE, |head| head.handle.wrapping_add(1));

        handle_attr.value = DataElement::UnsignedInt32(handle);
        record.handle = handle;
        record.index = self.num_services;
        self.num_services = self.num_services.wrapping_add(1);

        self.records
            .push(record)
            .map_err(|_| SdpError::TooManyServices)?;

        defmt::debug!("[SDP SERVER] Service registered at {}", handle);
        Ok(handle)
    }

    /// Records, most recently registered first
    pub fn iter(&self) -> impl Iterator<Item = &ServiceRecord> {
        self.records.iter().rev()
    }

    /// Get service record by handle
    #[must_use]
    pub fn get(&self, handle: ServiceRecordHandle) -> Option<&ServiceRecord> {
        self.records.iter().find(|record| record.handle == handle)
    }

    /// Number of registered records
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if no record has been registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sdp::record::ServiceClassId;

    #[test]
    fn test_handles_increase_from_base() {
        let mut registry = ServiceRegistry::new();

        let first = registry
            .register(ServiceRecord::new(ServiceClassId::SerialPort))
            .unwrap();
        let second = registry
            .register(ServiceRecord::new(ServiceClassId::AudioSink))
            .unwrap();
        let third = registry
            .register(ServiceRecord::new(ServiceClassId::HandsFree))
            .unwrap();

        assert_eq!(first, SDP_SERVICE_HANDLE_BASE);
        assert_eq!(second, SDP_SERVICE_HANDLE_BASE + 1);
        assert_eq!(third, SDP_SERVICE_HANDLE_BASE + 2);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_handle_written_into_first_attribute() {
        let mut registry = ServiceRegistry::new();
        registry
            .register(ServiceRecord::new(ServiceClassId::ObjectPush))
            .unwrap();
        let handle = registry
            .register(ServiceRecord::new(ServiceClassId::Headset))
            .unwrap();

        let record = registry.get(handle).unwrap();
        assert_eq!(record.handle, handle);
        assert_eq!(record.index, 1);
        assert_eq!(
            record.attributes[0].value,
            DataElement::UnsignedInt32(handle)
        );
    }

    #[test]
    fn test_newest_record_first() {
        let mut registry = ServiceRegistry::new();
        registry
            .register(ServiceRecord::new(ServiceClassId::SerialPort))
            .unwrap();
        registry
            .register(ServiceRecord::new(ServiceClassId::AudioSource))
            .unwrap();

        let mut handles = registry.iter().map(|record| record.handle);
        assert_eq!(handles.next(), Some(SDP_SERVICE_HANDLE_BASE + 1));
        assert_eq!(handles.next(), Some(SDP_SERVICE_HANDLE_BASE));
        assert_eq!(handles.next(), None);
    }

    #[test]
    fn test_record_without_handle_slot_rejected() {
        let mut registry = ServiceRegistry::new();

        assert_eq!(
            registry.register(ServiceRecord::empty()),
            Err(SdpError::InvalidRecord)
        );

        let mut record = ServiceRecord::empty();
        record
            .add_attribute(0x0100, DataElement::text_string("x").unwrap())
            .unwrap();
        assert_eq!(registry.register(record), Err(SdpError::InvalidRecord));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_registry_full() {
        let mut registry = ServiceRegistry::new();
        for _ in 0..MAX_SERVICES {
            registry
                .register(ServiceRecord::new(ServiceClassId::SerialPort))
                .unwrap();
        }

        assert_eq!(
            registry.register(ServiceRecord::new(ServiceClassId::SerialPort)),
            Err(SdpError::TooManyServices)
        );
    }
}
