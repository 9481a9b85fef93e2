//! Channel Transport Abstraction
//!
//! SDP runs on top of a reliable, connection-oriented L2CAP channel. The engine
//! never touches L2CAP directly; it drives the channel through [`Transport`] and
//! is told about channel lifecycle and inbound data through the event hooks on
//! [`crate::SdpHost`].

use crate::BluetoothAddress;

/// L2CAP channel identifier used as the SDP channel handle
pub type ChannelId = u16;

/// Errors reported by the transport collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum TransportError {
    /// No ACL link to the requested peer
    NotConnected,
    /// Transport has no room for another channel or packet
    NoResources,
    /// Channel handle is not known to the transport
    UnknownChannel,
    /// Packet exceeds the channel MTU
    PacketTooLarge,
}

impl core::fmt::Display for TransportError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotConnected => write!(f, "No link to remote device"),
            Self::NoResources => write!(f, "Transport resources exhausted"),
            Self::UnknownChannel => write!(f, "Unknown channel"),
            Self::PacketTooLarge => write!(f, "Packet exceeds channel MTU"),
        }
    }
}

/// Connection-oriented channel used to carry SDP PDUs
pub trait Transport {
    /// Start opening a channel to `peer` on `psm` with receive MTU `mtu`.
    ///
    /// The returned channel is usable once the transport reports it connected.
    ///
    /// # Errors
    /// Returns an error if the channel cannot be created
    fn connect(
        &mut self,
        peer: BluetoothAddress,
        psm: u16,
        mtu: u16,
    ) -> Result<ChannelId, TransportError>;

    /// Send one complete PDU on `channel`.
    ///
    /// # Errors
    /// Returns an error if the packet cannot be queued
    fn send(&mut self, channel: ChannelId, pdu: &[u8]) -> Result<(), TransportError>;

    /// Request the channel be closed. Completion is reported as a disconnect event.
    fn disconnect(&mut self, channel: ChannelId);
}

#[cfg(test)]
pub(crate) mod mock {
    use super::{ChannelId, Transport, TransportError};
    use crate::BluetoothAddress;
    use crate::constants::SDP_MTU;
    use heapless::Vec;

    /// Recording transport used by the unit tests
    #[derive(Debug, Default)]
    pub struct MockTransport {
        pub next_channel: ChannelId,
        pub connects: Vec<(BluetoothAddress, u16), 8>,
        pub sent: Vec<(ChannelId, Vec<u8, { SDP_MTU as usize }>), 16>,
        pub disconnects: Vec<ChannelId, 8>,
        pub connect_mtu: u16,
        pub fail_connect: bool,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self {
                next_channel: 0x0040,
                ..Self::default()
            }
        }

        pub fn last_sent(&self) -> Option<&[u8]> {
            self.sent.last().map(|(_, pdu)| pdu.as_slice())
        }
    }

    impl Transport for MockTransport {
        fn connect(
            &mut self,
            peer: BluetoothAddress,
            psm: u16,
            mtu: u16,
        ) -> Result<ChannelId, TransportError> {
            if self.fail_connect {
                return Err(TransportError::NotConnected);
            }
            self.connects
                .push((peer, psm))
                .map_err(|_| TransportError::NoResources)?;
            self.connect_mtu = mtu;
            let channel = self.next_channel;
            self.next_channel += 1;
            Ok(channel)
        }

        fn send(&mut self, channel: ChannelId, pdu: &[u8]) -> Result<(), TransportError> {
            let packet = Vec::from_slice(pdu).map_err(|()| TransportError::PacketTooLarge)?;
            self.sent
                .push((channel, packet))
                .map_err(|_| TransportError::NoResources)
        }

        fn disconnect(&mut self, channel: ChannelId) {
            self.disconnects.push(channel).ok();
        }
    }
}
