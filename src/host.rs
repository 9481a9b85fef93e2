//! SDP Host - Channel event routing for the server and client
//!
//! `SdpHost` ties the SDP engine to a [`Transport`]. It owns the transport, the
//! [`SdpServer`] serving the local registry and the [`SdpClient`] running
//! discoveries on remote devices.
//!
//! ## Event Flow
//!
//! 1. The L2CAP layer reports channel activity as [`ChannelEvent`]s
//! 2. Events for channels opened by a client session go to the client
//! 3. Every other channel belongs to the server
//! 4. Both sides answer through the transport owned by the host
//!
//! ## Usage
//!
//! ```rust,ignore
//! let mut registry = ServiceRegistry::new();
//! registry.register(ServiceRecord::new(ServiceClassId::SerialPort))?;
//!
//! let mut host = SdpHost::new(transport, &registry, SdpOptions::default());
//! host.discover(peer, &params)?;
//! host.handle_event(ChannelEvent::Connected { channel });
//! ```

use crate::constants::SDP_MTU;
use crate::sdp::{DiscoverParams, HandlerEntry, SdpClient, SdpError, SdpServer, ServiceRegistry};
use crate::transport::{ChannelId, Transport};
use crate::{BluetoothAddress, SdpOptions};
use heapless::Vec;

/// One complete SDP PDU as delivered by the transport
pub type Pdu = Vec<u8, { SDP_MTU as usize }>;

/// Channel activity reported by the L2CAP layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// Remote device opened a channel on the SDP PSM
    Accept {
        /// Remote device
        peer: BluetoothAddress,
        /// New channel
        channel: ChannelId,
    },
    /// Channel finished connecting
    Connected {
        /// Connected channel
        channel: ChannelId,
    },
    /// Channel closed, by either side
    Disconnected {
        /// Closed channel
        channel: ChannelId,
    },
    /// PDU received on a channel
    Received {
        /// Receiving channel
        channel: ChannelId,
        /// Received PDU
        data: Pdu,
    },
}

/// SDP server and client bound to one transport
pub struct SdpHost<'a, T: Transport> {
    transport: T,
    server: SdpServer<'a>,
    client: SdpClient<'a>,
    options: SdpOptions,
}

impl<'a, T: Transport> SdpHost<'a, T> {
    /// Create a host serving `registry`
    #[must_use]
    pub fn new(transport: T, registry: &'a ServiceRegistry, options: SdpOptions) -> Self {
        Self {
            transport,
            server: SdpServer::new(registry, &options),
            client: SdpClient::new(&options),
            options,
        }
    }

    /// Install the server's request handler table
    #[must_use]
    pub fn with_handlers(mut self, handlers: &'a [HandlerEntry<'a>]) -> Self {
        self.server = self.server.with_handlers(handlers);
        self
    }

    /// Get a reference to the options
    #[must_use]
    pub fn options(&self) -> &SdpOptions {
        &self.options
    }

    /// Get a reference to the transport
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Get a mutable reference to the transport
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// SDP server
    #[must_use]
    pub fn server(&self) -> &SdpServer<'a> {
        &self.server
    }

    /// SDP client
    #[must_use]
    pub fn client(&self) -> &SdpClient<'a> {
        &self.client
    }

    /// Resolve `params.uuid` on `peer`
    ///
    /// # Errors
    /// Returns the client's error if the request cannot be queued
    pub fn discover(
        &mut self,
        peer: BluetoothAddress,
        params: &'a DiscoverParams<'a>,
    ) -> Result<(), SdpError> {
        self.client.discover(&mut self.transport, peer, params)
    }

    /// Route a channel event to the client or the server
    pub fn handle_event(&mut self, event: ChannelEvent) {
        match event {
            ChannelEvent::Accept { peer, channel } => {
                if self.server.accept(peer, channel).is_err() {
                    self.transport.disconnect(channel);
                }
            }
            ChannelEvent::Connected { channel } => {
                if self.client.owns(channel) {
                    self.client.on_connected(&mut self.transport, channel);
                } else {
                    self.server.on_connected(channel);
                }
            }
            ChannelEvent::Disconnected { channel } => {
                if self.client.owns(channel) {
                    self.client.on_disconnected(&mut self.transport, channel);
                } else {
                    self.server.on_disconnected(channel);
                }
            }
            ChannelEvent::Received { channel, data } => {
                if self.client.owns(channel) {
                    self.client.on_receive(&mut self.transport, channel, &data);
                } else {
                    self.server.on_receive(&mut self.transport, channel, &data);
                }
            }
        }
    }
}
