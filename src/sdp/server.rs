//! SDP Server Implementation
//!
//! This module accepts inbound SDP channels and answers their requests. Each
//! accepted channel gets a server context from a fixed pool. Inbound PDUs are
//! checked for size and then dispatched by opcode against a table of
//! [`RequestHandler`]s; anything that cannot be answered gets an error response.

use super::protocol::{ByteWriter, SdpPduHeader, encode_error_response, encode_pdu};
use super::{SdpError, SdpErrorCode, TransactionId, registry::ServiceRegistry};
use crate::constants::{MAX_CONNECTIONS, SDP_DATA_MTU, SDP_HEADER_SIZE, SDP_MTU};
use crate::pool::{PoolSlot, SlotId, SlotPool};
use crate::transport::{ChannelId, Transport};
use crate::{BluetoothAddress, SdpOptions};

/// Buffer handlers write response parameters into
pub type ResponseBuffer = ByteWriter<{ SDP_DATA_MTU as usize }>;

/// Response generator for one request opcode
pub trait RequestHandler {
    /// Build the response parameters for a request.
    ///
    /// Returns the response opcode on success.
    ///
    /// # Errors
    /// Returns the error code to send back to the client
    fn handle(
        &self,
        registry: &ServiceRegistry,
        transaction_id: TransactionId,
        params: &[u8],
        response: &mut ResponseBuffer,
    ) -> Result<u8, SdpErrorCode>;
}

/// Dispatch table entry
#[derive(Clone, Copy)]
pub struct HandlerEntry<'a> {
    /// Request opcode served by the handler
    pub opcode: u8,
    /// Handler invoked for the opcode
    pub handler: &'a dyn RequestHandler,
}

/// Per-channel server state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServerContext {
    /// Channel the context is bound to, `None` when free
    pub channel: Option<ChannelId>,
    /// Remote device
    pub peer: Option<BluetoothAddress>,
    /// Receive MTU
    pub rx_mtu: u16,
    /// Transmit MTU
    pub tx_mtu: u16,
}

impl PoolSlot for ServerContext {
    fn is_free(&self) -> bool {
        self.channel.is_none()
    }
}

/// SDP Server
///
/// Serves the registered service records to remote clients.
pub struct SdpServer<'a> {
    registry: &'a ServiceRegistry,
    handlers: &'a [HandlerEntry<'a>],
    contexts: SlotPool<ServerContext, MAX_CONNECTIONS>,
    mtu: u16,
}

impl<'a> SdpServer<'a> {
    /// Create a server over `registry` with an empty handler table
    #[must_use]
    pub fn new(registry: &'a ServiceRegistry, options: &SdpOptions) -> Self {
        Self {
            registry,
            handlers: &[],
            contexts: SlotPool::new(),
            mtu: options.server_mtu.min(SDP_MTU),
        }
    }

    /// Install the opcode dispatch table
    #[must_use]
    pub fn with_handlers(mut self, handlers: &'a [HandlerEntry<'a>]) -> Self {
        self.handlers = handlers;
        self
    }

    /// Registry served by this server
    #[must_use]
    pub const fn registry(&self) -> &'a ServiceRegistry {
        self.registry
    }

    /// Allocate a context for an inbound channel.
    ///
    /// # Errors
    /// Returns `SdpError::ResourceExhausted` if every context is in use
    pub fn accept(&mut self, peer: BluetoothAddress, channel: ChannelId) -> Result<SlotId, SdpError> {
        let mtu = self.mtu;
        self.contexts
            .acquire(|context| {
                *context = ServerContext {
                    channel: Some(channel),
                    peer: Some(peer),
                    rx_mtu: mtu,
                    tx_mtu: 0,
                };
            })
            .inspect(|_| defmt::debug!("[SDP SERVER] Accepted channel 0x{:04x}", channel))
            .inspect_err(|_| {
                defmt::warn!("[SDP SERVER] No available SDP context for {}", peer);
            })
    }

    /// Check if `channel` is bound to a server context
    #[must_use]
    pub fn owns(&self, channel: ChannelId) -> bool {
        self.find(channel).is_some()
    }

    /// Context bound to `channel`
    #[must_use]
    pub fn context(&self, channel: ChannelId) -> Option<&ServerContext> {
        self.find(channel).and_then(|id| self.contexts.get(id))
    }

    /// Channel finished connecting
    pub fn on_connected(&mut self, channel: ChannelId) {
        let mtu = self.mtu;
        if let Some(context) = self.find(channel).and_then(|id| self.contexts.get_mut(id)) {
            defmt::debug!("[SDP SERVER] Channel 0x{:04x} connected", channel);
            context.rx_mtu = mtu;
            context.tx_mtu = mtu;
        }
    }

    /// Channel closed; its context is cleared
    pub fn on_disconnected(&mut self, channel: ChannelId) {
        if let Some(id) = self.find(channel) {
            defmt::debug!("[SDP SERVER] Channel 0x{:04x} disconnected", channel);
            self.contexts.release(id);
        }
    }

    /// Handle an inbound PDU and send the response or error response
    pub fn on_receive<T: Transport>(&mut self, transport: &mut T, channel: ChannelId, data: &[u8]) {
        if !self.owns(channel) {
            defmt::warn!("[SDP SERVER] PDU on unknown channel 0x{:04x}", channel);
            return;
        }

        let Ok(header) = SdpPduHeader::decode(data) else {
            defmt::warn!("[SDP SERVER] Too small SDP PDU received");
            return;
        };

        defmt::debug!(
            "[SDP SERVER] Received SDP code 0x{:02x} len {}",
            header.opcode,
            data.len()
        );

        let mut response = ResponseBuffer::new();
        match self.dispatch(&header, &data[SDP_HEADER_SIZE..], &mut response) {
            Ok(opcode) => {
                match encode_pdu::<{ SDP_MTU as usize }>(
                    opcode,
                    header.transaction_id,
                    response.as_slice(),
                ) {
                    Ok(pdu) => Self::send(transport, channel, pdu.as_slice()),
                    Err(e) => defmt::warn!("[SDP SERVER] Cannot frame response: {}", e),
                }
            }
            Err(code) => {
                defmt::warn!("[SDP SERVER] SDP error {}", code);
                let pdu = encode_error_response(header.transaction_id, code);
                Self::send(transport, channel, &pdu);
            }
        }
    }

    /// Route a request to the handler registered for its opcode.
    ///
    /// # Errors
    /// Returns `SdpErrorCode::InvalidPduSize` if the declared parameter length
    /// differs from the actual one, `SdpErrorCode::InvalidSyntax` if no handler
    /// serves the opcode, or the handler's own error code
    pub fn dispatch(
        &self,
        header: &SdpPduHeader,
        params: &[u8],
        response: &mut ResponseBuffer,
    ) -> Result<u8, SdpErrorCode> {
        if usize::from(header.parameter_length) != params.len() {
            return Err(SdpErrorCode::InvalidPduSize);
        }

        let entry = self
            .handlers
            .iter()
            .find(|entry| entry.opcode == header.opcode)
            .ok_or(SdpErrorCode::InvalidSyntax)?;

        entry
            .handler
            .handle(self.registry, header.transaction_id, params, response)
    }

    fn find(&self, channel: ChannelId) -> Option<SlotId> {
        self.contexts
            .find(|context| context.channel == Some(channel))
    }

    fn send<T: Transport>(transport: &mut T, channel: ChannelId, pdu: &[u8]) {
        if let Err(e) = transport.send(channel, pdu) {
            defmt::warn!("[SDP SERVER] Send failed on 0x{:04x}: {}", channel, e);
        }
    }
}
