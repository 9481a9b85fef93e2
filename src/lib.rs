#![no_std]
#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

mod address;
pub mod buffer;
pub mod constants;
pub mod host;
pub mod pool;
pub mod processor;
pub mod sdp;
pub mod transport;

use crate::constants::{MAX_ATTRIBUTE_BYTE_COUNT, SDP_CLIENT_MTU, SDP_MTU};

pub use address::BluetoothAddress;
pub use buffer::{BufferPool, RecordBuf, RecordPool};
pub use host::{ChannelEvent, SdpHost};
pub use sdp::{
    DiscoverFlow, DiscoverHandler, DiscoverParams, DiscoverResult, SdpClient, SdpError,
    SdpErrorCode, SdpServer, ServiceRecord, ServiceRegistry, Uuid,
};
pub use transport::{ChannelId, Transport, TransportError};

/// Options for configuring the SDP server and client
///
/// # Examples
///
/// ```rust
/// use bondybird_sdp::{SdpOptions, constants};
///
/// // Use default options
/// let default_options = SdpOptions::default();
///
/// // Ask remote servers for smaller responses
/// let small = SdpOptions {
///     max_attribute_byte_count: 0x0100,
///     ..SdpOptions::default()
/// };
/// assert_eq!(small.server_mtu, constants::SDP_MTU);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub struct SdpOptions {
    /// Receive and transmit MTU of inbound channels, capped at `SDP_MTU`
    pub server_mtu: u16,
    /// Receive MTU requested for outbound channels
    pub client_mtu: u16,
    /// Maximum attribute byte count asked for in each search request
    ///
    /// Remote servers split longer responses into continuation fragments.
    pub max_attribute_byte_count: u16,
}

impl Default for SdpOptions {
    fn default() -> Self {
        Self {
            server_mtu: SDP_MTU,
            client_mtu: SDP_CLIENT_MTU,
            max_attribute_byte_count: MAX_ATTRIBUTE_BYTE_COUNT,
        }
    }
}
