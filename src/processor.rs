//! Processor - Async event loop for the SDP host
//!
//! The L2CAP layer and the application feed the SDP engine through two queues:
//!
//! * **Channel events** ([`ChannelEvent`]) carry channel lifecycle and received PDUs
//! * **Discovery requests** ([`DiscoverRequest`]) ask for a UUID to be resolved on a peer
//!
//! [`process_next`] waits on both queues and applies whichever is ready first;
//! [`run`] does so forever and is meant to be spawned as its own task.
//!
//! # Example
//!
//! ```rust,ignore
//! use bondybird_sdp::processor::{self, DiscoverRequest};
//! use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, channel::Channel};
//!
//! static EVENTS: Channel<CriticalSectionRawMutex, ChannelEvent, EVENT_QUEUE_DEPTH> = Channel::new();
//! static REQUESTS: Channel<CriticalSectionRawMutex, DiscoverRequest<'static>, EVENT_QUEUE_DEPTH> =
//!     Channel::new();
//!
//! processor::run(&mut host, &EVENTS, &REQUESTS).await;
//! ```

use crate::BluetoothAddress;
use crate::host::{ChannelEvent, SdpHost};
use crate::sdp::DiscoverParams;
use crate::transport::Transport;
use embassy_futures::select::{Either, select};
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::Channel;

/// Request to resolve `params.uuid` on `peer`
#[derive(Clone, Copy)]
pub struct DiscoverRequest<'a> {
    /// Remote device
    pub peer: BluetoothAddress,
    /// UUID, result handler and buffer pool
    pub params: &'a DiscoverParams<'a>,
}

/// Wait for the next channel event or discovery request and apply it
pub async fn process_next<'a, M, T, const N: usize>(
    host: &mut SdpHost<'a, T>,
    events: &Channel<M, ChannelEvent, N>,
    requests: &Channel<M, DiscoverRequest<'a>, N>,
) where
    M: RawMutex,
    T: Transport,
{
    match select(events.receive(), requests.receive()).await {
        Either::First(event) => {
            defmt::debug!("[PROCESSOR] Channel event");
            host.handle_event(event);
        }
        Either::Second(request) => {
            defmt::debug!("[PROCESSOR] Discovery request for {}", request.peer);
            if let Err(e) = host.discover(request.peer, request.params) {
                defmt::warn!("[PROCESSOR] Discovery request rejected: {}", e);
            }
        }
    }
}

/// Process channel events and discovery requests forever
pub async fn run<'a, M, T, const N: usize>(
    host: &mut SdpHost<'a, T>,
    events: &Channel<M, ChannelEvent, N>,
    requests: &Channel<M, DiscoverRequest<'a>, N>,
) -> !
where
    M: RawMutex,
    T: Transport,
{
    loop {
        process_next(host, events, requests).await;
    }
}
