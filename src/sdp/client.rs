//! SDP Client Implementation
//!
//! This module resolves UUIDs on remote devices with service search attribute
//! requests. Each remote device gets one [`ClientSession`] from a fixed pool.
//! The session owns the channel to the peer and a FIFO of borrowed
//! [`DiscoverParams`], and resolves them one at a time:
//!
//! 1. a request for the head UUID is sent (`RequestSent`)
//! 2. response fragments are appended to a reassembly buffer while the server
//!    keeps returning a continuation state (`Reassembling`)
//! 3. the collected attribute lists are split into records and handed to the
//!    caller's [`DiscoverHandler`], or the caller is told nothing matched
//! 4. the next queued UUID is started, or the channel is closed when the queue
//!    is empty
//!
//! Malformed responses are logged and dropped without touching session state.

use super::cstate::{ContinuationState, read_total};
use super::protocol::{
    ByteReader, SdpPduHeader, encode_service_search_attribute_request, read_sequence_length,
};
use super::{SdpError, SdpPduId, TransactionId, uuid::Uuid};
use crate::buffer::{BufferPool, RecordBuf};
use crate::constants::{
    MAX_CONNECTIONS, MAX_PDU_CSTATE_LEN, MAX_PENDING_DISCOVERIES, SDP_HEADER_SIZE, SDP_PSM,
};
use crate::pool::{PoolSlot, SlotId, SlotPool};
use crate::transport::{ChannelId, Transport};
use crate::{BluetoothAddress, SdpOptions};
use heapless::Deque;

/// What the session should do after a record has been delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum DiscoverFlow {
    /// Deliver the next record of the current UUID, if any
    Continue,
    /// Skip the remaining records of the current UUID
    Stop,
}

/// Outcome delivered to a [`DiscoverHandler`]
#[derive(Debug, Clone, Copy)]
pub struct DiscoverResult<'r> {
    /// UUID being resolved
    pub uuid: &'r Uuid,
    /// One record's attribute list, `None` when no record matched
    pub record: Option<&'r [u8]>,
    /// More records follow this one
    pub next_record_hint: bool,
}

/// Receiver of discovery results
pub trait DiscoverHandler {
    /// Called once per matching record, or once with no record when the UUID
    /// could not be resolved
    fn on_result(&self, peer: BluetoothAddress, result: &DiscoverResult<'_>) -> DiscoverFlow;
}

impl<F> DiscoverHandler for F
where
    F: Fn(BluetoothAddress, &DiscoverResult<'_>) -> DiscoverFlow,
{
    fn on_result(&self, peer: BluetoothAddress, result: &DiscoverResult<'_>) -> DiscoverFlow {
        self(peer, result)
    }
}

/// Caller-owned description of one UUID to resolve
///
/// The session only borrows it; it is dropped from the session queue once the
/// UUID is resolved or declared unresolved.
#[derive(Clone, Copy)]
pub struct DiscoverParams<'a> {
    /// UUID to search for
    pub uuid: Uuid,
    /// Receiver of the results
    pub handler: &'a dyn DiscoverHandler,
    /// Pool the reassembly buffer is taken from
    pub pool: &'a dyn BufferPool,
}

impl<'a> DiscoverParams<'a> {
    /// Create discovery parameters
    #[must_use]
    pub const fn new(uuid: Uuid, handler: &'a dyn DiscoverHandler, pool: &'a dyn BufferPool) -> Self {
        Self {
            uuid,
            handler,
            pool,
        }
    }
}

/// Channel lifecycle of a client session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, defmt::Format)]
pub enum LinkState {
    /// Channel requested, waiting for the transport to connect it
    #[default]
    Connecting,
    /// Channel open
    Connected,
    /// Channel close requested by the session
    Disconnecting,
}

/// Progress of the UUID currently being resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, defmt::Format)]
pub enum SearchState {
    /// No request in flight
    #[default]
    Idle,
    /// First request for the UUID sent
    RequestSent,
    /// Some fragments received, continuation pending
    Reassembling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UuidState {
    NotResolved,
    Resolved,
}

/// Per-peer client state
#[derive(Default)]
pub struct ClientSession<'a> {
    peer: Option<BluetoothAddress>,
    channel: Option<ChannelId>,
    link: LinkState,
    /// UUIDs waiting to be resolved, in request order
    reqs: Deque<&'a DiscoverParams<'a>, MAX_PENDING_DISCOVERIES>,
    /// UUID being resolved now
    param: Option<&'a DiscoverParams<'a>>,
    tid: TransactionId,
    cstate: ContinuationState,
    rec_buf: Option<RecordBuf<'a>>,
    search: SearchState,
}

impl PoolSlot for ClientSession<'_> {
    fn is_free(&self) -> bool {
        self.peer.is_none()
    }
}

/// Attribute lists and continuation state of one response PDU
struct Fragment<'p> {
    attributes: &'p [u8],
    cstate: &'p [u8],
}

impl<'p> Fragment<'p> {
    fn parse(params: &'p [u8]) -> Result<Self, SdpError> {
        let mut reader = ByteReader::new(params);

        let frame_len = reader.be16().ok_or(SdpError::InvalidAttributeLength)?;
        if frame_len < 2 {
            return Err(SdpError::InvalidAttributeLength);
        }

        let attributes = reader
            .take(usize::from(frame_len))
            .ok_or(SdpError::BufferTooSmall)?;

        let cstate_len = reader.u8().ok_or(SdpError::BufferTooSmall)?;
        if usize::from(cstate_len) > MAX_PDU_CSTATE_LEN {
            return Err(SdpError::ContinuationTooLong);
        }

        if usize::from(frame_len) + usize::from(cstate_len) > params.len() {
            return Err(SdpError::BufferTooSmall);
        }

        let cstate = reader
            .take(usize::from(cstate_len))
            .ok_or(SdpError::BufferTooSmall)?;

        Ok(Self { attributes, cstate })
    }
}

impl<'a> ClientSession<'a> {
    /// Remote device of the session
    #[must_use]
    pub const fn peer(&self) -> Option<BluetoothAddress> {
        self.peer
    }

    /// Channel to the remote SDP server
    #[must_use]
    pub const fn channel(&self) -> Option<ChannelId> {
        self.channel
    }

    /// Channel lifecycle state
    #[must_use]
    pub const fn link(&self) -> LinkState {
        self.link
    }

    /// Progress of the current UUID
    #[must_use]
    pub const fn search(&self) -> SearchState {
        self.search
    }

    /// Transaction ID of the last request sent
    #[must_use]
    pub const fn transaction_id(&self) -> TransactionId {
        self.tid
    }

    /// Cached continuation state
    #[must_use]
    pub const fn continuation(&self) -> &ContinuationState {
        &self.cstate
    }

    /// Number of UUIDs queued, the one in flight included
    #[must_use]
    pub fn pending(&self) -> usize {
        self.reqs.len()
    }

    /// Check if `params` is the UUID in flight
    #[must_use]
    pub fn is_resolving(&self, params: &DiscoverParams<'_>) -> bool {
        self.param
            .is_some_and(|param| core::ptr::addr_eq(param, params))
    }

    fn select_param(&self) -> Option<&'a DiscoverParams<'a>> {
        self.param.or_else(|| self.reqs.front().copied())
    }

    /// Send a search for the active UUID, moving past UUIDs that cannot be
    /// searched. Without any queued UUID this does nothing.
    fn start_search<T: Transport>(&mut self, transport: &mut T, max_attribute_bytes: u16) {
        let mut abandoned = false;

        while let Some(param) = self.select_param() {
            match self.send_search(transport, param, max_attribute_bytes) {
                Ok(()) => return,
                Err(e) => {
                    defmt::warn!("[SDP CLIENT] Cannot search UUID {}: {}", param.uuid, e);
                    self.param = Some(param);
                    self.notify(UuidState::NotResolved);
                    self.finish_current();
                    abandoned = true;
                }
            }
        }

        if abandoned {
            self.close(transport);
        } else {
            defmt::debug!("[SDP CLIENT] No UUIDs to be resolved on remote");
        }
    }

    fn send_search<T: Transport>(
        &mut self,
        transport: &mut T,
        param: &'a DiscoverParams<'a>,
        max_attribute_bytes: u16,
    ) -> Result<(), SdpError> {
        let channel = self.channel.ok_or(SdpError::ResourceExhausted)?;

        if self.rec_buf.is_none() {
            self.rec_buf = Some(param.pool.acquire().ok_or(SdpError::ResourceExhausted)?);
        }

        let tid = self.tid.wrapping_add(1);
        let pdu = encode_service_search_attribute_request(
            tid,
            &param.uuid,
            max_attribute_bytes,
            &self.cstate,
        )?;

        transport
            .send(channel, pdu.as_slice())
            .map_err(|_| SdpError::ResourceExhausted)?;

        defmt::debug!("[SDP CLIENT] Search for UUID {} sent, tid {}", param.uuid, tid);

        self.param = Some(param);
        self.tid = tid;
        self.search = if self.cstate.is_empty() {
            SearchState::RequestSent
        } else {
            SearchState::Reassembling
        };
        Ok(())
    }

    fn receive<T: Transport>(&mut self, transport: &mut T, data: &[u8], max_attribute_bytes: u16) {
        let Ok(header) = SdpPduHeader::decode(data) else {
            defmt::warn!("[SDP CLIENT] Too small SDP PDU");
            return;
        };

        let params = &data[SDP_HEADER_SIZE..];

        defmt::debug!(
            "[SDP CLIENT] SDP PDU tid {} len {}",
            header.transaction_id,
            header.parameter_length
        );

        if usize::from(header.parameter_length) != params.len() {
            defmt::warn!(
                "[SDP CLIENT] SDP PDU length mismatch ({} != {})",
                params.len(),
                header.parameter_length
            );
            return;
        }

        if header.transaction_id != self.tid {
            defmt::warn!("[SDP CLIENT] Mismatch transaction ID value in SDP PDU");
            return;
        }

        if self.param.is_none() {
            defmt::warn!("[SDP CLIENT] No request in flight");
            return;
        }

        match header.pdu_id() {
            Some(SdpPduId::ErrorResponse) => {
                defmt::info!("[SDP CLIENT] Error SDP PDU response");
                self.notify(UuidState::NotResolved);
                self.iterate(transport, max_attribute_bytes);
            }
            Some(SdpPduId::ServiceSearchAttributeResponse) => {
                self.search_attribute_response(transport, params, max_attribute_bytes);
            }
            _ => {
                defmt::debug!("[SDP CLIENT] PDU 0x{:02x} response not handled", header.opcode);
            }
        }
    }

    fn search_attribute_response<T: Transport>(
        &mut self,
        transport: &mut T,
        params: &[u8],
        max_attribute_bytes: u16,
    ) {
        let fragment = match Fragment::parse(params) {
            Ok(fragment) => fragment,
            Err(e) => {
                defmt::warn!("[SDP CLIENT] Invalid response frame: {}", e);
                return;
            }
        };

        // A bare empty attribute list as the only fragment: nothing matched
        if fragment.attributes.len() == 2 && fragment.cstate.is_empty() && self.cstate.is_empty() {
            defmt::debug!("[SDP CLIENT] No record found for UUID");
            self.notify(UuidState::NotResolved);
            self.iterate(transport, max_attribute_bytes);
            return;
        }

        let mut attributes = ByteReader::new(fragment.attributes);
        let total = read_total(&self.cstate, &mut attributes);
        let body = attributes.rest();

        let copied = self.rec_buf.as_mut().is_some_and(|rec_buf| {
            usize::from(total) <= rec_buf.tailroom() && rec_buf.append(body)
        });
        if !copied {
            defmt::warn!("[SDP CLIENT] Not enough room for getting records data");
            self.iterate(transport, max_attribute_bytes);
            return;
        }

        if !fragment.cstate.is_empty() {
            match ContinuationState::from_bytes(fragment.cstate) {
                Ok(cstate) => self.cstate = cstate,
                Err(e) => {
                    defmt::warn!("[SDP CLIENT] Invalid continuation state: {}", e);
                    return;
                }
            }
            self.search = SearchState::Reassembling;
            self.start_search(transport, max_attribute_bytes);
            return;
        }

        defmt::debug!("[SDP CLIENT] UUID resolved");
        self.notify(UuidState::Resolved);
        self.iterate(transport, max_attribute_bytes);
    }

    /// Hand the outcome of the current UUID to its handler
    fn notify(&mut self, state: UuidState) {
        let (Some(param), Some(peer)) = (self.param, self.peer) else {
            return;
        };

        let has_records = self.rec_buf.as_ref().is_some_and(|buf| !buf.is_empty());
        if state == UuidState::NotResolved || !has_records {
            if state == UuidState::Resolved {
                defmt::debug!("[SDP CLIENT] Resolved with no records");
            }
            param.handler.on_result(
                peer,
                &DiscoverResult {
                    uuid: &param.uuid,
                    record: None,
                    next_record_hint: false,
                },
            );
            return;
        }

        let Some(rec_buf) = self.rec_buf.as_mut() else {
            return;
        };

        while !rec_buf.is_empty() {
            let mut reader = ByteReader::new(rec_buf.data());
            let rec_len = match read_sequence_length(&mut reader) {
                Ok(len) => usize::from(len),
                Err(e) => {
                    defmt::warn!("[SDP CLIENT] Cannot split records: {}", e);
                    break;
                }
            };
            let header_len = reader.position();
            let rec_len = rec_len.min(reader.remaining());
            let next_record_hint = reader.remaining() > rec_len;

            defmt::debug!("[SDP CLIENT] Record len {}", rec_len);

            let flow = param.handler.on_result(
                peer,
                &DiscoverResult {
                    uuid: &param.uuid,
                    record: Some(&rec_buf.data()[header_len..header_len + rec_len]),
                    next_record_hint,
                },
            );

            rec_buf.pull(header_len + rec_len);
            if flow == DiscoverFlow::Stop {
                break;
            }
        }
    }

    /// Drop the current UUID and reset per-UUID state
    fn finish_current(&mut self) {
        if let Some(param) = self.param.take() {
            if self
                .reqs
                .front()
                .is_some_and(|head| core::ptr::eq(*head, param))
            {
                self.reqs.pop_front();
            }
        }

        self.cstate.clear();
        self.search = SearchState::Idle;
        if let Some(rec_buf) = self.rec_buf.as_mut() {
            rec_buf.clear();
        }
    }

    /// Move on to the next queued UUID, or close the channel when none is left
    fn iterate<T: Transport>(&mut self, transport: &mut T, max_attribute_bytes: u16) {
        self.finish_current();

        if self.reqs.is_empty() {
            self.close(transport);
        } else {
            self.start_search(transport, max_attribute_bytes);
        }
    }

    fn close<T: Transport>(&mut self, transport: &mut T) {
        if let Some(channel) = self.channel {
            defmt::debug!("[SDP CLIENT] Disconnecting channel 0x{:04x}", channel);
            self.link = LinkState::Disconnecting;
            transport.disconnect(channel);
        }
    }
}

/// SDP Client
///
/// Manages one discovery session per remote device.
pub struct SdpClient<'a> {
    sessions: SlotPool<ClientSession<'a>, MAX_CONNECTIONS>,
    max_attribute_byte_count: u16,
    mtu: u16,
}

impl<'a> SdpClient<'a> {
    /// Create a client with every session free
    #[must_use]
    pub fn new(options: &SdpOptions) -> Self {
        Self {
            sessions: SlotPool::new(),
            max_attribute_byte_count: options.max_attribute_byte_count,
            mtu: options.client_mtu,
        }
    }

    /// Queue a UUID to be resolved on `peer`.
    ///
    /// A session and channel are set up on the first request for a peer. The
    /// search starts once the channel is connected; while another UUID is in
    /// flight the request waits in the queue.
    ///
    /// # Errors
    /// Returns `SdpError::InvalidParams` if `params` is already queued for the
    /// peer, or `SdpError::ResourceExhausted` if no session or queue slot is free
    /// or the channel cannot be opened
    pub fn discover<T: Transport>(
        &mut self,
        transport: &mut T,
        peer: BluetoothAddress,
        params: &'a DiscoverParams<'a>,
    ) -> Result<(), SdpError> {
        let id = match self.find_peer(peer) {
            Some(id) => id,
            None => self.new_session(transport, peer)?,
        };
        let max_attribute_bytes = self.max_attribute_byte_count;
        let session = self
            .sessions
            .get_mut(id)
            .ok_or(SdpError::ResourceExhausted)?;

        if session
            .reqs
            .iter()
            .any(|queued| core::ptr::eq(*queued, params))
        {
            defmt::warn!("[SDP CLIENT] Invalid user params");
            return Err(SdpError::InvalidParams);
        }

        session
            .reqs
            .push_back(params)
            .map_err(|_| SdpError::ResourceExhausted)?;

        if session.link == LinkState::Connected && session.param.is_none() {
            session.start_search(transport, max_attribute_bytes);
        }
        Ok(())
    }

    /// Check if `channel` belongs to a client session
    #[must_use]
    pub fn owns(&self, channel: ChannelId) -> bool {
        self.find_channel(channel).is_some()
    }

    /// Session for `peer`
    #[must_use]
    pub fn session(&self, peer: BluetoothAddress) -> Option<&ClientSession<'a>> {
        self.find_peer(peer).and_then(|id| self.sessions.get(id))
    }

    /// Channel to the remote server is open; start resolving
    pub fn on_connected<T: Transport>(&mut self, transport: &mut T, channel: ChannelId) {
        let max_attribute_bytes = self.max_attribute_byte_count;
        let Some(session) = self.session_mut(channel) else {
            return;
        };

        defmt::debug!("[SDP CLIENT] Channel 0x{:04x} connected", channel);
        session.link = LinkState::Connected;
        session.start_search(transport, max_attribute_bytes);
    }

    /// Channel closed.
    ///
    /// The session is released together with its reassembly buffer. When the
    /// session closed the channel itself and UUIDs were queued meanwhile, a new
    /// channel is opened for them instead.
    pub fn on_disconnected<T: Transport>(&mut self, transport: &mut T, channel: ChannelId) {
        let Some(id) = self.find_channel(channel) else {
            return;
        };
        let Some(session) = self.sessions.get_mut(id) else {
            return;
        };

        defmt::debug!("[SDP CLIENT] Channel 0x{:04x} disconnected", channel);

        let Some(peer) = session.peer else {
            self.sessions.release(id);
            return;
        };

        if session.link != LinkState::Disconnecting || session.reqs.is_empty() {
            self.sessions.release(id);
            return;
        }

        let reqs = core::mem::take(&mut session.reqs);
        *session = ClientSession {
            peer: Some(peer),
            reqs,
            ..ClientSession::default()
        };

        match transport.connect(peer, SDP_PSM, self.mtu) {
            Ok(channel) => session.channel = Some(channel),
            Err(e) => {
                defmt::warn!("[SDP CLIENT] Cannot reconnect to {}: {}", peer, e);
                self.sessions.release(id);
            }
        }
    }

    /// Process a response PDU from the remote server
    pub fn on_receive<T: Transport>(&mut self, transport: &mut T, channel: ChannelId, data: &[u8]) {
        let max_attribute_bytes = self.max_attribute_byte_count;
        let Some(session) = self.session_mut(channel) else {
            defmt::warn!("[SDP CLIENT] PDU on unknown channel 0x{:04x}", channel);
            return;
        };
        session.receive(transport, data, max_attribute_bytes);
    }

    fn new_session<T: Transport>(
        &mut self,
        transport: &mut T,
        peer: BluetoothAddress,
    ) -> Result<SlotId, SdpError> {
        let id = self
            .sessions
            .acquire(|session| session.peer = Some(peer))
            .inspect_err(|_| defmt::warn!("[SDP CLIENT] No available SDP client context"))?;

        match transport.connect(peer, SDP_PSM, self.mtu) {
            Ok(channel) => {
                if let Some(session) = self.sessions.get_mut(id) {
                    session.channel = Some(channel);
                }
                Ok(id)
            }
            Err(e) => {
                defmt::warn!("[SDP CLIENT] Cannot connect {}", e);
                self.sessions.release(id);
                Err(SdpError::ResourceExhausted)
            }
        }
    }

    fn find_peer(&self, peer: BluetoothAddress) -> Option<SlotId> {
        self.sessions.find(|session| session.peer == Some(peer))
    }

    fn find_channel(&self, channel: ChannelId) -> Option<SlotId> {
        self.sessions
            .find(|session| session.channel == Some(channel))
    }

    fn session_mut(&mut self, channel: ChannelId) -> Option<&mut ClientSession<'a>> {
        let id = self.find_channel(channel)?;
        self.sessions.get_mut(id)
    }
}
