use crate::sdp::SdpError;

/// Bluetooth Device Address (`BD_ADDR`) identifying a remote SDP peer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, defmt::Format)]
pub struct BluetoothAddress(pub [u8; 6]);

impl BluetoothAddress {
    /// Create a new Bluetooth address from bytes
    #[must_use]
    pub const fn new(addr: [u8; 6]) -> Self {
        Self(addr)
    }

    /// Get the raw address bytes
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }
}

impl From<[u8; 6]> for BluetoothAddress {
    fn from(addr: [u8; 6]) -> Self {
        Self(addr)
    }
}

impl From<BluetoothAddress> for bt_hci::param::BdAddr {
    fn from(addr: BluetoothAddress) -> Self {
        bt_hci::param::BdAddr::new(addr.0)
    }
}

impl TryFrom<&[u8]> for BluetoothAddress {
    type Error = SdpError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let addr: [u8; 6] = bytes.try_into().map_err(|_| SdpError::InvalidParams)?;
        Ok(Self(addr))
    }
}

impl TryFrom<bt_hci::param::BdAddr> for BluetoothAddress {
    type Error = SdpError;

    fn try_from(bd_addr: bt_hci::param::BdAddr) -> Result<Self, Self::Error> {
        bd_addr.raw().try_into()
    }
}
