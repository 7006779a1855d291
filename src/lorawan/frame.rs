//! Minimal in-memory representation of a LoRaWAN MAC frame.

use bitflags::bitflags;

/// MHDR value for an unconfirmed data uplink.
pub const MHDR_UNCONFIRMED_UP: u8 = 0x40;
/// MHDR value for a confirmed data uplink.
pub const MHDR_CONFIRMED_UP: u8 = 0x80;
/// MHDR value for an unconfirmed data downlink.
pub const MHDR_UNCONFIRMED_DOWN: u8 = 0x60;

bitflags! {
    /// FCtrl bits carried by both uplink and downlink frames.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FCtrl: u8 {
        /// Device has ADR enabled (uplink) / server may adjust rate.
        const ADR = 0x80;
        /// Device requests an ADR acknowledgement.
        const ADR_ACK_REQ = 0x40;
        /// Acknowledges the last confirmed frame.
        const ACK = 0x20;
    }
}

/// One LoRaWAN MAC frame as exchanged inside the simulation.
///
/// Kept in memory only; the payload bytes carry either application data or
/// an encoded MAC command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoRaWanFrame {
    pub mhdr: u8,
    pub fctrl: FCtrl,
    pub fcnt: u16,
    pub payload: Vec<u8>,
    pub confirmed: bool,
}

impl LoRaWanFrame {
    pub fn is_uplink(&self) -> bool {
        self.mhdr == MHDR_UNCONFIRMED_UP || self.mhdr == MHDR_CONFIRMED_UP
    }
}
