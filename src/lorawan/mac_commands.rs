//! LoRaWAN MAC command encoding and decoding.
//!
//! Commands are dispatched on their leading CID byte with explicit length
//! checks. The decoder is total: anything that does not match a known layout
//! comes back as [`MacCommand::Unknown`] instead of an error.

/// CID shared by LinkCheckReq and LinkCheckAns.
pub const CID_LINK_CHECK: u8 = 0x02;
/// CID shared by LinkADRReq and LinkADRAns.
pub const CID_LINK_ADR: u8 = 0x03;
/// CID shared by DeviceTimeReq and DeviceTimeAns.
pub const CID_DEVICE_TIME: u8 = 0x0D;

/// LinkADRAns status with channel mask, data rate and power all accepted.
pub const LINK_ADR_ANS_OK: u8 = 0x07;

/// A decoded LoRaWAN MAC command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacCommand {
    /// Server request to change data rate, TX power, channel mask and
    /// redundancy: `0x03 | (DR<<4 | TXPower) | ChMask LE16 | Redundancy`.
    LinkAdrReq {
        data_rate: u8,
        tx_power: u8,
        ch_mask: u16,
        redundancy: u8,
    },
    /// Device answer to LinkADRReq: `0x03 | Status`.
    LinkAdrAns { status: u8 },
    /// Link margin probe: `0x02`.
    LinkCheckReq,
    /// Answer carrying demodulation margin and gateway count:
    /// `0x02 | Margin | GwCnt`.
    LinkCheckAns { margin: u8, gw_cnt: u8 },
    /// Network time probe: `0x0D`.
    DeviceTimeReq,
    /// Answer carrying seconds since epoch and fractional part:
    /// `0x0D | Seconds LE32 | Fractional`.
    DeviceTimeAns { seconds: u32, fractional: u8 },
    /// Any CID or layout this decoder does not understand.
    Unknown { cid: u8 },
}

impl MacCommand {
    /// Encode the command to its wire bytes.
    pub fn encode(&self) -> Vec<u8> {
        match *self {
            MacCommand::LinkAdrReq {
                data_rate,
                tx_power,
                ch_mask,
                redundancy,
            } => {
                let mut bytes = vec![CID_LINK_ADR, (data_rate << 4) | (tx_power & 0x0F)];
                bytes.extend_from_slice(&ch_mask.to_le_bytes());
                bytes.push(redundancy);
                bytes
            }
            MacCommand::LinkAdrAns { status } => vec![CID_LINK_ADR, status],
            MacCommand::LinkCheckReq => vec![CID_LINK_CHECK],
            MacCommand::LinkCheckAns { margin, gw_cnt } => {
                vec![CID_LINK_CHECK, margin, gw_cnt]
            }
            MacCommand::DeviceTimeReq => vec![CID_DEVICE_TIME],
            MacCommand::DeviceTimeAns {
                seconds,
                fractional,
            } => {
                let mut bytes = vec![CID_DEVICE_TIME];
                bytes.extend_from_slice(&seconds.to_le_bytes());
                bytes.push(fractional);
                bytes
            }
            MacCommand::Unknown { cid } => vec![cid],
        }
    }

    /// Decode the command at the head of `bytes`.
    ///
    /// Returns `None` only for empty input. Request and answer forms that
    /// share a CID are told apart by length.
    pub fn decode(bytes: &[u8]) -> Option<MacCommand> {
        let cid = *bytes.first()?;
        let command = match cid {
            CID_LINK_ADR if bytes.len() >= 5 => MacCommand::LinkAdrReq {
                data_rate: bytes[1] >> 4,
                tx_power: bytes[1] & 0x0F,
                ch_mask: u16::from_le_bytes([bytes[2], bytes[3]]),
                redundancy: bytes[4],
            },
            CID_LINK_ADR if bytes.len() == 2 => MacCommand::LinkAdrAns { status: bytes[1] },
            CID_LINK_CHECK if bytes.len() >= 3 => MacCommand::LinkCheckAns {
                margin: bytes[1],
                gw_cnt: bytes[2],
            },
            CID_LINK_CHECK if bytes.len() == 1 => MacCommand::LinkCheckReq,
            CID_DEVICE_TIME if bytes.len() >= 6 => MacCommand::DeviceTimeAns {
                seconds: u32::from_le_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]),
                fractional: bytes[5],
            },
            CID_DEVICE_TIME if bytes.len() == 1 => MacCommand::DeviceTimeReq,
            other => MacCommand::Unknown { cid: other },
        };
        Some(command)
    }
}
