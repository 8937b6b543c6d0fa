//! MBAP header (Modbus Application Protocol header) for Modbus/TCP
//!
//! Header format:
//! - TRANSACTION ID (2 bytes): echoed back in the reply
//! - PROTOCOL ID (2 bytes): always 0 for Modbus
//! - LENGTH (2 bytes): number of following bytes (unit id + PDU)
//! - UNIT ID (1 byte): echoed back in the reply

use crate::frame::FrameError;

/// Size of the MBAP header including the unit id
pub const HEADER_LEN: usize = 7;

/// Protocol identifier for Modbus
pub const PROTOCOL_ID: u16 = 0;

/// Smallest legal LENGTH field (unit id + function code)
pub const MIN_LENGTH: u16 = 2;

/// Largest legal LENGTH field
pub const MAX_LENGTH: u16 = 253;

/// Maximum PDU size (LENGTH minus the unit id)
pub const MAX_PDU_SIZE: usize = MAX_LENGTH as usize - 1;

/// Maximum complete frame size (6 header bytes counted outside LENGTH + LENGTH)
pub const MAX_ADU_SIZE: usize = 6 + MAX_LENGTH as usize;

/// A decoded MBAP header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MbapHeader {
    /// Transaction identifier chosen by the client
    pub transaction_id: u16,
    /// Protocol identifier (0 for Modbus)
    pub protocol_id: u16,
    /// Byte count of unit id + PDU
    pub length: u16,
    /// Unit (slave) identifier
    pub unit_id: u8,
}

impl MbapHeader {
    /// Read a header from the start of `bytes`
    ///
    /// Returns `FrameError::Incomplete` when fewer than [`HEADER_LEN`] bytes
    /// are available. Field values are not validated here.
    pub fn parse(bytes: &[u8]) -> Result<Self, FrameError> {
        if bytes.len() < HEADER_LEN {
            return Err(FrameError::Incomplete);
        }

        Ok(Self {
            transaction_id: u16::from_be_bytes([bytes[0], bytes[1]]),
            protocol_id: u16::from_be_bytes([bytes[2], bytes[3]]),
            length: u16::from_be_bytes([bytes[4], bytes[5]]),
            unit_id: bytes[6],
        })
    }

    /// Check the protocol id and length fields
    pub fn validate(&self) -> Result<(), FrameError> {
        if self.protocol_id != PROTOCOL_ID {
            return Err(FrameError::InvalidProtocolId);
        }
        if !(MIN_LENGTH..=MAX_LENGTH).contains(&self.length) {
            return Err(FrameError::InvalidLength);
        }
        Ok(())
    }

    /// Total frame size announced by this header
    pub fn adu_len(&self) -> usize {
        6 + self.length as usize
    }

    /// PDU size announced by this header
    pub fn pdu_len(&self) -> usize {
        (self.length as usize).saturating_sub(1)
    }

    /// Header for a reply carrying a PDU of `pdu_len` bytes
    ///
    /// Transaction id and unit id are mirrored, the protocol id is forced
    /// to zero and the length is recomputed.
    pub fn reply(&self, pdu_len: usize) -> Self {
        Self {
            transaction_id: self.transaction_id,
            protocol_id: PROTOCOL_ID,
            length: (pdu_len + 1) as u16,
            unit_id: self.unit_id,
        }
    }

    /// Encode this header into the first [`HEADER_LEN`] bytes of `buffer`
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, FrameError> {
        if buffer.len() < HEADER_LEN {
            return Err(FrameError::BufferTooSmall);
        }

        buffer[0..2].copy_from_slice(&self.transaction_id.to_be_bytes());
        buffer[2..4].copy_from_slice(&self.protocol_id.to_be_bytes());
        buffer[4..6].copy_from_slice(&self.length.to_be_bytes());
        buffer[6] = self.unit_id;

        Ok(HEADER_LEN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_header() {
        let bytes = [0x12, 0x34, 0x00, 0x00, 0x00, 0x06, 0x01, 0x03];
        let header = MbapHeader::parse(&bytes).unwrap();

        assert_eq!(header.transaction_id, 0x1234);
        assert_eq!(header.protocol_id, 0);
        assert_eq!(header.length, 6);
        assert_eq!(header.unit_id, 1);
        assert_eq!(header.adu_len(), 12);
        assert_eq!(header.pdu_len(), 5);
        assert!(header.validate().is_ok());
    }

    #[test]
    fn test_parse_short_is_incomplete() {
        assert_eq!(
            MbapHeader::parse(&[0x00, 0x01, 0x00, 0x00, 0x00, 0x06]),
            Err(FrameError::Incomplete)
        );
    }

    #[test]
    fn test_validate_rejects_bad_fields() {
        let mut header = MbapHeader {
            transaction_id: 1,
            protocol_id: 1,
            length: 6,
            unit_id: 1,
        };
        assert_eq!(header.validate(), Err(FrameError::InvalidProtocolId));

        header.protocol_id = 0;
        header.length = 1;
        assert_eq!(header.validate(), Err(FrameError::InvalidLength));

        header.length = 254;
        assert_eq!(header.validate(), Err(FrameError::InvalidLength));

        header.length = MAX_LENGTH;
        assert!(header.validate().is_ok());
    }

    #[test]
    fn test_reply_header() {
        let request = MbapHeader {
            transaction_id: 0xBEEF,
            protocol_id: 0,
            length: 6,
            unit_id: 7,
        };
        let reply = request.reply(6);

        let mut buffer = [0u8; HEADER_LEN];
        assert_eq!(reply.encode(&mut buffer), Ok(HEADER_LEN));
        assert_eq!(buffer, [0xBE, 0xEF, 0x00, 0x00, 0x00, 0x07, 0x07]);
    }
}
