//! Frame reassembly for Modbus/TCP.
//!
//! TCP delivers a byte stream, so a request may arrive split over several
//! reads or several requests may arrive in one read. [`FrameAssembler`]
//! accumulates bytes in a bounded buffer and hands out complete frames.
//!
//! Resync policy: any header that cannot belong to a legal frame clears the
//! whole buffer, and so does an append that would overflow it.

use heapless::Vec;

use crate::mbap::{MbapHeader, HEADER_LEN, MAX_ADU_SIZE, MAX_PDU_SIZE};

/// Receive buffer size per connection
pub const RX_BUFFER_SIZE: usize = 512;

/// Largest read that can be appended without overflowing a buffer that
/// still holds an incomplete frame
pub const MAX_READ_CHUNK: usize = RX_BUFFER_SIZE - MAX_ADU_SIZE;

/// Errors that can occur during frame reassembly or encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Frame is incomplete (need more bytes)
    Incomplete,
    /// Protocol identifier is not Modbus
    InvalidProtocolId,
    /// LENGTH field outside the legal range
    InvalidLength,
    /// Appending would overflow the receive buffer
    Overflow,
    /// Buffer too small for encoding
    BufferTooSmall,
}

/// A complete application data unit: header plus PDU
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Adu {
    /// MBAP header
    pub header: MbapHeader,
    /// Protocol data unit (function code + data)
    pub pdu: Vec<u8, MAX_PDU_SIZE>,
}

// Client-side encoding, used to build request frames in tests
#[cfg(test)]
impl Adu {
    /// Create a frame, computing the LENGTH field from the PDU
    pub fn new(transaction_id: u16, unit_id: u8, pdu: &[u8]) -> Result<Self, FrameError> {
        if pdu.is_empty() {
            return Err(FrameError::InvalidLength);
        }
        let pdu = Vec::from_slice(pdu).map_err(|_| FrameError::InvalidLength)?;
        let header = MbapHeader {
            transaction_id,
            protocol_id: 0,
            length: (pdu.len() + 1) as u16,
            unit_id,
        };
        Ok(Self { header, pdu })
    }

    /// Encode this frame into a byte buffer
    ///
    /// Returns the number of bytes written
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, FrameError> {
        let frame_len = HEADER_LEN + self.pdu.len();
        if buffer.len() < frame_len {
            return Err(FrameError::BufferTooSmall);
        }

        self.header.encode(buffer)?;
        buffer[HEADER_LEN..frame_len].copy_from_slice(&self.pdu);

        Ok(frame_len)
    }

    /// Encode this frame into a heapless Vec
    pub fn encode_to_vec(&self) -> Result<Vec<u8, MAX_ADU_SIZE>, FrameError> {
        let mut buffer = [0u8; MAX_ADU_SIZE];
        let len = self.encode(&mut buffer)?;
        Vec::from_slice(&buffer[..len]).map_err(|_| FrameError::BufferTooSmall)
    }
}

/// Encode a reply frame for `request` carrying `pdu` into `buffer`
///
/// The reply mirrors the request's transaction and unit ids.
pub fn encode_reply(request: &MbapHeader, pdu: &[u8], buffer: &mut [u8]) -> Result<usize, FrameError> {
    let frame_len = HEADER_LEN + pdu.len();
    if buffer.len() < frame_len {
        return Err(FrameError::BufferTooSmall);
    }

    request.reply(pdu.len()).encode(buffer)?;
    buffer[HEADER_LEN..frame_len].copy_from_slice(pdu);

    Ok(frame_len)
}

/// Byte-stream reassembler for incoming frames
#[derive(Debug, Clone, Default)]
pub struct FrameAssembler {
    buffer: Vec<u8, RX_BUFFER_SIZE>,
}

impl FrameAssembler {
    /// Create an empty assembler
    pub const fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Drop everything buffered
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Number of buffered bytes
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check whether nothing is buffered
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Append received bytes
    ///
    /// If the bytes do not fit, both the buffer and `bytes` are discarded and
    /// `FrameError::Overflow` is returned.
    pub fn push(&mut self, bytes: &[u8]) -> Result<(), FrameError> {
        if self.buffer.len() + bytes.len() > RX_BUFFER_SIZE {
            self.reset();
            return Err(FrameError::Overflow);
        }

        self.buffer
            .extend_from_slice(bytes)
            .map_err(|_| FrameError::Overflow)
    }

    /// Take the next complete frame out of the buffer
    ///
    /// Returns `Ok(Some(frame))` when a frame was consumed, `Ok(None)` when
    /// more bytes are needed, or `Err` after a resync caused by an illegal
    /// header.
    pub fn next_frame(&mut self) -> Result<Option<Adu>, FrameError> {
        let header = match MbapHeader::parse(&self.buffer) {
            Ok(header) => header,
            Err(FrameError::Incomplete) => return Ok(None),
            Err(e) => {
                self.reset();
                return Err(e);
            }
        };

        if let Err(e) = header.validate() {
            self.reset();
            return Err(e);
        }

        let adu_len = header.adu_len();
        if self.buffer.len() < adu_len {
            return Ok(None);
        }

        // LENGTH <= 253 was validated, so the PDU always fits
        let pdu = Vec::from_slice(&self.buffer[HEADER_LEN..adu_len])
            .map_err(|_| FrameError::InvalidLength)?;

        self.consume(adu_len);

        Ok(Some(Adu { header, pdu }))
    }

    /// Remove `count` bytes from the front, shifting the remainder down
    fn consume(&mut self, count: usize) {
        let remaining = self.buffer.len() - count;
        self.buffer.copy_within(count.., 0);
        self.buffer.truncate(remaining);
    }
}
