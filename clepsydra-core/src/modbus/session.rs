//! Per-connection Modbus session
//!
//! ```text
//! socket bytes ──► receive() ──► FrameAssembler
//!                                     │
//!                 poll() ◄────────────┘
//!                   │  decode PDU ─► handle_request ─► encode reply
//!                   ▼
//!               reply bytes ──► socket
//! ```
//!
//! Call [`Session::poll`] until it returns `Ok(None)` after each receive;
//! several requests may arrive in one read.

use embassy_sync::blocking_mutex::raw::RawMutex;

use clepsydra_protocol::{
    encode_reply, FrameAssembler, FrameError, PduError, Request, Response, MAX_PDU_SIZE,
};

use super::handler::{handle_request, TimeObserver};
use crate::registers::RegisterStore;

/// Session errors
///
/// None of them are fatal: the receive buffer has already been reset when
/// one is returned and the connection can keep going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionError {
    /// Overflow or illegal header; buffer resynced
    Frame(FrameError),
    /// PDU too short to decode; no reply, buffer resynced
    Malformed,
    /// Reply does not fit the output buffer
    ReplyTooLarge,
}

impl From<FrameError> for SessionError {
    fn from(e: FrameError) -> Self {
        SessionError::Frame(e)
    }
}

/// Reassembly state for one client connection
#[derive(Debug, Clone, Default)]
pub struct Session {
    assembler: FrameAssembler,
}

impl Session {
    /// Create a session with an empty receive buffer
    pub const fn new() -> Self {
        Self {
            assembler: FrameAssembler::new(),
        }
    }

    /// Forget any partial frame, e.g. when a new client connects
    pub fn reset(&mut self) {
        self.assembler.reset();
    }

    /// Bytes waiting for the rest of their frame
    pub fn buffered(&self) -> usize {
        self.assembler.len()
    }

    /// Append bytes read from the socket
    pub fn receive(&mut self, bytes: &[u8]) -> Result<(), SessionError> {
        self.assembler.push(bytes)?;
        Ok(())
    }

    /// Process the next complete request, if any
    ///
    /// On success with a frame, the encoded reply occupies `out[..len]` and
    /// `Ok(Some(len))` is returned. `Ok(None)` means more bytes are needed.
    pub fn poll<M, O>(
        &mut self,
        store: &RegisterStore<M>,
        observer: &mut O,
        out: &mut [u8],
    ) -> Result<Option<usize>, SessionError>
    where
        M: RawMutex,
        O: TimeObserver + ?Sized,
    {
        let Some(adu) = self.assembler.next_frame()? else {
            return Ok(None);
        };

        let response = match Request::decode(&adu.pdu) {
            Ok(request) => handle_request(store, observer, &request),
            Err(PduError::Illegal { function, code }) => Response::exception(function, code),
            Err(PduError::Malformed) | Err(PduError::BufferTooSmall) => {
                self.assembler.reset();
                return Err(SessionError::Malformed);
            }
        };

        let mut pdu = [0u8; MAX_PDU_SIZE];
        let pdu_len = response
            .encode(&mut pdu)
            .map_err(|_| SessionError::ReplyTooLarge)?;
        let len = encode_reply(&adu.header, &pdu[..pdu_len], out)
            .map_err(|_| SessionError::ReplyTooLarge)?;

        Ok(Some(len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::ClockTime;
    use crate::registers::REGISTER_COUNT;
    use clepsydra_protocol::{Response, HEADER_LEN, MAX_ADU_SIZE};
    use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
    use proptest::prelude::*;

    type Store = RegisterStore<CriticalSectionRawMutex>;

    /// Feed `input` in one go and collect every reply
    fn exchange(
        session: &mut Session,
        store: &Store,
        seen: &mut std::vec::Vec<ClockTime>,
        input: &[u8],
    ) -> std::vec::Vec<std::vec::Vec<u8>> {
        session.receive(input).unwrap();
        let mut replies = std::vec::Vec::new();
        let mut out = [0u8; MAX_ADU_SIZE];
        while let Some(len) = session
            .poll(store, &mut |t: ClockTime| seen.push(t), &mut out)
            .unwrap()
        {
            replies.push(out[..len].to_vec());
        }
        replies
    }

    fn frame(transaction: u16, pdu: &[u8]) -> std::vec::Vec<u8> {
        let mut bytes = transaction.to_be_bytes().to_vec();
        bytes.extend_from_slice(&[0x00, 0x00]);
        bytes.extend_from_slice(&((pdu.len() + 1) as u16).to_be_bytes());
        bytes.push(0x01);
        bytes.extend_from_slice(pdu);
        bytes
    }

    #[test]
    fn test_read_clock_registers() {
        let store = Store::new();
        store.write_block(0, &[5, 30]).unwrap();

        let mut session = Session::new();
        let mut seen = std::vec::Vec::new();
        let replies = exchange(
            &mut session,
            &store,
            &mut seen,
            &[0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x01, 0x03, 0x00, 0x00, 0x00, 0x02],
        );

        assert_eq!(
            replies,
            std::vec![std::vec![
                0x00, 0x01, 0x00, 0x00, 0x00, 0x07, 0x01, 0x03, 0x04, 0x00, 0x05, 0x00, 0x1E
            ]]
        );
    }

    #[test]
    fn test_write_time_reaches_observer() {
        let store = Store::new();
        store.consume_changed_time();

        let mut session = Session::new();
        let mut seen = std::vec::Vec::new();
        let request = frame(7, &[0x10, 0x00, 0x00, 0x00, 0x02, 0x04, 0x00, 0x0C, 0x00, 0x22]);
        let replies = exchange(&mut session, &store, &mut seen, &request);

        assert_eq!(replies, std::vec![frame(7, &[0x10, 0x00, 0x00, 0x00, 0x02])]);
        assert_eq!(seen, std::vec![ClockTime::new(12, 34)]);

        // Rewriting the same time produces a reply but no notification
        let replies = exchange(&mut session, &store, &mut seen, &request);
        assert_eq!(replies.len(), 1);
        assert_eq!(seen.len(), 1);

        let single = frame(8, &[0x06, 0x00, 0x01, 0x00, 0x23]);
        let replies = exchange(&mut session, &store, &mut seen, &single);
        assert_eq!(replies, std::vec![single.clone()]);
        assert_eq!(seen, std::vec![ClockTime::new(12, 34), ClockTime::new(12, 35)]);
    }

    #[test]
    fn test_exceptions() {
        let store = Store::new();
        let mut session = Session::new();
        let mut seen = std::vec::Vec::new();

        let cases: [(&[u8], &[u8]); 5] = [
            (&[0x2B, 0x0E, 0x01, 0x00], &[0xAB, 0x01]),
            (&[0x03, 0x00, 0x00, 0x00, 0x00], &[0x83, 0x03]),
            (&[0x03, 0x00, 0x1F, 0x00, 0x02], &[0x83, 0x02]),
            (&[0x06, 0x00, 0x20, 0x00, 0x01], &[0x86, 0x02]),
            (&[0x10, 0x00, 0x00, 0x00, 0x02, 0x03, 0x00, 0x01, 0x00], &[0x90, 0x03]),
        ];
        for (request, expected) in cases {
            let replies = exchange(&mut session, &store, &mut seen, &frame(1, request));
            assert_eq!(replies, std::vec![frame(1, expected)]);
        }
        assert!(seen.is_empty());
    }

    #[test]
    fn test_malformed_pdu_resyncs_without_reply() {
        let store = Store::new();
        let mut session = Session::new();

        let mut input = frame(1, &[0x03, 0x00]);
        input.extend_from_slice(&frame(2, &[0x03, 0x00, 0x00, 0x00, 0x01]));
        session.receive(&input).unwrap();

        let mut out = [0u8; MAX_ADU_SIZE];
        assert_eq!(
            session.poll(&store, &mut |_: ClockTime| {}, &mut out),
            Err(SessionError::Malformed)
        );
        assert_eq!(session.buffered(), 0);
        assert_eq!(session.poll(&store, &mut |_: ClockTime| {}, &mut out), Ok(None));
    }

    #[test]
    fn test_bad_header_resyncs() {
        let store = Store::new();
        let mut session = Session::new();
        session
            .receive(&[0x00, 0x01, 0x00, 0x05, 0x00, 0x06, 0x01, 0x03])
            .unwrap();

        let mut out = [0u8; MAX_ADU_SIZE];
        assert_eq!(
            session.poll(&store, &mut |_: ClockTime| {}, &mut out),
            Err(SessionError::Frame(FrameError::InvalidProtocolId))
        );
        assert_eq!(session.buffered(), 0);
    }

    #[test]
    fn test_pipelined_requests() {
        let store = Store::new();
        store.write(20, 99).unwrap();
        let mut session = Session::new();
        let mut seen = std::vec::Vec::new();

        let mut input = frame(1, &[0x06, 0x00, 0x15, 0x00, 0x07]);
        input.extend_from_slice(&frame(2, &[0x03, 0x00, 0x14, 0x00, 0x02]));
        let replies = exchange(&mut session, &store, &mut seen, &input);

        assert_eq!(replies.len(), 2);
        assert_eq!(replies[1], frame(2, &[0x03, 0x04, 0x00, 0x63, 0x00, 0x07]));
    }

    proptest! {
        #[test]
        fn split_write_updates_time_once(split in 0usize..=17, minutes in 0u16..1000, seconds in 0u16..60) {
            let store = Store::new();
            store.consume_changed_time();
            let mut pdu = std::vec![0x10, 0x00, 0x00, 0x00, 0x02, 0x04];
            pdu.extend_from_slice(&minutes.to_be_bytes());
            pdu.extend_from_slice(&seconds.to_be_bytes());
            let request = frame(3, &pdu);

            let mut session = Session::new();
            let mut seen = std::vec::Vec::new();
            let mut replies = exchange(&mut session, &store, &mut seen, &request[..split]);
            replies.extend(exchange(&mut session, &store, &mut seen, &request[split..]));

            prop_assert_eq!(replies.len(), 1);
            let expected = if (minutes, seconds) == (0, 0) {
                std::vec![]
            } else {
                std::vec![ClockTime::new(minutes, seconds)]
            };
            prop_assert_eq!(seen, expected);
        }

        #[test]
        fn read_reply_decodes_to_table_slice(
            table in proptest::array::uniform32(any::<u16>()),
            (address, quantity) in (0u16..REGISTER_COUNT as u16)
                .prop_flat_map(|a| (Just(a), 1u16..=(REGISTER_COUNT as u16 - a))),
        ) {
            let store = Store::new();
            store.write_block(0, &table).unwrap();

            let mut pdu = std::vec![0x03];
            pdu.extend_from_slice(&address.to_be_bytes());
            pdu.extend_from_slice(&quantity.to_be_bytes());

            let mut session = Session::new();
            let mut seen = std::vec::Vec::new();
            let replies = exchange(&mut session, &store, &mut seen, &frame(7, &pdu));
            prop_assert_eq!(replies.len(), 1);

            let reply = &replies[0];
            prop_assert_eq!(&reply[..2], &7u16.to_be_bytes()[..]);
            let start = address as usize;
            let end = start + quantity as usize;
            match Response::decode(&reply[HEADER_LEN..]).unwrap() {
                Response::ReadHoldingRegisters { values } => {
                    prop_assert_eq!(values.as_slice(), &table[start..end]);
                }
                other => prop_assert!(false, "unexpected reply {:?}", other),
            }
        }
    }
}
