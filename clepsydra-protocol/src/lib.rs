//! Modbus/TCP register protocol
//!
//! This crate implements the wire side of the register server: the MBAP
//! header, reassembly of frames from a TCP byte stream, and the PDU codec
//! for the three supported function codes. It knows nothing about the
//! register table itself.
//!
//! # Frame Overview
//!
//! ```text
//! ┌────────────────┬─────────────┬────────┬─────────┬───────────────┐
//! │ TRANSACTION ID │ PROTOCOL ID │ LENGTH │ UNIT ID │ PDU           │
//! │ 2B             │ 2B (= 0)    │ 2B     │ 1B      │ LENGTH-1 B    │
//! └────────────────┴─────────────┴────────┴─────────┴───────────────┘
//! ```
//!
//! All 16-bit fields are big-endian. LENGTH counts the unit id plus the PDU
//! and must lie in `2..=253`.
//!
//! # Supported Functions
//!
//! | Code | Operation                  |
//! |------|----------------------------|
//! | 0x03 | Read holding registers     |
//! | 0x06 | Write single register      |
//! | 0x10 | Write multiple registers   |
//!
//! Any other code is answered with an `IllegalFunction` exception.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod frame;
pub mod mbap;
pub mod pdu;

pub use frame::{encode_reply, Adu, FrameAssembler, FrameError, MAX_READ_CHUNK, RX_BUFFER_SIZE};
pub use mbap::{MbapHeader, HEADER_LEN, MAX_ADU_SIZE, MAX_PDU_SIZE};
pub use pdu::{
    ExceptionCode, FunctionCode, PduError, Request, Response, MAX_READ_QUANTITY, MAX_WRITE_QUANTITY,
};
