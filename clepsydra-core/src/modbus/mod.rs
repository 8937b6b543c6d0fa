//! Modbus/TCP register server logic
//!
//! Transport-independent: the firmware task feeds socket bytes into a
//! [`Session`] and writes back whatever replies it produces; host tests do
//! the same with byte slices.

pub mod handler;
pub mod session;

pub use handler::{handle_request, TimeObserver};
pub use session::{Session, SessionError};
