//! Request execution against the register store

use embassy_sync::blocking_mutex::raw::RawMutex;
use heapless::Vec;

use clepsydra_protocol::{ExceptionCode, Request, Response, MAX_READ_QUANTITY};

use crate::registers::{ClockTime, RegisterStore};

/// Receives clock values after a write changed them
pub trait TimeObserver {
    /// Called once per detected change, after the store lock is released
    fn time_changed(&mut self, time: ClockTime);
}

impl<F: FnMut(ClockTime)> TimeObserver for F {
    fn time_changed(&mut self, time: ClockTime) {
        self(time)
    }
}

/// Execute a decoded request and build its reply
///
/// Store range failures become `IllegalDataAddress` exceptions. After every
/// successful write the time latch is consumed and any change is handed to
/// `observer`.
pub fn handle_request<M, O>(store: &RegisterStore<M>, observer: &mut O, request: &Request) -> Response
where
    M: RawMutex,
    O: TimeObserver + ?Sized,
{
    let function = request.function() as u8;
    let illegal_address = Response::exception(function, ExceptionCode::IllegalDataAddress);

    match request {
        Request::ReadHoldingRegisters { address, quantity } => {
            let mut values: Vec<u16, { MAX_READ_QUANTITY as usize }> = Vec::new();
            // Quantity is already bounded by the decoder
            if values.resize(*quantity as usize, 0).is_err() {
                return Response::exception(function, ExceptionCode::IllegalDataValue);
            }
            match store.read_block(*address, &mut values) {
                Ok(()) => Response::ReadHoldingRegisters { values },
                Err(_) => illegal_address,
            }
        }
        Request::WriteSingleRegister { address, value } => match store.write(*address, *value) {
            Ok(()) => {
                notify_time(store, observer);
                Response::WriteSingleRegister {
                    address: *address,
                    value: *value,
                }
            }
            Err(_) => illegal_address,
        },
        Request::WriteMultipleRegisters { address, values } => {
            match store.write_block(*address, values) {
                Ok(()) => {
                    notify_time(store, observer);
                    Response::WriteMultipleRegisters {
                        address: *address,
                        quantity: values.len() as u16,
                    }
                }
                Err(_) => illegal_address,
            }
        }
    }
}

fn notify_time<M, O>(store: &RegisterStore<M>, observer: &mut O)
where
    M: RawMutex,
    O: TimeObserver + ?Sized,
{
    if let Some(time) = store.consume_changed_time() {
        observer.time_changed(time);
    }
}
