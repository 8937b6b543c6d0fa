//! Modbus/TCP server task
//!
//! Serves one client at a time. Accept, read and write are all bounded by
//! the keepalive period so the task stamps its liveness slot even when no
//! master is connected or the master goes quiet. A reply that cannot be
//! queued within one keepalive means the client stopped reading; it is
//! dropped rather than left to stall the task into a watchdog reset.

use core::pin::pin;

use defmt::*;
use embassy_futures::select::{select, Either};
use embassy_net::tcp::TcpSocket;
use embassy_net::Stack;
use embassy_time::{with_timeout, Duration, Timer};
use embedded_io_async::Write;

use clepsydra_core::modbus::{Session, SessionError};
use clepsydra_core::supervisor::{LivenessTable, Subsystem};
use clepsydra_protocol::{MAX_ADU_SIZE, MAX_READ_CHUNK};

use super::{now_ms, Registers, KEEPALIVE};
use crate::channels::TimeForwarder;

/// Socket buffer size in each direction
const SOCKET_BUFFER_SIZE: usize = 1024;

/// Drop a client that has neither sent nor acknowledged anything for this long
const CLIENT_TIMEOUT: Duration = Duration::from_secs(60);

#[embassy_executor::task]
pub async fn modbus_task(
    stack: Stack<'static>,
    port: u16,
    registers: &'static Registers,
    liveness: &'static LivenessTable,
) -> ! {
    info!("Modbus task started");

    let mut rx_buffer = [0u8; SOCKET_BUFFER_SIZE];
    let mut tx_buffer = [0u8; SOCKET_BUFFER_SIZE];
    let mut session = Session::new();

    while !stack.is_config_up() {
        liveness.kick(Subsystem::Modbus, now_ms());
        Timer::after(KEEPALIVE).await;
    }
    if let Some(config) = stack.config_v4() {
        info!("Listening on {}:{}", config.address, port);
    }

    loop {
        liveness.kick(Subsystem::Modbus, now_ms());

        let mut socket = TcpSocket::new(stack, &mut rx_buffer, &mut tx_buffer);
        socket.set_timeout(Some(CLIENT_TIMEOUT));

        // One listening socket for the whole wait; the timer only wakes us
        // to stamp the slot
        let accepted = {
            let mut accept = pin!(socket.accept(port));
            loop {
                match select(accept.as_mut(), Timer::after(KEEPALIVE)).await {
                    Either::First(result) => break result,
                    Either::Second(()) => liveness.kick(Subsystem::Modbus, now_ms()),
                }
            }
        };
        if let Err(e) = accepted {
            warn!("Accept failed: {:?}", e);
            continue;
        }

        info!("Client connected: {:?}", socket.remote_endpoint());
        session.reset();
        serve(&mut socket, &mut session, registers, liveness).await;
        socket.close();
        let _ = with_timeout(KEEPALIVE, socket.flush()).await;
        info!("Client disconnected");
    }
}

/// Exchange requests and replies until the client leaves or the link fails
async fn serve(
    socket: &mut TcpSocket<'_>,
    session: &mut Session,
    registers: &'static Registers,
    liveness: &'static LivenessTable,
) {
    let mut chunk = [0u8; MAX_READ_CHUNK];
    let mut reply = [0u8; MAX_ADU_SIZE];
    let mut observer = TimeForwarder;

    loop {
        liveness.kick(Subsystem::Modbus, now_ms());

        let n = match with_timeout(KEEPALIVE, socket.read(&mut chunk)).await {
            Err(_) => continue,
            Ok(Ok(0)) => return,
            Ok(Ok(n)) => n,
            Ok(Err(e)) => {
                warn!("Read failed: {:?}", e);
                return;
            }
        };

        if let Err(e) = session.receive(&chunk[..n]) {
            warn!("Receive buffer reset: {:?}", e);
            continue;
        }

        loop {
            match session.poll(registers, &mut observer, &mut reply) {
                Ok(Some(len)) => {
                    trace!("Reply {=[u8]:x}", &reply[..len]);
                    liveness.kick(Subsystem::Modbus, now_ms());
                    match with_timeout(KEEPALIVE, socket.write_all(&reply[..len])).await {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => {
                            warn!("Write failed: {:?}", e);
                            return;
                        }
                        Err(_) => {
                            warn!("Client not reading replies, dropping it");
                            return;
                        }
                    }
                }
                Ok(None) => break,
                Err(SessionError::Malformed) => {
                    warn!("Malformed request dropped, resyncing");
                    break;
                }
                Err(e) => {
                    warn!("Frame dropped: {:?}", e);
                    break;
                }
            }
        }
    }
}
