//! Inter-task communication channels
//!
//! The Modbus task is the only producer: a clock write wakes the display
//! task through a latest-value signal and queues a sample for the logger.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;

use clepsydra_core::logger::{LogEvent, LOG_QUEUE_LEN};
use clepsydra_core::modbus::TimeObserver;
use clepsydra_core::registers::ClockTime;

use crate::tasks::now_ms;

/// Latest clock value for the display task; older values are overwritten
pub static DISPLAY_TIME: Signal<CriticalSectionRawMutex, ClockTime> = Signal::new();

/// Clock samples for the logger task
pub static LOG_EVENTS: Channel<CriticalSectionRawMutex, LogEvent, LOG_QUEUE_LEN> = Channel::new();

/// Forwards clock changes seen by the Modbus session to the other tasks
pub struct TimeForwarder;

impl TimeObserver for TimeForwarder {
    fn time_changed(&mut self, time: ClockTime) {
        DISPLAY_TIME.signal(time);

        let event = LogEvent {
            tick_ms: now_ms(),
            minutes: time.minutes,
            seconds: time.seconds,
        };
        // Fire and forget: a full queue drops the sample
        if LOG_EVENTS.try_send(event).is_err() {
            defmt::trace!("Log queue full, sample dropped");
        }
    }
}
