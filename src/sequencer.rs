//! Ordered command transmission with settle delays.

use crate::command::{Command, CommandTable};
use crate::error::BusError;
use crate::hal::PanelBus;
use embedded_hal::delay::DelayNs;
use log::trace;
use std::time::Duration;

/// Sends commands to the panel one at a time, in order.
///
/// Not synchronized on its own; the panel controller only reaches it while
/// holding its lock.
pub struct BusSequencer<B, D> {
    bus: B,
    delay: D,
}

impl<B: PanelBus, D: DelayNs> BusSequencer<B, D> {
    /// Pair a transport with the delay source used for settle times.
    pub fn new(bus: B, delay: D) -> Self {
        Self { bus, delay }
    }

    /// Send a single command.
    pub fn transmit_one(&mut self, command: &Command) -> Result<(), BusError> {
        trace!("tx {:?}", command);
        self.bus.send(command.opcode(), command.params())
    }

    /// Send a table in order. The first failure aborts the rest of the table.
    pub fn transmit(&mut self, table: &CommandTable) -> Result<(), BusError> {
        table.iter().try_for_each(|command| self.transmit_one(command))
    }

    /// Block for a datasheet settle time.
    pub fn delay(&mut self, duration: Duration) {
        let us = u32::try_from(duration.as_micros()).unwrap_or(u32::MAX);
        self.delay.delay_us(us);
    }
}
