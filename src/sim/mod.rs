// Licensed under the Apache-2.0 license

//! Simulated I2C bus for host-side testing.
//!
//! [`SimBus`] hands out pin and delay endpoints that plug straight into the
//! master engine. Lines resolve wired-AND like a pulled-up bus, a protocol
//! decoder turns edges into [`BusEvent`]s, and an optional register-file
//! slave model answers transactions. Delays are recorded, not slept, so
//! tests run in zero wall-clock time.

mod bus;
mod slave;

pub use bus::{BusEvent, Signal};
pub use slave::SimSlave;

use std::cell::RefCell;
use std::convert::Infallible;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, InputPin, OutputPin};

use bus::{BusInner, Drive, Line};

/// Shared simulated bus. Endpoints cloned from it all see the same lines.
pub struct SimBus {
    inner: Rc<RefCell<BusInner>>,
}

impl Default for SimBus {
    fn default() -> Self {
        Self::new()
    }
}

impl SimBus {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(BusInner::new())),
        }
    }

    /// Endpoint for the clock line.
    #[must_use]
    pub fn scl(&self) -> SimPin {
        SimPin {
            inner: Rc::clone(&self.inner),
            line: Line::Scl,
        }
    }

    /// Endpoint for the data line.
    #[must_use]
    pub fn sda(&self) -> SimPin {
        SimPin {
            inner: Rc::clone(&self.inner),
            line: Line::Sda,
        }
    }

    /// Delay endpoint for the master under test.
    #[must_use]
    pub fn delay(&self) -> SimDelay {
        SimDelay {
            inner: Rc::clone(&self.inner),
        }
    }

    pub fn attach_slave(&self, slave: SimSlave) {
        self.inner.borrow_mut().slave = Some(slave);
    }

    pub fn detach_slave(&self) -> Option<SimSlave> {
        self.inner.borrow_mut().slave.take()
    }

    /// Peeks at one register of the attached slave.
    #[must_use]
    pub fn slave_register(&self, register: u8) -> Option<u8> {
        self.inner
            .borrow()
            .slave
            .as_ref()
            .map(|slave| slave.register(register))
    }

    /// Framing events decoded so far, in bus order.
    #[must_use]
    pub fn events(&self) -> Vec<BusEvent> {
        self.inner.borrow().events.clone()
    }

    /// Raw line transitions and delay ticks, in bus order.
    #[must_use]
    pub fn signals(&self) -> Vec<Signal> {
        self.inner.borrow().signals.clone()
    }

    /// Drops recorded events, signals and delay statistics.
    pub fn clear(&self) {
        self.inner.borrow_mut().clear();
    }

    /// Both lines resting high.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.inner.borrow().is_idle()
    }

    #[must_use]
    pub fn delay_calls(&self) -> u32 {
        self.inner.borrow().delay_calls
    }

    /// Total virtual time the master asked to wait, in nanoseconds.
    #[must_use]
    pub fn delay_elapsed_ns(&self) -> u64 {
        self.inner.borrow().delay_elapsed_ns
    }
}

/// Master-side endpoint of one bus line.
///
/// Behaves like an open-drain GPIO: `set_high` releases the line to the
/// pull-up, `set_low` sinks it, and reads return the resolved line level.
pub struct SimPin {
    inner: Rc<RefCell<BusInner>>,
    line: Line,
}

impl ErrorType for SimPin {
    type Error = Infallible;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.inner.borrow_mut().drive(self.line, Drive::Low);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.inner.borrow_mut().drive(self.line, Drive::Released);
        Ok(())
    }
}

impl InputPin for SimPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.inner.borrow().level(self.line))
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|level| !level)
    }
}

/// Delay endpoint that advances the bus's virtual clock.
pub struct SimDelay {
    inner: Rc<RefCell<BusInner>>,
}

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.inner.borrow_mut().record_delay(ns);
    }
}
