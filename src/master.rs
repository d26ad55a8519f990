// Licensed under the Apache-2.0 license

//! Bit-banged I2C master engine.
//!
//! This module drives SCL and SDA as emulated open-drain lines through
//! `embedded-hal` pin traits and paces every edge with an injected delay
//! source. It exposes the classic four-call register transaction surface and
//! the `embedded_hal::i2c::I2c` trait on top of the same byte primitives.

use core::fmt;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::i2c::{self, NoAcknowledgeSource, Operation, SevenBitAddress};
use fugit::{HertzU32, NanosDurationU32, RateExtU32};

use crate::common::{LogLevel, Logger, NoOpLogger};

const NANOS_PER_SEC: u32 = 1_000_000_000;

/// Nominal bus clock rates.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum I2cSpeed {
    Standard = 100_000,
    Fast = 400_000,
    FastPlus = 1_000_000,
}

impl I2cSpeed {
    /// Bus clock rate as a `fugit` frequency.
    #[must_use]
    pub fn frequency(self) -> HertzU32 {
        (self as u32).Hz()
    }
}

/// Timing configuration for the engine.
///
/// The engine sleeps for one half SCL period between line transitions, so the
/// effective bus clock comes out at `speed` unless `half_period` overrides it
/// for slaves that need extra margin.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct I2cConfig {
    pub speed: I2cSpeed,
    pub half_period: Option<NanosDurationU32>,
}

impl I2cConfig {
    /// Half SCL period in nanoseconds, as derived from the configuration.
    #[must_use]
    pub fn half_period_ns(&self) -> u32 {
        match self.half_period {
            Some(period) => period.to_nanos(),
            None => NANOS_PER_SEC / (2 * self.speed.frequency().raw()),
        }
    }
}

impl Default for I2cConfig {
    fn default() -> Self {
        I2cConfigBuilder::new().build()
    }
}

pub struct I2cConfigBuilder {
    speed: I2cSpeed,
    half_period: Option<NanosDurationU32>,
}

impl Default for I2cConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl I2cConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            speed: I2cSpeed::Standard,
            half_period: None,
        }
    }
    #[must_use]
    pub fn speed(mut self, speed: I2cSpeed) -> Self {
        self.speed = speed;
        self
    }
    #[must_use]
    pub fn half_period(mut self, half_period: NanosDurationU32) -> Self {
        self.half_period = Some(half_period);
        self
    }
    #[must_use]
    pub fn build(self) -> I2cConfig {
        I2cConfig {
            speed: self.speed,
            half_period: self.half_period,
        }
    }
}

/// Errors reported by the engine.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Error<E> {
    /// A pin operation failed.
    Bus(E),
    /// The slave left SDA high during an acknowledge clock.
    NoAck(NoAcknowledgeSource),
}

impl<E: fmt::Debug> i2c::Error for Error<E> {
    fn kind(&self) -> i2c::ErrorKind {
        match self {
            Error::Bus(_) => i2c::ErrorKind::Bus,
            Error::NoAck(source) => i2c::ErrorKind::NoAcknowledge(*source),
        }
    }
}

/// Software I2C master over two open-drain capable pins.
///
/// `SCL` needs an output pin only; `SDA` must also read back the line level
/// so the engine can sample slave data and acknowledge bits. Pins are treated
/// as open drain: `set_high` must release the line to the pull-up and
/// `set_low` must sink it.
///
/// Every failure path, including a missing acknowledge mid-transaction,
/// leaves the bus released after exactly one stop condition.
///
/// ```rust,ignore
/// let mut i2c = SoftI2c::new(scl, sda, delay, I2cConfig::default());
/// i2c.init()?;
/// i2c.send_byte_data(0x44, 0x17, 0xCC)?;
/// let value = i2c.receive_byte_data(0x44, 0x17)?;
/// ```
pub struct SoftI2c<SCL, SDA, D, L = NoOpLogger>
where
    SCL: OutputPin,
    SDA: OutputPin + InputPin,
    D: DelayNs,
    L: Logger,
{
    scl: SCL,
    sda: SDA,
    delay: D,
    config: I2cConfig,
    half_period_ns: u32,
    pub logger: L,
}

impl<SCL, SDA, D, E> SoftI2c<SCL, SDA, D, NoOpLogger>
where
    SCL: OutputPin<Error = E>,
    SDA: OutputPin<Error = E> + InputPin<Error = E>,
    D: DelayNs,
{
    /// Creates an engine with logging disabled.
    pub fn new(scl: SCL, sda: SDA, delay: D, config: I2cConfig) -> Self {
        Self::new_with_logger(scl, sda, delay, config, NoOpLogger)
    }
}

impl<SCL, SDA, D, E, L> SoftI2c<SCL, SDA, D, L>
where
    SCL: OutputPin<Error = E>,
    SDA: OutputPin<Error = E> + InputPin<Error = E>,
    D: DelayNs,
    L: Logger,
{
    pub fn new_with_logger(scl: SCL, sda: SDA, delay: D, config: I2cConfig, logger: L) -> Self {
        let half_period_ns = config.half_period_ns();
        Self {
            scl,
            sda,
            delay,
            config,
            half_period_ns,
            logger,
        }
    }

    #[must_use]
    pub fn config(&self) -> I2cConfig {
        self.config
    }

    /// Consumes the engine and returns the pins and delay source.
    pub fn free(self) -> (SCL, SDA, D) {
        (self.scl, self.sda, self.delay)
    }

    /// Releases both lines and waits one half period for the bus to settle.
    ///
    /// Call once before the first transaction.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Bus`] if a pin operation fails.
    pub fn init(&mut self) -> Result<(), Error<E>> {
        self.set_scl_high()?;
        self.set_sda_high()?;
        self.wait_for_clk();
        self.logger.log(
            LogLevel::Debug,
            format_args!("bus released, half period {} ns", self.half_period_ns),
        );
        Ok(())
    }

    /// Writes one byte to the slave.
    ///
    /// On most register-file devices a single written byte sets the register
    /// pointer for a following read.
    ///
    /// # Errors
    ///
    /// [`Error::NoAck`] carries the phase that went unacknowledged; the stop
    /// condition has been emitted either way.
    pub fn send_byte(&mut self, address: SevenBitAddress, data: u8) -> Result<(), Error<E>> {
        if !self.write_byte(address << 1, true, false)? {
            return self.stop_and_nak(address, NoAcknowledgeSource::Address);
        }
        if !self.write_byte(data, false, true)? {
            // The byte primitive has already emitted the stop.
            return self.nak(address, NoAcknowledgeSource::Data);
        }
        Ok(())
    }

    /// Reads one byte from the slave at its current register pointer.
    ///
    /// The final (and only) data byte is not acknowledged, per the protocol.
    ///
    /// # Errors
    ///
    /// [`Error::NoAck`] if the address went unacknowledged; the stop
    /// condition has been emitted either way.
    pub fn receive_byte(&mut self, address: SevenBitAddress) -> Result<u8, Error<E>> {
        if !self.write_byte((address << 1) | 0x01, true, false)? {
            return self.stop_and_nak(address, NoAcknowledgeSource::Address);
        }
        self.read_byte(false, true)
    }

    /// Writes `data` to the slave register `register`.
    ///
    /// # Errors
    ///
    /// [`Error::NoAck`] carries the phase that went unacknowledged; the stop
    /// condition has been emitted either way.
    pub fn send_byte_data(
        &mut self,
        address: SevenBitAddress,
        register: u8,
        data: u8,
    ) -> Result<(), Error<E>> {
        if !self.write_byte(address << 1, true, false)? {
            return self.stop_and_nak(address, NoAcknowledgeSource::Address);
        }
        if !self.write_byte(register, false, false)? {
            return self.stop_and_nak(address, NoAcknowledgeSource::Data);
        }
        if !self.write_byte(data, false, true)? {
            return self.nak(address, NoAcknowledgeSource::Data);
        }
        Ok(())
    }

    /// Reads the slave register `register` using a repeated start between the
    /// pointer write and the read.
    ///
    /// # Errors
    ///
    /// [`Error::NoAck`] carries the phase that went unacknowledged; the stop
    /// condition has been emitted either way.
    pub fn receive_byte_data(
        &mut self,
        address: SevenBitAddress,
        register: u8,
    ) -> Result<u8, Error<E>> {
        if !self.write_byte(address << 1, true, false)? {
            return self.stop_and_nak(address, NoAcknowledgeSource::Address);
        }
        if !self.write_byte(register, false, false)? {
            return self.stop_and_nak(address, NoAcknowledgeSource::Data);
        }
        if !self.write_byte((address << 1) | 0x01, true, false)? {
            return self.stop_and_nak(address, NoAcknowledgeSource::Address);
        }
        self.read_byte(false, true)
    }

    fn wait_for_clk(&mut self) {
        self.delay.delay_ns(self.half_period_ns);
    }

    fn set_scl_high(&mut self) -> Result<(), Error<E>> {
        self.scl.set_high().map_err(Error::Bus)
    }

    fn set_scl_low(&mut self) -> Result<(), Error<E>> {
        self.scl.set_low().map_err(Error::Bus)
    }

    fn set_sda_high(&mut self) -> Result<(), Error<E>> {
        self.sda.set_high().map_err(Error::Bus)
    }

    fn set_sda_low(&mut self) -> Result<(), Error<E>> {
        self.sda.set_low().map_err(Error::Bus)
    }

    fn read_sda(&mut self) -> Result<bool, Error<E>> {
        self.sda.is_high().map_err(Error::Bus)
    }

    /// SDA falling while SCL is released.
    fn send_start(&mut self) -> Result<(), Error<E>> {
        self.set_scl_high()?;
        self.set_sda_high()?;
        self.wait_for_clk();

        self.set_sda_low()?;
        self.wait_for_clk();

        self.set_scl_low()?;
        self.wait_for_clk();
        Ok(())
    }

    /// SDA rising while SCL is released.
    fn send_stop(&mut self) -> Result<(), Error<E>> {
        self.set_sda_low()?;
        self.wait_for_clk();

        self.set_scl_high()?;
        self.wait_for_clk();

        self.set_sda_high()?;
        self.wait_for_clk();
        Ok(())
    }

    fn write_bit(&mut self, bit: bool) -> Result<(), Error<E>> {
        if bit {
            self.set_sda_high()?;
        } else {
            self.set_sda_low()?;
        }
        self.wait_for_clk();

        self.set_scl_high()?;
        self.wait_for_clk();

        self.set_scl_low()?;
        self.wait_for_clk();
        Ok(())
    }

    fn read_bit(&mut self) -> Result<bool, Error<E>> {
        self.set_sda_high()?;
        self.wait_for_clk();

        self.set_scl_high()?;
        self.wait_for_clk();

        let bit = self.read_sda()?;
        self.set_scl_low()?;
        Ok(bit)
    }

    /// Shifts one byte out MSB first and samples the acknowledge clock.
    ///
    /// Returns `true` when the slave pulled SDA low during the ninth clock.
    fn write_byte(
        &mut self,
        byte: u8,
        send_start: bool,
        send_stop: bool,
    ) -> Result<bool, Error<E>> {
        if send_start {
            self.send_start()?;
        }

        let mut rest = byte;
        for _ in 0..8 {
            self.write_bit(rest & 0x80 != 0)?;
            rest <<= 1;
        }

        let ack = !self.read_bit()?;

        if send_stop {
            self.send_stop()?;
        }
        Ok(ack)
    }

    /// Shifts one byte in MSB first, then drives the acknowledge clock low
    /// when `ack` is set to ask the slave for more.
    fn read_byte(&mut self, ack: bool, send_stop: bool) -> Result<u8, Error<E>> {
        let mut byte = 0u8;
        for _ in 0..8 {
            byte = (byte << 1) | u8::from(self.read_bit()?);
        }

        self.write_bit(!ack)?;

        if send_stop {
            self.send_stop()?;
        }
        Ok(byte)
    }

    fn nak<T>(
        &mut self,
        address: SevenBitAddress,
        source: NoAcknowledgeSource,
    ) -> Result<T, Error<E>> {
        self.logger.log(
            LogLevel::Warn,
            format_args!("no acknowledge from {address:#04x} ({source:?})"),
        );
        Err(Error::NoAck(source))
    }

    fn stop_and_nak<T>(
        &mut self,
        address: SevenBitAddress,
        source: NoAcknowledgeSource,
    ) -> Result<T, Error<E>> {
        self.send_stop()?;
        self.nak(address, source)
    }
}

impl<SCL, SDA, D, E, L> i2c::ErrorType for SoftI2c<SCL, SDA, D, L>
where
    SCL: OutputPin<Error = E>,
    SDA: OutputPin<Error = E> + InputPin<Error = E>,
    D: DelayNs,
    E: fmt::Debug,
    L: Logger,
{
    type Error = Error<E>;
}

impl<SCL, SDA, D, E, L> i2c::I2c for SoftI2c<SCL, SDA, D, L>
where
    SCL: OutputPin<Error = E>,
    SDA: OutputPin<Error = E> + InputPin<Error = E>,
    D: DelayNs,
    E: fmt::Debug,
    L: Logger,
{
    fn transaction(
        &mut self,
        address: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        // Zero-length reads are skipped rather than addressed: a slave
        // addressed for read drives SDA until a full byte is NAKed, which
        // an empty read never does. Zero-length writes still go out as
        // address probes.
        let mut ops = operations
            .iter_mut()
            .filter(|op| !matches!(op, Operation::Read(buffer) if buffer.is_empty()))
            .peekable();
        let mut started = false;
        let mut prev_was_read = false;
        while let Some(op) = ops.next() {
            let is_read = matches!(op, Operation::Read(_));
            // Start on the first operation, repeated start on every change
            // of direction. Same-direction operations continue without
            // re-addressing.
            if !started || is_read != prev_was_read {
                let address_byte = (address << 1) | u8::from(is_read);
                if !self.write_byte(address_byte, true, false)? {
                    return self.stop_and_nak(address, NoAcknowledgeSource::Address);
                }
                started = true;
            }
            match op {
                Operation::Write(bytes) => {
                    for &byte in bytes.iter() {
                        if !self.write_byte(byte, false, false)? {
                            return self.stop_and_nak(address, NoAcknowledgeSource::Data);
                        }
                    }
                }
                Operation::Read(buffer) => {
                    let next_is_read = matches!(ops.peek(), Some(Operation::Read(_)));
                    let count = buffer.len();
                    for (index, slot) in buffer.iter_mut().enumerate() {
                        let last_in_run = index + 1 == count && !next_is_read;
                        *slot = self.read_byte(!last_in_run, false)?;
                    }
                }
            }
            prev_was_read = is_read;
        }
        if started {
            self.send_stop()?;
        }
        Ok(())
    }
}
