// Licensed under the Apache-2.0 license

//! Logging plumbing shared by the driver modules.
//!
//! The driver is generic over a [`Logger`] so that firmware can route
//! diagnostics to a serial console while the default build stays silent and
//! free of formatting overhead.

use core::fmt;
use core::fmt::Write as _;

use embedded_io::Write;
use heapless::String;

/// Severity of a log line, lowest to highest.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        })
    }
}

/// Sink for driver diagnostics.
///
/// Implementations must not panic; a logger that cannot keep up is expected
/// to drop lines instead.
pub trait Logger {
    fn log(&mut self, level: LogLevel, args: fmt::Arguments<'_>);
}

/// Default logger that discards everything.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct NoOpLogger;

impl Logger for NoOpLogger {
    fn log(&mut self, _level: LogLevel, _args: fmt::Arguments<'_>) {}
}

/// Logger that renders each line into a fixed buffer and writes it to an
/// `embedded-io` byte sink, typically a UART.
///
/// Lines longer than the internal buffer are truncated.
#[derive(Debug)]
pub struct SerialLogger<W: Write> {
    serial: W,
    min_level: LogLevel,
}

impl<W: Write> SerialLogger<W> {
    /// Creates a logger that forwards every level to `serial`.
    #[must_use]
    pub fn new(serial: W) -> Self {
        Self::with_min_level(serial, LogLevel::Debug)
    }

    /// Creates a logger that drops lines below `min_level`.
    #[must_use]
    pub fn with_min_level(serial: W, min_level: LogLevel) -> Self {
        Self { serial, min_level }
    }

    /// Consumes the logger and returns the underlying sink.
    #[must_use]
    pub fn release(self) -> W {
        self.serial
    }
}

impl<W: Write> Logger for SerialLogger<W> {
    fn log(&mut self, level: LogLevel, args: fmt::Arguments<'_>) {
        if level < self.min_level {
            return;
        }
        let mut line: String<128> = String::new();
        let _ = write!(line, "[{level}] ");
        let _ = line.write_fmt(args);
        let _ = self.serial.write_all(line.as_bytes());
        let _ = self.serial.write_all(b"\r\n");
        let _ = self.serial.flush();
    }
}
