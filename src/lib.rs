// Licensed under the Apache-2.0 license

//! Software (bit-banged) I2C master driver.
//!
//! The protocol engine in [`master`] clocks two open-drain lines through the
//! `embedded-hal` digital pin and delay traits, so the same code runs against
//! real GPIOs on any platform with a pin HAL and against the simulated bus in
//! [`sim`] that the test suite wires up on the host.

// Prevent panic-prone patterns in production code only
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::indexing_slicing))]
#![cfg_attr(not(test), warn(clippy::expect_used))]
#![cfg_attr(not(any(test, feature = "std")), no_std)]

pub mod common;
pub mod master;
#[cfg(any(test, feature = "std"))]
pub mod sim;
pub mod wire;

// Re-export the driver surface for convenience
pub use common::{LogLevel, Logger, NoOpLogger, SerialLogger};
pub use master::{Error, I2cConfig, I2cConfigBuilder, I2cSpeed, SoftI2c};
