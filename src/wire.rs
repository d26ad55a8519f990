// Licensed under the Apache-2.0 license

//! Line format for forwarding sensor readings.
//!
//! Readings travel as three zero-padded decimal digits terminated by a
//! newline, so receivers can split on `\n` and parse fixed-width fields.

/// Encodes one reading for the wire.
///
/// ```
/// assert_eq!(soft_i2c::wire::encode_reading(135), *b"135\n");
/// assert_eq!(soft_i2c::wire::encode_reading(7), *b"007\n");
/// ```
#[must_use]
pub fn encode_reading(value: u8) -> [u8; 4] {
    [
        b'0' + value / 100,
        b'0' + (value % 100) / 10,
        b'0' + value % 10,
        b'\n',
    ]
}
