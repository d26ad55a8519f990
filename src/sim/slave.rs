// Licensed under the Apache-2.0 license

//! Register-file slave model.

/// Behavioral model of a 256-register I2C slave.
///
/// The first data byte of a write transfer latches the register pointer;
/// further written bytes land at the pointer, which advances after every
/// data byte in either direction. The pointer survives stop conditions, as
/// on real register-file parts.
pub struct SimSlave {
    address: u8,
    registers: [u8; 256],
    pointer: u8,
    expect_pointer: bool,
    write_ack_limit: Option<usize>,
    writes_acked: usize,
    nak_reads: bool,
}

impl SimSlave {
    /// Creates a slave answering on the given 7-bit address with all
    /// registers zeroed.
    #[must_use]
    pub fn new(address: u8) -> Self {
        Self {
            address,
            registers: [0; 256],
            pointer: 0,
            expect_pointer: false,
            write_ack_limit: None,
            writes_acked: 0,
            nak_reads: false,
        }
    }

    /// Presets one register.
    #[must_use]
    pub fn with_register(mut self, register: u8, value: u8) -> Self {
        if let Some(slot) = self.registers.get_mut(usize::from(register)) {
            *slot = value;
        }
        self
    }

    /// Acknowledges only the first `limit` written data bytes, then NAKs.
    #[must_use]
    pub fn with_write_ack_limit(mut self, limit: usize) -> Self {
        self.write_ack_limit = Some(limit);
        self
    }

    /// NAKs the address frame of read transfers; writes are unaffected.
    #[must_use]
    pub fn with_read_nak(mut self) -> Self {
        self.nak_reads = true;
        self
    }

    /// Current value of one register.
    #[must_use]
    pub fn register(&self, register: u8) -> u8 {
        self.registers
            .get(usize::from(register))
            .copied()
            .unwrap_or(0)
    }

    pub(crate) fn on_stop(&mut self) {
        self.expect_pointer = false;
    }

    /// Address frame decision; arms the pointer latch for write transfers.
    pub(crate) fn on_address_match(&mut self, address: u8, read: bool) -> bool {
        if address != self.address || (read && self.nak_reads) {
            return false;
        }
        if !read {
            self.expect_pointer = true;
        }
        true
    }

    /// Handles one written data byte; returns the acknowledge decision.
    pub(crate) fn on_write(&mut self, byte: u8) -> bool {
        if let Some(limit) = self.write_ack_limit {
            if self.writes_acked >= limit {
                return false;
            }
        }
        if self.expect_pointer {
            self.pointer = byte;
            self.expect_pointer = false;
        } else {
            if let Some(slot) = self.registers.get_mut(usize::from(self.pointer)) {
                *slot = byte;
            }
            self.pointer = self.pointer.wrapping_add(1);
        }
        self.writes_acked += 1;
        true
    }

    /// Produces the next byte of a read transfer and advances the pointer.
    pub(crate) fn on_read(&mut self) -> u8 {
        let value = self.register(self.pointer);
        self.pointer = self.pointer.wrapping_add(1);
        value
    }
}
