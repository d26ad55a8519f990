// Licensed under the Apache-2.0 license

//! Wired-AND line model and protocol decoder.
//!
//! The decoder watches resolved line levels edge by edge: data bits are
//! sampled on SCL rising edges, start and stop conditions on SDA edges while
//! SCL is released, and the attached slave model changes its SDA drive on
//! the SCL falling edges where real silicon does.

use crate::sim::slave::SimSlave;

/// One decoded framing event, in bus order.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BusEvent {
    Start,
    Stop,
    /// A nine-clock byte frame. `ack` is the level of the ninth clock,
    /// low meaning acknowledged, whichever side drove it.
    Byte { value: u8, ack: bool },
}

/// One raw line transition or recorded delay, in bus order.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Signal {
    SclRise,
    SclFall,
    SdaRise,
    SdaFall,
    Tick,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Line {
    Scl,
    Sda,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Drive {
    Released,
    Low,
}

/// Decoder position within the nine-clock byte frame.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Phase {
    /// No start condition seen.
    Idle,
    /// Sampling data bits; `count` collected so far.
    Bits { count: u8 },
    /// Eight bits in, waiting for the acknowledge clock to rise.
    AckClock,
    /// Acknowledge sampled, waiting for the ninth falling edge.
    AckFall { ack: bool },
}

pub(crate) struct BusInner {
    master_scl: Drive,
    master_sda: Drive,
    slave_sda: Drive,
    scl_level: bool,
    sda_level: bool,
    phase: Phase,
    shift: u8,
    frame_index: u16,
    selected: bool,
    xfer_read: bool,
    tx_byte: u8,
    pub(crate) slave: Option<SimSlave>,
    pub(crate) events: Vec<BusEvent>,
    pub(crate) signals: Vec<Signal>,
    pub(crate) delay_calls: u32,
    pub(crate) delay_elapsed_ns: u64,
}

impl BusInner {
    pub(crate) fn new() -> Self {
        Self {
            master_scl: Drive::Released,
            master_sda: Drive::Released,
            slave_sda: Drive::Released,
            scl_level: true,
            sda_level: true,
            phase: Phase::Idle,
            shift: 0,
            frame_index: 0,
            selected: false,
            xfer_read: false,
            tx_byte: 0,
            slave: None,
            events: Vec::new(),
            signals: Vec::new(),
            delay_calls: 0,
            delay_elapsed_ns: 0,
        }
    }

    pub(crate) fn drive(&mut self, line: Line, drive: Drive) {
        match line {
            Line::Scl => self.master_scl = drive,
            Line::Sda => self.master_sda = drive,
        }
        self.settle();
    }

    pub(crate) fn level(&self, line: Line) -> bool {
        match line {
            Line::Scl => self.scl_level,
            Line::Sda => self.sda_level,
        }
    }

    pub(crate) fn is_idle(&self) -> bool {
        self.scl_level && self.sda_level
    }

    pub(crate) fn record_delay(&mut self, ns: u32) {
        self.delay_calls += 1;
        self.delay_elapsed_ns += u64::from(ns);
        self.signals.push(Signal::Tick);
    }

    pub(crate) fn clear(&mut self) {
        self.events.clear();
        self.signals.clear();
        self.delay_calls = 0;
        self.delay_elapsed_ns = 0;
    }

    /// Re-resolves both lines and feeds one edge at a time to the decoder
    /// until the bus is stable. A slave reaction to one edge is picked up by
    /// the next iteration.
    fn settle(&mut self) {
        loop {
            let scl = self.master_scl == Drive::Released;
            let sda = self.master_sda == Drive::Released && self.slave_sda == Drive::Released;
            if scl != self.scl_level {
                self.scl_level = scl;
                if scl {
                    self.signals.push(Signal::SclRise);
                    self.on_scl_rise();
                } else {
                    self.signals.push(Signal::SclFall);
                    self.on_scl_fall();
                }
            } else if sda != self.sda_level {
                self.sda_level = sda;
                if sda {
                    self.signals.push(Signal::SdaRise);
                    if self.scl_level {
                        self.on_stop();
                    }
                } else {
                    self.signals.push(Signal::SdaFall);
                    if self.scl_level {
                        self.on_start();
                    }
                }
            } else {
                break;
            }
        }
    }

    fn on_scl_rise(&mut self) {
        match self.phase {
            Phase::Idle | Phase::AckFall { .. } => {}
            Phase::Bits { count } => {
                if count < 8 {
                    self.shift = (self.shift << 1) | u8::from(self.sda_level);
                    self.phase = Phase::Bits { count: count + 1 };
                }
            }
            Phase::AckClock => {
                // Low during the ninth clock means acknowledged.
                self.phase = Phase::AckFall {
                    ack: !self.sda_level,
                };
            }
        }
    }

    fn on_scl_fall(&mut self) {
        match self.phase {
            Phase::Bits { count: 8 } => {
                self.drive_ack();
                self.phase = Phase::AckClock;
            }
            Phase::Bits { count } if (1..8).contains(&count) => {
                // A transmitting slave presents the next data bit while the
                // clock is low.
                if self.selected && self.xfer_read && self.frame_index > 0 {
                    let bit = self.tx_byte & (0x80u8 >> count) != 0;
                    self.slave_sda = if bit { Drive::Released } else { Drive::Low };
                }
            }
            Phase::AckFall { ack } => self.finish_frame(ack),
            _ => {}
        }
    }

    /// The ninth clock is about to rise; decide who drives SDA during it.
    fn drive_ack(&mut self) {
        if self.frame_index == 0 {
            let address = self.shift >> 1;
            let read = self.shift & 0x01 != 0;
            self.xfer_read = read;
            self.selected = match self.slave.as_mut() {
                Some(slave) => slave.on_address_match(address, read),
                None => false,
            };
            self.slave_sda = if self.selected {
                Drive::Low
            } else {
                Drive::Released
            };
        } else if self.xfer_read {
            // Read data frames are acknowledged by the master.
            self.slave_sda = Drive::Released;
        } else {
            let value = self.shift;
            let ack = self.selected
                && self
                    .slave
                    .as_mut()
                    .is_some_and(|slave| slave.on_write(value));
            self.slave_sda = if ack { Drive::Low } else { Drive::Released };
        }
    }

    fn finish_frame(&mut self, ack: bool) {
        let value = self.shift;
        let was_address = self.frame_index == 0;
        self.events.push(BusEvent::Byte { value, ack });
        self.frame_index += 1;
        self.shift = 0;
        self.phase = Phase::Bits { count: 0 };

        if self.selected && self.xfer_read {
            if was_address || ack {
                self.load_tx_byte();
            } else {
                // Master NAK ends the read; the slave lets go of the line.
                self.selected = false;
                self.slave_sda = Drive::Released;
            }
        } else {
            self.slave_sda = Drive::Released;
        }
    }

    fn load_tx_byte(&mut self) {
        if let Some(slave) = self.slave.as_mut() {
            self.tx_byte = slave.on_read();
            // Bit 7 goes on the line before the next rising edge.
            self.slave_sda = if self.tx_byte & 0x80 != 0 {
                Drive::Released
            } else {
                Drive::Low
            };
        }
    }

    fn on_start(&mut self) {
        self.events.push(BusEvent::Start);
        self.phase = Phase::Bits { count: 0 };
        self.shift = 0;
        self.frame_index = 0;
        self.selected = false;
        self.xfer_read = false;
        self.slave_sda = Drive::Released;
    }

    fn on_stop(&mut self) {
        self.events.push(BusEvent::Stop);
        self.phase = Phase::Idle;
        self.shift = 0;
        self.frame_index = 0;
        self.selected = false;
        self.slave_sda = Drive::Released;
        if let Some(slave) = self.slave.as_mut() {
            slave.on_stop();
        }
    }
}
