//! SPI transaction framing: 1 direction bit, 7 address bits, 8 data bits,
//! most-significant bit first, one full SCLK pulse per bit.

use crate::bus::{Bus, PinState};
use crate::Error;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Write,
    Read,
}

/// One framed transaction. Constructed valid, consumed once, discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpiTransaction {
    direction: Direction,
    address: u8,
    data: u8,
}

impl SpiTransaction {
    /// Validated before anything touches the bus: `address` must fit 7 bits.
    /// `data` is width-checked by its type.
    pub fn new(direction: Direction, address: u8, data: u8) -> Result<Self, Error> {
        if address > 0x7F {
            return Err(Error::InvalidArgument(format!(
                "address {address:#04x} exceeds 7 bits"
            )));
        }
        Ok(Self {
            direction,
            address,
            data,
        })
    }

    pub fn write(address: u8, data: u8) -> Result<Self, Error> {
        Self::new(Direction::Write, address, data)
    }

    pub fn read(address: u8, data: u8) -> Result<Self, Error> {
        Self::new(Direction::Read, address, data)
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn data(&self) -> u8 {
        self.data
    }

    /// `(direction << 15) | (address << 8) | data`, Write = 1.
    pub fn word(&self) -> u16 {
        let dir = matches!(self.direction, Direction::Write) as u16;
        (dir << 15) | ((self.address as u16) << 8) | self.data as u16
    }

    pub fn to_bytes(&self) -> [u8; 2] {
        self.word().to_be_bytes()
    }
}

/// Bus timing in driving-clock ticks, never wall time. The default half
/// period of 10 ticks gives an SCLK rate of 1/20 of the driving clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusTiming {
    /// Ticks per SCLK half period.
    pub half_period_cycles: u64,
    /// Ticks the bus settles with chip-select asserted before the first bit.
    pub settle_cycles: u64,
    /// Ticks after deassert, giving the device time to commit internally.
    pub idle_cycles: u64,
}

impl Default for BusTiming {
    fn default() -> Self {
        Self {
            half_period_cycles: 10,
            settle_cycles: 1,
            idle_cycles: 600,
        }
    }
}

/// Drives framed transactions against the device input port.
pub struct SpiMaster {
    timing: BusTiming,
}

impl SpiMaster {
    pub fn new(timing: BusTiming) -> Self {
        Self { timing }
    }

    pub fn timing(&self) -> &BusTiming {
        &self.timing
    }

    /// Drive one complete 16-bit frame and return the final line state.
    ///
    /// Fire-and-forget: the device sends no acknowledgement; success is
    /// inferred by the caller from subsequent output observation. Once
    /// started, all 16 bits are always sent.
    pub fn send<B: Bus>(&self, bus: &mut B, txn: &SpiTransaction) -> Result<PinState, Error> {
        log::debug!(
            "spi {:?} addr={:#04x} data={:#04x}",
            txn.direction(),
            txn.address(),
            txn.data()
        );

        // Bus settle: select the device with clock and data at rest.
        bus.drive(PinState {
            cs_n: false,
            copi: false,
            sclk: false,
        });
        bus.tick(self.timing.settle_cycles);

        let word = txn.word();
        for i in (0..16).rev() {
            let bit = (word >> i) & 1 == 1;
            // The data line changes only while the clock is low; the device
            // samples on the rising edge with the bit already stable.
            bus.drive(PinState {
                cs_n: false,
                copi: bit,
                sclk: false,
            });
            bus.tick(self.timing.half_period_cycles);
            bus.drive(PinState {
                cs_n: false,
                copi: bit,
                sclk: true,
            });
            bus.tick(self.timing.half_period_cycles);
        }

        let end = PinState::idle();
        bus.drive(end);
        bus.tick(self.timing.idle_cycles);
        Ok(end)
    }
}
