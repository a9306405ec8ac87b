use serde::{Deserialize, Serialize};

/// Controller-driven input lines. `pack` places them in the device input
/// word as `0b00000_{cs_n}{copi}{sclk}`, reserved upper bits held at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinState {
    /// Chip-select, active low.
    pub cs_n: bool,
    /// Controller-out/peripheral-in data line.
    pub copi: bool,
    /// Serial clock.
    pub sclk: bool,
}

impl PinState {
    /// Bus at rest: chip-select deasserted, data and clock low.
    pub fn idle() -> Self {
        Self {
            cs_n: true,
            copi: false,
            sclk: false,
        }
    }

    pub fn pack(&self) -> u8 {
        ((self.cs_n as u8) << 2) | ((self.copi as u8) << 1) | self.sclk as u8
    }
}

/// The two observable output words. Bit 0 of `port0` carries the PWM signal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outputs {
    pub port0: u8,
    pub port1: u8,
}

impl Outputs {
    /// Level of one bit of `port0`.
    pub fn bit(&self, index: u8) -> bool {
        (self.port0 >> index) & 1 == 1
    }
}

/// One shared signal bus paced by a single driving clock. All waiting is
/// counted in clock ticks, never wall time, so protocol logic stays correct
/// under any simulation step size.
pub trait Bus {
    /// Register the input line state; the device sees it on following edges.
    fn drive(&mut self, pins: PinState);
    /// Advance the driving clock by `cycles` rising edges.
    fn tick(&mut self, cycles: u64);
    /// Current output words.
    fn outputs(&self) -> Outputs;
    /// Elapsed simulated time in nanoseconds.
    fn now_ns(&self) -> u64;
}
