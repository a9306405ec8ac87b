//! Behavioral model of the register-file/PWM peripheral, limited to its
//! observable contract: an SPI write port, two output words and one PWM bit.

use spibench_proto::Outputs;

pub const REG_PORT0: u8 = 0x00;
pub const REG_PORT1: u8 = 0x01;
pub const REG_PRESCALER: u8 = 0x02;
pub const REG_DUTY: u8 = 0x04;

/// PWM frequency at prescaler select 1; select N gives `3000 / N` Hz and
/// select 0 disables the PWM entirely (port 0 becomes a pure pass-through).
pub const PWM_BASE_HZ: u64 = 3000;

/// Input word layout, matching `PinState::pack`.
const IN_SCLK: u8 = 0x01;
const IN_COPI: u8 = 0x02;
const IN_CS_N: u8 = 0x04;

pub struct DutModel {
    clock_hz: u64,
    regs: [u8; 5],
    shift: u16,
    bit_count: u8,
    prev_sclk: bool,
    pwm_counter: u64,
    pwm_high: bool,
    outputs: Outputs,
}

impl DutModel {
    pub fn new(clock_hz: u64) -> Self {
        Self {
            clock_hz,
            regs: [0; 5],
            shift: 0,
            bit_count: 0,
            prev_sclk: false,
            pwm_counter: 0,
            pwm_high: false,
            outputs: Outputs::default(),
        }
    }

    /// Evaluate one rising edge of the driving clock. Reset is active low and
    /// clears all state; a low enable line freezes the device instead.
    pub fn clock_edge(&mut self, input_word: u8, rst_n: bool, ena: bool) {
        if !rst_n {
            self.regs = [0; 5];
            self.shift = 0;
            self.bit_count = 0;
            self.prev_sclk = false;
            self.pwm_counter = 0;
            self.pwm_high = false;
            self.outputs = Outputs::default();
            return;
        }
        if !ena {
            return;
        }

        let sclk = input_word & IN_SCLK != 0;
        let copi = input_word & IN_COPI != 0;
        let cs_n = input_word & IN_CS_N != 0;

        if cs_n {
            self.shift = 0;
            self.bit_count = 0;
        } else if sclk && !self.prev_sclk {
            self.shift = (self.shift << 1) | copi as u16;
            self.bit_count += 1;
            if self.bit_count == 16 {
                self.commit();
                self.shift = 0;
                self.bit_count = 0;
            }
        }
        self.prev_sclk = sclk;

        self.step_pwm();
        self.refresh_outputs();
    }

    pub fn outputs(&self) -> Outputs {
        self.outputs
    }

    fn commit(&mut self) {
        let write = self.shift & 0x8000 != 0;
        let address = ((self.shift >> 8) & 0x7F) as u8;
        let data = (self.shift & 0xFF) as u8;
        // No read-data return path exists; read frames are accepted and
        // discarded.
        if !write {
            log::debug!("dut: read frame addr={address:#04x} ignored");
            return;
        }
        match address {
            REG_PORT0 | REG_PORT1 | REG_PRESCALER | REG_DUTY => {
                log::debug!("dut: write {data:#04x} -> reg {address:#04x}");
                self.regs[address as usize] = data;
            }
            // Unimplemented addresses are silently ignored.
            _ => log::debug!("dut: write to unmapped addr {address:#04x} ignored"),
        }
    }

    fn pwm_period_cycles(&self) -> u64 {
        let sel = self.regs[REG_PRESCALER as usize] as u64;
        if sel == 0 {
            0
        } else {
            self.clock_hz * sel / PWM_BASE_HZ
        }
    }

    fn step_pwm(&mut self) {
        let period = self.pwm_period_cycles();
        if period == 0 {
            self.pwm_counter = 0;
            self.pwm_high = false;
            return;
        }
        let duty = self.regs[REG_DUTY as usize] as u64;
        let high = duty * period / 255;
        self.pwm_high = self.pwm_counter < high;
        self.pwm_counter += 1;
        if self.pwm_counter >= period {
            self.pwm_counter = 0;
        }
    }

    fn refresh_outputs(&mut self) {
        let port0 = self.regs[REG_PORT0 as usize];
        self.outputs.port0 = if self.pwm_period_cycles() != 0 {
            // Bit 0 carries the PWM signal, gated by its pass-through bit.
            (port0 & !0x01) | (port0 & 0x01 & self.pwm_high as u8)
        } else {
            port0
        };
        self.outputs.port1 = self.regs[REG_PORT1 as usize];
    }
}
