//! Synchronous simulation engine: one driving clock, one device model, one
//! shared trace buffer.

use crate::dut::DutModel;
use crate::trace::{TraceKind, TraceStore};
use parking_lot::Mutex;
use spibench_proto::{Bus, Outputs, PinState};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Driving clock period; 100 ns gives the nominal 10 MHz clock.
    pub clock_period_ns: u64,
    /// Cycles the reset line is held low before release.
    pub reset_cycles: u64,
    /// Capacity of the signal trace ring.
    pub trace_entries: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            clock_period_ns: 100,
            reset_cycles: 5,
            trace_entries: 10_000,
        }
    }
}

impl SimConfig {
    pub fn clock_hz(&self) -> u64 {
        1_000_000_000 / self.clock_period_ns
    }
}

pub struct Simulation {
    cfg: SimConfig,
    dut: DutModel,
    pins: PinState,
    rst_n: bool,
    ena: bool,
    time_ns: u64,
    last_outputs: Outputs,
    trace: Arc<Mutex<TraceStore>>,
}

impl Simulation {
    pub fn new(cfg: SimConfig) -> Self {
        let dut = DutModel::new(cfg.clock_hz());
        let trace = Arc::new(Mutex::new(TraceStore::new(cfg.trace_entries)));
        Self {
            dut,
            pins: PinState::idle(),
            rst_n: true,
            ena: true,
            time_ns: 0,
            last_outputs: Outputs::default(),
            trace,
            cfg,
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.cfg
    }

    pub fn trace(&self) -> Arc<Mutex<TraceStore>> {
        self.trace.clone()
    }

    /// Hold reset low for `cycles`, release it, then let the device settle
    /// for the same count. All registers read zero afterwards.
    pub fn reset(&mut self, cycles: u64) {
        log::info!("reset: {cycles} cycles low");
        self.rst_n = false;
        self.tick(cycles);
        self.rst_n = true;
        self.tick(cycles);
    }

    pub fn set_enable(&mut self, ena: bool) {
        self.ena = ena;
    }

    fn step(&mut self) {
        self.dut.clock_edge(self.pins.pack(), self.rst_n, self.ena);
        self.time_ns += self.cfg.clock_period_ns;
        let out = self.dut.outputs();
        if out != self.last_outputs {
            self.trace
                .lock()
                .push(self.time_ns, TraceKind::Out, vec![out.port0, out.port1]);
            self.last_outputs = out;
        }
    }
}

impl Bus for Simulation {
    fn drive(&mut self, pins: PinState) {
        if pins != self.pins {
            self.trace
                .lock()
                .push(self.time_ns, TraceKind::In, vec![pins.pack()]);
        }
        self.pins = pins;
    }

    fn tick(&mut self, cycles: u64) {
        for _ in 0..cycles {
            self.step();
        }
    }

    fn outputs(&self) -> Outputs {
        self.dut.outputs()
    }

    fn now_ns(&self) -> u64 {
        self.time_ns
    }
}
