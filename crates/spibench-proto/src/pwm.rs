//! Edge-timed measurement of a single output bit: frequency and duty cycle
//! derived from transition timestamps.

use crate::bus::Bus;
use crate::Error;
use serde::{Deserialize, Serialize};

/// Default edge-wait bound, in simulated nanoseconds.
pub const DEFAULT_TIMEOUT_NS: u64 = 100_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Edge {
    Rising,
    Falling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitState {
    Idle,
    Armed { deadline_ns: u64 },
    Satisfied { at_ns: u64 },
    TimedOut,
}

/// Edge-wait state machine (idle → armed → satisfied / timed-out), kept free
/// of any execution model so it works the same against a polling loop, an
/// event queue or a real interrupt source.
#[derive(Debug)]
pub struct EdgeMonitor {
    edge: Edge,
    state: WaitState,
    prev: Option<bool>,
}

impl EdgeMonitor {
    pub fn new(edge: Edge) -> Self {
        Self {
            edge,
            state: WaitState::Idle,
            prev: None,
        }
    }

    pub fn state(&self) -> WaitState {
        self.state
    }

    /// Arm with a mandatory deadline. The first observation after arming only
    /// seeds the previous level; a line that is already high never counts as
    /// a rising edge.
    pub fn arm(&mut self, now_ns: u64, timeout_ns: u64) {
        self.state = WaitState::Armed {
            deadline_ns: now_ns.saturating_add(timeout_ns),
        };
        self.prev = None;
    }

    /// Feed one observation of the line level.
    pub fn observe(&mut self, level: bool, now_ns: u64) -> WaitState {
        if let WaitState::Armed { deadline_ns } = self.state {
            if let Some(prev) = self.prev {
                let fired = match self.edge {
                    Edge::Rising => !prev && level,
                    Edge::Falling => prev && !level,
                };
                if fired {
                    self.state = WaitState::Satisfied { at_ns: now_ns };
                    self.prev = Some(level);
                    return self.state;
                }
            }
            if now_ns >= deadline_ns {
                self.state = WaitState::TimedOut;
            }
            self.prev = Some(level);
        }
        self.state
    }
}

/// Block until `bit` of `port0` makes the requested transition, advancing the
/// bus one clock at a time, and return the transition timestamp. The timeout
/// is mandatory and counted in simulated time, so a flat line fails the
/// scenario instead of hanging it.
pub fn await_edge<B: Bus>(bus: &mut B, bit: u8, edge: Edge, timeout_ns: u64) -> Result<u64, Error> {
    let mut monitor = EdgeMonitor::new(edge);
    monitor.arm(bus.now_ns(), timeout_ns);
    monitor.observe(bus.outputs().bit(bit), bus.now_ns());
    loop {
        bus.tick(1);
        match monitor.observe(bus.outputs().bit(bit), bus.now_ns()) {
            WaitState::Satisfied { at_ns } => return Ok(at_ns),
            WaitState::TimedOut => {
                log::warn!("no {edge:?} edge on bit {bit} within {timeout_ns} ns");
                return Err(Error::Timeout { edge, timeout_ns });
            }
            _ => {}
        }
    }
}

pub fn await_rising_edge<B: Bus>(bus: &mut B, bit: u8, timeout_ns: u64) -> Result<u64, Error> {
    await_edge(bus, bit, Edge::Rising, timeout_ns)
}

pub fn await_falling_edge<B: Bus>(bus: &mut B, bit: u8, timeout_ns: u64) -> Result<u64, Error> {
    await_edge(bus, bit, Edge::Falling, timeout_ns)
}

/// One observed PWM period. Ephemeral: recomputed from fresh edges on every
/// measurement request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PwmMeasurement {
    pub period_ns: u64,
    pub high_ns: u64,
}

impl PwmMeasurement {
    pub fn duty_percent(&self) -> f64 {
        if self.period_ns == 0 {
            0.0
        } else {
            self.high_ns as f64 / self.period_ns as f64 * 100.0
        }
    }

    pub fn frequency_hz(&self) -> f64 {
        if self.period_ns == 0 {
            0.0
        } else {
            1e9 / self.period_ns as f64
        }
    }
}

/// Frequency from two consecutive rising edges.
pub fn measure_frequency<B: Bus>(bus: &mut B, bit: u8, timeout_ns: u64) -> Result<f64, Error> {
    let t1 = await_rising_edge(bus, bit, timeout_ns)?;
    let t2 = await_rising_edge(bus, bit, timeout_ns)?;
    Ok(1e9 / (t2 - t1) as f64)
}

/// One full period from rising → falling → rising edge timestamps.
pub fn measure_pwm<B: Bus>(bus: &mut B, bit: u8, timeout_ns: u64) -> Result<PwmMeasurement, Error> {
    let t1 = await_rising_edge(bus, bit, timeout_ns)?;
    let t2 = await_falling_edge(bus, bit, timeout_ns)?;
    let t3 = await_rising_edge(bus, bit, timeout_ns)?;
    Ok(PwmMeasurement {
        period_ns: t3 - t1,
        high_ns: t2 - t1,
    })
}

/// Duty in percent for a given duty-register setting. The register extremes
/// hold the line constantly low or high and never produce an edge, so they
/// are defined as exactly 0% and 100% without waiting.
pub fn measure_duty<B: Bus>(
    bus: &mut B,
    bit: u8,
    duty_reg: u8,
    timeout_ns: u64,
) -> Result<f64, Error> {
    match duty_reg {
        0x00 => Ok(0.0),
        0xFF => Ok(100.0),
        _ => Ok(measure_pwm(bus, bit, timeout_ns)?.duty_percent()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{Outputs, PinState};

    /// Free-running square wave on bit 0: `high_cycles` high out of every
    /// `period_cycles`, 100 ns per tick.
    struct SquareBus {
        period_cycles: u64,
        high_cycles: u64,
        counter: u64,
        time_ns: u64,
    }

    impl SquareBus {
        fn new(period_cycles: u64, high_cycles: u64) -> Self {
            Self {
                period_cycles,
                high_cycles,
                counter: 0,
                time_ns: 0,
            }
        }
    }

    impl Bus for SquareBus {
        fn drive(&mut self, _pins: PinState) {}

        fn tick(&mut self, cycles: u64) {
            self.counter = (self.counter + cycles) % self.period_cycles;
            self.time_ns += cycles * 100;
        }

        fn outputs(&self) -> Outputs {
            Outputs {
                port0: (self.counter < self.high_cycles) as u8,
                port1: 0,
            }
        }

        fn now_ns(&self) -> u64 {
            self.time_ns
        }
    }

    #[test]
    fn monitor_walks_idle_armed_satisfied() {
        let mut mon = EdgeMonitor::new(Edge::Rising);
        assert_eq!(mon.state(), WaitState::Idle);
        mon.arm(0, 1_000);
        assert!(matches!(mon.state(), WaitState::Armed { .. }));
        mon.observe(false, 100);
        mon.observe(false, 200);
        assert_eq!(mon.observe(true, 300), WaitState::Satisfied { at_ns: 300 });
    }

    #[test]
    fn monitor_ignores_level_already_high_when_armed() {
        let mut mon = EdgeMonitor::new(Edge::Rising);
        mon.arm(0, 1_000);
        assert!(matches!(mon.observe(true, 100), WaitState::Armed { .. }));
        mon.observe(false, 200);
        assert_eq!(mon.observe(true, 300), WaitState::Satisfied { at_ns: 300 });
    }

    #[test]
    fn monitor_times_out_at_deadline() {
        let mut mon = EdgeMonitor::new(Edge::Falling);
        mon.arm(0, 500);
        mon.observe(false, 100);
        mon.observe(false, 400);
        assert_eq!(mon.observe(false, 500), WaitState::TimedOut);
    }

    #[test]
    fn frequency_of_square_wave() {
        // 10 ticks per period at 100 ns per tick = 1 MHz.
        let mut bus = SquareBus::new(10, 5);
        let freq = measure_frequency(&mut bus, 0, 1_000_000).unwrap();
        assert!((freq - 1e6).abs() < 1.0, "got {freq}");
    }

    #[test]
    fn duty_of_square_wave() {
        let mut bus = SquareBus::new(100, 25);
        let m = measure_pwm(&mut bus, 0, 1_000_000).unwrap();
        assert_eq!(m.period_ns, 10_000);
        assert_eq!(m.high_ns, 2_500);
        assert!((m.duty_percent() - 25.0).abs() < 0.01);
        assert!((m.frequency_hz() - 100_000.0).abs() < 1.0);
    }

    #[test]
    fn duty_register_extremes_skip_edge_waits() {
        // A flat line would otherwise time out; the extremes never wait.
        let mut bus = SquareBus::new(10, 0);
        assert_eq!(measure_duty(&mut bus, 0, 0x00, 1_000).unwrap(), 0.0);
        assert_eq!(measure_duty(&mut bus, 0, 0xFF, 1_000).unwrap(), 100.0);
    }

    #[test]
    fn flat_line_times_out() {
        let mut bus = SquareBus::new(10, 0);
        let err = await_rising_edge(&mut bus, 0, 10_000).unwrap_err();
        assert_eq!(
            err,
            Error::Timeout {
                edge: Edge::Rising,
                timeout_ns: 10_000
            }
        );
    }
}
