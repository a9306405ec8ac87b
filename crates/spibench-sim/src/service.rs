//! Command/event front end around the simulation: a worker thread owns the
//! engine and processes one command at a time, so the framer and the sampler
//! never touch the bus concurrently.

use crate::sim::{SimConfig, Simulation};
use crate::trace::TraceStore;
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use spibench_proto::pwm::{measure_duty, measure_frequency};
use spibench_proto::{Bus, BusTiming, Outputs, PinState, SpiMaster, SpiTransaction};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub enum SimCommand {
    Reset { cycles: u64 },
    SetEnable(bool),
    Tick(u64),
    Transaction(SpiTransaction),
    ReadOutputs,
    MeasureFrequency { bit: u8, timeout_ns: u64 },
    MeasureDuty { bit: u8, duty_reg: u8, timeout_ns: u64 },
    Close,
}

#[derive(Debug, Clone)]
pub enum SimEvent {
    ResetDone,
    TickDone,
    TransactionDone(PinState),
    Outputs(Outputs),
    Frequency(f64),
    Duty(f64),
    Error(String),
    Closed,
}

pub struct SimService {
    cfg: SimConfig,
    tx_cmd: Sender<SimCommand>,
    rx_evt: Receiver<SimEvent>,
    trace: Arc<Mutex<TraceStore>>,
}

impl SimService {
    pub fn start(cfg: SimConfig, timing: BusTiming) -> Self {
        let (tx_cmd, rx_cmd) = unbounded::<SimCommand>();
        let (tx_evt, rx_evt) = unbounded::<SimEvent>();
        let mut sim = Simulation::new(cfg.clone());
        let trace = sim.trace();
        let master = SpiMaster::new(timing);

        std::thread::spawn(move || {
            for cmd in rx_cmd.iter() {
                match cmd {
                    SimCommand::Reset { cycles } => {
                        sim.reset(cycles);
                        let _ = tx_evt.send(SimEvent::ResetDone);
                    }
                    SimCommand::SetEnable(ena) => {
                        sim.set_enable(ena);
                    }
                    SimCommand::Tick(cycles) => {
                        sim.tick(cycles);
                        let _ = tx_evt.send(SimEvent::TickDone);
                    }
                    SimCommand::Transaction(txn) => match master.send(&mut sim, &txn) {
                        Ok(state) => {
                            let _ = tx_evt.send(SimEvent::TransactionDone(state));
                        }
                        Err(e) => {
                            let _ = tx_evt.send(SimEvent::Error(e.to_string()));
                        }
                    },
                    SimCommand::ReadOutputs => {
                        let _ = tx_evt.send(SimEvent::Outputs(sim.outputs()));
                    }
                    SimCommand::MeasureFrequency { bit, timeout_ns } => {
                        match measure_frequency(&mut sim, bit, timeout_ns) {
                            Ok(freq) => {
                                let _ = tx_evt.send(SimEvent::Frequency(freq));
                            }
                            Err(e) => {
                                let _ = tx_evt.send(SimEvent::Error(e.to_string()));
                            }
                        }
                    }
                    SimCommand::MeasureDuty {
                        bit,
                        duty_reg,
                        timeout_ns,
                    } => match measure_duty(&mut sim, bit, duty_reg, timeout_ns) {
                        Ok(duty) => {
                            let _ = tx_evt.send(SimEvent::Duty(duty));
                        }
                        Err(e) => {
                            let _ = tx_evt.send(SimEvent::Error(e.to_string()));
                        }
                    },
                    SimCommand::Close => {
                        let _ = tx_evt.send(SimEvent::Closed);
                        return;
                    }
                }
            }
        });

        Self {
            cfg,
            tx_cmd,
            rx_evt,
            trace,
        }
    }

    pub fn send(&self, cmd: SimCommand) -> Result<(), String> {
        self.tx_cmd.send(cmd).map_err(|e| e.to_string())
    }

    pub fn events(&self) -> &Receiver<SimEvent> {
        &self.rx_evt
    }

    pub fn trace(&self) -> Arc<Mutex<TraceStore>> {
        self.trace.clone()
    }

    pub fn config(&self) -> &SimConfig {
        &self.cfg
    }

    pub fn close(&self) {
        let _ = self.tx_cmd.send(SimCommand::Close);
    }
}
