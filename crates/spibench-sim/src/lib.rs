//! Simulation environment: clocked device model, signal trace buffer and the
//! command/event service the scenario runner talks to.

pub mod dut;
pub mod service;
pub mod sim;
pub mod trace;

pub use dut::DutModel;
pub use service::{SimCommand, SimEvent, SimService};
pub use sim::{SimConfig, Simulation};
pub use trace::{TraceEntry, TraceKind, TraceStore};
