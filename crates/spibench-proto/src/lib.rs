//! Protocol core: SPI transaction framing and edge-timed PWM measurement.

pub mod bus;
pub mod pwm;
pub mod spi;

pub use bus::{Bus, Outputs, PinState};
pub use pwm::{Edge, EdgeMonitor, PwmMeasurement, WaitState};
pub use spi::{BusTiming, Direction, SpiMaster, SpiTransaction};

/// Everything here is terminal for the running scenario; the bench prefers
/// fail-fast precision over recovery.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("timed out after {timeout_ns} ns waiting for {edge:?} edge")]
    Timeout { edge: Edge, timeout_ns: u64 },
    #[error("{signal}: expected {expected:#04x}, got {actual:#04x}")]
    AssertionMismatch {
        signal: String,
        expected: u8,
        actual: u8,
    },
}

/// Compare an observed output word against the register-effect model,
/// reporting both values on mismatch.
pub fn check_output(signal: &str, expected: u8, actual: u8) -> Result<(), Error> {
    if expected == actual {
        Ok(())
    } else {
        Err(Error::AssertionMismatch {
            signal: signal.to_string(),
            expected,
            actual,
        })
    }
}
