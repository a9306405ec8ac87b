use anyhow::{anyhow, bail, Result};
use serde::Serialize;
use spibench_proto::pwm::DEFAULT_TIMEOUT_NS;
use spibench_proto::{check_output, BusTiming, Outputs, SpiTransaction};
use spibench_sim::dut::{REG_DUTY, REG_PORT0, REG_PORT1, REG_PRESCALER};
use spibench_sim::{SimCommand, SimEvent, SimService};

const PWM_BIT: u8 = 0;

#[derive(Debug, Serialize)]
struct StepReport {
    name: String,
    ok: bool,
    detail: String,
}

#[derive(Debug, Serialize)]
struct BenchReport {
    passed: usize,
    failed: usize,
    steps: Vec<StepReport>,
}

fn main() -> Result<()> {
    env_logger::init();

    let service = SimService::start(Default::default(), BusTiming::default());
    let mut steps: Vec<StepReport> = Vec::new();

    service
        .send(SimCommand::Reset { cycles: 5 })
        .map_err(anyhow::Error::msg)?;
    match recv(&service)? {
        SimEvent::ResetDone => {}
        other => bail!("unexpected event {other:?}"),
    }

    // Direct register effects
    step(&mut steps, "write 0x00 reaches output word 1", || {
        write_reg(&service, REG_PORT0, 0xF0)?;
        let out = read_outputs(&service)?;
        check_output("port0", 0xF0, out.port0)?;
        Ok(format!("port0={:#04x}", out.port0))
    });

    step(&mut steps, "write 0x01 reaches output word 2", || {
        write_reg(&service, REG_PORT1, 0xCC)?;
        let out = read_outputs(&service)?;
        check_output("port1", 0xCC, out.port1)?;
        Ok(format!("port1={:#04x}", out.port1))
    });

    step(&mut steps, "invalid address write is ignored", || {
        write_reg(&service, 0x30, 0xAA)?;
        let out = read_outputs(&service)?;
        check_output("port0", 0xF0, out.port0)?;
        check_output("port1", 0xCC, out.port1)?;
        Ok("outputs unchanged".to_string())
    });

    step(&mut steps, "read frames leave outputs unchanged", || {
        read_reg(&service, 0x30, 0xBE)?;
        read_reg(&service, 0x41, 0xEF)?;
        let out = read_outputs(&service)?;
        check_output("port0", 0xF0, out.port0)?;
        Ok("outputs unchanged".to_string())
    });

    // PWM frequency at prescaler select 1
    step(&mut steps, "pwm frequency at prescaler 1", || {
        write_reg(&service, REG_PORT0, 0x01)?;
        write_reg(&service, REG_PRESCALER, 0x01)?;
        write_reg(&service, REG_DUTY, 0x80)?;
        tick(&service, 1000)?;
        service
            .send(SimCommand::MeasureFrequency {
                bit: PWM_BIT,
                timeout_ns: DEFAULT_TIMEOUT_NS,
            })
            .map_err(anyhow::Error::msg)?;
        match recv(&service)? {
            SimEvent::Frequency(f) if (2970.0..3030.0).contains(&f) => Ok(format!("{f:.1} Hz")),
            SimEvent::Frequency(f) => bail!("frequency {f:.1} Hz outside 2970-3030 Hz"),
            SimEvent::Error(e) => bail!(e),
            other => bail!("unexpected event {other:?}"),
        }
    });

    // Duty sweep including the no-edge extremes
    for (value, expected) in [(0x00u8, 0.0f64), (0x80, 50.0), (0xFF, 100.0)] {
        step(
            &mut steps,
            &format!("pwm duty at register {value:#04x}"),
            || {
                write_reg(&service, REG_DUTY, value)?;
                tick(&service, 5000)?;
                service
                    .send(SimCommand::MeasureDuty {
                        bit: PWM_BIT,
                        duty_reg: value,
                        timeout_ns: DEFAULT_TIMEOUT_NS,
                    })
                    .map_err(anyhow::Error::msg)?;
                match recv(&service)? {
                    SimEvent::Duty(d) if (d - expected).abs() <= 5.0 => Ok(format!("{d:.1}%")),
                    SimEvent::Duty(d) => bail!("duty {d:.1}% not within 5 of {expected}%"),
                    SimEvent::Error(e) => bail!(e),
                    other => bail!("unexpected event {other:?}"),
                }
            },
        );
    }

    let failed = steps.iter().filter(|s| !s.ok).count();
    let report = BenchReport {
        passed: steps.len() - failed,
        failed,
        steps,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    if report.failed > 0 {
        let trace = service.trace();
        let text = trace.lock().to_text(true);
        let tail: Vec<&str> = text.lines().rev().take(40).collect();
        for line in tail.into_iter().rev() {
            log::error!("trace: {line}");
        }
        service.close();
        bail!("{} step(s) failed", report.failed);
    }

    service.close();
    Ok(())
}

fn step<F>(steps: &mut Vec<StepReport>, name: &str, f: F)
where
    F: FnOnce() -> Result<String>,
{
    match f() {
        Ok(detail) => {
            log::info!("{name}: ok ({detail})");
            steps.push(StepReport {
                name: name.to_string(),
                ok: true,
                detail,
            });
        }
        Err(e) => {
            log::error!("{name}: {e}");
            steps.push(StepReport {
                name: name.to_string(),
                ok: false,
                detail: e.to_string(),
            });
        }
    }
}

fn recv(service: &SimService) -> Result<SimEvent> {
    service
        .events()
        .recv()
        .map_err(|e| anyhow!("simulation stopped: {e}"))
}

fn send_transaction(service: &SimService, txn: SpiTransaction) -> Result<()> {
    log::info!(
        "{:?} frame {}",
        txn.direction(),
        hex::encode(txn.to_bytes())
    );
    service
        .send(SimCommand::Transaction(txn))
        .map_err(anyhow::Error::msg)?;
    match recv(service)? {
        SimEvent::TransactionDone(_) => Ok(()),
        SimEvent::Error(e) => bail!(e),
        other => bail!("unexpected event {other:?}"),
    }
}

fn write_reg(service: &SimService, addr: u8, data: u8) -> Result<()> {
    send_transaction(service, SpiTransaction::write(addr, data)?)
}

fn read_reg(service: &SimService, addr: u8, data: u8) -> Result<()> {
    send_transaction(service, SpiTransaction::read(addr, data)?)
}

fn read_outputs(service: &SimService) -> Result<Outputs> {
    service
        .send(SimCommand::ReadOutputs)
        .map_err(anyhow::Error::msg)?;
    match recv(service)? {
        SimEvent::Outputs(out) => Ok(out),
        other => bail!("unexpected event {other:?}"),
    }
}

fn tick(service: &SimService, cycles: u64) -> Result<()> {
    service
        .send(SimCommand::Tick(cycles))
        .map_err(anyhow::Error::msg)?;
    match recv(service)? {
        SimEvent::TickDone => Ok(()),
        other => bail!("unexpected event {other:?}"),
    }
}
