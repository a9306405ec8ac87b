//! End-to-end bench scenarios against the behavioral device model: register
//! writes, invalid addresses, and PWM frequency/duty measured from edges.

use spibench_proto::pwm::{
    await_rising_edge, measure_duty, measure_frequency, DEFAULT_TIMEOUT_NS,
};
use spibench_proto::{Bus, BusTiming, Error, SpiMaster, SpiTransaction};
use spibench_sim::dut::{REG_DUTY, REG_PORT0, REG_PORT1, REG_PRESCALER};
use spibench_sim::{SimConfig, Simulation};

const PWM_BIT: u8 = 0;

fn bench() -> (Simulation, SpiMaster) {
    let mut sim = Simulation::new(SimConfig::default());
    sim.reset(5);
    (sim, SpiMaster::new(BusTiming::default()))
}

fn write(sim: &mut Simulation, master: &SpiMaster, addr: u8, data: u8) {
    let txn = SpiTransaction::write(addr, data).unwrap();
    master.send(sim, &txn).unwrap();
}

fn read(sim: &mut Simulation, master: &SpiMaster, addr: u8, data: u8) {
    let txn = SpiTransaction::read(addr, data).unwrap();
    master.send(sim, &txn).unwrap();
}

#[test]
fn register_writes_reach_the_output_words() {
    let (mut sim, master) = bench();

    write(&mut sim, &master, REG_PORT0, 0xF0);
    assert_eq!(sim.outputs().port0, 0xF0);
    sim.tick(1000);
    assert_eq!(sim.outputs().port0, 0xF0);

    write(&mut sim, &master, REG_PORT1, 0xCC);
    assert_eq!(sim.outputs().port1, 0xCC);

    // Invalid address: accepted on the wire, no effect on state.
    write(&mut sim, &master, 0x30, 0xAA);
    sim.tick(100);
    assert_eq!(sim.outputs().port0, 0xF0);
    assert_eq!(sim.outputs().port1, 0xCC);

    // Read frames, valid or not, leave the outputs alone.
    read(&mut sim, &master, 0x30, 0xBE);
    assert_eq!(sim.outputs().port0, 0xF0);
    read(&mut sim, &master, 0x41, 0xEF);
    assert_eq!(sim.outputs().port0, 0xF0);
    assert_eq!(sim.outputs().port1, 0xCC);
}

#[test]
fn repeated_write_is_idempotent() {
    let (mut sim, master) = bench();
    write(&mut sim, &master, REG_PORT0, 0x5A);
    let once = sim.outputs();
    write(&mut sim, &master, REG_PORT0, 0x5A);
    assert_eq!(sim.outputs(), once);
}

#[test]
fn disabled_device_ignores_transactions() {
    let (mut sim, master) = bench();
    sim.set_enable(false);
    write(&mut sim, &master, REG_PORT0, 0x77);
    assert_eq!(sim.outputs().port0, 0x00);

    sim.set_enable(true);
    write(&mut sim, &master, REG_PORT0, 0x77);
    assert_eq!(sim.outputs().port0, 0x77);
}

#[test]
fn pwm_frequency_matches_prescaler_setting() {
    let (mut sim, master) = bench();
    write(&mut sim, &master, REG_PORT0, 0x01);
    write(&mut sim, &master, REG_PRESCALER, 0x01);
    write(&mut sim, &master, REG_DUTY, 0x80);
    sim.tick(1000);

    let freq = measure_frequency(&mut sim, PWM_BIT, DEFAULT_TIMEOUT_NS).unwrap();
    assert!(
        (2970.0..3030.0).contains(&freq),
        "frequency out of range: {freq:.2} Hz"
    );
}

#[test]
fn pwm_duty_tracks_the_register() {
    let (mut sim, master) = bench();
    write(&mut sim, &master, REG_PORT0, 0x01);
    write(&mut sim, &master, REG_PRESCALER, 0x01);

    for (value, expected) in [(0x00u8, 0.0f64), (0x80, 50.0), (0xFF, 100.0)] {
        write(&mut sim, &master, REG_DUTY, value);
        sim.tick(5000);
        let duty = measure_duty(&mut sim, PWM_BIT, value, DEFAULT_TIMEOUT_NS).unwrap();
        assert!(
            (duty - expected).abs() <= 5.0,
            "duty reg {value:#04x}: expected ~{expected}%, got {duty:.1}%"
        );
    }
}

#[test]
fn pwm_duty_is_monotonic_in_the_register() {
    let (mut sim, master) = bench();
    write(&mut sim, &master, REG_PORT0, 0x01);
    write(&mut sim, &master, REG_PRESCALER, 0x01);

    let mut last = 0.0f64;
    for value in [0x20u8, 0x40, 0x80, 0xC0, 0xE0] {
        write(&mut sim, &master, REG_DUTY, value);
        sim.tick(5000);
        let duty = measure_duty(&mut sim, PWM_BIT, value, DEFAULT_TIMEOUT_NS).unwrap();
        assert!(
            last <= duty + 5.0,
            "duty fell from {last:.1}% to {duty:.1}% at reg {value:#04x}"
        );
        last = duty;
    }
}

#[test]
fn duty_register_extremes_pin_the_output() {
    let (mut sim, master) = bench();
    write(&mut sim, &master, REG_PORT0, 0x01);
    write(&mut sim, &master, REG_PRESCALER, 0x01);

    write(&mut sim, &master, REG_DUTY, 0x00);
    sim.tick(5000);
    assert_eq!(sim.outputs().port0 & 0x01, 0);

    write(&mut sim, &master, REG_DUTY, 0xFF);
    sim.tick(5000);
    assert_eq!(sim.outputs().port0 & 0x01, 1);
}

#[test]
fn edge_wait_times_out_on_a_flat_line() {
    let (mut sim, master) = bench();
    // PWM enabled but duty zero: bit 0 never rises.
    write(&mut sim, &master, REG_PORT0, 0x01);
    write(&mut sim, &master, REG_PRESCALER, 0x01);

    let err = await_rising_edge(&mut sim, PWM_BIT, 200_000).unwrap_err();
    assert!(matches!(err, Error::Timeout { .. }));
}
