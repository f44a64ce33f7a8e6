//! VL53L0X driver against the fake register file.

use tofstream::sensors::vl53l0x::{OUT_OF_RANGE_MM, Vl53l0x, Vl53l0xError, timing};

use crate::mock_hw::{FakeVl53l0xBus, INTERRUPT_STATUS_REG, MODEL_ID_REG, NoopDelay, SYSRANGE_START_REG};

fn ready_driver(bus: &FakeVl53l0xBus) -> Vl53l0x<FakeVl53l0xBus, NoopDelay> {
    let mut tof = Vl53l0x::new(bus.clone(), NoopDelay::default());
    tof.set_timeout(5);
    tof.init(true).expect("init against healthy fake");
    tof
}

#[test]
fn init_sets_2v8_pad_and_final_sequence() {
    let bus = FakeVl53l0xBus::healthy();
    let _tof = ready_driver(&bus);

    assert_eq!(bus.reg(0x89) & 0x01, 0x01, "2V8 I/O mode");
    assert_eq!(bus.reg(0x01), 0xE8, "sequence config restored after calibration");
    assert_eq!(bus.reg(0x0A), 0x04, "new-sample-ready interrupt");
}

#[test]
fn init_selects_reference_spads() {
    let bus = FakeVl53l0xBus::healthy();
    // every SPAD reported good
    for r in 0xB0..=0xB5 {
        bus.force(r, 0xFF);
    }
    let _tof = ready_driver(&bus);

    // 5 aperture SPADs: first 12 skipped, next 5 kept
    let map: Vec<u8> = (0xB0..=0xB5).map(|r| bus.reg(r)).collect();
    assert_eq!(map, vec![0x00, 0xF0, 0x01, 0x00, 0x00, 0x00]);
}

#[test]
fn wrong_model_id_is_invalid_device() {
    let bus = FakeVl53l0xBus::healthy();
    bus.force(MODEL_ID_REG, 0xAA);
    let mut tof = Vl53l0x::new(bus, NoopDelay::default());
    assert_eq!(tof.init(true), Err(Vl53l0xError::InvalidDevice(0xAA)));
}

#[test]
fn unplugged_sensor_is_bus_error() {
    let bus = FakeVl53l0xBus::healthy();
    bus.unplug();
    let mut tof = Vl53l0x::new(bus, NoopDelay::default());
    assert!(matches!(tof.init(true), Err(Vl53l0xError::I2c(_))));
}

#[test]
fn wrong_address_is_bus_error() {
    let bus = FakeVl53l0xBus::healthy();
    let mut tof = Vl53l0x::new(bus, NoopDelay::default()).with_address(0x30);
    assert!(matches!(tof.init(true), Err(Vl53l0xError::I2c(_))));
}

#[test]
fn continuous_read_returns_range_and_clears_interrupt() {
    let bus = FakeVl53l0xBus::healthy();
    let mut tof = ready_driver(&bus);
    tof.start_continuous(0).unwrap();
    bus.set_range(457);

    assert_eq!(tof.read_range_continuous_mm(), Ok(457));
    assert!(!tof.timeout_occurred());
    assert_eq!(bus.reg(0x0B), 0x01);
}

#[test]
fn no_ready_bit_times_out_to_sentinel() {
    let bus = FakeVl53l0xBus::healthy();
    let delay = NoopDelay::default();
    let waited = delay.elapsed_ms.clone();
    let mut tof = Vl53l0x::new(bus.clone(), delay);
    tof.set_timeout(5);
    tof.init(true).unwrap();
    tof.start_continuous(0).unwrap();

    bus.force(INTERRUPT_STATUS_REG, 0x00);
    let before = waited.get();
    assert_eq!(tof.read_range_continuous_mm(), Ok(OUT_OF_RANGE_MM));
    assert!(tof.timeout_occurred());
    assert!(!tof.timeout_occurred(), "flag clears on read");
    assert_eq!(waited.get() - before, 5);
}

#[test]
fn timed_continuous_mode_scales_period_by_oscillator() {
    let bus = FakeVl53l0xBus::healthy();
    let mut tof = ready_driver(&bus);
    bus.force(0xF8, 0x00);
    bus.force(0xF9, 0x10);

    tof.start_continuous(100).unwrap();

    let period = u32::from_be_bytes([bus.reg(0x04), bus.reg(0x05), bus.reg(0x06), bus.reg(0x07)]);
    assert_eq!(period, 100 * 0x10);
    assert_eq!(bus.reg(0x00), 0x04);
}

#[test]
fn timing_budget_round_trips_through_registers() {
    let bus = FakeVl53l0xBus::healthy();
    let mut tof = ready_driver(&bus);

    tof.set_measurement_timing_budget(50_000).unwrap();
    let got = tof.measurement_timing_budget_us().unwrap();
    // one final-range MCLK of rounding either way
    assert!(got.abs_diff(50_000) < 100, "budget {got}");

    assert_eq!(
        tof.set_measurement_timing_budget(timing::MIN_TIMING_BUDGET_US - 1),
        Err(Vl53l0xError::InvalidArgument)
    );
}

#[test]
fn signal_rate_limit_is_q9_7() {
    let bus = FakeVl53l0xBus::healthy();
    let mut tof = ready_driver(&bus);
    tof.set_signal_rate_limit(0.5).unwrap();
    assert_eq!(u16::from_be_bytes([bus.reg(0x44), bus.reg(0x45)]), 64);
    assert_eq!(tof.set_signal_rate_limit(600.0), Err(Vl53l0xError::InvalidArgument));
}

#[test]
fn huge_period_saturates_instead_of_wrapping() {
    let bus = FakeVl53l0xBus::healthy();
    let mut tof = ready_driver(&bus);
    bus.force(0xF8, 0x00);
    bus.force(0xF9, 0x10);

    tof.start_continuous(u32::MAX).unwrap();

    let period = u32::from_be_bytes([bus.reg(0x04), bus.reg(0x05), bus.reg(0x06), bus.reg(0x07)]);
    assert_eq!(period, u32::MAX);
}

#[test]
fn stop_continuous_returns_to_single_shot_and_clears_stop_variable() {
    let bus = FakeVl53l0xBus::healthy();
    bus.force(0x91, 0x3C);
    let mut tof = ready_driver(&bus);

    tof.start_continuous(0).unwrap();
    assert_eq!(bus.reg(0x91), 0x3C, "stop variable restored for ranging");
    assert_eq!(bus.reg(SYSRANGE_START_REG), 0x02);

    let single_shots = bus.count_writes(SYSRANGE_START_REG, 0x01);
    tof.stop_continuous().unwrap();

    assert_eq!(bus.reg(0x91), 0x00);
    assert!(bus.count_writes(SYSRANGE_START_REG, 0x01) > single_shots);
    assert_eq!(bus.count_writes(0x91, 0x00), 1);
}

#[test]
fn release_hands_back_the_same_bus() {
    let bus = FakeVl53l0xBus::healthy();
    let tof = ready_driver(&bus);
    let (released, _delay) = tof.release();

    // a fresh driver on the released bus sees the state the first one left
    let mut again = Vl53l0x::new(released, NoopDelay::default());
    again.set_timeout(5);
    again.start_continuous(0).unwrap();
    bus.set_range(321);
    assert_eq!(again.read_range_continuous_mm(), Ok(321));
}
