//! StreamService → TofAdapter → VL53L0X driver → fake bus.
//!
//! The full firmware stack minus the ESP-IDF drivers: the real driver runs
//! its bring-up against the fake register file and the service prints to a
//! recording console.

use tofstream::adapters::range_sensor::TofAdapter;
use tofstream::app::service::{INIT_FAILURE_MESSAGE, StreamService, StreamState};
use tofstream::config::StreamConfig;
use tofstream::error::Error;
use tofstream::sensors::vl53l0x::Vl53l0x;

use crate::mock_hw::{
    FakeVl53l0xBus, INTERRUPT_STATUS_REG, MODEL_ID_REG, NoopDelay, RecordingConsole,
    SYSRANGE_START_REG, StepClock,
};

type Service = StreamService<TofAdapter<FakeVl53l0xBus, NoopDelay>>;

fn make_service(bus: &FakeVl53l0xBus) -> Service {
    let config = StreamConfig::default();
    let tof = Vl53l0x::new(bus.clone(), NoopDelay::default());
    StreamService::new(TofAdapter::new(tof, &config), &config)
}

// ── Bring-up ──────────────────────────────────────────────────

#[test]
fn healthy_sensor_starts_running_in_back_to_back_mode() {
    let bus = FakeVl53l0xBus::healthy();
    let mut svc = make_service(&bus);
    let mut console = RecordingConsole::default();

    svc.start(&mut console).expect("bring-up succeeds");

    assert_eq!(svc.state(), StreamState::Running);
    assert_eq!(bus.count_writes(SYSRANGE_START_REG, 0x02), 1, "continuous mode once");
    assert!(console.text.is_empty(), "nothing printed on success");
}

#[test]
fn timeout_is_configured_from_config() {
    let bus = FakeVl53l0xBus::healthy();
    let mut svc = make_service(&bus);
    svc.start(&mut RecordingConsole::default()).unwrap();

    let tof = svc.into_sensor().into_inner();
    assert_eq!(tof.timeout(), StreamConfig::default().sensor_timeout_ms);
}

#[test]
fn wrong_model_id_reports_once_and_halts() {
    let bus = FakeVl53l0xBus::healthy();
    bus.force(MODEL_ID_REG, 0x00);
    let mut svc = make_service(&bus);
    let mut console = RecordingConsole::default();

    let err = svc.run(&StepClock::new(0, 10), &mut console).unwrap_err();

    assert_eq!(err, Error::SensorInit);
    assert_eq!(svc.state(), StreamState::Halted);
    assert_eq!(console.text, INIT_FAILURE_MESSAGE);
    assert_eq!(bus.range_reads(), 0, "loop never ran");
    assert_eq!(bus.count_writes(SYSRANGE_START_REG, 0x02), 0);
}

#[test]
fn missing_sensor_reports_once_and_halts() {
    let bus = FakeVl53l0xBus::healthy();
    bus.unplug();
    let mut svc = make_service(&bus);
    let mut console = RecordingConsole::default();

    assert_eq!(svc.start(&mut console), Err(Error::SensorInit));
    assert_eq!(svc.poll_once(&StepClock::new(0, 1), &mut console), Err(Error::InvalidState));
    assert_eq!(console.lines(), vec![INIT_FAILURE_MESSAGE.trim_end()]);
}

// ── Poll loop ─────────────────────────────────────────────────

#[test]
fn readings_below_threshold_are_printed_with_timestamps() {
    let bus = FakeVl53l0xBus::healthy();
    bus.script_ranges([450, 650, 600, 599, 12]);
    let mut svc = make_service(&bus);
    let mut console = RecordingConsole::default();
    svc.start(&mut console).unwrap();

    let clock = StepClock::new(1500, 250);
    for _ in 0..5 {
        svc.poll_once(&clock, &mut console).unwrap();
    }

    assert_eq!(
        console.lines(),
        vec!["1.500 450.00", "2.250 599.00", "2.500 12.00"]
    );
    assert_eq!(svc.lines_emitted(), 3);
}

#[test]
fn read_timeout_yields_sentinel_and_is_filtered() {
    let bus = FakeVl53l0xBus::healthy();
    let mut svc = make_service(&bus);
    let mut console = RecordingConsole::default();
    svc.start(&mut console).unwrap();

    bus.force(INTERRUPT_STATUS_REG, 0x00);
    let out = svc.poll_once(&StepClock::new(0, 1), &mut console).unwrap();

    assert_eq!(out, None);
    assert!(console.text.is_empty());
    assert_eq!(svc.sensor().timeouts(), 1);
    assert_eq!(bus.range_reads(), 0, "range register not read after timeout");
}

#[test]
fn bus_failure_mid_stream_is_filtered_not_fatal() {
    let bus = FakeVl53l0xBus::healthy();
    let mut svc = make_service(&bus);
    let mut console = RecordingConsole::default();
    svc.start(&mut console).unwrap();

    bus.unplug();
    assert_eq!(svc.poll_once(&StepClock::new(0, 1), &mut console), Ok(None));
    assert_eq!(svc.state(), StreamState::Running);
}

#[test]
fn console_failure_ends_run() {
    let bus = FakeVl53l0xBus::healthy();
    bus.script_ranges([100, 200, 300]);
    let mut svc = make_service(&bus);
    let mut console = RecordingConsole {
        fail_after: Some(2),
        ..Default::default()
    };

    let err = svc.run(&StepClock::new(0, 1), &mut console).unwrap_err();

    assert_eq!(err, Error::Console);
    assert_eq!(console.lines(), vec!["0.000 100.00", "0.001 200.00"]);
}
