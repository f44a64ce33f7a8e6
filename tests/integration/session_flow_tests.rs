//! Firmware output → serial chunks → session file → oscillation estimate.
//!
//! A spring bouncing under the sensor is simulated by scripting the fake
//! bus with a 1 s sine around 300 mm.  The console output is then pushed
//! through the host-side pipeline exactly as a bench PC would see it.

use std::f64::consts::PI;

use tofstream::adapters::range_sensor::TofAdapter;
use tofstream::analysis::{
    BlockAverage, CivilTime, CollectStatus, LineAssembler, RollingAverage, SessionCollector,
    SessionHeader, SessionRecord, analyze, count_half_oscillations, fit_damped_oscillation,
    session_file_name,
};
use tofstream::app::service::StreamService;
use tofstream::config::StreamConfig;
use tofstream::sensors::vl53l0x::Vl53l0x;

use crate::mock_hw::{FakeVl53l0xBus, NoopDelay, RecordingConsole, StepClock};

const SPRING_MASS_KG: f64 = 0.609;

/// 300 ± 50 mm with a 1 s period, one value per 10 ms tick.
fn bouncing_spring(ticks: u32) -> Vec<u16> {
    (0..ticks)
        .map(|i| {
            let t = f64::from(i) / 100.0;
            (300.0 + 50.0 * (2.0 * PI * (t - 0.255)).sin()).round() as u16
        })
        .collect()
}

fn stream_console_output(ranges: Vec<u16>) -> String {
    let n = ranges.len();
    let bus = FakeVl53l0xBus::healthy();
    bus.script_ranges(ranges);

    let config = StreamConfig::default();
    let tof = Vl53l0x::new(bus, NoopDelay::default());
    let mut svc = StreamService::new(TofAdapter::new(tof, &config), &config);
    let mut console = RecordingConsole::default();
    let clock = StepClock::new(0, 10);

    svc.start(&mut console).unwrap();
    for _ in 0..n {
        svc.poll_once(&clock, &mut console).unwrap();
    }
    console.text
}

#[test]
fn bench_pipeline_estimates_spring_constant() {
    let text = stream_console_output(bouncing_spring(300));

    // serial reads split lines at arbitrary points
    let mut assembler = LineAssembler::new();
    let samples: Vec<_> = text
        .as_bytes()
        .chunks(7)
        .flat_map(|chunk| assembler.push_samples(chunk))
        .collect();
    assert_eq!(samples.len(), 300);

    let mut record = SessionRecord::new(SessionHeader {
        spring_mass_kg: SPRING_MASS_KG,
        duration_secs: 3.0,
        last_averaged_distance_mm: Some(300.0),
    });
    record.samples = samples;

    let reloaded = SessionRecord::parse(&record.render()).unwrap();
    assert_eq!(reloaded.samples.len(), 300);

    let report = analyze(
        &reloaded.samples,
        reloaded.header.last_averaged_distance_mm,
        reloaded.header.spring_mass_kg,
    )
    .unwrap();

    assert_eq!(report.crossings, 3);
    let period = report.period_secs.unwrap();
    assert!((period - 1.0).abs() < 1e-6, "period {period}");
    let k = report.spring_constant_n_per_m.unwrap();
    assert!((k - 4.0 * PI * PI * SPRING_MASS_KG).abs() < 1e-3, "k {k}");

    assert_eq!(count_half_oscillations(&reloaded.samples), 6);
}

#[test]
fn far_readings_never_reach_the_session() {
    let mut ranges = bouncing_spring(100);
    ranges.extend([600, 8190, 65_535]);
    let text = stream_console_output(ranges);

    let mut assembler = LineAssembler::new();
    let samples = assembler.push_samples(text.as_bytes());
    assert_eq!(samples.len(), 100);
    assert!(samples.iter().all(|s| s.distance_mm < 600.0));
}

#[test]
fn at_rest_average_becomes_equilibrium() {
    let text = stream_console_output(vec![312; 120]);

    let mut assembler = LineAssembler::new();
    let mut rolling: RollingAverage = RollingAverage::new();
    let mut block: BlockAverage = BlockAverage::new();
    let mut block_reports = 0;
    for s in assembler.push_samples(text.as_bytes()) {
        rolling.push(s.distance_mm);
        if block.push(s.distance_mm).is_some() {
            block_reports += 1;
        }
    }

    assert_eq!(rolling.last(), Some(312.0));
    assert_eq!(block_reports, 6);
}

#[test]
fn timed_collection_then_damped_fit() {
    let text = stream_console_output(bouncing_spring(300));
    let header = SessionHeader {
        spring_mass_kg: SPRING_MASS_KG,
        duration_secs: 2.0,
        last_averaged_distance_mm: Some(300.0),
    };

    // one 13-byte line per chunk, one chunk per 10 ms of host time
    let mut collector = SessionCollector::new(header, 0.0);
    let mut status = CollectStatus::Collecting { remaining_secs: 2.0 };
    for (i, chunk) in text.as_bytes().chunks(13).enumerate() {
        status = collector.push(chunk, i as f64 / 100.0);
    }
    assert_eq!(status, CollectStatus::Done);
    assert_eq!(collector.block_averages().len(), 10);

    let record = collector.finish();
    assert_eq!(record.samples.len(), 200);

    let name = session_file_name(&CivilTime::from_unix_secs(1_700_000_000));
    assert_eq!(name, "spring_20231114_221320.txt");

    let report = analyze(&record.samples, Some(300.0), SPRING_MASS_KG).unwrap();
    let fit = fit_damped_oscillation(&record.samples, 300.0, report.period_secs).unwrap();
    assert!((fit.period_secs() - 1.0).abs() < 0.01, "period {}", fit.period_secs());
    assert!((fit.amplitude_mm - 50.0).abs() < 1.0, "A {}", fit.amplitude_mm);
    assert!(fit.damping_per_s.abs() < 0.02, "α {}", fit.damping_per_s);
    assert!(fit.rms_residual_mm < 1.0);

    let kin = fit.kinematics(&record.samples).unwrap();
    assert_eq!(kin.speed_mm_s.len(), 200);
}
