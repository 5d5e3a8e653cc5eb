//! End-to-end tests: MemoryGraph -> registry -> processors -> meters

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use jackmeter_core::{Event, MeterConfig, MeterEngine, ProcessorKind};
use jackmeter_dsp::display;
use jackmeter_platform::{CallbackStatus, MemoryGraph};

fn sine(frames: usize, cycles: f32, amplitude: f32) -> Vec<f32> {
    (0..frames)
        .map(|n| amplitude * (2.0 * std::f32::consts::PI * cycles * n as f32 / frames as f32).sin())
        .collect()
}

fn two_sources(frames: u32) -> MemoryGraph {
    let graph = MemoryGraph::new("jackmeter", 48000, frames);
    graph.add_source("system:capture_1");
    graph.add_source("system:capture_2");
    graph
}

#[test]
fn test_peak_levels_through_the_graph() {
    let graph = two_sources(256);
    graph.set_signal("system:capture_1", vec![0.25; 256]);
    graph.set_signal("system:capture_2", vec![0.0; 256]);

    let config = MeterConfig {
        processor: ProcessorKind::Peak,
        ..Default::default()
    };
    let mut engine = MeterEngine::new(Box::new(graph.clone()), config).unwrap();
    engine.start().unwrap();

    graph.run_period();
    graph.set_signal("system:capture_1", vec![0.5; 256]);
    graph.run_period();
    graph.set_signal("system:capture_1", vec![0.125; 256]);
    graph.run_period();

    let loud = engine.meters()[0].as_peak().unwrap().state();
    assert!(loud.signal_detected);
    assert_eq!(loud.latest_peak, 0.125);
    assert_eq!(loud.max_peak, 0.5);
    assert_eq!(loud.min_peak, 0.125);

    let silent = engine.meters()[1].as_peak().unwrap();
    assert!(!silent.signal_detected());
    assert_eq!(silent.latest_peak(), 0.0);
}

#[test]
fn test_spectrum_snapshot_through_the_graph() {
    let graph = two_sources(1024);
    // 32 cycles per period at 48 kHz is bin 32, i.e. 1.5 kHz
    graph.set_signal("system:capture_1", sine(1024, 32.0, 1.0));

    let mut engine = MeterEngine::new(Box::new(graph.clone()), MeterConfig::default()).unwrap();
    let meter = engine.meters()[0].as_spectrum().unwrap().clone();
    assert!(meter.spectrum().is_err());

    engine.start().unwrap();
    graph.run_period();

    let snapshot = meter.spectrum().unwrap();
    assert_eq!(snapshot.output.len(), 1024);
    assert_eq!(snapshot.sample_rate, 48000);
    assert_eq!((snapshot.start_index, snapshot.bin_count), (1, 426));

    // Imaginary part of bin 32 lives at out[N - 32]; a sine of amplitude 1 gives -N/2
    assert!((snapshot.output[1024 - 32] + 512.0).abs() < 1e-2);
    assert!(snapshot.output[32].abs() < 1e-2);

    let row = display::render_row(&snapshot, 100, Default::default());
    assert_eq!(row.chars().count(), 100);
}

#[test]
fn test_failing_period_reports_event() {
    let graph = two_sources(64);
    graph.set_sample_rate(0);

    let mut engine = MeterEngine::new(Box::new(graph.clone()), MeterConfig::default()).unwrap();
    engine.start().unwrap();

    assert_eq!(graph.run_period(), Some(CallbackStatus::Failed));

    let events = engine.poll_events();
    assert!(events.contains(&Event::Activated));
    match events.iter().find(|e| e.is_fatal()) {
        Some(Event::PeriodFailed { probe, message }) => {
            assert_eq!(probe, "system:capture_1");
            assert!(message.contains('0'));
        }
        other => panic!("expected PeriodFailed, got {:?}", other),
    }
    assert!(engine.meters()[1].as_spectrum().unwrap().spectrum().is_err());
}

#[test]
fn test_connect_failure_leaves_other_probes_running() {
    let graph = two_sources(128);
    graph.refuse_connection("system:capture_1");
    graph.set_signal("system:capture_1", vec![0.9; 128]);
    graph.set_signal("system:capture_2", vec![0.3; 128]);

    let config = MeterConfig {
        processor: ProcessorKind::Peak,
        ..Default::default()
    };
    let mut engine = MeterEngine::new(Box::new(graph.clone()), config).unwrap();
    assert_eq!(engine.start().unwrap(), 1);
    assert!(!engine.links()[0].is_connected());
    assert!(engine.links()[1].is_connected());

    assert_eq!(graph.run_period(), Some(CallbackStatus::Continue));
    // Unconnected sink reads silence
    assert!(!engine.meters()[0].signal_detected());
    assert_eq!(engine.meters()[1].as_peak().unwrap().latest_peak(), 0.3);

    let failures: Vec<Event> = engine
        .poll_events()
        .into_iter()
        .filter(|e| matches!(e, Event::ConnectFailed { .. }))
        .collect();
    assert_eq!(failures.len(), 1);
}

#[test]
fn test_teardown_on_drop() {
    let graph = two_sources(64);
    {
        let mut engine = MeterEngine::new(Box::new(graph.clone()), MeterConfig::default()).unwrap();
        engine.start().unwrap();
        assert_eq!(graph.links().len(), 2);
        assert_eq!(graph.sinks(), vec!["jackmeter:in_0", "jackmeter:in_1"]);
    }
    assert!(graph.links().is_empty());
    assert!(graph.sinks().is_empty());
    assert!(graph.run_period().is_none());
}

#[test]
fn test_concurrent_reads_see_whole_snapshots() {
    let graph = two_sources(512);
    let mut engine = MeterEngine::new(Box::new(graph.clone()), MeterConfig::default()).unwrap();
    engine.start().unwrap();
    let meters = engine.meters().to_vec();

    let done = Arc::new(AtomicBool::new(false));
    let driver = {
        let graph = graph.clone();
        let done = done.clone();
        thread::spawn(move || {
            // Alternate period sizes so every snapshot has a distinct shape
            for i in 0..400u32 {
                let frames = if i % 2 == 0 { 512 } else { 256 };
                graph.set_buffer_size(frames);
                graph.set_signal("system:capture_1", sine(frames as usize, 4.0, 0.5));
                assert_eq!(graph.run_period(), Some(CallbackStatus::Continue));
            }
            done.store(true, Ordering::SeqCst);
        })
    };

    let mut reads = 0;
    while !done.load(Ordering::SeqCst) || reads == 0 {
        for meter in &meters {
            let Ok(snapshot) = meter.as_spectrum().unwrap().spectrum() else {
                continue;
            };
            let frames = snapshot.input.len();
            assert!(frames == 512 || frames == 256);
            assert_eq!(snapshot.output.len(), frames);
            let (start, bins) = jackmeter_dsp::spectrum_window(frames, 48000);
            assert_eq!((snapshot.start_index, snapshot.bin_count), (start, bins));
            reads += 1;
        }
    }

    driver.join().unwrap();
    assert!(reads > 0);
    engine.stop().unwrap();
}

#[test]
fn test_concurrent_reads_never_see_torn_peaks() {
    let graph = two_sources(128);
    let config = MeterConfig {
        processor: ProcessorKind::Peak,
        ..Default::default()
    };
    let mut engine = MeterEngine::new(Box::new(graph.clone()), config).unwrap();
    engine.start().unwrap();
    let meters = engine.meters().to_vec();
    let allowed = [0.0_f32, 0.25, 0.75];

    let done = Arc::new(AtomicBool::new(false));
    let driver = {
        let graph = graph.clone();
        let done = done.clone();
        thread::spawn(move || {
            for i in 0..2000 {
                let (a, b) = if i % 2 == 0 { (0.25, 0.75) } else { (0.75, 0.25) };
                graph.set_signal("system:capture_1", vec![a; 128]);
                graph.set_signal("system:capture_2", vec![-b; 128]);
                graph.run_period();
            }
            done.store(true, Ordering::SeqCst);
        })
    };

    while !done.load(Ordering::SeqCst) {
        for meter in &meters {
            let state = meter.as_peak().unwrap().state();
            assert!(allowed.contains(&state.latest_peak), "torn value {}", state.latest_peak);
            assert!(allowed.contains(&state.min_peak));
            assert!(allowed.contains(&state.max_peak));
        }
    }
    driver.join().unwrap();

    for meter in &meters {
        let state = meter.as_peak().unwrap().state();
        assert!(state.signal_detected);
        assert_eq!(state.max_peak, 0.75);
        assert!(state.min_peak <= state.latest_peak && state.latest_peak <= state.max_peak);
    }
}
