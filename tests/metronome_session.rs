// Integration tests for metronome sessions driven like the host timer would

use mymusic_practice::config::TapTempoConfig;
use mymusic_practice::sequencer::CompletionReason;
use mymusic_practice::{
    AudioBackend, ClickKind, ClickSound, EngineConfig, MetronomeEngine, MetronomeSettings, Pulse,
    PulseEvent, RenderClock, SpeedTrainerSettings, TapTempo, create_notification_channel,
};
use ringbuf::traits::Consumer;
use tempfile::tempdir;

const SAMPLE_RATE: f64 = 48000.0;
const TICK_FRAMES: usize = 1200; // 25 ms

/// Drive the engine from the render clock for `seconds`, scheduling every
/// click on the backend. Returns all pulses and the rendered stereo audio.
fn run_session(
    engine: &mut MetronomeEngine,
    backend: &mut RenderClock,
    clicks: &ClickSound,
    seconds: f64,
) -> (Vec<PulseEvent>, Vec<f32>) {
    let mut events = Vec::new();
    let mut output = Vec::new();
    let mut chunk = vec![0.0f32; TICK_FRAMES * 2];
    let chunks = (seconds * SAMPLE_RATE / TICK_FRAMES as f64).round() as usize;

    for _ in 0..chunks {
        let now_ms = backend.now() * 1000.0;
        for event in engine.tick(now_ms) {
            clicks.schedule(backend, &event, 0.0);
            events.push(event);
        }
        backend.render(&mut chunk);
        output.extend_from_slice(&chunk);
    }
    (events, output)
}

fn energy(output: &[f32], from_seconds: f64, length_seconds: f64) -> f32 {
    let start = (from_seconds * SAMPLE_RATE) as usize * 2;
    let end = start + (length_seconds * SAMPLE_RATE) as usize * 2;
    output[start..end].iter().map(|s| s * s).sum()
}

fn click_beats(events: &[PulseEvent]) -> Vec<u32> {
    events
        .iter()
        .filter_map(|e| match e.pulse {
            Pulse::Click { beat, .. } => Some(beat),
            _ => None,
        })
        .collect()
}

#[test]
fn test_clicks_land_on_the_beat() {
    let mut engine = MetronomeEngine::default(); // 120 BPM
    let mut backend = RenderClock::new(SAMPLE_RATE).with_history();
    let clicks = ClickSound::new(SAMPLE_RATE as u32, 0.8);

    for event in engine.start(0.0) {
        clicks.schedule(&mut backend, &event, 0.0);
    }
    let (events, output) = run_session(&mut engine, &mut backend, &clicks, 2.0);

    assert_eq!(click_beats(&events), vec![1, 2, 3]);
    let starts: Vec<f64> = backend.history().iter().map(|e| e.start_time).collect();
    assert_eq!(starts, vec![0.0, 0.5, 1.0, 1.5]);
    assert!(backend.history().iter().all(|e| e.label == "click"));

    // Sound right after each beat, silence halfway between
    assert!(energy(&output, 0.5, 0.01) > 0.01);
    assert!(energy(&output, 1.0, 0.01) > 0.01);
    assert_eq!(energy(&output, 0.25, 0.05), 0.0);
}

#[test]
fn test_tap_tempo_retunes_a_running_metronome() {
    let mut engine = MetronomeEngine::new(MetronomeSettings {
        bpm: 90,
        ..Default::default()
    });
    let mut tap = TapTempo::new(&TapTempoConfig::default());

    engine.start(0.0);
    let mut estimate = None;
    for t in [100.0, 600.0, 1100.0, 1600.0] {
        engine.tick(t);
        estimate = tap.tap(t);
    }
    assert_eq!(estimate, Some(120));

    engine.set_bpm(120, 1600.0);
    assert_eq!(engine.state().bpm, 120);

    let mut events = Vec::new();
    let mut now = 1625.0;
    while now <= 3200.0 {
        events.extend(engine.tick(now));
        now += 25.0;
    }
    let click_times: Vec<f64> = events
        .iter()
        .filter(|e| matches!(e.pulse, Pulse::Click { .. }))
        .map(|e| e.at_ms)
        .collect();
    assert_eq!(click_times, vec![2100.0, 2600.0, 3100.0]);

    // A long pause starts a new tap window
    tap.poll(5000.0);
    assert_eq!(tap.tap_count(), 0);
    assert_eq!(tap.bpm(), None);
}

#[test]
fn test_speed_trainer_session_reports_progress() {
    let (producer, mut consumer) = create_notification_channel(16);
    let mut engine = MetronomeEngine::new(MetronomeSettings {
        bpm: 100,
        beats_per_measure: 2,
        speed_trainer: Some(SpeedTrainerSettings {
            bpm_increment: 20,
            repeats_per_loop: 1,
            loops: Some(3),
        }),
        ..Default::default()
    });
    engine.set_notification_producer(producer);
    let reader = engine.state_reader();

    let mut events = engine.start(0.0);
    let mut now = 0.0;
    while engine.is_playing() && now < 10_000.0 {
        now += 25.0;
        events.extend(engine.tick(now));
    }

    let tempos: Vec<u32> = events
        .iter()
        .filter_map(|e| match e.pulse {
            Pulse::TempoChanged { bpm } => Some(bpm),
            _ => None,
        })
        .collect();
    assert_eq!(tempos, vec![120, 140]);
    assert_eq!(click_beats(&events), vec![0, 1, 0, 1, 0, 1]);
    assert_eq!(
        events.last().map(|e| e.pulse),
        Some(Pulse::Completed {
            reason: CompletionReason::SpeedTrainer
        })
    );

    let state = reader.get();
    assert!(!state.is_playing);
    assert_eq!(state.bpm, 140);

    let notification = consumer.try_pop().unwrap();
    assert!(notification.message.contains("complete"));
}

#[test]
fn test_timer_session_from_config_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("practice.ron");
    std::fs::write(
        &path,
        "(metronome: (bpm: 60, beats_per_measure: 3, count_in: 2))",
    )
    .unwrap();

    let config = EngineConfig::load_from_file(&path).unwrap();
    let mut settings = MetronomeSettings::from(&config.metronome);
    settings.timer_seconds = Some(2);
    let mut engine = MetronomeEngine::new(settings);

    let mut events = engine.start(0.0);
    let mut now = 0.0;
    while engine.is_playing() && now < 10_000.0 {
        now += 25.0;
        events.extend(engine.tick(now));
    }

    let pulses: Vec<(f64, Pulse)> = events.iter().map(|e| (e.at_ms, e.pulse)).collect();
    assert_eq!(
        pulses,
        vec![
            (0.0, Pulse::CountIn { remaining: 2 }),
            (1000.0, Pulse::CountIn { remaining: 1 }),
            (
                2000.0,
                Pulse::Click {
                    beat: 0,
                    kind: ClickKind::Downbeat
                }
            ),
            // A second due with a beat fires first
            (3000.0, Pulse::Second { elapsed: 1 }),
            (
                3000.0,
                Pulse::Click {
                    beat: 1,
                    kind: ClickKind::Normal
                }
            ),
            (4000.0, Pulse::Second { elapsed: 2 }),
            (
                4000.0,
                Pulse::Completed {
                    reason: CompletionReason::Timer
                }
            ),
        ]
    );
}
