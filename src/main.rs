use clap::Parser;
use mymusic_practice::messaging::NotificationConsumer;
use mymusic_practice::messaging::channels::notify;
use mymusic_practice::project::{decode_or_default, extract_share_code};
use mymusic_practice::{
    AudioBackend, ClickSound, DrumScheduler, EngineConfig, FileSampleFetcher, MetronomeEngine,
    MetronomeSettings, PracticeResult, Pulse, RenderClock, create_notification_channel,
};
use ringbuf::traits::Consumer;
use std::path::PathBuf;
use std::time::Duration;

const SAMPLE_RATE: f64 = 48000.0;
const NOTIFICATION_RINGBUFFER_CAPACITY: usize = 64;

/// Drum loop and metronome practice session rendered offline
#[derive(Parser, Debug)]
#[command(name = "mymusic_practice")]
#[command(version, about, long_about = None)]
struct Cli {
    /// RON engine config (defaults apply when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Share code or share link of the drum project to play
    #[arg(short, long)]
    share: Option<String>,

    /// Directory the track sample paths are resolved against
    #[arg(long, default_value = ".")]
    samples: PathBuf,

    /// Length of the session in seconds
    #[arg(long, default_value_t = 8.0)]
    seconds: f64,
}

fn drain_notifications(consumer: &mut NotificationConsumer) {
    while let Some(notification) = consumer.try_pop() {
        println!("{}", notification);
    }
}

async fn run(options: Cli) -> PracticeResult<()> {
    let config = match &options.config {
        Some(path) => EngineConfig::load_from_file(path)?,
        None => EngineConfig::default(),
    };

    let (notification_tx, mut notification_rx) =
        create_notification_channel(NOTIFICATION_RINGBUFFER_CAPACITY);
    let mut notifications = Some(notification_tx);

    let share = options.share.as_deref().unwrap_or("");
    let share = extract_share_code(share).unwrap_or(share);
    let (project, warning) = decode_or_default(share);
    if let Some(warning) = warning {
        notify(&mut notifications, warning);
    }
    println!(
        "Project: {} tracks, {} sections at {} BPM",
        project.tracks.len(),
        project.sections.len(),
        project.bpm
    );

    let fetcher = FileSampleFetcher::new(&options.samples);
    let mut scheduler = DrumScheduler::new(
        RenderClock::new(SAMPLE_RATE),
        project,
        config.scheduler.clone(),
    );
    if let Some(tx) = notifications.take() {
        scheduler.set_notification_producer(tx);
    }
    let cursor = scheduler.cursor_reader();

    let mut metronome = MetronomeEngine::new(MetronomeSettings::from(&config.metronome));
    let clicks = ClickSound::new(SAMPLE_RATE as u32, config.metronome.click_volume);

    if let Err(e) = scheduler.play(&fetcher).await {
        log::error!("Drum loop unavailable ({}): {}", e.category(), e);
        println!("Drum loop disabled ({}), metronome only", e);
    }
    for event in metronome.start(0.0) {
        clicks.schedule(scheduler.backend_mut(), &event, 0.0);
    }

    let tick = Duration::from_secs_f64(config.scheduler.tick_interval_ms / 1000.0);
    let mut interval = tokio::time::interval(tick);
    let mut seen_cursor = 0;

    while scheduler.backend().now() < options.seconds {
        interval.tick().await;
        scheduler.backend_mut().advance(tick.as_secs_f64());
        scheduler.tick();

        let now_ms = scheduler.backend().now() * 1000.0;
        for event in metronome.tick(now_ms) {
            clicks.schedule(scheduler.backend_mut(), &event, 0.0);
            if let Pulse::Click { beat: 0, .. } = event.pulse {
                println!("Metronome: downbeat at {:.0} ms", event.at_ms);
            }
        }

        if let Some((version, position)) = cursor.get_if_newer(seen_cursor) {
            seen_cursor = version;
            if position.step_index == 0 {
                println!(
                    "Drum loop: section {} (loop {})",
                    position.section_index + 1,
                    position.loop_count + 1
                );
            }
        }
        drain_notifications(&mut notification_rx);
    }

    scheduler.stop();
    metronome.stop();

    let stats = scheduler.stats();
    println!(
        "Done: {} scheduled, {} late, {} skipped, {} resyncs",
        stats.scheduled_events, stats.late_events, stats.skipped_events, stats.resyncs
    );
    drain_notifications(&mut notification_rx);
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("=== MyMusic Practice ===");
    let options = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("ERROR: failed to start runtime: {}", e);
            return;
        }
    };

    if let Err(e) = runtime.block_on(run(options)) {
        eprintln!("ERROR: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["mymusic_practice"]).unwrap();
        assert!(cli.config.is_none());
        assert!(cli.share.is_none());
        assert_eq!(cli.samples, PathBuf::from("."));
        assert_eq!(cli.seconds, 8.0);
    }

    #[test]
    fn test_all_options() {
        let cli = Cli::try_parse_from([
            "mymusic_practice",
            "--config",
            "practice.ron",
            "-s",
            "https://example.com/#p=abc",
            "--samples",
            "kit",
            "--seconds",
            "2.5",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("practice.ron")));
        assert_eq!(cli.share.as_deref(), Some("https://example.com/#p=abc"));
        assert_eq!(cli.samples, PathBuf::from("kit"));
        assert_eq!(cli.seconds, 2.5);
    }

    #[test]
    fn test_bad_arguments_are_rejected() {
        assert!(Cli::try_parse_from(["mymusic_practice", "--seconds", "abc"]).is_err());
        assert!(Cli::try_parse_from(["mymusic_practice", "--tempo", "120"]).is_err());
        assert!(Cli::try_parse_from(["mymusic_practice", "--config"]).is_err());
    }
}
