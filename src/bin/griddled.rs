//! griddled - demo driver for the griddle pipeline.
//!
//! This binary:
//! 1. Loads the merged screen profile (file + environment)
//! 2. Registers classifier backends and resolves the profile's choice
//! 3. Drives the pipeline from a synthetic camera, in poll or push mode
//! 4. Drains pipeline events on a consumer thread (the stand-in for the
//!    UI context)
//! 5. Logs counters periodically and a summary on exit

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::{Parser, ValueEnum};

use griddle::{
    BackendRegistry, ChannelSink, FrameSource, GriddleConfig, Phase, Pipeline, PipelineEvent,
    StubBackend, SyntheticConfig, SyntheticSource,
};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    /// Background loop pulls the current frame on a fixed interval.
    Poll,
    /// The capture loop offers every frame; saturated gate drops it.
    Push,
}

#[derive(Parser, Debug)]
#[command(name = "griddled", about = "griddle pipeline demo driver")]
struct Args {
    #[arg(long, value_enum, default_value = "poll")]
    mode: Mode,

    /// Stop after this many submitted frames (0 = run until interrupted).
    #[arg(long, default_value_t = 0)]
    max_frames: u64,

    /// Seconds between stats log lines.
    #[arg(long, default_value_t = 10)]
    stats_every: u64,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let cfg = GriddleConfig::load()?;
    log::info!(
        "profile '{}': crop={:?} side={} capacity={} threshold={} fire={:?}",
        cfg.profile.name,
        cfg.profile.crop,
        cfg.profile.target_side,
        cfg.profile.gate_capacity,
        cfg.profile.threshold,
        cfg.profile.fire
    );

    let mut registry = BackendRegistry::new();
    registry.register(StubBackend::new());
    let backend = registry.resolve(&cfg.profile.backend)?;
    log::info!("classifying with backend '{}'", backend.name());

    let (sink, events) = ChannelSink::new();
    thread::spawn(move || {
        // Stand-in for the UI context: apply events in arrival order.
        for event in events {
            match event {
                PipelineEvent::SurfaceDetected => log::info!("ui: surface found, guide box up"),
                PipelineEvent::ConditionStable(condition) => {
                    log::info!("ui: {:?} aligned, guide box hidden", condition)
                }
                PipelineEvent::ConditionLost => log::info!("ui: alignment lost, guide box back"),
            }
        }
    });

    let pipeline = Pipeline::new(cfg.profile.clone(), backend, Arc::new(sink))?;

    {
        let pipeline = pipeline.clone();
        ctrlc::set_handler(move || pipeline.stop())?;
    }

    let source = SyntheticSource::new(SyntheticConfig {
        width: cfg.source.width,
        height: cfg.source.height,
        fps: cfg.source.fps,
        ..SyntheticConfig::default()
    });

    // The demo stands in for the session layer; pretend the table plane
    // was just found.
    pipeline.announce_surface();

    match args.mode {
        Mode::Poll => run_poll(&pipeline, source, &args)?,
        Mode::Push => run_push(&pipeline, source, &args),
    }

    let stats = pipeline.stats();
    log::info!(
        "done: submitted={} gate_drops={} completed={} preprocess_failures={} \
         classify_failures={} stale={} stable_events={}",
        stats.submitted,
        stats.gate_drops,
        stats.completed,
        stats.preprocess_failures,
        stats.classify_failures,
        stats.stale_discarded,
        stats.stable_events
    );
    Ok(())
}

fn run_poll(
    pipeline: &Pipeline,
    source: SyntheticSource,
    args: &Args,
) -> Result<()> {
    let driver = pipeline.spawn_poll(source)?;

    let mut last_stats = Instant::now();
    loop {
        thread::sleep(Duration::from_millis(250));
        let phase = pipeline.phase();
        if phase == Phase::Idle || phase == Phase::Halted {
            break;
        }
        if args.max_frames > 0 && pipeline.stats().submitted >= args.max_frames {
            pipeline.stop();
            break;
        }
        if last_stats.elapsed() >= Duration::from_secs(args.stats_every) {
            log_stats(pipeline);
            last_stats = Instant::now();
        }
    }

    if driver.join().is_err() {
        log::warn!("poll driver thread panicked");
    }
    Ok(())
}

fn run_push(pipeline: &Pipeline, mut source: SyntheticSource, args: &Args) {
    if let Err(e) = pipeline.start() {
        log::error!("could not start pipeline: {}", e);
        return;
    }
    let interval = Duration::from_millis(1000 / u64::from(source.nominal_fps().max(1)));

    let mut last_stats = Instant::now();
    loop {
        let phase = pipeline.phase();
        if phase == Phase::Idle || phase == Phase::Halted {
            break;
        }
        match source.next_frame() {
            Ok(Some(frame)) => {
                pipeline.submit(frame);
            }
            Ok(None) => {}
            Err(e) => log::warn!("synthetic source error: {}", e),
        }
        if args.max_frames > 0 && pipeline.stats().submitted >= args.max_frames {
            break;
        }
        if last_stats.elapsed() >= Duration::from_secs(args.stats_every) {
            log_stats(pipeline);
            last_stats = Instant::now();
        }
        thread::sleep(interval);
    }
    pipeline.stop();
}

fn log_stats(pipeline: &Pipeline) {
    let stats = pipeline.stats();
    log::info!(
        "stats: submitted={} gate_drops={} completed={} stable={} fps={:.2}",
        stats.submitted,
        stats.gate_drops,
        stats.completed,
        stats.stable_events,
        pipeline.delivered_fps()
    );
}
