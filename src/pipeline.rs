//! Pipeline orchestration.
//!
//! The pipeline wires one screen's frame flow together: admission gate,
//! preprocessor, classifier backend, debouncer, event sink. It supports
//! two drive modes:
//!
//! - **Poll mode** (`run_poll`): a driver loop wakes on a fixed interval
//!   after an initial warm-up delay, blocks for a gate slot, pulls the
//!   *current* frame from the source and hands it to a worker. A slow
//!   classifier slows the loop down; the camera keeps running.
//! - **Push mode** (`submit`): the capture layer offers every new frame;
//!   a saturated gate means the frame is dropped on the spot.
//!
//! Both modes funnel into the same worker path, so debouncing behaves
//! identically regardless of how frames arrive.
//!
//! Lifecycle is explicit state, not ambient flags: the pipeline is
//! `Idle` until started, `Running` while admitting frames, and `Halted`
//! after a terminal stable decision when the profile asks for one. A
//! generation counter stamps every admitted frame; results that complete
//! after `stop()` or a restart are counted and discarded, never acted on.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};

use crate::classify::ClassifierBackend;
use crate::debounce::{Condition, DebounceEvent, DebouncePolicy, Debouncer, FireMode, LabelTable};
use crate::events::{EventSink, PipelineEvent};
use crate::frame::Frame;
use crate::gate::{AdmissionGate, GatePermit};
use crate::lock_unpoisoned;
use crate::preprocess::{CropRect, Preprocessor};
use crate::source::FrameSource;
use crate::stats::{FpsMeter, PipelineStats, StatsSnapshot};

const WARMUP_SLICE: Duration = Duration::from_millis(25);

/// Where the pipeline is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Not admitting frames. The state after construction and `stop()`.
    Idle,
    /// Poll mode only: waiting out the initial warm-up delay.
    Warmup,
    /// Admitting and classifying frames.
    Running,
    /// A terminal stable decision was made; no more frames are admitted
    /// until the next `start()`/`run_poll()`.
    Halted,
}

/// Everything one screen needs from the pipeline, as data.
///
/// The two built-in profiles mirror the two screens of the cooking
/// assistant; integrations may construct their own.
#[derive(Clone, Debug)]
pub struct ScreenProfile {
    pub name: String,
    /// Guide-box crop in source-frame coordinates.
    pub crop: CropRect,
    /// Classifier input side length.
    pub target_side: u32,
    /// Concurrent in-flight classification bound.
    pub gate_capacity: usize,
    /// Ranked entries scanned per prediction.
    pub scan_depth: usize,
    /// Consecutive-run threshold; stability needs threshold+1 results.
    pub threshold: u32,
    pub fire: FireMode,
    /// Stop admitting frames after the first stable announcement.
    pub halt_on_stable: bool,
    /// Poll mode: delay before the first frame is pulled.
    pub warmup: Duration,
    /// Poll mode: sleep between iterations.
    pub poll_interval: Duration,
    /// Exact class-name to condition mapping, in priority order.
    pub labels: Vec<(String, Condition)>,
    /// Registry name of the backend this screen classifies with.
    pub backend: String,
}

impl ScreenProfile {
    /// The pan alignment screen: hold a frying pan inside the guide box;
    /// once it is stably in frame, the pot object is placed exactly once
    /// and classification stops.
    pub fn pan_alignment() -> Self {
        Self {
            name: "pan_alignment".to_string(),
            crop: CropRect::new(422, 136, 436, 448),
            target_side: 227,
            gate_capacity: 2,
            scan_depth: 5,
            threshold: 2,
            fire: FireMode::SingleShot,
            halt_on_stable: true,
            warmup: Duration::from_secs(8),
            poll_interval: Duration::from_millis(200),
            labels: vec![(
                "frying pan, frypan, skillet".to_string(),
                Condition::FryingPan,
            )],
            backend: "stub".to_string(),
        }
    }

    /// The ingredient guide screen: keep the vegetable aligned; the
    /// overlay toggles on every confirmed result and comes back the
    /// moment alignment is lost.
    pub fn ingredient_guide() -> Self {
        Self {
            name: "ingredient_guide".to_string(),
            crop: CropRect::new(158, 68, 163, 224),
            target_side: 227,
            gate_capacity: 2,
            scan_depth: 5,
            threshold: 1,
            fire: FireMode::Continuous,
            halt_on_stable: false,
            warmup: Duration::ZERO,
            poll_interval: Duration::from_millis(200),
            labels: vec![
                ("bell pepper".to_string(), Condition::BellPepper),
                ("cucumber, cuke".to_string(), Condition::Cucumber),
            ],
            backend: "stub".to_string(),
        }
    }

    /// Built-in profile by name.
    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "pan_alignment" => Some(Self::pan_alignment()),
            "ingredient_guide" => Some(Self::ingredient_guide()),
            _ => None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.gate_capacity < 1 {
            return Err(anyhow!("gate capacity must be at least 1"));
        }
        if self.scan_depth < 1 {
            return Err(anyhow!("scan depth must be at least 1"));
        }
        if self.target_side < 1 {
            return Err(anyhow!("target side must be at least 1"));
        }
        if self.crop.width == 0 || self.crop.height == 0 {
            return Err(anyhow!("crop rect must have a non-zero area"));
        }
        if self.labels.is_empty() {
            return Err(anyhow!("label table must not be empty"));
        }
        if self.poll_interval.is_zero() {
            return Err(anyhow!("poll interval must be non-zero"));
        }
        Ok(())
    }

    fn preprocessor(&self) -> Preprocessor {
        Preprocessor::new(self.crop, self.target_side)
    }

    fn policy(&self) -> DebouncePolicy {
        DebouncePolicy {
            threshold: self.threshold,
            scan_depth: self.scan_depth,
            fire: self.fire,
        }
    }

    fn label_table(&self) -> LabelTable {
        LabelTable::new(self.labels.clone())
    }
}

struct Shared {
    profile: ScreenProfile,
    preprocessor: Preprocessor,
    gate: AdmissionGate,
    backend: Arc<dyn ClassifierBackend>,
    sink: Arc<dyn EventSink>,
    debouncer: Mutex<Debouncer>,
    phase: Mutex<Phase>,
    generation: AtomicU64,
    stats: PipelineStats,
    fps: Mutex<FpsMeter>,
}

/// One screen's classification pipeline. Cheap to clone; clones share
/// state, so a capture callback and a shutdown handler can hold their
/// own copies.
#[derive(Clone)]
pub struct Pipeline {
    shared: Arc<Shared>,
}

impl Pipeline {
    pub fn new(
        profile: ScreenProfile,
        backend: Arc<dyn ClassifierBackend>,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self> {
        profile.validate()?;
        backend
            .warm_up()
            .with_context(|| format!("backend '{}' failed to warm up", backend.name()))?;

        let debouncer = Debouncer::new(profile.label_table(), profile.policy());
        let shared = Shared {
            preprocessor: profile.preprocessor(),
            gate: AdmissionGate::new(profile.gate_capacity),
            backend,
            sink,
            debouncer: Mutex::new(debouncer),
            phase: Mutex::new(Phase::Idle),
            generation: AtomicU64::new(0),
            stats: PipelineStats::default(),
            fps: Mutex::new(FpsMeter::new()),
            profile,
        };
        Ok(Self {
            shared: Arc::new(shared),
        })
    }

    pub fn profile(&self) -> &ScreenProfile {
        &self.shared.profile
    }

    pub fn phase(&self) -> Phase {
        self.shared.phase()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }

    /// Classifications delivered per second, measured over a rolling
    /// window.
    pub fn delivered_fps(&self) -> f64 {
        lock_unpoisoned(&self.shared.fps).current()
    }

    /// A handle on the admission gate (shared, not a copy).
    pub fn gate(&self) -> AdmissionGate {
        self.shared.gate.clone()
    }

    /// Enter the running state for push-mode use. Fails if already
    /// active. `run_poll` performs its own entry including warm-up; do
    /// not combine the two on one pipeline.
    pub fn start(&self) -> Result<()> {
        self.shared.begin(Phase::Running)?;
        log::info!("pipeline '{}' running (push mode)", self.shared.profile.name);
        Ok(())
    }

    /// Leave the running state. Idempotent. In-flight classifications
    /// complete on their own time; their results are discarded.
    pub fn stop(&self) {
        self.shared.generation.fetch_add(1, Ordering::AcqRel);
        let mut phase = lock_unpoisoned(&self.shared.phase);
        if *phase != Phase::Idle {
            log::info!("pipeline '{}' stopped", self.shared.profile.name);
        }
        *phase = Phase::Idle;
    }

    /// Push-mode frame offer. Returns whether the frame was admitted.
    ///
    /// A saturated gate or an inactive pipeline drops the frame; both
    /// are normal operation, not errors.
    pub fn submit(&self, frame: Frame) -> bool {
        if self.shared.phase() != Phase::Running {
            log::trace!("frame {} rejected: pipeline not running", frame.seq());
            return false;
        }
        self.shared.stats.record_submitted();
        let Some(permit) = self.shared.gate.try_acquire() else {
            self.shared.stats.record_gate_drop();
            log::debug!("frame {} dropped: gate saturated", frame.seq());
            return false;
        };
        self.shared.spawn_worker(frame, permit);
        true
    }

    /// Poll-mode driver. Blocks the calling thread until the pipeline
    /// stops or halts.
    ///
    /// Each iteration blocks for a gate slot, pulls the current frame
    /// (the same visual instant may be classified twice if the source
    /// has not advanced) and sleeps the profile's interval.
    pub fn run_poll(&self, source: &mut dyn FrameSource) -> Result<()> {
        let profile = &self.shared.profile;
        if profile.warmup.is_zero() {
            self.shared.begin(Phase::Running)?;
        } else {
            self.shared.begin(Phase::Warmup)?;
            log::info!(
                "pipeline '{}' warming up for {:?}",
                profile.name,
                profile.warmup
            );
            if !self.shared.wait_out_warmup() {
                return Ok(());
            }
        }
        log::info!(
            "pipeline '{}' running (poll mode, {} fps nominal)",
            profile.name,
            source.nominal_fps()
        );

        while self.shared.phase() == Phase::Running {
            let permit = self.shared.gate.acquire();
            // The acquire may have blocked for a while; re-check before
            // pulling a frame.
            if self.shared.phase() != Phase::Running {
                break;
            }
            match source.next_frame() {
                Ok(Some(frame)) => {
                    self.shared.stats.record_submitted();
                    self.shared.spawn_worker(frame, permit);
                }
                Ok(None) => drop(permit),
                Err(e) => {
                    drop(permit);
                    self.shared.stats.record_source_failure();
                    log::warn!("frame source error: {}", e);
                }
            }
            thread::sleep(profile.poll_interval);
        }
        log::info!("pipeline '{}' poll loop exited", profile.name);
        Ok(())
    }

    /// Run the poll driver on its own thread.
    pub fn spawn_poll<S: FrameSource + Send + 'static>(
        &self,
        mut source: S,
    ) -> Result<thread::JoinHandle<()>> {
        let pipeline = self.clone();
        let handle = thread::Builder::new()
            .name("griddle-poll".to_string())
            .spawn(move || {
                if let Err(e) = pipeline.run_poll(&mut source) {
                    log::warn!("poll driver exited: {}", e);
                }
            })
            .context("failed to spawn poll driver thread")?;
        Ok(handle)
    }

    /// Relay a surface detection from the surrounding session layer into
    /// the event stream.
    pub fn announce_surface(&self) {
        self.shared.sink.emit(PipelineEvent::SurfaceDetected);
    }
}

impl Shared {
    fn phase(&self) -> Phase {
        *lock_unpoisoned(&self.phase)
    }

    /// Idle/Halted -> `entry`. Bumps the generation and resets the
    /// debouncer so nothing from a previous run leaks into this one.
    fn begin(&self, entry: Phase) -> Result<()> {
        let mut phase = lock_unpoisoned(&self.phase);
        match *phase {
            Phase::Idle | Phase::Halted => {
                *phase = entry;
                drop(phase);
                self.generation.fetch_add(1, Ordering::AcqRel);
                lock_unpoisoned(&self.debouncer).reset();
                Ok(())
            }
            current => Err(anyhow!("pipeline already active in phase {:?}", current)),
        }
    }

    /// Sleep out the warm-up in slices so `stop()` stays responsive.
    /// Returns whether the pipeline moved on to `Running`.
    fn wait_out_warmup(&self) -> bool {
        let started = Instant::now();
        while started.elapsed() < self.profile.warmup {
            if self.phase() != Phase::Warmup {
                return false;
            }
            thread::sleep(WARMUP_SLICE);
        }
        let mut phase = lock_unpoisoned(&self.phase);
        if *phase == Phase::Warmup {
            *phase = Phase::Running;
            true
        } else {
            false
        }
    }

    fn halt(&self) {
        let mut phase = lock_unpoisoned(&self.phase);
        if matches!(*phase, Phase::Running | Phase::Warmup) {
            *phase = Phase::Halted;
            log::info!("pipeline '{}' halted on stable condition", self.profile.name);
        }
    }

    fn spawn_worker(self: &Arc<Self>, frame: Frame, permit: GatePermit) {
        let shared = Arc::clone(self);
        let generation = self.generation.load(Ordering::Acquire);
        thread::spawn(move || shared.classify_frame(frame, permit, generation));
    }

    /// Worker body. The permit is owned here, so the slot frees on every
    /// return path, including preprocess and classifier failures.
    fn classify_frame(&self, frame: Frame, permit: GatePermit, generation: u64) {
        let _permit = permit;

        let prepared = match self.preprocessor.prepare(&frame) {
            Ok(prepared) => prepared,
            Err(e) => {
                self.stats.record_preprocess_failure();
                log::debug!("frame {} dropped: {}", frame.seq(), e);
                return;
            }
        };

        let prediction = match self.backend.classify(
            prepared.pixels(),
            prepared.width(),
            prepared.height(),
        ) {
            Ok(prediction) => prediction,
            Err(e) => {
                self.stats.record_classify_failure();
                log::warn!("classification failed for frame {}: {}", frame.seq(), e);
                return;
            }
        };

        self.stats.record_completed();
        lock_unpoisoned(&self.fps).tick();

        // Results that complete after stop()/restart or a terminal halt
        // must not drive the UI.
        if self.generation.load(Ordering::Acquire) != generation
            || self.phase() != Phase::Running
        {
            self.stats.record_stale_discard();
            log::trace!("frame {} result discarded: run ended", frame.seq());
            return;
        }

        let events = lock_unpoisoned(&self.debouncer).observe(&prediction);
        for event in events {
            match event {
                DebounceEvent::Stable(condition) => {
                    self.stats.record_stable_event();
                    self.sink.emit(PipelineEvent::ConditionStable(condition));
                    if self.profile.halt_on_stable {
                        self.halt();
                    }
                }
                DebounceEvent::Lost => self.sink.emit(PipelineEvent::ConditionLost),
            }
        }
    }
}
