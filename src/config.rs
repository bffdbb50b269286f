//! Daemon configuration.
//!
//! Configuration merges three layers, later wins:
//! 1. a built-in screen profile selected by name,
//! 2. an optional JSON config file named by `GRIDDLE_CONFIG`,
//! 3. `GRIDDLE_*` environment variables.
//!
//! The merged result is validated as a whole; a crop rect that does not
//! fit the configured source, or a zero gate capacity, fails loading
//! rather than failing frames later.

use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::debounce::{Condition, FireMode};
use crate::pipeline::ScreenProfile;
use crate::preprocess::CropRect;

const DEFAULT_PROFILE: &str = "pan_alignment";
const DEFAULT_SOURCE_FPS: u32 = 5;
const DEFAULT_SOURCE_WIDTH: u32 = 1280;
const DEFAULT_SOURCE_HEIGHT: u32 = 720;

#[derive(Debug, Deserialize, Default)]
struct GriddleConfigFile {
    profile: Option<String>,
    backend: Option<String>,
    source: Option<SourceConfigFile>,
    gate: Option<GateConfigFile>,
    debounce: Option<DebounceConfigFile>,
    preprocess: Option<PreprocessConfigFile>,
    poll: Option<PollConfigFile>,
    labels: Option<Vec<LabelEntryFile>>,
}

#[derive(Debug, Deserialize, Default)]
struct SourceConfigFile {
    fps: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct GateConfigFile {
    capacity: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
struct DebounceConfigFile {
    threshold: Option<u32>,
    scan_depth: Option<usize>,
    fire: Option<FireMode>,
    halt_on_stable: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
struct PreprocessConfigFile {
    crop: Option<CropRect>,
    target_side: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct PollConfigFile {
    warmup_secs: Option<u64>,
    interval_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct LabelEntryFile {
    label: String,
    condition: Condition,
}

/// Camera settings for the built-in synthetic source.
#[derive(Clone, Copy, Debug)]
pub struct SourceSettings {
    pub fps: u32,
    pub width: u32,
    pub height: u32,
}

/// Fully merged and validated daemon configuration.
#[derive(Clone, Debug)]
pub struct GriddleConfig {
    pub profile: ScreenProfile,
    pub source: SourceSettings,
}

impl GriddleConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("GRIDDLE_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => read_config_file(Path::new(path))?,
            None => GriddleConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg)?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: GriddleConfigFile) -> Result<Self> {
        // Profile name from the environment wins over the file, because
        // it selects the base the rest of the file overrides.
        let profile_name = std::env::var("GRIDDLE_PROFILE")
            .ok()
            .filter(|name| !name.trim().is_empty())
            .or(file.profile)
            .unwrap_or_else(|| DEFAULT_PROFILE.to_string());
        let mut profile = ScreenProfile::by_name(&profile_name)
            .ok_or_else(|| anyhow!("unknown screen profile '{}'", profile_name))?;

        if let Some(backend) = file.backend {
            profile.backend = backend;
        }
        if let Some(gate) = file.gate {
            if let Some(capacity) = gate.capacity {
                profile.gate_capacity = capacity;
            }
        }
        if let Some(debounce) = file.debounce {
            if let Some(threshold) = debounce.threshold {
                profile.threshold = threshold;
            }
            if let Some(scan_depth) = debounce.scan_depth {
                profile.scan_depth = scan_depth;
            }
            if let Some(fire) = debounce.fire {
                profile.fire = fire;
            }
            if let Some(halt) = debounce.halt_on_stable {
                profile.halt_on_stable = halt;
            }
        }
        if let Some(preprocess) = file.preprocess {
            if let Some(crop) = preprocess.crop {
                profile.crop = crop;
            }
            if let Some(side) = preprocess.target_side {
                profile.target_side = side;
            }
        }
        if let Some(poll) = file.poll {
            if let Some(secs) = poll.warmup_secs {
                profile.warmup = Duration::from_secs(secs);
            }
            if let Some(ms) = poll.interval_ms {
                profile.poll_interval = Duration::from_millis(ms);
            }
        }
        if let Some(labels) = file.labels {
            profile.labels = labels
                .into_iter()
                .map(|entry| (entry.label, entry.condition))
                .collect();
        }

        let source = SourceSettings {
            fps: file
                .source
                .as_ref()
                .and_then(|source| source.fps)
                .unwrap_or(DEFAULT_SOURCE_FPS),
            width: file
                .source
                .as_ref()
                .and_then(|source| source.width)
                .unwrap_or(DEFAULT_SOURCE_WIDTH),
            height: file
                .source
                .and_then(|source| source.height)
                .unwrap_or(DEFAULT_SOURCE_HEIGHT),
        };

        Ok(Self { profile, source })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(backend) = std::env::var("GRIDDLE_BACKEND") {
            if !backend.trim().is_empty() {
                self.profile.backend = backend;
            }
        }
        if let Ok(capacity) = std::env::var("GRIDDLE_GATE_CAPACITY") {
            self.profile.gate_capacity = capacity
                .parse()
                .map_err(|_| anyhow!("GRIDDLE_GATE_CAPACITY must be an integer"))?;
        }
        if let Ok(threshold) = std::env::var("GRIDDLE_DEBOUNCE_THRESHOLD") {
            self.profile.threshold = threshold
                .parse()
                .map_err(|_| anyhow!("GRIDDLE_DEBOUNCE_THRESHOLD must be an integer"))?;
        }
        if let Ok(secs) = std::env::var("GRIDDLE_WARMUP_SECS") {
            let secs: u64 = secs
                .parse()
                .map_err(|_| anyhow!("GRIDDLE_WARMUP_SECS must be an integer number of seconds"))?;
            self.profile.warmup = Duration::from_secs(secs);
        }
        if let Ok(ms) = std::env::var("GRIDDLE_POLL_INTERVAL_MS") {
            let ms: u64 = ms.parse().map_err(|_| {
                anyhow!("GRIDDLE_POLL_INTERVAL_MS must be an integer number of milliseconds")
            })?;
            self.profile.poll_interval = Duration::from_millis(ms);
        }
        if let Ok(fps) = std::env::var("GRIDDLE_SOURCE_FPS") {
            self.source.fps = fps
                .parse()
                .map_err(|_| anyhow!("GRIDDLE_SOURCE_FPS must be an integer"))?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        self.profile.validate()?;
        if self.source.fps == 0 {
            return Err(anyhow!("source fps must be greater than zero"));
        }
        if self.source.width == 0 || self.source.height == 0 {
            return Err(anyhow!("source dimensions must be non-zero"));
        }
        if !self
            .profile
            .crop
            .fits_within(self.source.width, self.source.height)
        {
            return Err(anyhow!(
                "crop rect {:?} does not fit the {}x{} source",
                self.profile.crop,
                self.source.width,
                self.source.height
            ));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<GriddleConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
