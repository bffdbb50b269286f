//! Frame sources.
//!
//! A `FrameSource` hands out the current camera frame on demand (poll
//! mode). Push-mode integrations skip the trait entirely and call
//! [`crate::Pipeline::submit`] from their capture callback.
//!
//! The crate ships `SyntheticSource`, a deterministic generator used by
//! the demo daemon and tests. Real camera integrations live outside the
//! crate, behind this trait.

use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::frame::Frame;

/// Produces camera frames at a nominal rate.
pub trait FrameSource {
    /// The current frame, or `None` when the source has nothing new to
    /// offer (a drained file, a camera that has not produced yet). A poll
    /// driver may receive the same visual instant twice if it polls
    /// faster than the source advances.
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    /// Nominal capture rate in frames per second.
    fn nominal_fps(&self) -> u32;
}

/// Configuration for the synthetic source.
#[derive(Clone, Copy, Debug)]
pub struct SyntheticConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Frames to hold each scene before advancing to the next.
    pub scene_hold: u64,
    /// RNG seed for pixel noise; fixed seed, fixed frames.
    pub seed: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fps: 5,
            scene_hold: 12,
            seed: 0x6672_7970_616e,
        }
    }
}

/// Deterministic synthetic camera.
///
/// Cycles through four flat "scenes" of increasing luminance, holding
/// each for `scene_hold` frames, with a sprinkle of seeded noise so
/// consecutive frames are not byte-identical. The luminance levels line
/// up with the stub backend's scene buckets, so a synthetic run drives
/// the whole pipeline end to end.
pub struct SyntheticSource {
    config: SyntheticConfig,
    seq: u64,
    rng: StdRng,
}

impl SyntheticSource {
    pub fn new(config: SyntheticConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            config,
            seq: 0,
            rng,
        }
    }

    /// Scene index for the frame about to be produced.
    fn scene(&self) -> u8 {
        ((self.seq / self.config.scene_hold) % 4) as u8
    }

    fn generate_pixels(&mut self) -> Vec<u8> {
        let base = self.scene() * 64 + 32;
        let len = Frame::expected_len(self.config.width, self.config.height);
        let mut pixels = vec![base; len];
        // Light noise on a few pixels; the mean stays inside the bucket.
        let speckles = len / 64;
        for _ in 0..speckles {
            let at = self.rng.gen_range(0..len);
            let delta = self.rng.gen_range(-8i16..=8);
            pixels[at] = (base as i16 + delta).clamp(0, 255) as u8;
        }
        pixels
    }

    pub fn frames_produced(&self) -> u64 {
        self.seq
    }
}

impl FrameSource for SyntheticSource {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let pixels = self.generate_pixels();
        self.seq += 1;
        Ok(Some(Frame::new(
            pixels,
            self.config.width,
            self.config.height,
            self.seq,
        )))
    }

    fn nominal_fps(&self) -> u32 {
        self.config.fps
    }
}
