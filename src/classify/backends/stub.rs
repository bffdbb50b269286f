use anyhow::Result;
use sha2::{Digest, Sha256};

use crate::classify::backend::ClassifierBackend;
use crate::classify::prediction::Prediction;

/// Stub backend for demos and tests. No model; it buckets the frame's
/// mean luminance into one of four scenes and returns a canned ranked
/// list for that scene, with a confidence jitter derived from a pixel
/// hash so identical frames always classify identically.
pub struct StubBackend;

impl StubBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassifierBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn classify(&self, pixels: &[u8], _width: u32, _height: u32) -> Result<Prediction> {
        if pixels.is_empty() {
            return Ok(Prediction::default());
        }

        let sum: u64 = pixels.iter().map(|&p| p as u64).sum();
        let mean = (sum / pixels.len() as u64) as u8;

        let digest = Sha256::digest(pixels);
        let jitter = (digest[0] % 16) as f32 / 100.0;
        let top = 0.78 + jitter;

        let prediction = match mean / 64 {
            0 => Prediction::from_pairs(&[
                ("stove, range", top),
                ("dutch oven", 0.07),
                ("spatula", 0.04),
            ]),
            1 => Prediction::from_pairs(&[
                ("frying pan, frypan, skillet", top),
                ("wok", 0.08),
                ("dutch oven", 0.03),
            ]),
            2 => Prediction::from_pairs(&[
                ("bell pepper", top),
                ("cucumber, cuke", 0.06),
                ("zucchini, courgette", 0.04),
            ]),
            _ => Prediction::from_pairs(&[
                ("cucumber, cuke", top),
                ("zucchini, courgette", 0.09),
                ("bell pepper", 0.05),
            ]),
        };
        Ok(prediction)
    }

    fn warm_up(&self) -> Result<()> {
        log::debug!("stub backend ready");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_frame(level: u8) -> Vec<u8> {
        vec![level; 4 * 4 * 3]
    }

    #[test]
    fn luminance_buckets_select_the_scene() {
        let backend = StubBackend::new();

        let dark = backend.classify(&flat_frame(32), 4, 4).unwrap();
        assert_eq!(dark.labels[0].label, "stove, range");

        let pan = backend.classify(&flat_frame(96), 4, 4).unwrap();
        assert_eq!(pan.labels[0].label, "frying pan, frypan, skillet");

        let pepper = backend.classify(&flat_frame(160), 4, 4).unwrap();
        assert_eq!(pepper.labels[0].label, "bell pepper");

        let cuke = backend.classify(&flat_frame(224), 4, 4).unwrap();
        assert_eq!(cuke.labels[0].label, "cucumber, cuke");
    }

    #[test]
    fn identical_frames_classify_identically() {
        let backend = StubBackend::new();
        let a = backend.classify(&flat_frame(96), 4, 4).unwrap();
        let b = backend.classify(&flat_frame(96), 4, 4).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn confidence_stays_ranked() {
        let backend = StubBackend::new();
        let pred = backend.classify(&flat_frame(96), 4, 4).unwrap();
        for pair in pred.labels.windows(2) {
            assert!(pair[0].confidence >= pair[1].confidence);
        }
    }

    #[test]
    fn empty_input_yields_empty_prediction() {
        let backend = StubBackend::new();
        assert!(backend.classify(&[], 0, 0).unwrap().is_empty());
    }
}
