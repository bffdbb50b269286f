use anyhow::Result;

use crate::classify::prediction::Prediction;

/// Classifier backend trait.
///
/// A backend wraps one vision model. It receives a preprocessed square
/// RGB24 frame and returns a ranked prediction list, or an error, with
/// bounded but unspecified latency. On error the caller drops the frame;
/// there is no retry and nothing is surfaced to the user.
///
/// `classify` takes `&self` because the admission gate allows several
/// classifications in flight at once; backends that keep state use
/// interior locking. Implementations must treat the pixel slice as
/// read-only and ephemeral.
pub trait ClassifierBackend: Send + Sync {
    /// Backend identifier, used for registry lookup.
    fn name(&self) -> &'static str;

    /// Classify one preprocessed frame.
    fn classify(&self, pixels: &[u8], width: u32, height: u32) -> Result<Prediction>;

    /// Optional warm-up hook, called once before the first frame.
    fn warm_up(&self) -> Result<()> {
        Ok(())
    }
}
