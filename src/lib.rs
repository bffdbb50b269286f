//! griddle - frame admission and classification smoothing.
//!
//! The crate is the camera-facing core of a guided cooking assistant. A
//! frame source produces camera frames; each frame is cropped to the
//! on-screen guide box and resampled to the classifier's input size; a
//! bounded admission gate decides whether the frame may be classified at
//! all; and the classifier's noisy ranked-label output is debounced across
//! consecutive results into stable condition events (frying pan in frame,
//! bell pepper aligned, ...) that a UI layer consumes.
//!
//! Design rules the whole crate follows:
//!
//! - Backpressure drops frames, it never queues them. A slow classifier
//!   costs coverage, not latency.
//! - Every acquired gate slot is released exactly once, on every path,
//!   via RAII permit drop. Release without acquire is unrepresentable.
//! - The core never touches UI state. It emits [`PipelineEvent`]s through
//!   an [`EventSink`]; the sink marshals onto whatever context it owns.
//! - No classification error is ever surfaced to the end user. Failed
//!   frames are counted, logged, and dropped.

use std::sync::{Mutex, MutexGuard};

pub mod classify;
pub mod config;
pub mod debounce;
pub mod events;
pub mod frame;
pub mod gate;
pub mod pipeline;
pub mod preprocess;
pub mod source;
pub mod stats;

pub use classify::{
    BackendRegistry, ClassifierBackend, LabelScore, Prediction, ScriptedBackend, StubBackend,
};
pub use config::{GriddleConfig, SourceSettings};
pub use debounce::{Condition, DebounceEvent, DebouncePolicy, Debouncer, FireMode, LabelTable};
pub use events::{ChannelSink, EventSink, LogSink, PipelineEvent};
pub use frame::Frame;
pub use gate::{AdmissionGate, GatePermit};
pub use pipeline::{Phase, Pipeline, ScreenProfile};
pub use preprocess::{CropRect, PreprocessError, Preprocessor};
pub use source::{FrameSource, SyntheticConfig, SyntheticSource};
pub use stats::{FpsMeter, PipelineStats, StatsSnapshot};

/// Lock a mutex, recovering the inner state if a holder panicked.
///
/// The guarded state (counters, debounce state, gate slots) stays valid
/// across a poisoning panic; abandoning it would stall the pipeline.
pub(crate) fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
