//! Events the core emits toward the UI layer.
//!
//! The core never calls UI APIs. It emits discrete events through an
//! [`EventSink`]; sink implementations are responsible for marshalling
//! onto whatever execution context owns the UI state. Sinks are invoked
//! from classification worker threads.

use std::sync::mpsc;

use crate::debounce::Condition;

/// Discrete event for the UI layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineEvent {
    /// The surrounding session layer found a usable surface. Relayed
    /// through the pipeline so the UI consumes one ordered stream.
    SurfaceDetected,
    /// A condition held long enough to act on: hide the guide box,
    /// place the object, enable the next step.
    ConditionStable(Condition),
    /// The stable condition no longer holds: show the guide box again.
    ConditionLost,
}

/// Consumer of pipeline events. Called from worker threads.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: PipelineEvent);
}

/// Sink that forwards events into a channel. The receiving end is the
/// "UI context": whoever drains the channel applies the events. Events
/// sent after the receiver is gone are dropped silently, which is the
/// correct fate for results that complete after screen teardown.
pub struct ChannelSink {
    tx: mpsc::Sender<PipelineEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::Receiver<PipelineEvent>) {
        let (tx, rx) = mpsc::channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: PipelineEvent) {
        let _ = self.tx.send(event);
    }
}

/// Sink that logs events. Used by the demo daemon.
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: PipelineEvent) {
        match event {
            PipelineEvent::SurfaceDetected => log::info!("surface detected"),
            PipelineEvent::ConditionStable(condition) => {
                log::info!("condition stable: {:?}", condition)
            }
            PipelineEvent::ConditionLost => log::info!("condition lost"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_sink_forwards_events() {
        let (sink, rx) = ChannelSink::new();
        sink.emit(PipelineEvent::ConditionStable(Condition::FryingPan));
        sink.emit(PipelineEvent::ConditionLost);

        assert_eq!(
            rx.try_recv().unwrap(),
            PipelineEvent::ConditionStable(Condition::FryingPan)
        );
        assert_eq!(rx.try_recv().unwrap(), PipelineEvent::ConditionLost);
    }

    #[test]
    fn emit_after_receiver_drop_is_silent() {
        let (sink, rx) = ChannelSink::new();
        drop(rx);
        // Must not panic; late results after teardown land here.
        sink.emit(PipelineEvent::SurfaceDetected);
    }
}
