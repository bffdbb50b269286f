//! End-to-end debouncing scenarios through the push-mode pipeline.
//!
//! Frames are submitted one at a time, waiting for each classification
//! to complete, so predictions reach the debouncer in script order.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use griddle::{
    ChannelSink, Condition, CropRect, FireMode, Frame, Pipeline, PipelineEvent, Prediction,
    ScreenProfile, ScriptedBackend,
};

fn test_profile(threshold: u32, fire: FireMode, halt_on_stable: bool) -> ScreenProfile {
    ScreenProfile {
        name: "test".to_string(),
        crop: CropRect::new(0, 0, 8, 8),
        target_side: 8,
        gate_capacity: 2,
        scan_depth: 5,
        threshold,
        fire,
        halt_on_stable,
        warmup: Duration::ZERO,
        poll_interval: Duration::from_millis(5),
        labels: vec![
            (
                "frying pan, frypan, skillet".to_string(),
                Condition::FryingPan,
            ),
            ("bell pepper".to_string(), Condition::BellPepper),
            ("cucumber, cuke".to_string(), Condition::Cucumber),
        ],
        backend: "scripted".to_string(),
    }
}

fn test_frame(seq: u64) -> Frame {
    Frame::new(vec![0; Frame::expected_len(8, 8)], 8, 8, seq)
}

fn wait_for(mut condition: impl FnMut() -> bool, timeout: Duration) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

/// Submit `count` frames, waiting for each worker to finish entirely
/// (the permit drops after event emission, so a full gate means every
/// event for the frame has reached the sink).
fn drive_frames(pipeline: &Pipeline, count: u64) {
    let capacity = pipeline.profile().gate_capacity;
    let before = pipeline.stats().completed + pipeline.stats().classify_failures;
    for i in 0..count {
        assert!(pipeline.submit(test_frame(i + 1)), "frame {} admitted", i + 1);
        let target = before + i + 1;
        assert!(
            wait_for(
                || pipeline.stats().completed + pipeline.stats().classify_failures >= target,
                Duration::from_secs(2)
            ),
            "classification {} finished",
            i + 1
        );
        assert!(
            wait_for(
                || pipeline.gate().available() == capacity,
                Duration::from_secs(2)
            ),
            "slot released after frame {}",
            i + 1
        );
    }
}

fn pan_prediction() -> Prediction {
    Prediction::from_pairs(&[
        ("frying pan, frypan, skillet", 0.9),
        ("wok", 0.05),
        ("dutch oven", 0.02),
    ])
}

#[test]
fn three_pan_frames_fire_exactly_one_stable_event() {
    let script = vec![pan_prediction(), pan_prediction(), pan_prediction()];
    let backend = Arc::new(ScriptedBackend::new(script));
    let (sink, events) = ChannelSink::new();
    let pipeline = Pipeline::new(
        test_profile(2, FireMode::SingleShot, false),
        backend,
        Arc::new(sink),
    )
    .unwrap();

    pipeline.start().unwrap();
    drive_frames(&pipeline, 3);
    pipeline.stop();

    let received: Vec<_> = events.try_iter().collect();
    assert_eq!(
        received,
        vec![PipelineEvent::ConditionStable(Condition::FryingPan)]
    );
    assert_eq!(pipeline.stats().stable_events, 1);
}

#[test]
fn single_shot_does_not_refire_on_later_matches() {
    let script = vec![pan_prediction(); 6];
    let backend = Arc::new(ScriptedBackend::new(script));
    let (sink, events) = ChannelSink::new();
    let pipeline = Pipeline::new(
        test_profile(2, FireMode::SingleShot, false),
        backend,
        Arc::new(sink),
    )
    .unwrap();

    pipeline.start().unwrap();
    drive_frames(&pipeline, 6);
    pipeline.stop();

    let stable_count = events
        .try_iter()
        .filter(|event| matches!(event, PipelineEvent::ConditionStable(_)))
        .count();
    assert_eq!(stable_count, 1);
}

#[test]
fn alternating_vegetables_never_stabilize() {
    let mut script = Vec::new();
    for _ in 0..5 {
        script.push(Prediction::from_pairs(&[("bell pepper", 0.7)]));
        script.push(Prediction::from_pairs(&[("cucumber, cuke", 0.7)]));
    }
    let backend = Arc::new(ScriptedBackend::new(script));
    let (sink, events) = ChannelSink::new();
    let pipeline = Pipeline::new(
        test_profile(1, FireMode::Continuous, false),
        backend,
        Arc::new(sink),
    )
    .unwrap();

    pipeline.start().unwrap();
    drive_frames(&pipeline, 10);
    pipeline.stop();

    assert!(events.try_iter().next().is_none());
    assert_eq!(pipeline.stats().stable_events, 0);
}

#[test]
fn continuous_mode_refires_and_reports_loss() {
    let script = vec![
        Prediction::from_pairs(&[("bell pepper", 0.7)]),
        Prediction::from_pairs(&[("bell pepper", 0.7)]),
        Prediction::from_pairs(&[("bell pepper", 0.7)]),
        Prediction::from_pairs(&[("zucchini, courgette", 0.6)]),
    ];
    let backend = Arc::new(ScriptedBackend::new(script));
    let (sink, events) = ChannelSink::new();
    let pipeline = Pipeline::new(
        test_profile(1, FireMode::Continuous, false),
        backend,
        Arc::new(sink),
    )
    .unwrap();

    pipeline.start().unwrap();
    drive_frames(&pipeline, 4);
    pipeline.stop();

    let received: Vec<_> = events.try_iter().collect();
    assert_eq!(
        received,
        vec![
            PipelineEvent::ConditionStable(Condition::BellPepper),
            PipelineEvent::ConditionStable(Condition::BellPepper),
            PipelineEvent::ConditionLost,
        ]
    );
}

#[test]
fn empty_predictions_flow_through_without_events() {
    let backend = Arc::new(ScriptedBackend::new(vec![Prediction::default(); 5]));
    let (sink, events) = ChannelSink::new();
    let pipeline = Pipeline::new(
        test_profile(1, FireMode::Continuous, false),
        backend,
        Arc::new(sink),
    )
    .unwrap();

    pipeline.start().unwrap();
    drive_frames(&pipeline, 5);
    pipeline.stop();

    assert!(events.try_iter().next().is_none());
    assert_eq!(pipeline.stats().completed, 5);
}

#[test]
fn halt_on_stable_stops_admission() {
    let script = vec![pan_prediction(); 3];
    let backend = Arc::new(ScriptedBackend::new(script));
    let (sink, events) = ChannelSink::new();
    let pipeline = Pipeline::new(
        test_profile(2, FireMode::SingleShot, true),
        backend,
        Arc::new(sink),
    )
    .unwrap();

    pipeline.start().unwrap();
    drive_frames(&pipeline, 3);

    assert!(wait_for(
        || pipeline.phase() == griddle::Phase::Halted,
        Duration::from_secs(2)
    ));
    // The terminal decision was made; further frames are rejected.
    assert!(!pipeline.submit(test_frame(99)));
    assert_eq!(
        events.try_iter().collect::<Vec<_>>(),
        vec![PipelineEvent::ConditionStable(Condition::FryingPan)]
    );
}
