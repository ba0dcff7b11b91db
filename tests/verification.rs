//! Integration tests driving the verification engine end to end.
//!
//! These exercise the same flow a scenario does: feed the control channel
//! the payloads a client would emit, correlate them, check the registry,
//! and verify cell liveness against scripted observations.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use playwatch::{
    ActiveStreamRegistry, CellProbe, ControlChannel, Environment, Frame, FramePredicate,
    LivenessPoller, LivenessStrategy, PlaybackDirection, PointerMotion, QuiescenceConfig,
    Result, SessionConfig, VerifyError, VerifySession, compare_pointer_positions, recording_gaps,
    times_match, transform_intervals, wait_until_quiescent,
};

fn start_payload(stream_id: &str, speed: f64, format: &str) -> String {
    format!(
        r#"{{"method":"play","streamId":"{stream_id}","speed":{speed},"format":"{format}","endpoint":"/cameras/{stream_id}"}}"#
    )
}

fn stop_payload(stream_id: &str) -> String {
    format!(r#"{{"method":"stop_video","streamId":"{stream_id}"}}"#)
}

/// Replays scripted timer readouts; the last one repeats once exhausted.
struct TimerCell {
    label: String,
    readouts: Mutex<(Vec<String>, usize)>,
}

impl TimerCell {
    fn new(label: &str, seconds: &[u32]) -> Self {
        let readouts = seconds.iter().map(|s| format!("00:00:{s:02}")).collect();
        Self { label: label.to_string(), readouts: Mutex::new((readouts, 0)) }
    }
}

#[async_trait]
impl CellProbe for TimerCell {
    fn label(&self) -> String {
        self.label.clone()
    }

    async fn timer_text(&self) -> Result<String> {
        let mut guard = self.readouts.lock().expect("timer cell lock");
        let index = guard.1.min(guard.0.len() - 1);
        guard.1 += 1;
        Ok(guard.0[index].clone())
    }

    async fn capture_frame(&self) -> Result<Vec<u8>> {
        Ok(Vec::new())
    }

    async fn wait_until_playing(&self) -> Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn play_correlates_and_registers() {
    let _ = tracing_subscriber::fmt::try_init();
    let channel = Arc::new(ControlChannel::new());
    let session = VerifySession::begin(
        Arc::clone(&channel),
        SessionConfig::new(Environment::Local, LivenessStrategy::TimerText),
    );
    tokio::task::yield_now().await;

    let waiter = {
        let channel = Arc::clone(&channel);
        tokio::spawn(async move {
            let predicate = FramePredicate::all(["\"speed\":1", "mp4"]);
            playwatch::await_matching_frame(&channel, &predicate, Duration::from_secs(5)).await
        })
    };
    tokio::task::yield_now().await;

    channel.publish_sent(start_payload("cam1-4f9a", 1.0, "mp4"));
    tokio::time::sleep(Duration::from_millis(20)).await;

    let frame = waiter.await.unwrap().unwrap();
    let Frame::Start(start) = frame else {
        panic!("expected a start command");
    };
    assert_eq!(start.stream_id, "cam1-4f9a");
    assert_eq!(start.direction(), Some(PlaybackDirection::Forward));

    assert_eq!(session.registry().len(), 1);
    assert_eq!(session.registry().snapshot()[0].format.as_deref(), Some("mp4"));
}

#[tokio::test]
async fn stop_empties_registry_and_channel_goes_quiet() {
    let channel = Arc::new(ControlChannel::new());
    let registry = ActiveStreamRegistry::new();
    registry.install(&channel);
    tokio::task::yield_now().await;

    channel.publish_sent(start_payload("cam1-a", 1.0, "mp4"));
    channel.publish_sent(start_payload("cam2-b", 1.0, "mp4"));
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(registry.len(), 2);

    channel.publish_sent(stop_payload("cam1-a|cam2-b"));
    tokio::time::sleep(Duration::from_millis(20)).await;
    registry.assert_none_active().unwrap();

    // No telemetry after the stop: the transport is silent.
    wait_until_quiescent(&channel, Duration::from_millis(50), Duration::from_millis(200))
        .await
        .unwrap();
}

#[tokio::test]
async fn quiescence_fails_on_late_telemetry() {
    let channel = Arc::new(ControlChannel::new());

    let feeder = {
        let channel = Arc::clone(&channel);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            channel.publish_received(r#"{"frame":"deadbeef","streamId":"cam1-a"}"#);
        })
    };

    let config =
        QuiescenceConfig { settle: Duration::from_millis(10), window: Duration::from_millis(500) };
    let error = playwatch::assert_no_frames_received(&channel, config).await.unwrap_err();
    feeder.await.unwrap();

    assert!(matches!(error, VerifyError::UnexpectedFrame { .. }));
}

#[tokio::test(start_paused = true)]
async fn grid_verification_attributes_the_stalled_cell() {
    let advancing: Vec<u32> = (1..=10).collect();
    let mut cells: Vec<Arc<dyn CellProbe>> = Vec::new();
    for index in 0..6 {
        let seconds: Vec<u32> = if index == 3 { vec![7; 10] } else { advancing.clone() };
        cells.push(Arc::new(TimerCell::new(&format!("cell-{index}"), &seconds)));
    }

    let poller = LivenessPoller::new(LivenessStrategy::TimerText);
    let error = poller.verify_many(&cells, Duration::from_secs(10), true).await.unwrap_err();

    let VerifyError::Liveness { cell, .. } = &error else {
        panic!("expected a liveness error, got {error:?}");
    };
    assert_eq!(cell, "cell-3");
    assert!(!error.is_retryable());
}

#[tokio::test(start_paused = true)]
async fn paused_cell_passes_a_must_not_play_check() {
    let cell = TimerCell::new("cell-0", &[42; 8]);
    let poller = LivenessPoller::new(LivenessStrategy::TimerText);
    poller.verify_one(&cell, Duration::from_secs(8), false).await.unwrap();
}

#[tokio::test]
async fn session_facade_wires_the_components() {
    let channel = Arc::new(ControlChannel::new());
    let session = VerifySession::begin(Arc::clone(&channel), SessionConfig::default());
    tokio::task::yield_now().await;

    session.registry().assert_none_active().unwrap();

    let waiter = {
        let channel = Arc::clone(&channel);
        tokio::spawn(async move {
            let predicate = FramePredicate::all(["jpeg"]);
            playwatch::await_matching_frame(&channel, &predicate, Duration::from_secs(5)).await
        })
    };
    tokio::task::yield_now().await;
    channel.publish_sent(start_payload("cam9-77", 2.0, "jpeg"));

    let frame = waiter.await.unwrap().unwrap();
    assert_eq!(frame.stream_id(), Some("cam9-77"));
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(session.registry().len(), 1);

    session.end();
}

#[test]
fn archive_pointer_flow() {
    // Forward playback: the pointer advances between two readings.
    compare_pointer_positions("10:31:02", "10:31:07", PointerMotion::Forward).unwrap();
    // Reverse playback after a re-speed with a negative rate.
    compare_pointer_positions("10:31:07", "10:31:02", PointerMotion::Reverse).unwrap();
    // The rendered clock truncates; a one-second skew still matches.
    assert!(times_match("10:31:02", "10:31:03", 1).unwrap());
}

#[test]
fn archive_interval_flow() {
    let intervals = vec![
        playwatch::ArchiveInterval {
            begin: "20250611T230000".into(),
            end: "20250611T234500".into(),
        },
        playwatch::ArchiveInterval {
            begin: "20250612T001500".into(),
            end: "20250612T013000".into(),
        },
    ];

    // Viewer at UTC+2: the late-evening interval lands on the next local day.
    let local = transform_intervals(&intervals, -2).unwrap();
    assert_eq!((local[0].begin.day, local[0].begin.hours), (12, 1));
    assert_eq!((local[1].end.day, local[1].end.hours), (12, 3));

    // One 30-minute recording outage between the two segments.
    let gaps = recording_gaps(&intervals).unwrap();
    assert_eq!(gaps, vec![30 * 60 * 1000]);
}
