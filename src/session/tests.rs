use super::*;
use crate::media::fake::FakeDevices;
use crate::speech::SpeechError;
use crossbeam_channel::unbounded;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Recognizer double: counts starts/stops, hands out a channel the test
/// can feed events into, and can be told to fail the next start.
pub(crate) struct MockRecognizer {
    pub(crate) starts: Arc<AtomicUsize>,
    pub(crate) stops: Arc<AtomicUsize>,
    pub(crate) event_tx: Arc<Mutex<Option<Sender<SpeechEvent>>>>,
    pub(crate) fail_next_start: Arc<Mutex<Option<SpeechError>>>,
}

impl MockRecognizer {
    pub(crate) fn new() -> Self {
        Self {
            starts: Arc::new(AtomicUsize::new(0)),
            stops: Arc::new(AtomicUsize::new(0)),
            event_tx: Arc::new(Mutex::new(None)),
            fail_next_start: Arc::new(Mutex::new(None)),
        }
    }

    pub(crate) fn handles(
        &self,
    ) -> (
        Arc<AtomicUsize>,
        Arc<AtomicUsize>,
        Arc<Mutex<Option<Sender<SpeechEvent>>>>,
    ) {
        (
            self.starts.clone(),
            self.stops.clone(),
            self.event_tx.clone(),
        )
    }
}

impl SpeechRecognizer for MockRecognizer {
    fn start(&mut self, _opts: &RecognizerOptions) -> Result<Receiver<SpeechEvent>, SpeechError> {
        if let Some(err) = self.fail_next_start.lock().unwrap().take() {
            return Err(err);
        }
        self.starts.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = unbounded();
        *self.event_tx.lock().unwrap() = Some(tx);
        Ok(rx)
    }

    fn stop(&mut self) {
        self.stops.fetch_add(1, Ordering::Relaxed);
        *self.event_tx.lock().unwrap() = None;
    }
}

/// Synthesizer double recording enqueue/cancel traffic.
pub(crate) struct MockSynthesizer {
    pub(crate) enqueues: Arc<AtomicUsize>,
    pub(crate) cancels: Arc<AtomicUsize>,
}

impl MockSynthesizer {
    pub(crate) fn new() -> Self {
        Self {
            enqueues: Arc::new(AtomicUsize::new(0)),
            cancels: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl SpeechSynthesizer for MockSynthesizer {
    fn enqueue(&mut self, _samples: &[f32], _sample_rate: u32) {
        self.enqueues.fetch_add(1, Ordering::Relaxed);
    }

    fn cancel(&mut self) {
        self.cancels.fetch_add(1, Ordering::Relaxed);
    }
}

struct Fixture {
    orchestrator: CallOrchestrator,
    starts: Arc<AtomicUsize>,
    stops: Arc<AtomicUsize>,
    cancels: Arc<AtomicUsize>,
    enqueues: Arc<AtomicUsize>,
}

fn fixture() -> Fixture {
    fixture_with_tuning(SessionTuning::default())
}

fn fixture_with_tuning(tuning: SessionTuning) -> Fixture {
    let recognizer = MockRecognizer::new();
    let (starts, stops, _events) = recognizer.handles();
    let synthesizer = MockSynthesizer::new();
    let cancels = synthesizer.cancels.clone();
    let enqueues = synthesizer.enqueues.clone();
    let orchestrator = CallOrchestrator::new(
        Box::new(FakeDevices::new()),
        Box::new(recognizer),
        Box::new(synthesizer),
        tuning,
    );
    Fixture {
        orchestrator,
        starts,
        stops,
        cancels,
        enqueues,
    }
}

#[test]
fn entering_active_starts_exactly_one_recognition_session() {
    let mut fx = fixture();
    fx.orchestrator.toggle_call(Instant::now());
    assert!(fx.orchestrator.snapshot().active);
    assert_eq!(fx.starts.load(Ordering::Relaxed), 1);
    assert_eq!(fx.stops.load(Ordering::Relaxed), 0);
}

#[test]
fn repeated_cycles_leave_no_duplicate_sessions() {
    let mut fx = fixture();
    for _ in 0..3 {
        fx.orchestrator.toggle_call(Instant::now());
        fx.orchestrator.toggle_call(Instant::now());
    }
    assert_eq!(fx.starts.load(Ordering::Relaxed), 3);
    assert_eq!(fx.stops.load(Ordering::Relaxed), 3);
    assert!(!fx.orchestrator.snapshot().active);
}

#[test]
fn duration_ticks_only_while_active_and_resets_on_exit() {
    let mut fx = fixture();
    fx.orchestrator.on_duration_tick();
    assert_eq!(fx.orchestrator.snapshot().duration_seconds, 0);

    fx.orchestrator.toggle_call(Instant::now());
    fx.orchestrator.on_duration_tick();
    fx.orchestrator.on_duration_tick();
    assert_eq!(fx.orchestrator.snapshot().duration_seconds, 2);

    fx.orchestrator.toggle_call(Instant::now());
    assert_eq!(fx.orchestrator.snapshot().duration_seconds, 0);
}

#[test]
fn leaving_active_cancels_synthesis_and_clears_error() {
    let mut fx = fixture();
    let now = Instant::now();
    fx.orchestrator.toggle_call(now);
    fx.orchestrator
        .on_speech_event(SpeechEvent::Error("mic gone".into()), now);
    assert!(fx.orchestrator.snapshot().last_error.is_some());

    fx.orchestrator.toggle_call(now);
    let snapshot = fx.orchestrator.snapshot();
    assert!(!snapshot.active);
    assert_eq!(snapshot.last_error, None);
    assert_eq!(fx.cancels.load(Ordering::Relaxed), 1);
    assert_eq!(fx.stops.load(Ordering::Relaxed), 1);
}

#[test]
fn error_schedules_one_restart_after_backoff() {
    let mut fx = fixture();
    let now = Instant::now();
    fx.orchestrator.toggle_call(now);
    assert_eq!(fx.starts.load(Ordering::Relaxed), 1);

    fx.orchestrator
        .on_speech_event(SpeechEvent::Error("transient".into()), now);
    // Not restarted yet; waiting out the backoff. The call stays active.
    assert_eq!(fx.starts.load(Ordering::Relaxed), 1);
    assert!(fx.orchestrator.snapshot().active);
    assert_eq!(
        fx.orchestrator.snapshot().last_error,
        Some("transient".into())
    );

    fx.orchestrator.on_restart_deadline(now + Duration::from_secs(1));
    assert_eq!(fx.starts.load(Ordering::Relaxed), 2);
}

#[test]
fn natural_end_restarts_immediately() {
    let mut fx = fixture();
    let now = Instant::now();
    fx.orchestrator.toggle_call(now);
    fx.orchestrator.on_speech_event(SpeechEvent::End, now);
    assert_eq!(fx.starts.load(Ordering::Relaxed), 2);
    // No error surfaced: a natural end is not a failure.
    assert_eq!(fx.orchestrator.snapshot().last_error, None);
}

#[test]
fn speech_events_are_ignored_when_idle() {
    let mut fx = fixture();
    let now = Instant::now();
    fx.orchestrator.on_speech_event(SpeechEvent::End, now);
    fx.orchestrator
        .on_speech_event(SpeechEvent::Error("late".into()), now);
    assert_eq!(fx.starts.load(Ordering::Relaxed), 0);
    assert_eq!(fx.orchestrator.snapshot().last_error, None);
}

#[test]
fn restart_cap_surfaces_error_but_keeps_call_active() {
    let tuning = SessionTuning {
        max_restarts_per_min: 2,
        ..SessionTuning::default()
    };
    let mut fx = fixture_with_tuning(tuning);
    let now = Instant::now();
    fx.orchestrator.toggle_call(now);
    fx.orchestrator.on_speech_event(SpeechEvent::End, now);
    fx.orchestrator.on_speech_event(SpeechEvent::End, now);
    // Third end hits the cap: no restart, error surfaced, still active.
    fx.orchestrator.on_speech_event(SpeechEvent::End, now);
    assert_eq!(fx.starts.load(Ordering::Relaxed), 3);
    let snapshot = fx.orchestrator.snapshot();
    assert!(snapshot.active);
    assert!(snapshot
        .last_error
        .as_deref()
        .is_some_and(|msg| msg.contains("restart limit")));
}

#[test]
fn cap_resets_on_next_activation() {
    let tuning = SessionTuning {
        max_restarts_per_min: 1,
        ..SessionTuning::default()
    };
    let mut fx = fixture_with_tuning(tuning);
    let now = Instant::now();
    fx.orchestrator.toggle_call(now);
    fx.orchestrator.on_speech_event(SpeechEvent::End, now);
    fx.orchestrator.on_speech_event(SpeechEvent::End, now);
    assert!(fx.orchestrator.snapshot().last_error.is_some());

    fx.orchestrator.toggle_call(now); // off
    fx.orchestrator.toggle_call(now); // on again, supervisor re-armed
    fx.orchestrator.on_speech_event(SpeechEvent::End, now);
    // starts: activate(1) + end-restart(2) + reactivate(3) + end-restart(4)
    assert_eq!(fx.starts.load(Ordering::Relaxed), 4);
}

#[test]
fn result_event_concatenates_alternatives_in_order() {
    let mut fx = fixture();
    let now = Instant::now();
    fx.orchestrator.toggle_call(now);
    fx.orchestrator.on_speech_event(
        SpeechEvent::Result {
            alternatives: vec!["what is ".into(), "photosynthesis".into()],
        },
        now,
    );
    assert_eq!(
        fx.orchestrator.snapshot().last_transcript,
        "what is photosynthesis"
    );
}

#[test]
fn recognition_start_failure_surfaces_error_and_keeps_session() {
    let recognizer = MockRecognizer::new();
    *recognizer.fail_next_start.lock().unwrap() =
        Some(SpeechError::Unavailable("no engine".into()));
    let starts = recognizer.starts.clone();
    let mut orchestrator = CallOrchestrator::new(
        Box::new(FakeDevices::new()),
        Box::new(recognizer),
        Box::new(MockSynthesizer::new()),
        SessionTuning::default(),
    );
    orchestrator.toggle_call(Instant::now());
    assert_eq!(starts.load(Ordering::Relaxed), 0);
    let snapshot = orchestrator.snapshot();
    assert!(snapshot.active);
    assert!(snapshot
        .last_error
        .as_deref()
        .is_some_and(|msg| msg.contains("no engine")));
}

#[test]
fn media_toggle_failure_lands_in_last_error() {
    let mut devices = FakeDevices::new();
    devices.fail_with = Some(crate::media::MediaError::PermissionDenied(
        "camera blocked".into(),
    ));
    let mut orchestrator = CallOrchestrator::new(
        Box::new(devices),
        Box::new(MockRecognizer::new()),
        Box::new(MockSynthesizer::new()),
        SessionTuning::default(),
    );
    orchestrator.toggle_camera();
    let snapshot = orchestrator.snapshot();
    assert!(snapshot
        .last_error
        .as_deref()
        .is_some_and(|msg| msg.contains("camera blocked")));
    // The toggle itself still registered the user's intent.
    assert!(snapshot.camera_enabled);
}

#[test]
fn teardown_from_active_cleans_everything() {
    let mut fx = fixture();
    fx.orchestrator.toggle_call(Instant::now());
    fx.orchestrator.toggle_mic();
    fx.orchestrator.teardown();
    let snapshot = fx.orchestrator.snapshot();
    assert!(!snapshot.active);
    assert_eq!(snapshot.duration_seconds, 0);
    assert_eq!(fx.stops.load(Ordering::Relaxed), 1);
    assert_eq!(fx.cancels.load(Ordering::Relaxed), 1);
}

#[test]
fn teardown_when_idle_is_safe() {
    let mut fx = fixture();
    fx.orchestrator.teardown();
    assert_eq!(fx.stops.load(Ordering::Relaxed), 0);
    assert_eq!(fx.cancels.load(Ordering::Relaxed), 1);
}

#[test]
fn downlink_audio_feeds_synthesizer_and_interrupt_cancels() {
    let mut fx = fixture();
    fx.orchestrator
        .on_downlink_event(DownlinkEvent::Audio(vec![0.0; 480]));
    assert_eq!(fx.enqueues.load(Ordering::Relaxed), 1);

    fx.orchestrator.on_downlink_event(DownlinkEvent::Interrupted);
    assert_eq!(fx.cancels.load(Ordering::Relaxed), 1);
}

#[test]
fn downlink_text_and_transcription_update_reply() {
    let mut fx = fixture();
    fx.orchestrator
        .on_downlink_event(DownlinkEvent::Text("chlorophyll absorbs light".into()));
    assert_eq!(
        fx.orchestrator.snapshot().last_reply,
        "chlorophyll absorbs light"
    );
    fx.orchestrator.on_downlink_event(DownlinkEvent::Transcription {
        text: "let me explain".into(),
        sender: "Gemini".into(),
        finished: false,
    });
    assert_eq!(fx.orchestrator.snapshot().last_reply, "let me explain");
}

#[test]
fn frames_forward_to_uplink() {
    let mut fx = fixture();
    let (uplink_tx, uplink_rx) = crossbeam_channel::bounded(4);
    let (_downlink_tx, downlink_rx) = crossbeam_channel::bounded::<DownlinkEvent>(4);
    fx.orchestrator.attach_link(uplink_tx, downlink_rx);

    fx.orchestrator.on_frame(AudioFrame {
        pcm: vec![0, 1, -1],
        level: 12.0,
    });
    let message = uplink_rx.try_recv().expect("uplink message");
    assert!(matches!(message, UplinkMessage::RealtimeInput { .. }));
}
