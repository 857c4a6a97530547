//! Call session orchestration.
//!
//! One `CallOrchestrator` owns everything a live call touches: the media
//! acquisition, the detection poller, the speech-recognition session, the
//! speech output sink, and the uplink/downlink channels. It runs a single
//! cooperative event loop — user commands, the one-second duration tick,
//! the detection tick, speech events, and the restart timer all interleave
//! on one thread. Failures become `last_error` or a logged skip; nothing
//! escapes the loop.

use crossbeam_channel::{at, never, tick, Receiver, Sender};
use std::time::{Duration, Instant};

use crate::audio::AudioFrame;
use crate::detect::{DetectionPoller, Overlay, VideoSurface, POLL_INTERVAL_MS};
use crate::link::{DownlinkEvent, UplinkMessage};
use crate::log_debug;
use crate::media::{MediaDevices, MediaSession, VideoConstraints};
use crate::speech::{
    concat_alternatives, sanitize_transcript, RecognizerOptions, RestartAction, SpeechEvent,
    SpeechRecognizer, SpeechSupervisor, SpeechSynthesizer, MAX_RESTARTS_PER_MIN,
    RESTART_BACKOFF_MS,
};

/// Sample rate of downlink tutor audio.
pub const DOWNLINK_AUDIO_RATE: u32 = 24_000;

/// User-driven commands into the orchestrator loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    ToggleMic,
    ToggleCamera,
    ToggleCall,
    Shutdown,
}

/// Knobs the CLI exposes for the session.
#[derive(Debug, Clone)]
pub struct SessionTuning {
    pub recognizer: RecognizerOptions,
    pub restart_backoff: Duration,
    pub max_restarts_per_min: u32,
    pub detect_interval: Duration,
    pub camera: VideoConstraints,
}

impl Default for SessionTuning {
    fn default() -> Self {
        Self {
            recognizer: RecognizerOptions::default(),
            restart_backoff: Duration::from_millis(RESTART_BACKOFF_MS),
            max_restarts_per_min: MAX_RESTARTS_PER_MIN,
            detect_interval: Duration::from_millis(POLL_INTERVAL_MS),
            camera: VideoConstraints::default(),
        }
    }
}

/// Read-only view of the session for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub active: bool,
    pub duration_seconds: u64,
    pub mic_enabled: bool,
    pub camera_enabled: bool,
    pub last_error: Option<String>,
    pub last_transcript: String,
    pub last_reply: String,
}

/// The call-lifecycle state machine plus every resource tied to it.
pub struct CallOrchestrator {
    media: MediaSession,
    recognizer: Box<dyn SpeechRecognizer>,
    synthesizer: Box<dyn SpeechSynthesizer>,
    supervisor: SpeechSupervisor,
    tuning: SessionTuning,

    active: bool,
    duration_seconds: u64,
    last_error: Option<String>,
    last_transcript: String,
    last_reply: String,

    speech_events: Option<Receiver<SpeechEvent>>,
    pending_restart: Option<Instant>,

    poller: Option<DetectionPoller>,
    surface: Option<Box<dyn VideoSurface>>,
    overlay: Option<Box<dyn Overlay>>,

    frames: Option<Receiver<AudioFrame>>,
    uplink: Option<Sender<UplinkMessage>>,
    downlink: Option<Receiver<DownlinkEvent>>,
}

impl CallOrchestrator {
    pub fn new(
        devices: Box<dyn MediaDevices>,
        recognizer: Box<dyn SpeechRecognizer>,
        synthesizer: Box<dyn SpeechSynthesizer>,
        tuning: SessionTuning,
    ) -> Self {
        let supervisor = SpeechSupervisor::new(tuning.restart_backoff, tuning.max_restarts_per_min);
        let mut media = MediaSession::new(devices);
        media.set_video_constraints(tuning.camera);
        Self {
            media,
            recognizer,
            synthesizer,
            supervisor,
            tuning,
            active: false,
            duration_seconds: 0,
            last_error: None,
            last_transcript: String::new(),
            last_reply: String::new(),
            speech_events: None,
            pending_restart: None,
            poller: None,
            surface: None,
            overlay: None,
            frames: None,
            uplink: None,
            downlink: None,
        }
    }

    /// Mount the detection loop: a loaded detector plus the surface and
    /// overlay it renders through. Polling starts on the next tick and
    /// runs whether or not a call is active.
    pub fn attach_detection(
        &mut self,
        poller: DetectionPoller,
        surface: Box<dyn VideoSurface>,
        overlay: Box<dyn Overlay>,
    ) {
        self.poller = Some(poller);
        self.surface = Some(surface);
        self.overlay = Some(overlay);
    }

    /// Connect the capture pipeline's frame stream.
    pub fn attach_frames(&mut self, frames: Receiver<AudioFrame>) {
        self.frames = Some(frames);
    }

    /// Connect the live-session link.
    pub fn attach_link(
        &mut self,
        uplink: Sender<UplinkMessage>,
        downlink: Receiver<DownlinkEvent>,
    ) {
        self.uplink = Some(uplink);
        self.downlink = Some(downlink);
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            active: self.active,
            duration_seconds: self.duration_seconds,
            mic_enabled: self.media.mic_enabled(),
            camera_enabled: self.media.camera_enabled(),
            last_error: self.last_error.clone(),
            last_transcript: self.last_transcript.clone(),
            last_reply: self.last_reply.clone(),
        }
    }

    // ------------------------------------------------------------------
    // State transitions
    // ------------------------------------------------------------------

    pub fn toggle_call(&mut self, now: Instant) {
        if self.active {
            self.deactivate();
        } else {
            self.activate(now);
        }
    }

    fn activate(&mut self, _now: Instant) {
        self.active = true;
        self.duration_seconds = 0;
        self.supervisor.reset();
        self.start_recognition();
        log_debug("call activated");
    }

    /// Leave Active: stop the duration counter, tear down recognition,
    /// silence pending speech output, clear the error banner. Runs on
    /// toggle-off and on teardown; every step is unconditional.
    fn deactivate(&mut self) {
        self.active = false;
        self.duration_seconds = 0;
        self.pending_restart = None;
        self.stop_recognition();
        self.synthesizer.cancel();
        self.last_error = None;
        log_debug("call deactivated");
    }

    /// Full teardown at unmount: everything deactivate does, plus the
    /// media acquisition itself.
    pub fn teardown(&mut self) {
        if self.active {
            self.deactivate();
        } else {
            // Recognition can only exist while active, but stopping is
            // cheap and keeps unmount safe against any path that leaked.
            self.stop_recognition();
            self.synthesizer.cancel();
        }
        self.media.release();
        log_debug("session torn down");
    }

    pub fn toggle_mic(&mut self) {
        if let Err(err) = self.media.toggle_mic() {
            self.last_error = Some(err.to_string());
        }
    }

    pub fn toggle_camera(&mut self) {
        if let Err(err) = self.media.toggle_camera() {
            self.last_error = Some(err.to_string());
        }
    }

    // ------------------------------------------------------------------
    // Event handlers
    // ------------------------------------------------------------------

    pub fn on_duration_tick(&mut self) {
        if self.active {
            self.duration_seconds += 1;
        }
    }

    pub fn on_detect_tick(&mut self) {
        if let (Some(poller), Some(surface), Some(overlay)) =
            (&mut self.poller, &self.surface, &mut self.overlay)
        {
            poller.poll_tick(surface.as_ref(), overlay.as_mut());
        }
    }

    pub fn on_speech_event(&mut self, event: SpeechEvent, now: Instant) {
        if !self.active {
            return;
        }
        match event {
            SpeechEvent::Result { alternatives } => {
                self.last_transcript = sanitize_transcript(&concat_alternatives(&alternatives));
                crate::log_debug_content(&format!("transcript: {}", self.last_transcript));
            }
            SpeechEvent::Error(message) => {
                log_debug(&format!("recognition error: {message}"));
                self.last_error = Some(message);
                match self.supervisor.on_error(now) {
                    RestartAction::After(backoff) => {
                        self.pending_restart = Some(now + backoff);
                    }
                    RestartAction::Exhausted => self.note_exhausted(),
                    RestartAction::Immediate | RestartAction::None => {}
                }
            }
            SpeechEvent::End => match self.supervisor.on_end(now) {
                RestartAction::Immediate => {
                    log_debug("recognition ended; restarting");
                    self.start_recognition();
                }
                RestartAction::Exhausted => self.note_exhausted(),
                RestartAction::After(_) | RestartAction::None => {}
            },
        }
    }

    /// The recognizer's event channel disconnected without a terminal
    /// event. Drop the stale receiver; a proper End/Error was either
    /// already handled or never coming.
    pub fn on_speech_channel_closed(&mut self) {
        self.speech_events = None;
    }

    pub fn on_restart_deadline(&mut self, _now: Instant) {
        self.pending_restart = None;
        self.supervisor.retry_fired();
        if self.active {
            log_debug("recognition retry firing");
            self.start_recognition();
        }
    }

    pub fn on_frame(&mut self, frame: AudioFrame) {
        if let Some(uplink) = &self.uplink {
            // Frames are disposable once stale; never block the loop on a
            // slow link.
            let _ = uplink.try_send(UplinkMessage::audio_frame(&frame.pcm));
        }
    }

    pub fn on_downlink_event(&mut self, event: DownlinkEvent) {
        match event {
            DownlinkEvent::Audio(samples) => {
                self.synthesizer.enqueue(&samples, DOWNLINK_AUDIO_RATE);
            }
            DownlinkEvent::Text(text) => {
                self.last_reply = text;
            }
            DownlinkEvent::Transcription {
                text, finished: _, ..
            } => {
                if !text.is_empty() {
                    self.last_reply = text;
                }
            }
            DownlinkEvent::Interrupted => {
                log_debug("tutor interrupted; cancelling queued audio");
                self.synthesizer.cancel();
            }
            DownlinkEvent::Closed(reason) => {
                log_debug(&format!("link closed: {reason}"));
                self.downlink = None;
                self.uplink = None;
            }
        }
    }

    // ------------------------------------------------------------------
    // Recognition plumbing
    // ------------------------------------------------------------------

    fn start_recognition(&mut self) {
        self.stop_recognition();
        match self.recognizer.start(&self.tuning.recognizer) {
            Ok(events) => {
                self.speech_events = Some(events);
            }
            Err(err) => {
                log_debug(&format!("recognition start failed: {err}"));
                self.last_error = Some(err.to_string());
            }
        }
    }

    fn stop_recognition(&mut self) {
        if self.speech_events.take().is_some() {
            self.recognizer.stop();
        }
    }

    fn note_exhausted(&mut self) {
        let message = format!(
            "speech recognition restart limit reached ({} per minute)",
            self.tuning.max_restarts_per_min
        );
        log_debug(&message);
        self.last_error = Some(message);
    }

    // ------------------------------------------------------------------
    // Event loop
    // ------------------------------------------------------------------

    /// Run until `Shutdown` arrives or the command channel closes.
    /// Consumes and returns the orchestrator so callers can inspect the
    /// final state after the loop exits.
    pub fn run(mut self, commands: &Receiver<SessionCommand>) -> Self {
        let mut duration_tick = tick(Duration::from_secs(1));
        let detect_tick = tick(self.tuning.detect_interval);

        loop {
            let speech = self.speech_events.clone().unwrap_or_else(never);
            let frames = self.frames.clone().unwrap_or_else(never);
            let downlink = self.downlink.clone().unwrap_or_else(never);
            let restart_timer = match self.pending_restart {
                Some(deadline) => at(deadline),
                None => never(),
            };

            let mut call_toggled_on = false;
            crossbeam_channel::select! {
                recv(commands) -> cmd => match cmd {
                    Ok(SessionCommand::ToggleMic) => self.toggle_mic(),
                    Ok(SessionCommand::ToggleCamera) => self.toggle_camera(),
                    Ok(SessionCommand::ToggleCall) => {
                        self.toggle_call(Instant::now());
                        call_toggled_on = self.active;
                    }
                    Ok(SessionCommand::Shutdown) | Err(_) => {
                        self.teardown();
                        break;
                    }
                },
                recv(duration_tick) -> _ => self.on_duration_tick(),
                recv(detect_tick) -> _ => self.on_detect_tick(),
                recv(speech) -> event => match event {
                    Ok(event) => self.on_speech_event(event, Instant::now()),
                    Err(_) => self.on_speech_channel_closed(),
                },
                recv(frames) -> frame => match frame {
                    Ok(frame) => self.on_frame(frame),
                    Err(_) => self.frames = None,
                },
                recv(downlink) -> event => match event {
                    Ok(event) => self.on_downlink_event(event),
                    Err(_) => {
                        self.downlink = None;
                        self.uplink = None;
                    }
                },
                recv(restart_timer) -> _ => self.on_restart_deadline(Instant::now()),
            }

            if call_toggled_on {
                // Align the counter's first increment with the moment the
                // call started.
                duration_tick = tick(Duration::from_secs(1));
            }
        }
        self
    }
}

#[cfg(test)]
mod tests;
