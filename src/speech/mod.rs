//! Speech recognition lifecycle.
//!
//! Recognition is an external capability with start/stop controls and a
//! stream of result/error/end events. A session exists exactly while the
//! call is active; this module supplies the restart policy that keeps it
//! that way: errors get one retry after a fixed backoff, natural ends
//! restart immediately, and a rolling per-minute cap stops a flapping
//! recognizer from restarting forever.

use crossbeam_channel::Receiver;
use regex::Regex;
use std::collections::VecDeque;
use std::fmt;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

/// Backoff before retrying after a recognition error.
pub const RESTART_BACKOFF_MS: u64 = 1_000;

/// Rolling cap on restarts (errors and natural ends combined).
pub const MAX_RESTARTS_PER_MIN: u32 = 10;

const RESTART_WINDOW: Duration = Duration::from_secs(60);

/// Session parameters for the recognition capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognizerOptions {
    pub locale: String,
    pub continuous: bool,
    pub interim_results: bool,
}

impl Default for RecognizerOptions {
    fn default() -> Self {
        Self {
            locale: "en-US".to_string(),
            continuous: true,
            interim_results: true,
        }
    }
}

/// Events a live recognition session produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechEvent {
    /// Alternatives for the utterance so far, in recognizer order.
    Result { alternatives: Vec<String> },
    /// The session failed; it will not produce further events.
    Error(String),
    /// The host ended the session normally (expected to be transient).
    End,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechError {
    Unavailable(String),
    StartFailed(String),
}

impl fmt::Display for SpeechError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpeechError::Unavailable(msg) => write!(f, "speech recognition unavailable: {msg}"),
            SpeechError::StartFailed(msg) => write!(f, "failed to start recognition: {msg}"),
        }
    }
}

impl std::error::Error for SpeechError {}

/// External recognition capability. `start` opens a continuous session and
/// hands back its event stream; `stop` tears the session down and must be
/// safe to call when nothing is running.
pub trait SpeechRecognizer: Send {
    fn start(&mut self, opts: &RecognizerOptions) -> Result<Receiver<SpeechEvent>, SpeechError>;
    fn stop(&mut self);
}

/// Speech output capability. `enqueue` queues synthesized audio for
/// playback; `cancel` drops anything queued or playing.
pub trait SpeechSynthesizer: Send {
    fn enqueue(&mut self, samples: &[f32], sample_rate: u32);
    fn cancel(&mut self);
}

impl SpeechSynthesizer for crate::audio::Playback {
    fn enqueue(&mut self, samples: &[f32], sample_rate: u32) {
        crate::audio::Playback::enqueue(self, samples, sample_rate);
    }

    fn cancel(&mut self) {
        crate::audio::Playback::cancel(self);
    }
}

/// What the supervisor wants done after a session event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartAction {
    /// Nothing to do (retry already pending, or cap reached earlier).
    None,
    /// Restart the session right away.
    Immediate,
    /// Restart once the backoff elapses.
    After(Duration),
    /// The per-minute cap was just hit; stop restarting until reset.
    Exhausted,
}

/// Restart policy for the recognition session.
///
/// Pure decision logic: callers feed it error/end events with a timestamp
/// and execute whatever action comes back. One instance lives per call
/// activation; `reset` re-arms it on the next Idle -> Active transition.
pub struct SpeechSupervisor {
    backoff: Duration,
    max_restarts_per_min: u32,
    recent_restarts: VecDeque<Instant>,
    retry_pending: bool,
    exhausted: bool,
}

impl SpeechSupervisor {
    pub fn new(backoff: Duration, max_restarts_per_min: u32) -> Self {
        Self {
            backoff,
            max_restarts_per_min: max_restarts_per_min.max(1),
            recent_restarts: VecDeque::new(),
            retry_pending: false,
            exhausted: false,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// An error arrived while the call is still active: schedule a single
    /// retry after the backoff. Further errors while that retry is pending
    /// schedule nothing.
    pub fn on_error(&mut self, now: Instant) -> RestartAction {
        if self.exhausted || self.retry_pending {
            return RestartAction::None;
        }
        if !self.admit_restart(now) {
            return RestartAction::Exhausted;
        }
        self.retry_pending = true;
        RestartAction::After(self.backoff)
    }

    /// The session ended naturally while the call is still active: restart
    /// immediately, no backoff.
    pub fn on_end(&mut self, now: Instant) -> RestartAction {
        if self.exhausted || self.retry_pending {
            return RestartAction::None;
        }
        if !self.admit_restart(now) {
            return RestartAction::Exhausted;
        }
        RestartAction::Immediate
    }

    /// The scheduled backoff retry fired and the session was restarted.
    pub fn retry_fired(&mut self) {
        self.retry_pending = false;
    }

    /// Re-arm on a fresh activation.
    pub fn reset(&mut self) {
        self.recent_restarts.clear();
        self.retry_pending = false;
        self.exhausted = false;
    }

    fn admit_restart(&mut self, now: Instant) -> bool {
        while let Some(&oldest) = self.recent_restarts.front() {
            if now.duration_since(oldest) > RESTART_WINDOW {
                self.recent_restarts.pop_front();
            } else {
                break;
            }
        }
        if self.recent_restarts.len() as u32 >= self.max_restarts_per_min {
            self.exhausted = true;
            return false;
        }
        self.recent_restarts.push_back(now);
        true
    }
}

/// Join result alternatives in recognizer order. No reordering, no
/// filtering — alternatives arrive ranked and the transcript preserves
/// that ranking.
pub fn concat_alternatives(alternatives: &[String]) -> String {
    alternatives.concat()
}

/// Strip bracketed non-speech markers and collapse whitespace so the
/// transcript surfaced to consumers reads clean.
pub fn sanitize_transcript(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    static NON_SPEECH_RE: OnceLock<Regex> = OnceLock::new();
    let re = NON_SPEECH_RE.get_or_init(|| {
        Regex::new(
            r"(?i)\[\s*\]|\(\s*\)|\[(?:\s*(?:silence|noise|inaudible|music|laughter|applause|cough|breath(?:ing)?|background)\s*)\]|\((?:\s*(?:silence|noise|inaudible|music|laughter|applause|cough|breath(?:ing)?|background)\s*)\)",
        )
        .expect("non-speech regex should compile")
    });
    let without_markers = re.replace_all(trimmed, " ");
    without_markers
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn supervisor() -> SpeechSupervisor {
        SpeechSupervisor::new(Duration::from_millis(RESTART_BACKOFF_MS), MAX_RESTARTS_PER_MIN)
    }

    #[test]
    fn error_schedules_exactly_one_backoff_retry() {
        let mut sup = supervisor();
        let now = Instant::now();
        assert_eq!(
            sup.on_error(now),
            RestartAction::After(Duration::from_millis(RESTART_BACKOFF_MS))
        );
        // A second error while the retry is pending schedules nothing.
        assert_eq!(sup.on_error(now), RestartAction::None);
        sup.retry_fired();
        assert_eq!(
            sup.on_error(now),
            RestartAction::After(Duration::from_millis(RESTART_BACKOFF_MS))
        );
    }

    #[test]
    fn natural_end_restarts_immediately() {
        let mut sup = supervisor();
        assert_eq!(sup.on_end(Instant::now()), RestartAction::Immediate);
    }

    #[test]
    fn end_while_retry_pending_does_not_double_restart() {
        let mut sup = supervisor();
        let now = Instant::now();
        assert!(matches!(sup.on_error(now), RestartAction::After(_)));
        assert_eq!(sup.on_end(now), RestartAction::None);
    }

    #[test]
    fn restart_cap_parks_the_supervisor() {
        let mut sup = SpeechSupervisor::new(Duration::from_secs(1), 3);
        let now = Instant::now();
        for _ in 0..3 {
            assert_eq!(sup.on_end(now), RestartAction::Immediate);
        }
        assert_eq!(sup.on_end(now), RestartAction::Exhausted);
        assert!(sup.is_exhausted());
        // Everything after the cap is a quiet no-op.
        assert_eq!(sup.on_end(now), RestartAction::None);
        assert_eq!(sup.on_error(now), RestartAction::None);
    }

    #[test]
    fn restart_window_is_rolling() {
        let mut sup = SpeechSupervisor::new(Duration::from_secs(1), 2);
        let t0 = Instant::now();
        assert_eq!(sup.on_end(t0), RestartAction::Immediate);
        assert_eq!(sup.on_end(t0 + Duration::from_secs(1)), RestartAction::Immediate);
        // Both restarts have aged out of the window by t0+70s.
        assert_eq!(
            sup.on_end(t0 + Duration::from_secs(70)),
            RestartAction::Immediate
        );
        assert!(!sup.is_exhausted());
    }

    #[test]
    fn reset_rearms_after_exhaustion() {
        let mut sup = SpeechSupervisor::new(Duration::from_secs(1), 1);
        let now = Instant::now();
        assert_eq!(sup.on_end(now), RestartAction::Immediate);
        assert_eq!(sup.on_end(now), RestartAction::Exhausted);
        sup.reset();
        assert!(!sup.is_exhausted());
        assert_eq!(sup.on_end(now), RestartAction::Immediate);
    }

    #[test]
    fn alternatives_concatenate_in_order() {
        let alternatives = vec!["hello ".to_string(), "world".to_string()];
        assert_eq!(concat_alternatives(&alternatives), "hello world");
        assert_eq!(concat_alternatives(&[]), "");
    }

    #[test]
    fn sanitize_strips_markers_and_collapses_whitespace() {
        assert_eq!(
            sanitize_transcript("  hello   [noise] world (laughter) "),
            "hello world"
        );
        assert_eq!(sanitize_transcript("[silence]"), "");
        assert_eq!(sanitize_transcript(""), "");
    }

    #[test]
    fn recognizer_options_default_to_continuous_interim() {
        let opts = RecognizerOptions::default();
        assert!(opts.continuous);
        assert!(opts.interim_results);
        assert_eq!(opts.locale, "en-US");
    }
}
