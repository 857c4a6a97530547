//! Command-line parsing and validation helpers.

mod defaults;
#[cfg(test)]
mod tests;
mod validation;

use clap::Parser;
use std::time::Duration;

pub use defaults::{
    DEFAULT_AUDIO_CHANNEL_CAPACITY, DEFAULT_CAMERA_HEIGHT, DEFAULT_CAMERA_WIDTH,
    DEFAULT_DETECT_INTERVAL_MS, DEFAULT_FRAME_SAMPLES, DEFAULT_LINK_QUEUE_CAPACITY,
    DEFAULT_LINK_URL, DEFAULT_MAX_RESTARTS_PER_MIN, DEFAULT_RESTART_BACKOFF_MS,
    DEFAULT_SPEECH_LOCALE,
};

use crate::media::VideoConstraints;
use crate::session::SessionTuning;
use crate::speech::RecognizerOptions;

/// CLI options for the call session core. Validated values keep the
/// pipeline and the link endpoint safe to wire up.
#[derive(Debug, Parser, Clone)]
#[command(about = "AI tutor call session core", author, version)]
pub struct AppConfig {
    /// Preferred audio input device name
    #[arg(long)]
    pub input_device: Option<String>,

    /// Print detected audio input devices and exit
    #[arg(long = "list-input-devices", default_value_t = false)]
    pub list_input_devices: bool,

    /// Samples per emitted PCM frame
    #[arg(long = "frame-samples", default_value_t = DEFAULT_FRAME_SAMPLES)]
    pub frame_samples: usize,

    /// Frame channel capacity between capture and the session loop
    #[arg(
        long = "audio-channel-capacity",
        default_value_t = DEFAULT_AUDIO_CHANNEL_CAPACITY
    )]
    pub audio_channel_capacity: usize,

    /// Interval between face detection polls (milliseconds)
    #[arg(long = "detect-interval-ms", default_value_t = DEFAULT_DETECT_INTERVAL_MS)]
    pub detect_interval_ms: u64,

    /// Locale passed to the speech recognizer
    #[arg(long = "speech-locale", default_value = DEFAULT_SPEECH_LOCALE)]
    pub speech_locale: String,

    /// Backoff before retrying a failed recognition session (milliseconds)
    #[arg(
        long = "speech-restart-backoff-ms",
        default_value_t = DEFAULT_RESTART_BACKOFF_MS
    )]
    pub speech_restart_backoff_ms: u64,

    /// Rolling cap on recognition restarts per minute
    #[arg(
        long = "speech-max-restarts-per-min",
        default_value_t = DEFAULT_MAX_RESTARTS_PER_MIN
    )]
    pub speech_max_restarts_per_min: u32,

    /// Tutor backend websocket endpoint
    #[arg(long = "link-url", env = "TUTORCALL_LINK_URL", default_value = DEFAULT_LINK_URL)]
    pub link_url: String,

    /// Queue capacity for uplink/downlink link channels
    #[arg(
        long = "link-queue-capacity",
        default_value_t = DEFAULT_LINK_QUEUE_CAPACITY
    )]
    pub link_queue_capacity: usize,

    /// Ideal camera capture width
    #[arg(long = "camera-width", default_value_t = DEFAULT_CAMERA_WIDTH)]
    pub camera_width: u32,

    /// Ideal camera capture height
    #[arg(long = "camera-height", default_value_t = DEFAULT_CAMERA_HEIGHT)]
    pub camera_height: u32,

    /// Capture duration for the mic probe (seconds)
    #[arg(long = "probe-seconds", default_value_t = 5)]
    pub probe_seconds: u64,

    /// Enable file logging (debug)
    #[arg(long = "logs", env = "TUTORCALL_LOGS", default_value_t = false)]
    pub logs: bool,

    /// Disable all file logging (overrides --logs and log env vars)
    #[arg(long = "no-logs", env = "TUTORCALL_NO_LOGS", default_value_t = false)]
    pub no_logs: bool,

    /// Allow logging transcript/content snippets (debug log only)
    #[arg(
        long = "log-content",
        env = "TUTORCALL_LOG_CONTENT",
        default_value_t = false
    )]
    pub log_content: bool,

    /// Enable verbose timing logs
    #[arg(long)]
    pub log_timings: bool,
}

impl AppConfig {
    /// Snapshot the CLI-controlled session knobs for the orchestrator.
    pub fn session_tuning(&self) -> SessionTuning {
        SessionTuning {
            recognizer: RecognizerOptions {
                locale: self.speech_locale.clone(),
                ..RecognizerOptions::default()
            },
            restart_backoff: Duration::from_millis(self.speech_restart_backoff_ms),
            max_restarts_per_min: self.speech_max_restarts_per_min,
            detect_interval: Duration::from_millis(self.detect_interval_ms),
            camera: VideoConstraints {
                ideal_width: self.camera_width,
                ideal_height: self.camera_height,
                ..VideoConstraints::default()
            },
        }
    }
}
