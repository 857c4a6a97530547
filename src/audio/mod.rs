//! Audio capture pipeline.
//!
//! Microphone audio is captured via CPAL, normalized to mono at the
//! pipeline rate, measured for loudness every quantum, and packed into
//! fixed-size 16-bit PCM frames for the session to stream out.

/// Rate the capture pipeline normalizes to before framing.
pub const TARGET_RATE: u32 = 16_000;

/// Samples per emitted PCM frame.
pub const FRAME_SAMPLES: usize = 4096;

mod capture;
mod dispatch;
mod meter;
mod playback;

pub use capture::{CaptureStream, MicCapture};
pub use dispatch::{offline_dispatch_from_pcm, AudioFrame, DispatchSummary, FrameDispatcher};
pub use meter::LiveMeter;
pub use playback::Playback;
