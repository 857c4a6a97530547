use std::f32::consts::PI;

use anyhow::Result;
use clap::Parser;
use tutorcall::audio::{offline_dispatch_from_pcm, FRAME_SAMPLES, TARGET_RATE};
use tutorcall::link::UplinkMessage;

/// Offline probe for the capture pipeline: pushes a synthetic clip
/// through the frame dispatcher quantum by quantum and reports cadence,
/// levels, and the size of the uplink payload each frame would produce.
#[derive(Debug, Parser)]
#[command(about = "Probe the audio framing pipeline with synthetic PCM")]
struct Args {
    /// Human-friendly label recorded in the output metrics
    #[arg(long, default_value = "clip")]
    label: String,

    /// Duration of the synthetic tone (milliseconds)
    #[arg(long, default_value_t = 2_000)]
    tone_ms: u64,

    /// Tone frequency (Hz)
    #[arg(long, default_value_t = 440.0)]
    tone_hz: f32,

    /// Tone amplitude in [0, 1]
    #[arg(long, default_value_t = 0.4)]
    amplitude: f32,

    /// Trailing silence appended after the tone (milliseconds)
    #[arg(long, default_value_t = 500)]
    silence_ms: u64,

    /// Samples delivered per simulated quantum
    #[arg(long, default_value_t = 128)]
    quantum_samples: usize,

    /// Samples per emitted frame
    #[arg(long, default_value_t = FRAME_SAMPLES)]
    frame_samples: usize,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let clip = synthesize_clip(&args);
    let summary = offline_dispatch_from_pcm(&clip, args.quantum_samples, args.frame_samples);

    let uplink_bytes: usize = summary
        .frames
        .iter()
        .map(|frame| {
            serde_json::to_string(&UplinkMessage::audio_frame(&frame.pcm))
                .map(|payload| payload.len())
                .unwrap_or(0)
        })
        .sum();

    println!(
        "dispatch_metrics|label={}|samples={}|frames={}|pending={}|dropped={}|peak_level={:.1}|uplink_bytes={}",
        args.label,
        clip.len(),
        summary.frames.len(),
        summary.pending_samples,
        summary.frames_dropped,
        summary.peak_level,
        uplink_bytes,
    );
    for (index, frame) in summary.frames.iter().enumerate() {
        println!(
            "frame|index={index}|samples={}|level={:.1}",
            frame.pcm.len(),
            frame.level
        );
    }

    Ok(())
}

fn synthesize_clip(args: &Args) -> Vec<f32> {
    let tone_samples = (args.tone_ms * u64::from(TARGET_RATE) / 1000) as usize;
    let silence_samples = (args.silence_ms * u64::from(TARGET_RATE) / 1000) as usize;
    let mut samples = Vec::with_capacity(tone_samples + silence_samples);
    for n in 0..tone_samples {
        let t = n as f32 / TARGET_RATE as f32;
        samples.push((2.0 * PI * args.tone_hz * t).sin() * args.amplitude);
    }
    samples.extend(std::iter::repeat(0.0).take(silence_samples));
    samples
}
