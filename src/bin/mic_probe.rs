use std::time::{Duration, Instant};

use anyhow::Result;
use crossbeam_channel::RecvTimeoutError;
use tutorcall::audio::{LiveMeter, MicCapture};
use tutorcall::config::AppConfig;
use tutorcall::{init_logging, init_tracing, log_debug};

/// Live capture probe: runs the real microphone through the framing
/// pipeline for a few seconds and reports frame cadence and loudness so
/// users can verify their input device before joining a call.
fn main() -> Result<()> {
    let config = AppConfig::parse_args()?;
    init_logging(&config);
    init_tracing(&config);

    if config.list_input_devices {
        for name in MicCapture::list_devices()? {
            println!("{name}");
        }
        return Ok(());
    }

    let capture = MicCapture::new(config.input_device.as_deref())?;
    println!("capturing from '{}'", capture.device_name());
    log_debug(&format!("mic probe started on '{}'", capture.device_name()));

    let meter = LiveMeter::new();
    let stream = capture.start(
        config.frame_samples,
        config.audio_channel_capacity,
        meter.clone(),
    )?;

    let deadline = Instant::now() + Duration::from_secs(config.probe_seconds);
    let mut frames = 0usize;
    let mut peak_level = 0.0f32;
    while Instant::now() < deadline {
        match stream.frames().recv_timeout(Duration::from_millis(200)) {
            Ok(frame) => {
                frames += 1;
                peak_level = peak_level.max(frame.level);
                println!(
                    "frame|index={frames}|samples={}|level={:.1}",
                    frame.pcm.len(),
                    frame.level
                );
            }
            Err(RecvTimeoutError::Timeout) => {
                println!("meter|level={:.1}", meter.level());
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    println!(
        "capture_metrics|frames={frames}|dropped={}|peak_level={peak_level:.1}",
        stream.frames_dropped(),
    );
    Ok(())
}
