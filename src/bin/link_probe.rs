use std::f32::consts::PI;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossbeam_channel::RecvTimeoutError;
use tutorcall::audio::{offline_dispatch_from_pcm, TARGET_RATE};
use tutorcall::config::AppConfig;
use tutorcall::link::{DownlinkEvent, LinkClient, UplinkMessage};
use tutorcall::{init_logging, init_tracing, log_debug};

/// Streams a short synthetic clip to the tutor backend and prints every
/// downlink event, so the websocket wiring can be checked without a
/// browser in front of it.
fn main() -> Result<()> {
    let config = AppConfig::parse_args()?;
    init_logging(&config);
    init_tracing(&config);

    let endpoint = config.link_endpoint()?;
    let client = LinkClient::connect(&endpoint, config.link_queue_capacity)?;
    println!("connected to {endpoint}");

    // One second of a 440 Hz tone, framed exactly like live capture.
    let clip: Vec<f32> = (0..TARGET_RATE as usize)
        .map(|n| (2.0 * PI * 440.0 * n as f32 / TARGET_RATE as f32).sin() * 0.4)
        .collect();
    let summary = offline_dispatch_from_pcm(&clip, 128, config.frame_samples);
    for frame in &summary.frames {
        client.send(UplinkMessage::audio_frame(&frame.pcm))?;
    }
    println!("sent {} frames", summary.frames.len());
    log_debug(&format!("link probe sent {} frames", summary.frames.len()));

    let events = client.events();
    let deadline = Instant::now() + Duration::from_secs(config.probe_seconds);
    while Instant::now() < deadline {
        match events.recv_timeout(Duration::from_millis(200)) {
            Ok(DownlinkEvent::Text(text)) => println!("text|{text}"),
            Ok(DownlinkEvent::Audio(samples)) => println!("audio|samples={}", samples.len()),
            Ok(DownlinkEvent::Transcription {
                text,
                sender,
                finished,
            }) => println!("transcription|sender={sender}|finished={finished}|{text}"),
            Ok(DownlinkEvent::Interrupted) => println!("interrupted"),
            Ok(DownlinkEvent::Closed(reason)) => {
                println!("closed|{reason}");
                break;
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    client.close();
    Ok(())
}
