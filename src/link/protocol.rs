//! Wire types for the tutor backend link.
//!
//! Messages are JSON text frames. Uplink media rides in a
//! `realtime_input.media_chunks` envelope with base64 payloads; downlink
//! messages carry exactly one of `text`, `audio`, `transcription`, or
//! `interrupted`.

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

pub const AUDIO_PCM_MIME: &str = "audio/pcm";

/// One media payload inside an uplink envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaChunk {
    pub mime_type: String,
    pub data: String,
}

/// Client -> backend messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UplinkMessage {
    RealtimeInput { media_chunks: Vec<MediaChunk> },
    Text(String),
}

impl UplinkMessage {
    /// Wrap one captured PCM frame as an audio chunk.
    pub fn audio_frame(pcm: &[i16]) -> Self {
        UplinkMessage::RealtimeInput {
            media_chunks: vec![MediaChunk {
                mime_type: AUDIO_PCM_MIME.to_string(),
                data: encode_pcm_base64(pcm),
            }],
        }
    }

    /// Wrap an encoded camera frame (e.g. `image/jpeg`).
    pub fn image(mime_type: &str, bytes: &[u8]) -> Self {
        UplinkMessage::RealtimeInput {
            media_chunks: vec![MediaChunk {
                mime_type: mime_type.to_string(),
                data: BASE64.encode(bytes),
            }],
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        UplinkMessage::Text(text.into())
    }
}

/// A transcription update for either side of the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcription {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub finished: Option<bool>,
}

/// Backend -> client messages as they appear on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerMessage {
    Text(String),
    Audio(String),
    Transcription(Transcription),
    /// Sent as `{"interrupted": "True"}` when generation was cut off.
    Interrupted(String),
}

/// Decoded downlink event handed to the session loop.
#[derive(Debug, Clone, PartialEq)]
pub enum DownlinkEvent {
    Text(String),
    /// Tutor audio decoded to mono f32 samples.
    Audio(Vec<f32>),
    Transcription {
        text: String,
        sender: String,
        finished: bool,
    },
    Interrupted,
    /// The link is gone; no further events will arrive.
    Closed(String),
}

/// Encode i16 PCM as base64 over little-endian bytes.
pub fn encode_pcm_base64(pcm: &[i16]) -> String {
    let mut bytes = Vec::with_capacity(pcm.len() * 2);
    for sample in pcm {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    BASE64.encode(bytes)
}

/// Decode base64 little-endian i16 PCM into f32 samples.
pub fn decode_pcm_base64(data: &str) -> Result<Vec<f32>> {
    let bytes = BASE64.decode(data).context("invalid base64 audio payload")?;
    Ok(bytes
        .chunks_exact(2)
        .map(|chunk| {
            let sample = i16::from_le_bytes([chunk[0], chunk[1]]);
            sample as f32 / 32_768.0
        })
        .collect())
}

/// Parse one downlink text frame into an event.
pub fn parse_server_message(raw: &str) -> Result<DownlinkEvent> {
    let message: ServerMessage =
        serde_json::from_str(raw).context("unrecognized server message")?;
    Ok(match message {
        ServerMessage::Text(text) => DownlinkEvent::Text(text),
        ServerMessage::Audio(data) => DownlinkEvent::Audio(decode_pcm_base64(&data)?),
        ServerMessage::Transcription(t) => DownlinkEvent::Transcription {
            text: t.text,
            sender: t.sender,
            finished: t.finished.unwrap_or(false),
        },
        ServerMessage::Interrupted(_) => DownlinkEvent::Interrupted,
    })
}
