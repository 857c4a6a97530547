//! Live-session link.
//!
//! The call streams captured PCM frames to the tutor backend over a
//! websocket and receives synthesized audio, reply text, and running
//! transcriptions back. `protocol` defines the JSON wire shapes and the
//! PCM codecs; `client` runs the socket on a worker thread bridged to the
//! session loop with channels.

mod client;
mod protocol;

pub use client::LinkClient;
pub use protocol::{
    decode_pcm_base64, encode_pcm_base64, parse_server_message, DownlinkEvent, MediaChunk,
    ServerMessage, Transcription, UplinkMessage, AUDIO_PCM_MIME,
};
