//! Microphone capture via CPAL.
//!
//! Opens the default (or named) input device, converts whatever format the
//! hardware delivers to mono f32 at the pipeline rate, and feeds each
//! callback quantum to the frame dispatcher. The callback thread is the
//! producer side of the pipeline; the returned stream handle keeps the
//! device open and dropping it releases the handle.

use anyhow::{anyhow, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use crossbeam_channel::{bounded, Receiver};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use super::dispatch::{append_downmixed_samples, AudioFrame, FrameDispatcher};
use super::meter::LiveMeter;
use super::TARGET_RATE;
use crate::log_debug;

/// Linear resampler between the device rate and the pipeline rate.
/// Operates on mono f32 samples.
fn resample_linear(input: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || input.is_empty() {
        return input.to_vec();
    }
    let ratio = from_rate as f64 / to_rate as f64;
    let out_len = ((input.len() as f64) / ratio).floor() as usize;
    let mut output = Vec::with_capacity(out_len);
    for i in 0..out_len {
        let src_idx = i as f64 * ratio;
        let idx0 = src_idx.floor() as usize;
        let frac = (src_idx - idx0 as f64) as f32;
        let s0 = input.get(idx0).copied().unwrap_or(0.0);
        let s1 = input.get(idx0 + 1).copied().unwrap_or(s0);
        output.push(s0 + frac * (s1 - s0));
    }
    output
}

/// Audio input device wrapper.
pub struct MicCapture {
    device: cpal::Device,
}

/// Live capture handle: the CPAL stream plus the consumer side of the
/// frame channel. The stream stops and the device is released on drop.
pub struct CaptureStream {
    _stream: cpal::Stream,
    frames: Receiver<AudioFrame>,
    dropped: Arc<AtomicUsize>,
}

impl CaptureStream {
    pub fn frames(&self) -> &Receiver<AudioFrame> {
        &self.frames
    }

    pub fn frames_dropped(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl MicCapture {
    /// List microphone names so the CLI can expose a selector.
    pub fn list_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();
        let devices = host.input_devices().context("no input devices available")?;
        let mut names = Vec::new();
        for device in devices {
            if let Ok(name) = device.name() {
                names.push(name);
            }
        }
        Ok(names)
    }

    /// Create a capture handle, optionally forcing a specific device so users
    /// can pick the right microphone when the host exposes several inputs.
    pub fn new(preferred_device: Option<&str>) -> Result<Self> {
        let host = cpal::default_host();
        let device = match preferred_device {
            Some(name) => {
                let mut devices = host.input_devices().context("no input devices available")?;
                devices
                    .find(|d| d.name().map(|n| n == name).unwrap_or(false))
                    .ok_or_else(|| anyhow!("input device '{name}' not found"))?
            }
            None => host
                .default_input_device()
                .context("no default input device available")?,
        };
        Ok(Self { device })
    }

    /// Name of the active input device.
    pub fn device_name(&self) -> String {
        self.device
            .name()
            .unwrap_or_else(|_| "Unknown Device".to_string())
    }

    /// Start capturing. Each callback quantum is downmixed to mono,
    /// resampled to the pipeline rate, and handed to the dispatcher; the
    /// returned receiver yields one [`AudioFrame`] per `frame_samples`
    /// accumulated samples.
    pub fn start(
        &self,
        frame_samples: usize,
        channel_capacity: usize,
        meter: LiveMeter,
    ) -> Result<CaptureStream> {
        let default_config = self.device.default_input_config()?;
        let format = default_config.sample_format();
        let device_config: StreamConfig = default_config.into();
        let device_rate = device_config.sample_rate.0;
        let channels = usize::from(device_config.channels.max(1));

        log_debug(&format!(
            "capture config: format={format:?} sample_rate={device_rate}Hz channels={channels}"
        ));

        let (sender, frames) = bounded::<AudioFrame>(channel_capacity.max(1));
        let dropped = Arc::new(AtomicUsize::new(0));
        let dispatcher = Arc::new(Mutex::new(FrameDispatcher::new(
            frame_samples,
            sender,
            meter,
            dropped.clone(),
        )));

        let stream = match format {
            SampleFormat::F32 => self.build_stream(
                &device_config,
                dispatcher,
                dropped.clone(),
                device_rate,
                channels,
                |sample: f32| sample,
            )?,
            SampleFormat::I16 => self.build_stream(
                &device_config,
                dispatcher,
                dropped.clone(),
                device_rate,
                channels,
                |sample: i16| sample as f32 / 32_768.0,
            )?,
            SampleFormat::U16 => self.build_stream(
                &device_config,
                dispatcher,
                dropped.clone(),
                device_rate,
                channels,
                |sample: u16| (sample as f32 - 32_768.0) / 32_768.0,
            )?,
            other => return Err(anyhow!("unsupported sample format: {other:?}")),
        };

        stream.play().context("failed to start input stream")?;
        log_debug("audio capture started");

        Ok(CaptureStream {
            _stream: stream,
            frames,
            dropped,
        })
    }

    fn build_stream<T, F>(
        &self,
        device_config: &StreamConfig,
        dispatcher: Arc<Mutex<FrameDispatcher>>,
        dropped: Arc<AtomicUsize>,
        device_rate: u32,
        channels: usize,
        convert: F,
    ) -> Result<cpal::Stream>
    where
        T: cpal::SizedSample + Send + 'static,
        F: Fn(T) -> f32 + Send + 'static,
    {
        let needs_resample = device_rate != TARGET_RATE;
        let mut mono: Vec<f32> = Vec::new();
        let stream = self.device.build_input_stream(
            device_config,
            move |data: &[T], _| {
                mono.clear();
                append_downmixed_samples(&mut mono, data, channels, &convert);
                let resampled;
                let quantum: &[f32] = if needs_resample {
                    resampled = resample_linear(&mono, device_rate, TARGET_RATE);
                    &resampled
                } else {
                    &mono
                };
                // try_lock keeps the realtime callback from blocking behind
                // a slow consumer; a contended quantum counts as dropped.
                if let Ok(mut pump) = dispatcher.try_lock() {
                    pump.push(quantum, 1, |sample| sample);
                } else {
                    dropped.fetch_add(1, Ordering::Relaxed);
                }
            },
            |err| log_debug(&format!("audio_stream_error: {err}")),
            None,
        )?;
        Ok(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resample_identity_when_rates_match() {
        let input = vec![0.1f32, 0.2, 0.3];
        assert_eq!(resample_linear(&input, TARGET_RATE, TARGET_RATE), input);
    }

    #[test]
    fn resample_halves_length_for_double_rate() {
        let input = vec![0.0f32, 1.0, 2.0, 3.0];
        let output = resample_linear(&input, 32_000, 16_000);
        assert_eq!(output.len(), 2);
        assert!((output[0] - 0.0).abs() < 1e-6);
        assert!((output[1] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn resample_interpolates_on_upsample() {
        let input = vec![0.0f32, 1.0];
        let output = resample_linear(&input, 8_000, 16_000);
        assert_eq!(output.len(), 4);
        assert!((output[1] - 0.5).abs() < 1e-6);
    }
}
