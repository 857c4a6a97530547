use crossbeam_channel::{bounded, Sender, TrySendError};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use super::meter::{rms_level, LiveMeter};

/// One converted PCM frame plus the loudness level of the quantum that
/// completed it. Ownership moves to the consumer on emission; the
/// dispatcher never touches an emitted buffer again.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    pub pcm: Vec<i16>,
    pub level: f32,
}

/// Downmix multi-channel input to mono while applying the provided converter
/// so the framing stage sees a single channel regardless of the microphone
/// layout.
pub(super) fn append_downmixed_samples<T, F>(
    buf: &mut Vec<f32>,
    data: &[T],
    channels: usize,
    mut convert: F,
) where
    T: Copy,
    F: FnMut(T) -> f32,
{
    if channels <= 1 {
        buf.extend(data.iter().copied().map(&mut convert));
        return;
    }

    // Average each interleaved frame to produce a mono representation.
    let mut acc = 0.0f32;
    let mut count = 0usize;
    for sample in data.iter().copied() {
        acc += convert(sample);
        count += 1;
        if count == channels {
            buf.push(acc / channels as f32);
            acc = 0.0;
            count = 0;
        }
    }
    if count > 0 {
        buf.push(acc / count as f32);
    }
}

/// Clamp a float sample to [-1, 1] and scale it onto the signed 16-bit range.
/// Negative values scale by 32768 and non-negative by 32767 so both extremes
/// land exactly on i16::MIN / i16::MAX.
pub(crate) fn sample_to_i16(sample: f32) -> i16 {
    let s = sample.clamp(-1.0, 1.0);
    if s < 0.0 {
        (s * 32_768.0) as i16
    } else {
        (s * 32_767.0) as i16
    }
}

/// Accumulates normalized mono quanta into fixed-size PCM frames.
///
/// Every quantum updates the live meter with its RMS level; each time the
/// accumulation cursor reaches the frame size the buffer is converted to
/// 16-bit PCM and sent with the current level. Frame boundaries carry
/// across quanta: leftover samples seed the next frame.
pub struct FrameDispatcher {
    frame_samples: usize,
    pending: Vec<f32>,
    level: f32,
    meter: LiveMeter,
    sender: Sender<AudioFrame>,
    dropped: Arc<AtomicUsize>,
}

impl FrameDispatcher {
    pub fn new(
        frame_samples: usize,
        sender: Sender<AudioFrame>,
        meter: LiveMeter,
        dropped: Arc<AtomicUsize>,
    ) -> Self {
        let frame_samples = frame_samples.max(1);
        Self {
            frame_samples,
            pending: Vec::with_capacity(frame_samples),
            level: 0.0,
            meter,
            sender,
            dropped,
        }
    }

    /// Ingest one quantum of device samples.
    ///
    /// An empty quantum is silence, not an error: the dispatcher skips the
    /// work and leaves the accumulated frame untouched.
    pub fn push<T, F>(&mut self, data: &[T], channels: usize, convert: F)
    where
        T: Copy,
        F: FnMut(T) -> f32,
    {
        if data.is_empty() {
            return;
        }
        let start = self.pending.len();
        append_downmixed_samples(&mut self.pending, data, channels, convert);
        self.level = rms_level(&self.pending[start..]);
        self.meter.set_level(self.level);

        while self.pending.len() >= self.frame_samples {
            let rest = self.pending.split_off(self.frame_samples);
            let full = std::mem::replace(&mut self.pending, rest);
            let pcm: Vec<i16> = full.into_iter().map(sample_to_i16).collect();
            match self.sender.try_send(AudioFrame {
                pcm,
                level: self.level,
            }) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                }
                Err(TrySendError::Disconnected(_)) => break,
            }
        }
    }

    /// Loudness of the most recent quantum.
    pub fn level(&self) -> f32 {
        self.level
    }

    /// Samples waiting for the current frame to fill.
    pub fn pending_samples(&self) -> usize {
        self.pending.len()
    }
}

/// Result of an offline dispatcher run.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchSummary {
    pub frames: Vec<AudioFrame>,
    pub frames_dropped: usize,
    pub pending_samples: usize,
    pub peak_level: f32,
}

/// Run the framing pipeline over synthetic PCM, quantum by quantum, without
/// any audio hardware. Used by the probe binary and tests to measure frame
/// cadence and levels.
pub fn offline_dispatch_from_pcm(
    samples: &[f32],
    quantum_samples: usize,
    frame_samples: usize,
) -> DispatchSummary {
    let quantum = quantum_samples.max(1);
    // Capacity matches the worst case so offline runs never drop frames.
    let (tx, rx) = bounded::<AudioFrame>(samples.len() / frame_samples.max(1) + 1);
    let dropped = Arc::new(AtomicUsize::new(0));
    let mut dispatcher =
        FrameDispatcher::new(frame_samples, tx, LiveMeter::new(), dropped.clone());

    let mut peak_level = 0.0f32;
    for chunk in samples.chunks(quantum) {
        dispatcher.push(chunk, 1, |sample| sample);
        peak_level = peak_level.max(dispatcher.level());
    }
    let pending_samples = dispatcher.pending_samples();
    drop(dispatcher);

    DispatchSummary {
        frames: rx.iter().collect(),
        frames_dropped: dropped.load(Ordering::Relaxed),
        pending_samples,
        peak_level,
    }
}
