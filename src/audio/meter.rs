use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

const IDLE_LEVEL: f32 = 0.0;

/// Shared loudness level in [0, 100], updated once per capture quantum.
///
/// The capture callback writes and the UI thread reads, so the value is
/// stored as atomic f32 bits instead of behind a lock.
#[derive(Clone, Debug)]
pub struct LiveMeter {
    level_bits: Arc<AtomicU32>,
}

impl LiveMeter {
    pub fn new() -> Self {
        Self {
            level_bits: Arc::new(AtomicU32::new(IDLE_LEVEL.to_bits())),
        }
    }

    pub fn set_level(&self, level: f32) {
        self.level_bits.store(level.to_bits(), Ordering::Relaxed);
    }

    pub fn level(&self) -> f32 {
        f32::from_bits(self.level_bits.load(Ordering::Relaxed))
    }
}

impl Default for LiveMeter {
    fn default() -> Self {
        Self::new()
    }
}

/// RMS amplitude of one quantum scaled onto [0, 100].
///
/// Silence (all zeros) maps to 0; anything at or above full scale clamps
/// to 100. Empty input reads as silence.
pub(crate) fn rms_level(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return IDLE_LEVEL;
    }
    let energy: f32 = samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32;
    (energy.sqrt() * 100.0).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_meter_defaults_to_idle() {
        let meter = LiveMeter::new();
        assert_eq!(meter.level(), IDLE_LEVEL);
    }

    #[test]
    fn live_meter_updates_level() {
        let meter = LiveMeter::new();
        meter.set_level(42.5);
        assert_eq!(meter.level(), 42.5);
    }

    #[test]
    fn rms_level_handles_empty() {
        assert_eq!(rms_level(&[]), IDLE_LEVEL);
    }
}
