use super::defaults::{
    ISO_639_1_CODES, MAX_DETECT_INTERVAL_MS, MAX_FRAME_SAMPLES, MAX_RESTART_BACKOFF_MS,
    MIN_DETECT_INTERVAL_MS, MIN_FRAME_SAMPLES, MIN_RESTART_BACKOFF_MS,
};
use super::AppConfig;
use anyhow::{bail, Context, Result};
use clap::Parser;
use url::Url;

impl AppConfig {
    /// Parse CLI arguments and validate them right away.
    pub fn parse_args() -> Result<Self> {
        let mut config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    /// Check CLI values and normalize the link endpoint.
    pub fn validate(&mut self) -> Result<()> {
        const MIN_PROBE_SECONDS: u64 = 1;
        const MAX_PROBE_SECONDS: u64 = 60;

        if !(MIN_FRAME_SAMPLES..=MAX_FRAME_SAMPLES).contains(&self.frame_samples) {
            bail!(
                "--frame-samples must be between {MIN_FRAME_SAMPLES} and {MAX_FRAME_SAMPLES}, got {}",
                self.frame_samples
            );
        }
        if !(1..=1024).contains(&self.audio_channel_capacity) {
            bail!(
                "--audio-channel-capacity must be between 1 and 1024, got {}",
                self.audio_channel_capacity
            );
        }
        if !(MIN_DETECT_INTERVAL_MS..=MAX_DETECT_INTERVAL_MS).contains(&self.detect_interval_ms) {
            bail!(
                "--detect-interval-ms must be between {MIN_DETECT_INTERVAL_MS} and {MAX_DETECT_INTERVAL_MS}, got {}",
                self.detect_interval_ms
            );
        }
        if !(MIN_RESTART_BACKOFF_MS..=MAX_RESTART_BACKOFF_MS)
            .contains(&self.speech_restart_backoff_ms)
        {
            bail!(
                "--speech-restart-backoff-ms must be between {MIN_RESTART_BACKOFF_MS} and {MAX_RESTART_BACKOFF_MS}, got {}",
                self.speech_restart_backoff_ms
            );
        }
        if !(1..=600).contains(&self.speech_max_restarts_per_min) {
            bail!(
                "--speech-max-restarts-per-min must be between 1 and 600, got {}",
                self.speech_max_restarts_per_min
            );
        }
        if !(1..=512).contains(&self.link_queue_capacity) {
            bail!(
                "--link-queue-capacity must be between 1 and 512, got {}",
                self.link_queue_capacity
            );
        }
        if !(16..=7_680).contains(&self.camera_width) || !(16..=4_320).contains(&self.camera_height)
        {
            bail!(
                "camera dimensions must be between 16x16 and 7680x4320, got {}x{}",
                self.camera_width,
                self.camera_height
            );
        }
        if !(MIN_PROBE_SECONDS..=MAX_PROBE_SECONDS).contains(&self.probe_seconds) {
            bail!(
                "--probe-seconds must be between {MIN_PROBE_SECONDS} and {MAX_PROBE_SECONDS}, got {}",
                self.probe_seconds
            );
        }

        self.validate_locale()?;
        self.validate_link_url()?;
        Ok(())
    }

    fn validate_locale(&self) -> Result<()> {
        if self.speech_locale.trim().is_empty() {
            bail!("--speech-locale must not be empty");
        }
        if !self
            .speech_locale
            .chars()
            .all(|ch| ch.is_ascii_alphabetic() || ch == '-' || ch == '_')
        {
            bail!("--speech-locale must contain only alphabetic characters or '-'/'_' separators");
        }
        // Allow region suffixes but only check the leading ISO-639-1 code.
        let primary = self
            .speech_locale
            .split(['-', '_'])
            .next()
            .unwrap_or("")
            .to_ascii_lowercase();
        if !ISO_639_1_CODES.contains(&primary.as_str()) {
            bail!(
                "--speech-locale must start with a valid ISO-639-1 code, got '{}'",
                self.speech_locale
            );
        }
        Ok(())
    }

    fn validate_link_url(&mut self) -> Result<()> {
        let parsed = Url::parse(self.link_url.trim())
            .with_context(|| format!("--link-url '{}' is not a valid URL", self.link_url))?;
        match parsed.scheme() {
            "ws" | "wss" => {}
            other => bail!("--link-url must use the ws or wss scheme, got '{other}'"),
        }
        if parsed.host_str().is_none() {
            bail!("--link-url must include a host");
        }
        // Store the normalized form for downstream consumers.
        self.link_url = parsed.to_string();
        Ok(())
    }

    /// Parsed form of the validated endpoint.
    pub fn link_endpoint(&self) -> Result<Url> {
        Url::parse(&self.link_url).with_context(|| format!("invalid link url '{}'", self.link_url))
    }
}
