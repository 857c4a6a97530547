//! Camera/microphone acquisition.
//!
//! The device layer is a capability the host environment provides; this
//! module owns the protocol around it: at most one live acquisition at a
//! time, release-before-reacquire so device handles never leak, and
//! track-level enable flags kept in sync with the user's mic/camera
//! toggles.

use std::fmt;

use crate::log_debug;

/// Ideal capture size requested for the camera track.
pub const IDEAL_CAMERA_WIDTH: u32 = 1280;
pub const IDEAL_CAMERA_HEIGHT: u32 = 720;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Audio,
    Video,
}

impl TrackKind {
    pub fn label(self) -> &'static str {
        match self {
            TrackKind::Audio => "audio",
            TrackKind::Video => "video",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraFacing {
    Front,
    Back,
}

/// Video half of an acquisition request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoConstraints {
    pub ideal_width: u32,
    pub ideal_height: u32,
    pub facing: CameraFacing,
}

impl Default for VideoConstraints {
    fn default() -> Self {
        Self {
            ideal_width: IDEAL_CAMERA_WIDTH,
            ideal_height: IDEAL_CAMERA_HEIGHT,
            facing: CameraFacing::Front,
        }
    }
}

/// What to request from the device layer. Derived from the current
/// mic/camera flags right before each acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MediaConstraints {
    pub audio: bool,
    pub video: Option<VideoConstraints>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaError {
    PermissionDenied(String),
    NoDevice(String),
    Failed(String),
}

impl fmt::Display for MediaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaError::PermissionDenied(msg) => write!(f, "media permission denied: {msg}"),
            MediaError::NoDevice(msg) => write!(f, "no matching media device: {msg}"),
            MediaError::Failed(msg) => write!(f, "media acquisition failed: {msg}"),
        }
    }
}

impl std::error::Error for MediaError {}

/// One track inside a live acquisition. `set_enabled` mutes/unmutes in
/// place; `stop` releases the underlying device capture permanently.
pub trait MediaTrack: Send {
    fn kind(&self) -> TrackKind;
    fn is_enabled(&self) -> bool;
    fn set_enabled(&mut self, enabled: bool);
    fn stop(&mut self);
}

/// A granted device stream and its tracks.
pub trait MediaStreamHandle: Send {
    fn tracks(&mut self) -> &mut [Box<dyn MediaTrack>];

    fn has_track(&mut self, kind: TrackKind) -> bool {
        self.tracks().iter().any(|t| t.kind() == kind)
    }
}

/// Device-layer capability: grant a stream for the given constraints.
/// Acquisition may suspend on a permission prompt; callers must not hold
/// up interactive work while it is pending.
pub trait MediaDevices: Send {
    fn acquire(
        &mut self,
        constraints: &MediaConstraints,
    ) -> Result<Box<dyn MediaStreamHandle>, MediaError>;
}

/// Owns the single live acquisition and the mic/camera flags.
///
/// Rendering surfaces observe the acquisition but never mutate it; every
/// mutation funnels through the toggle and acquire paths here.
pub struct MediaSession {
    devices: Box<dyn MediaDevices>,
    acquisition: Option<Box<dyn MediaStreamHandle>>,
    video_constraints: VideoConstraints,
    mic_enabled: bool,
    camera_enabled: bool,
}

/// How a toggle was satisfied, for callers that care (tests, logging).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// The matching track's enabled flag was flipped in place.
    TrackFlipped,
    /// The needed track was missing; a full re-acquisition ran.
    Reacquired,
    /// Nothing to do (no acquisition and the flag is now off).
    NoOp,
}

impl MediaSession {
    pub fn new(devices: Box<dyn MediaDevices>) -> Self {
        Self {
            devices,
            acquisition: None,
            video_constraints: VideoConstraints::default(),
            mic_enabled: false,
            camera_enabled: false,
        }
    }

    /// Override the camera request used for future acquisitions.
    pub fn set_video_constraints(&mut self, constraints: VideoConstraints) {
        self.video_constraints = constraints;
    }

    pub fn mic_enabled(&self) -> bool {
        self.mic_enabled
    }

    pub fn camera_enabled(&self) -> bool {
        self.camera_enabled
    }

    pub fn has_acquisition(&self) -> bool {
        self.acquisition.is_some()
    }

    /// Constraints matching the current flags.
    pub fn constraints(&self) -> MediaConstraints {
        MediaConstraints {
            audio: self.mic_enabled,
            video: self.camera_enabled.then_some(self.video_constraints),
        }
    }

    pub fn toggle_mic(&mut self) -> Result<ToggleOutcome, MediaError> {
        self.mic_enabled = !self.mic_enabled;
        self.apply_toggle(TrackKind::Audio, self.mic_enabled)
    }

    pub fn toggle_camera(&mut self) -> Result<ToggleOutcome, MediaError> {
        self.camera_enabled = !self.camera_enabled;
        self.apply_toggle(TrackKind::Video, self.camera_enabled)
    }

    /// Flip the matching track in place when it exists so the other track
    /// keeps flowing; otherwise re-acquire when the kind just became
    /// required.
    fn apply_toggle(&mut self, kind: TrackKind, enabled: bool) -> Result<ToggleOutcome, MediaError> {
        if let Some(acquisition) = self.acquisition.as_mut() {
            if acquisition.has_track(kind) {
                for track in acquisition.tracks() {
                    if track.kind() == kind {
                        track.set_enabled(enabled);
                    }
                }
                log_debug(&format!(
                    "{} track {}",
                    kind.label(),
                    if enabled { "enabled" } else { "disabled" }
                ));
                return Ok(ToggleOutcome::TrackFlipped);
            }
        }
        if enabled {
            self.acquire()?;
            return Ok(ToggleOutcome::Reacquired);
        }
        Ok(ToggleOutcome::NoOp)
    }

    /// Acquire a fresh stream for the current flags.
    ///
    /// Any prior acquisition is released first — stopping every track —
    /// then the new stream's tracks are explicitly synced to the flags
    /// rather than trusted to match the constraints.
    pub fn acquire(&mut self) -> Result<(), MediaError> {
        self.release();
        let constraints = self.constraints();
        log_debug(&format!(
            "acquiring media: audio={} video={}",
            constraints.audio,
            constraints.video.is_some()
        ));
        let mut stream = self.devices.acquire(&constraints)?;
        for track in stream.tracks() {
            let want = match track.kind() {
                TrackKind::Audio => self.mic_enabled,
                TrackKind::Video => self.camera_enabled,
            };
            track.set_enabled(want);
        }
        self.acquisition = Some(stream);
        Ok(())
    }

    /// Stop every track and drop the stream.
    pub fn release(&mut self) {
        if let Some(mut acquisition) = self.acquisition.take() {
            for track in acquisition.tracks() {
                track.stop();
            }
            log_debug("released media acquisition");
        }
    }

    /// Borrow the live acquisition for a rendering surface to observe.
    pub fn acquisition_mut(&mut self) -> Option<&mut Box<dyn MediaStreamHandle>> {
        self.acquisition.as_mut()
    }
}

impl Drop for MediaSession {
    fn drop(&mut self) {
        self.release();
    }
}
