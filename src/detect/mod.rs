//! Face/expression detection polling.
//!
//! The detection model is an opaque capability: it takes a video frame and
//! returns bounding boxes with optional landmarks and expression scores.
//! This module owns everything around it — explicit initialization, the
//! periodic poll against the current frame, scaling results to the display
//! surface, and drawing onto the overlay. A failed tick is logged and
//! skipped; polling never stops because one inference call misbehaved.

use std::fmt;

use crate::log_debug;

/// Interval between detection polls.
pub const POLL_INTERVAL_MS: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    fn scaled(&self, sx: f32, sy: f32) -> BoundingBox {
        BoundingBox {
            x: self.x * sx,
            y: self.y * sy,
            width: self.width * sx,
            height: self.height * sy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

/// One detected face. Transient: rendered on the tick that produced it,
/// then discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub bounds: BoundingBox,
    pub landmarks: Vec<Point>,
    pub expressions: Vec<(String, f32)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// A single frame grabbed from the video surface, handed to the detector.
pub struct VideoFrame {
    pub dims: Dimensions,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectError {
    /// Model assets missing or unreadable at initialization.
    LoadFailed(String),
    /// One inference call failed; the next tick may succeed.
    Inference(String),
}

impl fmt::Display for DetectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectError::LoadFailed(msg) => write!(f, "detector failed to load: {msg}"),
            DetectError::Inference(msg) => write!(f, "detection failed: {msg}"),
        }
    }
}

impl std::error::Error for DetectError {}

/// The external detection model.
pub trait FaceDetector: Send {
    fn detect(&mut self, frame: &VideoFrame) -> Result<Vec<Detection>, DetectError>;
}

/// Source of video frames to run detection against.
pub trait VideoSurface: Send {
    fn display_dims(&self) -> Dimensions;
    fn current_frame(&self) -> Option<VideoFrame>;
}

/// Drawing target layered over the video surface.
pub trait Overlay: Send {
    fn clear(&mut self);
    fn draw_box(&mut self, bounds: &BoundingBox);
    fn draw_landmarks(&mut self, landmarks: &[Point]);
    fn draw_expressions(&mut self, bounds: &BoundingBox, expressions: &[(String, f32)]);
}

/// An initialized detector. Loading is explicit and failure is typed so
/// the caller decides what a missing model means; the poller only ever
/// sees a ready handle.
pub struct DetectorHandle {
    detector: Box<dyn FaceDetector>,
}

impl std::fmt::Debug for DetectorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectorHandle").finish_non_exhaustive()
    }
}

impl DetectorHandle {
    pub fn load<F>(init: F) -> Result<Self, DetectError>
    where
        F: FnOnce() -> Result<Box<dyn FaceDetector>, DetectError>,
    {
        let detector = init()?;
        Ok(Self { detector })
    }

    pub fn from_detector(detector: Box<dyn FaceDetector>) -> Self {
        Self { detector }
    }
}

/// Scale detections from frame coordinates to display coordinates.
fn resize_results(detections: &mut [Detection], from: Dimensions, to: Dimensions) {
    if from == to || from.width == 0 || from.height == 0 {
        return;
    }
    let sx = to.width as f32 / from.width as f32;
    let sy = to.height as f32 / from.height as f32;
    for detection in detections {
        detection.bounds = detection.bounds.scaled(sx, sy);
        for point in &mut detection.landmarks {
            point.x *= sx;
            point.y *= sy;
        }
    }
}

/// Drives one detection pass per tick while a surface and overlay are
/// mounted. Runs synchronously on the session loop, so a tick finishes
/// before the next one is taken; the tick channel coalesces anything
/// missed while inference was slow.
pub struct DetectionPoller {
    handle: DetectorHandle,
}

impl DetectionPoller {
    pub fn new(handle: DetectorHandle) -> Self {
        Self { handle }
    }

    /// Run one poll: grab the current frame, detect, scale to the display,
    /// clear the overlay, draw. Best effort — a frameless surface or a
    /// failed inference skips the tick without touching the overlay.
    pub fn poll_tick(&mut self, surface: &dyn VideoSurface, overlay: &mut dyn Overlay) -> bool {
        let Some(frame) = surface.current_frame() else {
            return false;
        };
        let mut detections = match self.handle.detector.detect(&frame) {
            Ok(detections) => detections,
            Err(err) => {
                log_debug(&format!("detection tick skipped: {err}"));
                return false;
            }
        };
        resize_results(&mut detections, frame.dims, surface.display_dims());

        overlay.clear();
        for detection in &detections {
            overlay.draw_box(&detection.bounds);
            if !detection.landmarks.is_empty() {
                overlay.draw_landmarks(&detection.landmarks);
            }
            if !detection.expressions.is_empty() {
                overlay.draw_expressions(&detection.bounds, &detection.expressions);
            }
        }
        true
    }
}
