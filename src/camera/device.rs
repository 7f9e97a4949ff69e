//! Trait seam over video capture hardware.
//!
//! The controller never touches frames or device handles directly; platform
//! backends implement these traits and report failures through the fixed
//! `DeviceError` taxonomy.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::DeviceError;

/// Still-capture encoding quality, on the 0..=1 scale used by JPEG encoders.
pub const CAPTURE_QUALITY: f32 = 0.8;

/// Which way the camera should face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facing {
    /// Front camera (selfie).
    User,
    /// Rear camera, preferred for documenting task steps.
    Environment,
}

/// Acquisition preferences passed to the device backend.
///
/// Resolution is a hint; backends may deliver the nearest supported mode.
#[derive(Debug, Clone)]
pub struct CaptureConstraints {
    pub facing: Facing,
    pub width: u32,
    pub height: u32,
    pub jpeg_quality: f32,
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self {
            facing: Facing::Environment,
            width: 1280,
            height: 720,
            jpeg_quality: CAPTURE_QUALITY,
        }
    }
}

/// A video input device that can be opened for exclusive use.
#[async_trait]
pub trait CameraDevice: Send + Sync {
    /// Request exclusive access to the device.
    ///
    /// Errors must carry the `DeviceErrorKind` matching the platform failure
    /// (permission denial, missing device, device in use, and so on).
    async fn open(
        &self,
        constraints: &CaptureConstraints,
    ) -> Result<Box<dyn CameraStream>, DeviceError>;
}

/// A live stream acquired from a `CameraDevice`.
///
/// The stream doubles as the preview handle: it stays live across captures
/// and is only torn down by `close`.
pub trait CameraStream: Send {
    /// Encode the current frame as JPEG at the constraint quality.
    fn capture_frame(&mut self) -> Result<Bytes, DeviceError>;

    /// Human-readable device label for display next to the preview.
    fn label(&self) -> &str;

    /// Release the underlying device. Must be safe to call more than once.
    fn close(&mut self);
}
