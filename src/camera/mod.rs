//! Media capture controller.
//!
//! Owns the camera device lifecycle as an explicit state machine
//! (`Idle → Requesting → Active → Stopped`, with `Requesting → Error` on
//! acquisition failure) independent of the task session. The only thing that
//! crosses over to the session side is an immutable `ImageArtifact` snapshot.
//!
//! Releasing the device on teardown is mandatory: `stop` is idempotent and
//! `Drop` runs it as a backstop.

mod device;

pub use device::{CameraDevice, CameraStream, CaptureConstraints, Facing, CAPTURE_QUALITY};

use std::sync::Arc;

use crate::error::{CameraError, DeviceError};
use crate::evidence::ImageArtifact;

/// Lifecycle of a camera acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraState {
    Idle,
    Requesting,
    Active,
    Error,
    Stopped,
}

impl std::fmt::Display for CameraState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Requesting => "requesting",
            Self::Active => "active",
            Self::Error => "error",
            Self::Stopped => "stopped",
        };
        write!(f, "{}", s)
    }
}

/// Exclusive owner of the camera device handle.
pub struct CameraController {
    device: Box<dyn CameraDevice>,
    constraints: CaptureConstraints,
    stream: Option<Box<dyn CameraStream>>,
    state: CameraState,
    error: Option<DeviceError>,
    captured: Option<Arc<ImageArtifact>>,
}

impl CameraController {
    pub fn new(device: Box<dyn CameraDevice>) -> Self {
        Self::with_constraints(device, CaptureConstraints::default())
    }

    pub fn with_constraints(device: Box<dyn CameraDevice>, constraints: CaptureConstraints) -> Self {
        Self {
            device,
            constraints,
            stream: None,
            state: CameraState::Idle,
            error: None,
            captured: None,
        }
    }

    pub fn state(&self) -> CameraState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == CameraState::Active
    }

    /// The acquisition failure, when the controller is in `Error`.
    pub fn error(&self) -> Option<&DeviceError> {
        self.error.as_ref()
    }

    /// Device label of the live preview, when active.
    pub fn preview_label(&self) -> Option<&str> {
        self.stream.as_deref().map(CameraStream::label)
    }

    /// Request exclusive device access and bring the preview up.
    ///
    /// A failure moves the controller to `Error` with the classified reason;
    /// there is no automatic retry. Calling while already active is a no-op.
    pub async fn start(&mut self) -> Result<(), DeviceError> {
        if self.state == CameraState::Active {
            return Ok(());
        }
        self.state = CameraState::Requesting;
        self.error = None;
        match self.device.open(&self.constraints).await {
            Ok(stream) => {
                tracing::info!(label = stream.label(), "camera stream acquired");
                self.stream = Some(stream);
                self.state = CameraState::Active;
                Ok(())
            }
            Err(err) => {
                tracing::warn!(kind = err.kind.as_str(), "camera acquisition failed: {}", err);
                self.state = CameraState::Error;
                self.error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Release the device. Idempotent; safe in any state.
    pub fn stop(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.close();
            tracing::info!("camera stream released");
        }
        if self.state != CameraState::Idle {
            self.state = CameraState::Stopped;
        }
    }

    /// Snapshot the current frame without stopping the live stream.
    ///
    /// Valid only while `Active`; the artifact is stamped with its capture
    /// time and kept as the last captured image until `retake` or handoff.
    pub fn capture(&mut self) -> Result<Arc<ImageArtifact>, CameraError> {
        if self.state != CameraState::Active {
            return Err(CameraError::NotActive);
        }
        let stream = self.stream.as_mut().ok_or(CameraError::NotActive)?;
        let bytes = stream.capture_frame()?;
        let artifact = Arc::new(ImageArtifact::jpeg(bytes));
        tracing::debug!(id = %artifact.id, size = artifact.bytes.len(), "frame captured");
        self.captured = Some(Arc::clone(&artifact));
        Ok(artifact)
    }

    /// Discard the last captured artifact; the stream stays live.
    pub fn retake(&mut self) {
        self.captured = None;
    }

    pub fn captured(&self) -> Option<&Arc<ImageArtifact>> {
        self.captured.as_ref()
    }

    /// One-shot handoff of the captured artifact to the evidence side.
    pub fn take_captured(&mut self) -> Option<Arc<ImageArtifact>> {
        self.captured.take()
    }
}

impl Drop for CameraController {
    fn drop(&mut self) {
        self.stop();
    }
}
