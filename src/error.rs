//! Error taxonomy for the task-progression core.
//!
//! Three families, matching where a failure can originate:
//! - `ValidationError`: rejected locally before any network call, session unchanged.
//! - `DeviceError` / `CameraError`: camera acquisition and capture failures; the
//!   task session is unaffected.
//! - `GatewayError`: transport or protocol failure talking to the verification
//!   service. A response that merely reports `passed = false` is a normal
//!   outcome, not a `GatewayError`.
//!
//! Nothing here triggers an automatic retry; every error is terminal for the
//! single transition that produced it.

use thiserror::Error;

/// Local precondition failures, checked before the gateway is contacted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("provide a photo or a text note before verifying")]
    MissingEvidence,

    #[error("no active task")]
    NoActiveTask,

    #[error("describe the task you want help with")]
    EmptyGoal,
}

/// Fixed classification of camera acquisition failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceErrorKind {
    PermissionDenied,
    NotFound,
    Busy,
    Aborted,
    Unsupported,
    Unknown,
}

impl DeviceErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PermissionDenied => "permission-denied",
            Self::NotFound => "device-not-found",
            Self::Busy => "device-busy",
            Self::Aborted => "aborted",
            Self::Unsupported => "unsupported",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for DeviceErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A camera device failure with its classified kind and a user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct DeviceError {
    pub kind: DeviceErrorKind,
    pub message: String,
}

impl DeviceError {
    pub fn new(kind: DeviceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(DeviceErrorKind::PermissionDenied, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(DeviceErrorKind::NotFound, message)
    }

    pub fn busy(message: impl Into<String>) -> Self {
        Self::new(DeviceErrorKind::Busy, message)
    }

    pub fn aborted(message: impl Into<String>) -> Self {
        Self::new(DeviceErrorKind::Aborted, message)
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::new(DeviceErrorKind::Unsupported, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(DeviceErrorKind::Unknown, message)
    }
}

/// Errors surfaced by the media capture controller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CameraError {
    #[error(transparent)]
    Device(#[from] DeviceError),

    /// `capture()` or similar invoked while the stream is not live.
    #[error("camera is not active")]
    NotActive,
}

/// Failures at the remote verification boundary.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("gateway returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed gateway response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The service's explicit `error` field; always aborts the transition.
    #[error("service error: {0}")]
    Service(String),
}

/// Umbrella error for session transitions.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("could not start task: {0}")]
    StartFailed(#[source] GatewayError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

pub type SessionResult<T> = Result<T, SessionError>;
