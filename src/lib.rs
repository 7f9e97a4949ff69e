//! # Stepwise
//!
//! Client-side core of a guided-task assistant: the user states a goal, an
//! external reasoning service plans the steps, and each step must be proven
//! complete (photo or text evidence) before the plan advances.
//!
//! This crate owns the local task state and reconciles it against the
//! service's variable, sometimes-ambiguous responses. Rendering, styling and
//! the service itself live elsewhere.
//!
//! ## Data Flow
//!
//! ```text
//!   user input ──► EvidenceDraft ──► VerificationGateway ──► reconcile
//!                      ▲                 (HTTP request)          │
//!                      │                                         ▼
//!               CameraController                           TaskSession ──► re-render
//!            (device lifecycle, owns                      (steps, index,
//!             the only camera handle)                      history, options)
//! ```
//!
//! ## Modules
//! - `camera`: device-lifecycle state machine and frame capture
//! - `evidence`: pure assembly of image/text proof payloads
//! - `gateway`: the remote verification service boundary
//! - `session`: session store, reconciliation engine, transition controller
//! - `config`: gateway endpoint configuration
//! - `error`: the crate-wide error taxonomy

pub mod camera;
pub mod config;
pub mod error;
pub mod evidence;
pub mod gateway;
pub mod session;

pub use camera::{
    CameraController, CameraDevice, CameraState, CameraStream, CaptureConstraints, Facing,
};
pub use config::GatewayConfig;
pub use error::{
    CameraError, DeviceError, DeviceErrorKind, GatewayError, SessionError, SessionResult,
    ValidationError,
};
pub use evidence::{Evidence, EvidenceDraft, EvidenceShape, ImageArtifact};
pub use gateway::{HttpGateway, VerificationGateway};
pub use session::{HistoryEntry, Outcome, SessionController, TaskSession};
