//! Evidence assembly.
//!
//! Evidence is the proof submitted to justify a step's completion: an optional
//! captured image, an optional text note, at least one of the two. Assembly is
//! pure; the image travels by reference (`Arc`) and is never copied here.

use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// MIME type of captured stills.
pub const JPEG_MIME: &str = "image/jpeg";

/// An immutable captured image, stamped at capture time for uniqueness.
///
/// Produced by the camera controller and handed to evidence as a one-shot
/// snapshot; nothing mutates it after creation.
#[derive(Debug, Clone)]
pub struct ImageArtifact {
    pub id: Uuid,
    pub bytes: Bytes,
    pub mime: &'static str,
    pub captured_at: DateTime<Utc>,
}

impl ImageArtifact {
    /// Wrap encoded JPEG bytes, stamping id and capture time.
    pub fn jpeg(bytes: Bytes) -> Self {
        Self {
            id: Uuid::new_v4(),
            bytes,
            mime: JPEG_MIME,
            captured_at: Utc::now(),
        }
    }

    /// Suggested filename for upload parts.
    pub fn file_name(&self) -> String {
        format!("evidence-{}.jpg", self.id)
    }
}

/// What a piece of evidence contained, without the payload itself.
///
/// History records store this instead of raw bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceShape {
    pub has_text: bool,
    pub has_image: bool,
}

/// Validated evidence ready for a verification request.
#[derive(Debug, Clone)]
pub struct Evidence {
    text: Option<String>,
    image: Option<Arc<ImageArtifact>>,
}

impl Evidence {
    /// Combine an optional image and optional note into evidence.
    ///
    /// The note is trimmed before the emptiness check; fails with
    /// `MissingEvidence` when both inputs are empty or blank.
    pub fn assemble(
        image: Option<Arc<ImageArtifact>>,
        text: Option<&str>,
    ) -> Result<Self, ValidationError> {
        let text = text
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from);
        if text.is_none() && image.is_none() {
            return Err(ValidationError::MissingEvidence);
        }
        Ok(Self { text, image })
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn image(&self) -> Option<&Arc<ImageArtifact>> {
        self.image.as_ref()
    }

    pub fn shape(&self) -> EvidenceShape {
        EvidenceShape {
            has_text: self.text.is_some(),
            has_image: self.image.is_some(),
        }
    }
}

/// The in-progress evidence a user is composing for the current step.
///
/// Retained across a failed verification so the user can retry; cleared only
/// when a step passes or the session resets.
#[derive(Debug, Default)]
pub struct EvidenceDraft {
    text: String,
    image: Option<Arc<ImageArtifact>>,
}

impl EvidenceDraft {
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn attach_image(&mut self, artifact: Arc<ImageArtifact>) {
        self.image = Some(artifact);
    }

    pub fn clear_image(&mut self) {
        self.image = None;
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.image = None;
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty() && self.image.is_none()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn image(&self) -> Option<&Arc<ImageArtifact>> {
        self.image.as_ref()
    }

    /// Validate the draft into submittable evidence without consuming it.
    pub fn assemble(&self) -> Result<Evidence, ValidationError> {
        Evidence::assemble(self.image.clone(), Some(&self.text))
    }
}
