//! Face descriptor acquisition behind a readiness gate.
//!
//! The recognition model itself is an external collaborator: something that
//! turns an RGB frame into a [`Descriptor`] or reports that it found no face.
//! It has to load its weights once before the first frame is submitted, so
//! callers never talk to an extractor directly; they go through a
//! [`ModelGate`], which refuses frames until loading has finished.

use crate::types::Descriptor;
use async_trait::async_trait;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractorError {
    #[error("face models are not loaded yet")]
    NotReady,
    #[error("no face detected")]
    NoFaceDetected,
    #[error("face models already loaded")]
    AlreadyReady,
    #[error("model loading failed: {0}")]
    LoadFailed(String),
    #[error("extraction failed: {0}")]
    ExtractionFailed(String),
    #[error("expected {expected}-dim descriptor, got {actual}")]
    UnexpectedDimension { expected: usize, actual: usize },
}

/// External face-recognition capability.
#[async_trait]
pub trait DescriptorExtractor: Send + Sync {
    /// One-time model loading. Must complete before [`extract`](Self::extract).
    async fn load(&mut self) -> Result<(), ExtractorError>;

    /// Describe the single face in an RGB8 frame; `Ok(None)` if there is none.
    async fn extract(
        &self,
        rgb: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Option<Descriptor>, ExtractorError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Uninitialized,
    Ready,
}

/// Two-state lifecycle wrapper around a [`DescriptorExtractor`].
pub struct ModelGate<E> {
    ready: OnceLock<E>,
}

impl<E: DescriptorExtractor> ModelGate<E> {
    pub fn new() -> Self {
        Self {
            ready: OnceLock::new(),
        }
    }

    pub fn state(&self) -> GateState {
        if self.ready.get().is_some() {
            GateState::Ready
        } else {
            GateState::Uninitialized
        }
    }

    /// Load the extractor's models and open the gate.
    ///
    /// A failed load leaves the gate Uninitialized.
    pub async fn initialize(&self, mut extractor: E) -> Result<(), ExtractorError> {
        if self.ready.get().is_some() {
            return Err(ExtractorError::AlreadyReady);
        }
        extractor.load().await?;
        self.ready
            .set(extractor)
            .map_err(|_| ExtractorError::AlreadyReady)?;
        tracing::info!("face models ready");
        Ok(())
    }

    /// Acquire a descriptor for the face in `rgb`.
    ///
    /// Fails with [`ExtractorError::NotReady`] before any work is done if the
    /// gate is still Uninitialized.
    pub async fn acquire(
        &self,
        rgb: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Descriptor, ExtractorError> {
        let extractor = self.ready.get().ok_or(ExtractorError::NotReady)?;
        extractor
            .extract(rgb, width, height)
            .await?
            .ok_or(ExtractorError::NoFaceDetected)
    }
}

impl<E: DescriptorExtractor> Default for ModelGate<E> {
    fn default() -> Self {
        Self::new()
    }
}
