//! Camera selection and exclusive stream ownership.
//!
//! A camera is opened with the preferred constraints first (rear-facing,
//! full HD). If that fails for any reason it is retried exactly once with
//! the facing requirement dropped. The resulting [`ActiveStream`] stops the
//! underlying stream when dropped, so every exit path releases the device.

use crate::frame::Frame;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CameraError {
    #[error("device not found: {0}")]
    DeviceNotFound(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("constraint not satisfiable: {0}")]
    ConstraintUnsatisfied(String),
    #[error("capture failed: {0}")]
    CaptureFailed(String),
    #[error("no usable camera: {0}")]
    DeviceUnavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacingMode {
    /// Front camera, facing the operator.
    User,
    /// Rear camera, facing the player.
    Environment,
}

/// Requested capture properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraints {
    /// Required facing; `None` accepts any camera.
    pub facing: Option<FacingMode>,
    /// Preferred resolution. Cameras may deliver a different size.
    pub ideal_width: u32,
    pub ideal_height: u32,
}

impl Constraints {
    pub fn preferred() -> Self {
        Self {
            facing: Some(FacingMode::Environment),
            ideal_width: 1920,
            ideal_height: 1080,
        }
    }

    /// Same resolution, any facing.
    pub fn relaxed() -> Self {
        Self {
            facing: None,
            ..Self::preferred()
        }
    }
}

/// A frame source that can be opened under [`Constraints`].
pub trait Camera {
    type Stream: FrameStream;

    fn open(&self, constraints: &Constraints) -> Result<Self::Stream, CameraError>;
}

/// An open stream of frames. `stop` releases the device.
pub trait FrameStream {
    fn next_frame(&mut self) -> Result<Frame, CameraError>;
    fn stop(&mut self);
}

/// Exclusively owned open stream; stopped on drop.
pub struct ActiveStream<S: FrameStream> {
    inner: S,
    constraints: Constraints,
}

impl<S: FrameStream> ActiveStream<S> {
    pub fn constraints(&self) -> &Constraints {
        &self.constraints
    }

    pub fn next_frame(&mut self) -> Result<Frame, CameraError> {
        self.inner.next_frame()
    }
}

impl<S: FrameStream> Drop for ActiveStream<S> {
    fn drop(&mut self) {
        self.inner.stop();
        tracing::debug!("camera stream stopped");
    }
}

/// Open `camera` with [`Constraints::preferred`], falling back once to
/// [`Constraints::relaxed`].
pub fn open_with_fallback<C: Camera>(camera: &C) -> Result<ActiveStream<C::Stream>, CameraError> {
    let preferred = Constraints::preferred();
    match camera.open(&preferred) {
        Ok(inner) => {
            return Ok(ActiveStream {
                inner,
                constraints: preferred,
            })
        }
        Err(e) => {
            tracing::warn!(error = %e, "preferred camera unavailable; retrying with any camera");
        }
    }

    let relaxed = Constraints::relaxed();
    camera
        .open(&relaxed)
        .map(|inner| ActiveStream {
            inner,
            constraints: relaxed,
        })
        .map_err(|e| CameraError::DeviceUnavailable(e.to_string()))
}
