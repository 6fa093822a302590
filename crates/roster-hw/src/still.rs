//! Still-photo "camera": serves a photo file as a one-frame stream.

use crate::camera::{Camera, CameraError, Constraints, FacingMode, FrameStream};
use crate::frame::Frame;
use image::imageops::FilterType;
use std::path::{Path, PathBuf};

/// A photo on disk, treated as a camera with a fixed facing.
pub struct StillImageCamera {
    path: PathBuf,
    facing: FacingMode,
}

impl StillImageCamera {
    /// Photos are assumed to come from a rear camera pointed at the player.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            facing: FacingMode::Environment,
        }
    }

    pub fn with_facing(mut self, facing: FacingMode) -> Self {
        self.facing = facing;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Camera for StillImageCamera {
    type Stream = StillImageStream;

    fn open(&self, constraints: &Constraints) -> Result<StillImageStream, CameraError> {
        if let Some(required) = constraints.facing {
            if required != self.facing {
                return Err(CameraError::ConstraintUnsatisfied(format!(
                    "{} faces {:?}, need {:?}",
                    self.path.display(),
                    self.facing,
                    required
                )));
            }
        }

        let image = image::open(&self.path).map_err(|e| match e {
            image::ImageError::IoError(io) if io.kind() == std::io::ErrorKind::NotFound => {
                CameraError::DeviceNotFound(self.path.display().to_string())
            }
            image::ImageError::IoError(io)
                if io.kind() == std::io::ErrorKind::PermissionDenied =>
            {
                CameraError::PermissionDenied(self.path.display().to_string())
            }
            other => CameraError::CaptureFailed(format!("{}: {other}", self.path.display())),
        })?;

        // Shrink oversized photos to the ideal resolution; never upscale.
        let image = if image.width() > constraints.ideal_width
            || image.height() > constraints.ideal_height
        {
            image.resize(
                constraints.ideal_width,
                constraints.ideal_height,
                FilterType::Triangle,
            )
        } else {
            image
        };

        tracing::info!(
            path = %self.path.display(),
            width = image.width(),
            height = image.height(),
            "opened still image"
        );

        Ok(StillImageStream {
            frame: Some(Frame::from_image(image)),
        })
    }
}

pub struct StillImageStream {
    frame: Option<Frame>,
}

impl FrameStream for StillImageStream {
    fn next_frame(&mut self) -> Result<Frame, CameraError> {
        self.frame
            .clone()
            .ok_or_else(|| CameraError::CaptureFailed("stream stopped".into()))
    }

    fn stop(&mut self) {
        self.frame = None;
    }
}
