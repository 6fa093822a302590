use roster_core::{DescriptorError, ExtractorError};
use roster_hw::CameraError;
use roster_store::{ArchiveError, StoreError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RosterError {
    #[error("player ID is empty")]
    EmptyId,
    #[error("no photo taken for player {0}")]
    NoPhoto(String),
    #[error("player {0} is not registered")]
    UnknownPlayer(String),
    #[error("player {0} has no photo on file")]
    NoStoredPhoto(String),
    #[error("extractor: {0}")]
    Extractor(#[from] ExtractorError),
    #[error("camera: {0}")]
    Camera(#[from] CameraError),
    #[error("store: {0}")]
    Store(#[from] StoreError),
    #[error("archive: {0}")]
    Archive(#[from] ArchiveError),
    #[error("descriptor: {0}")]
    Descriptor(#[from] DescriptorError),
}

impl RosterError {
    /// Short message for the person at the keyboard. Details go to the
    /// trace log instead.
    pub fn notice(&self) -> String {
        match self {
            Self::EmptyId => "Please enter the player's ID first.".into(),
            Self::NoPhoto(_) => "Please take a photo before saving.".into(),
            Self::UnknownPlayer(id) => format!("Player {id} is not registered."),
            Self::NoStoredPhoto(id) => format!("Player {id} has no photo on file."),
            Self::Extractor(ExtractorError::NotReady) => {
                "Face models are not ready yet; try again in a moment.".into()
            }
            Self::Extractor(ExtractorError::NoFaceDetected) => {
                "No face detected; please take the photo again.".into()
            }
            Self::Extractor(_) => "Could not process the photo.".into(),
            Self::Camera(_) => "Could not access the camera.".into(),
            Self::Store(_) => "Could not access the player database.".into(),
            Self::Archive(ArchiveError::Json(_)) => "The player file is not valid.".into(),
            Self::Archive(_) => "Could not export or import player data.".into(),
            Self::Descriptor(_) => "The stored photo cannot be compared with this one.".into(),
        }
    }
}
