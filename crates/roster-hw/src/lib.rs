//! roster-hw — Capture devices for player photos.
//!
//! Camera selection with a one-step constraint fallback, exclusive stream
//! ownership, and RGB frame handling.

pub mod camera;
pub mod frame;
pub mod still;

pub use camera::{
    open_with_fallback, ActiveStream, Camera, CameraError, Constraints, FacingMode, FrameStream,
};
pub use frame::Frame;
pub use still::StillImageCamera;
