//! Categorized failures of the capture/render pipeline.
//!
//! The taxonomy matters more than the payload: permission, device and
//! model-load failures abort a session start and each carries its own
//! user-facing message; everything transient (a single detector call, a
//! single frame fetch) is handled inside the loop and never surfaces here.

use std::fmt::{self, Display};

#[derive(Debug)]
pub enum CanvasError {
    /// Camera access denied by the OS or user. Terminal until the user
    /// retries explicitly.
    PermissionDenied(String),
    /// No usable capture hardware. Terminal.
    DeviceNotFound(String),
    /// The landmark backend failed to initialize. Retryable by restarting.
    ModelLoad(String),
    /// Creating or updating the output window failed.
    Window(String),
    /// Encoding or writing an exported image failed.
    Export(String),
}

impl CanvasError {
    /// One human-readable line per category, shown to the user verbatim.
    pub fn user_message(&self) -> String {
        match self {
            CanvasError::PermissionDenied(_) => {
                "Camera access was denied. Grant permission and start again.".into()
            }
            CanvasError::DeviceNotFound(_) => {
                "No camera was found. Connect one, or run without --camera.".into()
            }
            CanvasError::ModelLoad(_) => {
                "The hand detector failed to load. Restarting the view retries.".into()
            }
            CanvasError::Window(_) => "The output window could not be opened.".into(),
            CanvasError::Export(_) => "Saving the drawing failed.".into(),
        }
    }
}

impl Display for CanvasError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CanvasError::PermissionDenied(s) => write!(f, "camera permission denied: {s}"),
            CanvasError::DeviceNotFound(s) => write!(f, "capture device not found: {s}"),
            CanvasError::ModelLoad(s) => write!(f, "landmark model load failed: {s}"),
            CanvasError::Window(s) => write!(f, "window error: {s}"),
            CanvasError::Export(s) => write!(f, "export error: {s}"),
        }
    }
}

impl std::error::Error for CanvasError {}
