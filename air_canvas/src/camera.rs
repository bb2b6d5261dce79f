//! Frame acquisition: the `FrameSource` trait plus its two backends.
//!
//! `CameraCapture` opens a webcam through nokhwa and converts every frame to
//! packed `0x00RRGGBB` pixels.  `SyntheticStage` fabricates a static backdrop
//! at a fixed resolution so both views run on machines without capture
//! hardware; it is the default backend, the camera is opt-in.
//!
//! Requested camera resolutions are best-effort: the stream may negotiate
//! something else, so consumers must read [`FrameSource::resolution`] back
//! instead of assuming the request was honored.

use hand_track::FrameRef;
use nokhwa::{
    pixel_format::RgbFormat,
    utils::{CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution},
    Camera,
};

use crate::error::CanvasError;

// ════════════════════════════════════════════════════════════════════════════
// VideoFrame
// ════════════════════════════════════════════════════════════════════════════

/// One decoded frame, packed `0x00RRGGBB`, row-major.
#[derive(Clone, Debug, Default)]
pub struct VideoFrame {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<u32>,
}

impl VideoFrame {
    /// The placeholder a loop renders with before the source delivers.
    pub fn empty() -> Self {
        VideoFrame::default()
    }

    /// A frame with a zero dimension carries no image.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn as_ref(&self) -> FrameRef<'_> {
        FrameRef {
            width: self.width,
            height: self.height,
            pixels: &self.pixels,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// FrameSource trait
// ════════════════════════════════════════════════════════════════════════════

/// Anything that can deliver the latest video frame.
///
/// Sources never queue: each call returns the newest available frame and
/// older ones are gone (latest frame wins).
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<VideoFrame, CanvasError>;

    /// Actual negotiated resolution, which may differ from any request.
    fn resolution(&self) -> (usize, usize);

    /// Short backend name for logs and HUD.
    fn label(&self) -> &str {
        "frames"
    }
}

// ════════════════════════════════════════════════════════════════════════════
// CameraCapture — nokhwa-backed webcam frames
// ════════════════════════════════════════════════════════════════════════════

pub struct CameraCapture {
    cam: Camera,
    width: u32,
    height: u32,
}

impl CameraCapture {
    /// Open camera `index` and start streaming near the requested size.
    pub fn open(index: u32, width: u32, height: u32) -> Result<Self, CanvasError> {
        let idx = CameraIndex::Index(index);

        // Uncompressed frames are cheap to convert; ask for the closest
        // format the device offers.
        let fmt = CameraFormat::new(Resolution::new(width, height), FrameFormat::YUYV, 30);
        let req = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(fmt));

        let mut cam = Camera::new(idx, req).map_err(|e| categorize_open_error(&e.to_string()))?;

        cam.open_stream()
            .map_err(|e| categorize_open_error(&e.to_string()))?;

        // The stream may have negotiated a different resolution.
        let actual = cam.resolution();
        tracing::info!(
            width = actual.width(),
            height = actual.height(),
            "camera stream open"
        );

        Ok(CameraCapture {
            cam,
            width: actual.width(),
            height: actual.height(),
        })
    }
}

impl FrameSource for CameraCapture {
    /// Blocks until the device's next frame, so the call cadence never
    /// outruns the camera and no frame is ever queued behind another.
    fn next_frame(&mut self) -> Result<VideoFrame, CanvasError> {
        let frame = self
            .cam
            .frame()
            .map_err(|e| CanvasError::DeviceNotFound(format!("fetch frame: {e}")))?;

        let rgb = frame
            .decode_image::<RgbFormat>()
            .map_err(|e| CanvasError::DeviceNotFound(format!("decode frame: {e}")))?;

        let (w, h) = rgb.dimensions();
        let mut pixels = Vec::with_capacity(w as usize * h as usize);
        for p in rgb.pixels() {
            pixels.push(((p[0] as u32) << 16) | ((p[1] as u32) << 8) | p[2] as u32);
        }

        Ok(VideoFrame {
            width: w as usize,
            height: h as usize,
            pixels,
        })
    }

    fn resolution(&self) -> (usize, usize) {
        (self.width as usize, self.height as usize)
    }

    fn label(&self) -> &str {
        "camera"
    }
}

impl Drop for CameraCapture {
    /// Stop the stream explicitly so releasing a session always halts the
    /// device, whatever nokhwa's own drop order does.
    fn drop(&mut self) {
        let _ = self.cam.stop_stream();
        tracing::debug!("camera stream stopped");
    }
}

/// Sort a backend open failure into the permission/device taxonomy.
/// nokhwa reports both through the same error type, so the message text is
/// the only signal available.
fn categorize_open_error(msg: &str) -> CanvasError {
    let lower = msg.to_lowercase();
    if lower.contains("permission") || lower.contains("denied") || lower.contains("access") {
        CanvasError::PermissionDenied(msg.to_string())
    } else {
        CanvasError::DeviceNotFound(msg.to_string())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// SyntheticStage — camera-free backdrop frames
// ════════════════════════════════════════════════════════════════════════════

/// Fixed-size fabricated frames: a dark vignette that reads as an empty
/// stage.  Used whenever no capture hardware is wanted.
pub struct SyntheticStage {
    width: usize,
    height: usize,
    backdrop: Vec<u32>,
}

impl SyntheticStage {
    pub fn new(width: usize, height: usize) -> Self {
        let cx = width as f32 / 2.0;
        let cy = height as f32 / 2.0;
        let max_d = (cx * cx + cy * cy).sqrt().max(1.0);

        let mut backdrop = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                let dx = x as f32 - cx;
                let dy = y as f32 - cy;
                let d = (dx * dx + dy * dy).sqrt() / max_d;
                let shade = (34.0 * (1.0 - d * 0.7)) as u32;
                backdrop.push((shade << 16) | ((shade + 4) << 8) | (shade + 12));
            }
        }

        SyntheticStage { width, height, backdrop }
    }
}

impl FrameSource for SyntheticStage {
    fn next_frame(&mut self) -> Result<VideoFrame, CanvasError> {
        Ok(VideoFrame {
            width: self.width,
            height: self.height,
            pixels: self.backdrop.clone(),
        })
    }

    fn resolution(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    fn label(&self) -> &str {
        "synthetic stage"
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_stage_reports_its_resolution() {
        let mut s = SyntheticStage::new(320, 200);
        assert_eq!(s.resolution(), (320, 200));
        let f = s.next_frame().unwrap();
        assert_eq!(f.width, 320);
        assert_eq!(f.height, 200);
        assert_eq!(f.pixels.len(), 320 * 200);
        assert!(!f.is_empty());
    }

    #[test]
    fn empty_frame_is_empty() {
        assert!(VideoFrame::empty().is_empty());
        assert!(VideoFrame::empty().as_ref().is_empty());
    }

    #[test]
    fn open_errors_categorize_by_message() {
        assert!(matches!(
            categorize_open_error("Access denied by user"),
            CanvasError::PermissionDenied(_)
        ));
        assert!(matches!(
            categorize_open_error("no such video device"),
            CanvasError::DeviceNotFound(_)
        ));
    }
}
