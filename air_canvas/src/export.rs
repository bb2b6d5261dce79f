//! On-demand export of the drawing board.
//!
//! The flattened image is built only when the user saves: the current camera
//! frame is mirrored to match what the screen showed, the ink layer is
//! composited over it, and the result is encoded as PNG.  Filenames carry a
//! millisecond timestamp so repeated saves never collide.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use image::RgbaImage;
use ink_layer::InkLayer;

use crate::camera::VideoFrame;
use crate::error::CanvasError;
use crate::surface::Surface;

/// Backdrop used when no camera frame is available at save time.
const BARE_BACKDROP: u32 = 0x0014_161C;

/// Flatten `frame` (mirrored) under `ink` and write a PNG into `dir`.
/// Returns the path written.
pub fn save_snapshot(
    frame: &VideoFrame,
    ink: &InkLayer,
    dir: &Path,
) -> Result<PathBuf, CanvasError> {
    let (w, h) = (ink.width(), ink.height());

    // Mirror-scale the backdrop to the drawing's dimensions, exactly as the
    // live view renders it.
    let mut stage = Surface::new(w, h);
    if frame.is_empty() {
        stage.fill(0xFF00_0000 | BARE_BACKDROP);
    } else {
        stage.blit_mirrored(frame);
    }

    let flat = ink.composite_over(stage.pixels());

    let mut img = RgbaImage::new(w as u32, h as u32);
    for (i, &px) in flat.iter().enumerate() {
        let x = (i % w) as u32;
        let y = (i / w) as u32;
        let r = (px >> 16 & 0xFF) as u8;
        let g = (px >> 8 & 0xFF) as u8;
        let b = (px & 0xFF) as u8;
        img.put_pixel(x, y, image::Rgba([r, g, b, 0xFF]));
    }

    let path = dir.join(format!("air_canvas_{}.png", unix_millis()));
    img.save(&path)
        .map_err(|e| CanvasError::Export(e.to_string()))?;
    tracing::info!(path = %path.display(), "snapshot saved");
    Ok(path)
}

fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}
