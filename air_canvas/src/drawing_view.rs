//! The gesture drawing board.
//!
//! A full-window surface shows the mirrored backdrop with the persistent
//! ink layer over it.  Pinching the thumb and index fingertip paints (or
//! erases) along the fingertip's path; releasing the pinch ends the stroke,
//! and a later pinch starts a new one rather than bridging the gap.  The
//! window is resizable; the ink layer follows the viewport and keeps the
//! overlapping region.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use minifb::{Key, KeyRepeat, MouseButton, MouseMode, Window, WindowOptions};

use hand_track::{
    classify_pinch, landmark, to_pixels, ClassifierConfig, KeypointSet, LandmarkSource,
    PinchState, PixelPoint,
};
use ink_layer::{
    InkLayer, StrokeStyle, StrokeTracker, Template, Tool, DEFAULT_BRUSH_WIDTH,
    DEFAULT_ERASER_WIDTH,
};

use crate::camera::{CameraCapture, FrameSource, SyntheticStage};
use crate::driver::Driver;
use crate::error::CanvasError;
use crate::export;
use crate::session::CaptureSession;
use crate::sim_hand::{PointerSample, SimHandSource};
use crate::surface::Surface;

const CAMERA_REQUEST: (u32, u32) = (1280, 720);

/// Ink colors on keys 1–6.
pub const PALETTE: [u32; 6] = [
    0xFF2D70, // rose
    0xFF9E2B, // amber
    0xFFE34A, // yellow
    0x3FD06E, // green
    0x3FA7F0, // blue
    0xF4F4F8, // chalk
];

pub struct DrawingViewOptions {
    pub use_camera: bool,
    pub width: usize,
    pub height: usize,
    pub classifier: ClassifierConfig,
}

impl Default for DrawingViewOptions {
    fn default() -> Self {
        DrawingViewOptions {
            use_camera: false,
            width: 1280,
            height: 720,
            classifier: ClassifierConfig::default(),
        }
    }
}

/// One post-detection drawing step: classify the pinch, then feed the stroke
/// tracker.  Split out of the window loop so the stroke semantics are
/// testable without a window.
pub fn ink_step(
    ink: &mut InkLayer,
    tracker: &mut StrokeTracker,
    hand: Option<&KeypointSet>,
    width: f32,
    height: f32,
    cfg: &ClassifierConfig,
    style: &StrokeStyle,
) -> PinchState {
    let pinch = classify_pinch(hand, width, height, cfg);
    tracker.feed(ink, pinch.anchor(), style);
    pinch
}

/// Run the drawing board until the window closes or the user stops it.
pub fn run(opts: DrawingViewOptions) -> Result<(), CanvasError> {
    let mut window = Window::new(
        "Air Canvas — Drawing Board",
        opts.width,
        opts.height,
        WindowOptions { resize: true, ..WindowOptions::default() },
    )
    .map_err(|e| CanvasError::Window(e.to_string()))?;
    window.limit_update_rate(Some(Duration::from_millis(16)));

    let (pointer_tx, sim) = SimHandSource::channel(opts.classifier.mirror_x);

    let mut session = CaptureSession::new();
    let use_camera = opts.use_camera;
    let (init_w, init_h) = (opts.width, opts.height);
    session.start(
        move || -> Result<Box<dyn FrameSource>, CanvasError> {
            if use_camera {
                Ok(Box::new(CameraCapture::open(0, CAMERA_REQUEST.0, CAMERA_REQUEST.1)?))
            } else {
                Ok(Box::new(SyntheticStage::new(init_w, init_h)))
            }
        },
        move || -> Result<Box<dyn LandmarkSource>, CanvasError> { Ok(Box::new(sim)) },
    )?;

    let mut driver = Driver::new();
    let (mut width, mut height) = window.get_size();
    let mut surface = Surface::new(width, height);
    let mut ink = InkLayer::new(width, height);
    let mut tracker = StrokeTracker::new();

    let mut tool = Tool::Brush;
    let mut color_idx = 0usize;
    let mut brush_width = DEFAULT_BRUSH_WIDTH;
    let mut eraser_width = DEFAULT_ERASER_WIDTH;
    let mut status = String::from("PINCH TO DRAW");

    let mut fps_text = String::from("FPS 0");
    let mut frames_this_second = 0u32;
    let mut last_fps_time = Instant::now();

    while window.is_open() && session.is_running() {
        if window.is_key_pressed(Key::Escape, KeyRepeat::No)
            || window.is_key_pressed(Key::Q, KeyRepeat::No)
        {
            break;
        }

        // The viewport drives the surface and the layer; the overlap of the
        // drawing survives a resize.
        let (new_w, new_h) = window.get_size();
        if (new_w, new_h) != (width, height) && new_w > 0 && new_h > 0 {
            width = new_w;
            height = new_h;
            surface.resize(width, height);
            ink.resize(width, height);
        }

        // ── Tool keys ─────────────────────────────────────────────────────
        if window.is_key_pressed(Key::B, KeyRepeat::No) {
            tool = Tool::Brush;
            status = "BRUSH".into();
        }
        if window.is_key_pressed(Key::E, KeyRepeat::No) {
            tool = Tool::Eraser;
            status = "ERASER".into();
        }
        for (i, key) in [Key::Key1, Key::Key2, Key::Key3, Key::Key4, Key::Key5, Key::Key6]
            .iter()
            .enumerate()
        {
            if window.is_key_pressed(*key, KeyRepeat::No) {
                color_idx = i;
                tool = Tool::Brush;
                status = format!("COLOR {}", i + 1);
            }
        }
        let active_width = match tool {
            Tool::Brush => &mut brush_width,
            Tool::Eraser => &mut eraser_width,
        };
        if window.is_key_pressed(Key::LeftBracket, KeyRepeat::Yes) {
            *active_width = (*active_width - 2.0).max(2.0);
            status = format!("WIDTH {:.0}", *active_width);
        }
        if window.is_key_pressed(Key::RightBracket, KeyRepeat::Yes) {
            *active_width = (*active_width + 2.0).min(80.0);
            status = format!("WIDTH {:.0}", *active_width);
        }
        if window.is_key_pressed(Key::X, KeyRepeat::No) {
            ink.clear();
            status = "CLEARED".into();
        }
        if window.is_key_pressed(Key::T, KeyRepeat::No) {
            // Stamp the template at a fixed position/scale, bypassing the
            // gesture pipeline entirely.
            let scale = height as f32 * 0.5;
            let origin = PixelPoint::new(width as f32 / 2.0 - scale / 2.0, height as f32 * 0.2);
            ink.stamp_template(&Template::daisy(), origin, scale);
            status = "TEMPLATE STAMPED".into();
        }

        let _ = pointer_tx.send(pointer_sample(&window, width, height));

        // ── Pipeline: detect, classify, ink, draw ─────────────────────────
        let step = driver.pump(&mut session);
        let style = match tool {
            Tool::Brush => StrokeStyle::brush(PALETTE[color_idx], brush_width),
            Tool::Eraser => StrokeStyle::eraser(eraser_width),
        };
        let pinch = ink_step(
            &mut ink,
            &mut tracker,
            step.hand.as_ref(),
            width as f32,
            height as f32,
            &opts.classifier,
            &style,
        );

        if window.is_key_pressed(Key::S, KeyRepeat::No) {
            let dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
            match export::save_snapshot(&step.frame, &ink, &dir) {
                Ok(path) => status = format!("SAVED {}", path.display()),
                Err(e) => {
                    tracing::warn!(error = %e, "snapshot failed");
                    status = e.user_message();
                }
            }
        }

        if step.frame.is_empty() {
            surface.fill(0xFF14_161C);
        } else {
            surface.blit_mirrored(&step.frame);
        }
        surface.overlay_argb(ink.pixels());

        // Fingertip cursor: filled while pinching, outline otherwise.
        if let Some(kps) = step.hand.as_ref() {
            let tip = to_pixels(
                kps.point(landmark::INDEX_TIP),
                width as f32,
                height as f32,
                opts.classifier.mirror_x,
            );
            let cursor_r = style.width / 2.0 + 3.0;
            match pinch {
                PinchState::Pinching { .. } => surface.disc(tip.x, tip.y, cursor_r, 0xFFFF_FFFF),
                PinchState::NotPinching => surface.ring(tip.x, tip.y, cursor_r, 0xFFC0_C0C0),
            }
        }

        let tool_name = match tool {
            Tool::Brush => "BRUSH",
            Tool::Eraser => "ERASER",
        };
        let hud = format!(
            "{} {} | {} | {}",
            tool_name,
            match tool {
                Tool::Brush => format!("{:.0}", brush_width),
                Tool::Eraser => format!("{:.0}", eraser_width),
            },
            status,
            fps_text
        );
        surface.label(&hud, 8, 8, 0xFFEE_EEEE);
        surface.label(
            "LMB=PINCH  B/E=TOOL  1-6=COLOR  [/]=WIDTH  X=CLEAR  T=TEMPLATE  S=SAVE  ESC/Q=QUIT",
            8,
            height.saturating_sub(14),
            0xFF88_8888,
        );

        window
            .update_with_buffer(surface.pixels(), width, height)
            .map_err(|e| CanvasError::Window(e.to_string()))?;

        frames_this_second += 1;
        if last_fps_time.elapsed() >= Duration::from_secs(1) {
            let fps = frames_this_second as f32 / last_fps_time.elapsed().as_secs_f32();
            fps_text = format!("FPS {:.0}", fps);
            frames_this_second = 0;
            last_fps_time = Instant::now();
        }
    }

    session.release();
    Ok(())
}

fn pointer_sample(window: &Window, width: usize, height: usize) -> PointerSample {
    match window.get_mouse_pos(MouseMode::Discard) {
        Some((mx, my)) => PointerSample {
            x: mx / width.max(1) as f32,
            y: my / height.max(1) as f32,
            pressed: window.get_mouse_down(MouseButton::Left),
            present: true,
        },
        None => PointerSample::default(),
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests — stroke semantics through the real classifier
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use hand_track::Keypoint;

    const W: f32 = 640.0;
    const H: f32 = 480.0;

    fn cfg() -> ClassifierConfig {
        ClassifierConfig { mirror_x: false, ..ClassifierConfig::default() }
    }

    /// A hand whose thumb and index tips coincide at (nx, ny) when pinched,
    /// or sit far apart when not.
    fn hand(nx: f32, ny: f32, pinched: bool) -> KeypointSet {
        let index = Keypoint::new(nx, ny, 0.0);
        let thumb = if pinched { index } else { Keypoint::new(nx - 0.4, ny, 0.0) };
        KeypointSet::from_fn(|i| match i {
            landmark::INDEX_TIP => index,
            landmark::THUMB_TIP => thumb,
            _ => Keypoint::new(nx, ny + 0.1, 0.0),
        })
    }

    #[test]
    fn pinch_path_commits_one_segment_per_consecutive_frame_pair() {
        let mut ink = InkLayer::new(W as usize, H as usize);
        let mut tracker = StrokeTracker::new();
        let style = StrokeStyle::brush(PALETTE[0], 6.0);

        // Frame 1: pinch at A — records, draws nothing.
        let a = hand(0.125, 0.5, true);
        let p = ink_step(&mut ink, &mut tracker, Some(&a), W, H, &cfg(), &style);
        assert!(p.is_pinching());
        assert!(ink.is_blank());

        // Frame 2: pinch at B — exactly the A→B segment lands.
        let b = hand(0.25, 0.5, true);
        ink_step(&mut ink, &mut tracker, Some(&b), W, H, &cfg(), &style);
        assert!(!ink.is_blank());
        // Midpoint of A→B in pixels: ((0.125+0.25)/2 * 640, 240).
        assert_ne!(ink.pixel(120, 240) >> 24, 0);
    }

    #[test]
    fn released_pinch_never_bridges_to_the_next_stroke() {
        let mut ink = InkLayer::new(W as usize, H as usize);
        let mut tracker = StrokeTracker::new();
        let style = StrokeStyle::brush(PALETTE[0], 6.0);

        ink_step(&mut ink, &mut tracker, Some(&hand(0.1, 0.1, true)), W, H, &cfg(), &style);
        ink_step(&mut ink, &mut tracker, Some(&hand(0.1, 0.1, false)), W, H, &cfg(), &style);
        ink_step(&mut ink, &mut tracker, Some(&hand(0.9, 0.9, true)), W, H, &cfg(), &style);
        assert!(ink.is_blank(), "no ink may appear between separate strokes");

        // The stroke resumes normally from the new anchor.
        ink_step(&mut ink, &mut tracker, Some(&hand(0.85, 0.9, true)), W, H, &cfg(), &style);
        assert!(!ink.is_blank());
    }

    #[test]
    fn losing_the_hand_clears_continuity_too() {
        let mut ink = InkLayer::new(W as usize, H as usize);
        let mut tracker = StrokeTracker::new();
        let style = StrokeStyle::brush(PALETTE[0], 6.0);

        ink_step(&mut ink, &mut tracker, Some(&hand(0.2, 0.2, true)), W, H, &cfg(), &style);
        ink_step(&mut ink, &mut tracker, None, W, H, &cfg(), &style);
        assert!(tracker.last_anchor().is_none());
    }

    #[test]
    fn eraser_default_is_wider_than_brush_default() {
        assert!(DEFAULT_ERASER_WIDTH > DEFAULT_BRUSH_WIDTH);
    }
}
