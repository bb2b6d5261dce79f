//! The particle visualization view.
//!
//! A fixed logical surface shows the mirrored backdrop dimmed under a
//! 300-particle ensemble.  An open palm scatters the swarm, a closed fist
//! gathers it; the ensemble recolors instantly with the gesture.  The
//! simulation never ends on its own; the view runs until the window closes
//! or the user stops it.

use std::time::{Duration, Instant};

use minifb::{Key, KeyRepeat, MouseButton, MouseMode, Window, WindowOptions};

use hand_track::{classify_hand, ClassifierConfig, HandState, LandmarkSource};
use particle_field::{FieldConfig, ParticleField};

use crate::camera::{CameraCapture, FrameSource, SyntheticStage};
use crate::driver::Driver;
use crate::error::CanvasError;
use crate::session::CaptureSession;
use crate::sim_hand::{PointerSample, SimHandSource};
use crate::surface::Surface;

/// Requested camera capture size; the stream may negotiate differently and
/// the blit rescales whatever arrives.
const CAMERA_REQUEST: (u32, u32) = (640, 480);

pub struct ParticleViewOptions {
    pub use_camera: bool,
    pub field: FieldConfig,
    pub classifier: ClassifierConfig,
}

impl Default for ParticleViewOptions {
    fn default() -> Self {
        ParticleViewOptions {
            use_camera: false,
            field: FieldConfig::default(),
            classifier: ClassifierConfig::default(),
        }
    }
}

/// Run the particle view until the window closes or the user stops it.
pub fn run(opts: ParticleViewOptions) -> Result<(), CanvasError> {
    let width = opts.field.width as usize;
    let height = opts.field.height as usize;

    let mut window = Window::new(
        "Air Canvas — Particle Field",
        width,
        height,
        WindowOptions::default(),
    )
    .map_err(|e| CanvasError::Window(e.to_string()))?;
    window.limit_update_rate(Some(Duration::from_millis(16)));

    let (pointer_tx, sim) = SimHandSource::channel(opts.classifier.mirror_x);

    let mut session = CaptureSession::new();
    let use_camera = opts.use_camera;
    session.start(
        move || -> Result<Box<dyn FrameSource>, CanvasError> {
            if use_camera {
                Ok(Box::new(CameraCapture::open(0, CAMERA_REQUEST.0, CAMERA_REQUEST.1)?))
            } else {
                Ok(Box::new(SyntheticStage::new(width, height)))
            }
        },
        move || -> Result<Box<dyn LandmarkSource>, CanvasError> { Ok(Box::new(sim)) },
    )?;

    let mut driver = Driver::new();
    let mut field = ParticleField::new(opts.field.clone());
    let mut surface = Surface::new(width, height);
    let source_line = session.describe();

    // FPS readout, refreshed once per second.
    let mut fps_text = String::from("FPS 0");
    let mut frames_this_second = 0u32;
    let mut last_fps_time = Instant::now();

    while window.is_open() && session.is_running() {
        if window.is_key_pressed(Key::Escape, KeyRepeat::No)
            || window.is_key_pressed(Key::Q, KeyRepeat::No)
        {
            break;
        }
        if window.is_key_pressed(Key::R, KeyRepeat::No) {
            field.reset();
        }

        let _ = pointer_tx.send(pointer_sample(&window, width, height));

        // Pipeline order is fixed: detect, classify, simulate, draw.
        let step = driver.pump(&mut session);
        let gesture = classify_hand(
            step.hand.as_ref(),
            width as f32,
            height as f32,
            &opts.classifier,
        );
        field.step(&gesture);

        if step.frame.is_empty() {
            surface.fill(0xFF10_1018);
        } else {
            surface.blit_mirrored(&step.frame);
            surface.dim(0.55);
        }

        for p in field.particles() {
            surface.disc(p.x, p.y, p.radius, field.display_color(p, &gesture));
        }
        if let Some(anchor) = gesture.anchor() {
            let color = match gesture {
                HandState::Closed { .. } => field.config().closed_color,
                _ => field.config().open_color,
            };
            surface.ring(anchor.x, anchor.y, 26.0, color);
        }

        let hud = format!("{} | HAND: {} | {}", source_line, gesture.name(), fps_text);
        surface.label(&hud, 8, 8, 0xFFEE_EEEE);
        surface.label(
            "LMB=FIST  R=RESET  ESC/Q=QUIT",
            8,
            height - 14,
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

/// Sample the window pointer for the simulated hand.
fn pointer_sample(window: &Window, width: usize, height: usize) -> PointerSample {
    match window.get_mouse_pos(MouseMode::Discard) {
        Some((mx, my)) => PointerSample {
            x: mx / width as f32,
            y: my / height as f32,
            pressed: window.get_mouse_down(MouseButton::Left),
            present: true,
        },
        None => PointerSample::default(),
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests — the full pipeline scenario, windowless
// ════════════════════════════════════════════════════════════════════════════
