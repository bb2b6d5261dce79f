//! # particle_field
//!
//! A fixed-size particle ensemble driven by the current [`HandState`].
//!
//! The field is created once per session and stepped every rendered frame;
//! particles are mutated in place and never destroyed individually, only
//! re-scattered en masse by [`ParticleField::reset`].  Per frame, each
//! particle branches on the gesture:
//!
//! | Gesture | Behaviour | Damping |
//! |---|---|---|
//! | `Closed` | constant-magnitude pull toward the anchor | tight (0.90) |
//! | `Open`   | linear-falloff push away inside the repulsion radius, ambient jitter outside | loose (0.95) |
//! | `None`   | jitter plus a weak pull toward the surface centre | heavy (0.98) |
//!
//! After the force pass, positions integrate by one velocity step and the
//! reflective boundary clamps them back inside the surface, inverting the
//! exited velocity component.  Damping runs every frame whether or not a
//! force applied, so velocities stay bounded and the simulation never
//! terminates on its own.

use hand_track::{HandState, PixelPoint};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// ════════════════════════════════════════════════════════════════════════════
// FieldConfig
// ════════════════════════════════════════════════════════════════════════════

/// Every tunable of the simulation, with the values the particle view ships.
#[derive(Clone, Debug)]
pub struct FieldConfig {
    /// Ensemble size, fixed for the field's lifetime.
    pub count: usize,
    /// Output surface size in pixels.
    pub width: f32,
    pub height: f32,

    /// Magnitude of the pull toward a closed fist.
    pub attract_strength: f32,
    /// No pull inside this distance of the anchor, so the swarm orbits
    /// rather than collapsing to a point.
    pub attract_dead_zone: f32,
    pub attract_damping: f32,

    /// Open-palm push reaches this far from the anchor.
    pub repel_radius: f32,
    /// Push magnitude is `(repel_radius - distance) / repel_falloff_div`.
    pub repel_falloff_div: f32,
    pub repel_damping: f32,

    pub idle_damping: f32,
    /// Idle pull toward the surface centre, per pixel of offset.
    pub center_pull: f32,
    /// Half-range of the per-axis random velocity jitter.
    pub jitter: f32,

    pub min_radius: f32,
    pub max_radius: f32,

    /// Ensemble-wide override colors while a gesture is held.
    pub closed_color: u32,
    pub open_color: u32,
}

impl Default for FieldConfig {
    fn default() -> Self {
        FieldConfig {
            count: 300,
            width: 960.0,
            height: 540.0,

            attract_strength: 1.5,
            attract_dead_zone: 5.0,
            attract_damping: 0.90,

            repel_radius: 200.0,
            repel_falloff_div: 20.0,
            repel_damping: 0.95,

            idle_damping: 0.98,
            center_pull: 0.0005,
            jitter: 0.3,

            min_radius: 1.5,
            max_radius: 3.5,

            closed_color: 0xFFFF5A36, // hot ember
            open_color: 0xFF4FC3F7,   // cool sky
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Particle
// ════════════════════════════════════════════════════════════════════════════

/// One particle.  Position and velocity are in surface pixels (per frame).
#[derive(Clone, Copy, Debug)]
pub struct Particle {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub radius: f32,
    pub base_color: u32,
}

/// Map an ensemble index to a base color on a hue wheel, so neighbouring
/// particles stay visually distinct when idle.
fn base_color(index: usize, count: usize) -> u32 {
    let hue = index as f32 / count.max(1) as f32 * 360.0;
    hsv_to_argb(hue, 0.55, 0.95)
}

/// Convert HSV to packed ARGB (alpha 0xFF).
fn hsv_to_argb(h: f32, s: f32, v: f32) -> u32 {
    let h = h % 360.0;
    let sector = (h / 60.0) as u32;
    let f = h / 60.0 - sector as f32;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    let (r, g, b) = match sector {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };
    0xFF00_0000
        | (((r * 255.0) as u32) << 16)
        | (((g * 255.0) as u32) << 8)
        | ((b * 255.0) as u32)
}

// ════════════════════════════════════════════════════════════════════════════
// ParticleField
// ════════════════════════════════════════════════════════════════════════════

pub struct ParticleField {
    cfg: FieldConfig,
    particles: Vec<Particle>,
    rng: StdRng,
}

impl ParticleField {
    /// Scatter a fresh ensemble with entropy-seeded randomness.
    pub fn new(cfg: FieldConfig) -> Self {
        Self::from_rng(cfg, StdRng::from_entropy())
    }

    /// Deterministic ensemble for tests.
    pub fn with_seed(cfg: FieldConfig, seed: u64) -> Self {
        Self::from_rng(cfg, StdRng::seed_from_u64(seed))
    }

    fn from_rng(cfg: FieldConfig, rng: StdRng) -> Self {
        let mut field = ParticleField { cfg, particles: Vec::new(), rng };
        field.reset();
        field
    }

    /// Re-scatter the whole ensemble.  The only way particles "restart":
    /// there is no per-particle spawn or death.
    pub fn reset(&mut self) {
        let cfg = self.cfg.clone();
        self.particles.clear();
        for i in 0..cfg.count {
            let p = Particle {
                x: self.rng.gen_range(0.0..cfg.width.max(1.0)),
                y: self.rng.gen_range(0.0..cfg.height.max(1.0)),
                vx: 0.0,
                vy: 0.0,
                radius: self.rng.gen_range(cfg.min_radius..=cfg.max_radius),
                base_color: base_color(i, cfg.count),
            };
            self.particles.push(p);
        }
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn particles_mut(&mut self) -> &mut [Particle] {
        &mut self.particles
    }

    pub fn config(&self) -> &FieldConfig {
        &self.cfg
    }

    /// Follow a surface-size change, clamping every particle back inside.
    pub fn resize(&mut self, width: f32, height: f32) {
        self.cfg.width = width.max(1.0);
        self.cfg.height = height.max(1.0);
        for p in &mut self.particles {
            p.x = p.x.clamp(0.0, self.cfg.width);
            p.y = p.y.clamp(0.0, self.cfg.height);
        }
    }

    /// Advance the simulation by one frame under the given gesture.
    pub fn step(&mut self, gesture: &HandState) {
        let cfg = self.cfg.clone();
        let cx = cfg.width / 2.0;
        let cy = cfg.height / 2.0;

        for p in &mut self.particles {
            match *gesture {
                HandState::Closed { anchor } => {
                    let dx = anchor.x - p.x;
                    let dy = anchor.y - p.y;
                    let dist = (dx * dx + dy * dy).sqrt();
                    if dist > cfg.attract_dead_zone {
                        p.vx += dx / dist * cfg.attract_strength;
                        p.vy += dy / dist * cfg.attract_strength;
                    }
                    p.vx *= cfg.attract_damping;
                    p.vy *= cfg.attract_damping;
                }
                HandState::Open { anchor } => {
                    let dx = p.x - anchor.x;
                    let dy = p.y - anchor.y;
                    let dist = (dx * dx + dy * dy).sqrt();
                    if dist < cfg.repel_radius {
                        let push = (cfg.repel_radius - dist) / cfg.repel_falloff_div;
                        let dist = dist.max(1.0);
                        p.vx += dx / dist * push;
                        p.vy += dy / dist * push;
                    } else {
                        p.vx += self.rng.gen_range(-cfg.jitter..=cfg.jitter);
                        p.vy += self.rng.gen_range(-cfg.jitter..=cfg.jitter);
                    }
                    p.vx *= cfg.repel_damping;
                    p.vy *= cfg.repel_damping;
                }
                HandState::None => {
                    p.vx += self.rng.gen_range(-cfg.jitter..=cfg.jitter);
                    p.vy += self.rng.gen_range(-cfg.jitter..=cfg.jitter);
                    p.vx += (cx - p.x) * cfg.center_pull;
                    p.vy += (cy - p.y) * cfg.center_pull;
                    p.vx *= cfg.idle_damping;
                    p.vy *= cfg.idle_damping;
                }
            }

            p.x += p.vx;
            p.y += p.vy;

            // Reflective boundary: clamp and bounce the exited axis.
            if p.x < 0.0 {
                p.x = 0.0;
                p.vx = -p.vx;
            } else if p.x > cfg.width {
                p.x = cfg.width;
                p.vx = -p.vx;
            }
            if p.y < 0.0 {
                p.y = 0.0;
                p.vy = -p.vy;
            } else if p.y > cfg.height {
                p.y = cfg.height;
                p.vy = -p.vy;
            }
        }
    }

    /// Render color for a particle under the current gesture: a fixed hot
    /// color while closed and a fixed cool color while open, giving feedback
    /// the instant the state flips, independent of the physics.
    pub fn display_color(&self, particle: &Particle, gesture: &HandState) -> u32 {
        match gesture {
            HandState::Closed { .. } => self.cfg.closed_color,
            HandState::Open { .. } => self.cfg.open_color,
            HandState::None => particle.base_color,
        }
    }

    /// Mean distance of the ensemble to a point (HUD and tests).
    pub fn mean_distance_to(&self, point: PixelPoint) -> f32 {
        if self.particles.is_empty() {
            return 0.0;
        }
        let sum: f32 = self
            .particles
            .iter()
            .map(|p| {
                let dx = p.x - point.x;
                let dy = p.y - point.y;
                (dx * dx + dy * dy).sqrt()
            })
            .sum();
        sum / self.particles.len() as f32
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn field() -> ParticleField {
        ParticleField::with_seed(FieldConfig::default(), 7)
    }

    fn in_bounds(f: &ParticleField) -> bool {
        let cfg = f.config();
        f.particles()
            .iter()
            .all(|p| p.x >= 0.0 && p.x <= cfg.width && p.y >= 0.0 && p.y <= cfg.height)
    }

    #[test]
    fn scatter_fills_count_in_bounds() {
        let f = field();
        assert_eq!(f.particles().len(), 300);
        assert!(in_bounds(&f));
    }

    #[test]
    fn bounds_hold_under_adversarial_velocities() {
        let mut f = field();
        for (i, p) in f.particles_mut().iter_mut().enumerate() {
            p.vx = if i % 2 == 0 { 900.0 } else { -900.0 };
            p.vy = if i % 3 == 0 { -700.0 } else { 700.0 };
        }
        let anchor = PixelPoint::new(480.0, 270.0);
        for step in 0..200 {
            let gesture = match step % 3 {
                0 => HandState::Closed { anchor },
                1 => HandState::Open { anchor },
                _ => HandState::None,
            };
            f.step(&gesture);
            assert!(in_bounds(&f), "particle escaped at step {}", step);
        }
    }

    #[test]
    fn closed_fist_draws_ensemble_inward() {
        let mut f = field();
        let anchor = PixelPoint::new(480.0, 270.0);
        let before = f.mean_distance_to(anchor);
        let mut prev = before;
        for _ in 0..30 {
            f.step(&HandState::Closed { anchor });
            let now = f.mean_distance_to(anchor);
            assert!(now < prev, "mean distance must strictly decrease");
            prev = now;
        }
        assert!(prev < before * 0.8);
    }

    #[test]
    fn open_palm_pushes_ensemble_out() {
        let mut f = field();
        let anchor = PixelPoint::new(480.0, 270.0);
        // Gather first so everything starts inside the repulsion radius.
        for _ in 0..120 {
            f.step(&HandState::Closed { anchor });
        }
        let gathered = f.mean_distance_to(anchor);
        for _ in 0..60 {
            f.step(&HandState::Open { anchor });
        }
        let scattered = f.mean_distance_to(anchor);
        let cfg = f.config();
        assert!(
            scattered > gathered || scattered >= cfg.repel_radius,
            "ensemble should spread out or clear the repulsion radius"
        );
    }

    #[test]
    fn idle_velocities_stay_bounded() {
        let mut f = field();
        for _ in 0..500 {
            f.step(&HandState::None);
        }
        assert!(f
            .particles()
            .iter()
            .all(|p| p.vx.abs() < 50.0 && p.vy.abs() < 50.0));
        assert!(in_bounds(&f));
    }

    #[test]
    fn display_color_overrides_by_gesture() {
        let f = field();
        let p = f.particles()[0];
        let anchor = PixelPoint::new(0.0, 0.0);
        assert_eq!(
            f.display_color(&p, &HandState::Closed { anchor }),
            f.config().closed_color
        );
        assert_eq!(
            f.display_color(&p, &HandState::Open { anchor }),
            f.config().open_color
        );
        assert_eq!(f.display_color(&p, &HandState::None), p.base_color);
    }

    #[test]
    fn reset_rescatters_en_masse() {
        let mut f = field();
        let anchor = PixelPoint::new(10.0, 10.0);
        for _ in 0..100 {
            f.step(&HandState::Closed { anchor });
        }
        f.reset();
        assert_eq!(f.particles().len(), 300);
        assert!(in_bounds(&f));
        assert!(f.particles().iter().all(|p| p.vx == 0.0 && p.vy == 0.0));
    }

    #[test]
    fn resize_clamps_particles_inside() {
        let mut f = field();
        f.resize(100.0, 80.0);
        let cfg = f.config();
        assert_eq!(cfg.width, 100.0);
        assert_eq!(cfg.height, 80.0);
        assert!(in_bounds(&f));
    }
}
