//! # ink_layer
//!
//! The persistent raster layer behind the gesture drawing board.
//!
//! Strokes arrive as pairs of consecutive pinch anchors and are rasterized
//! immediately by stamping filled discs along the segment, which gives every
//! stroke rounded caps and joins so a chain of short per-frame segments
//! reads as one continuous line.  The layer is irreversible: there is no
//! vector history and no undo, only [`InkLayer::clear`].
//!
//! Pixels are packed ARGB; alpha `0x00` marks untouched raster.  The eraser
//! is the same stamping walk configured to subtract coverage instead of
//! painting it.
//!
//! [`StrokeTracker`] carries the one frame of state the stroke pipeline
//! needs: the previous anchor.  Feeding it `None` (pinch released, hand
//! lost) clears that anchor, so a later resumed pinch starts a fresh stroke
//! instead of drawing a spurious segment across the gap.

use hand_track::PixelPoint;

// ════════════════════════════════════════════════════════════════════════════
// Tools and stroke style
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tool {
    Brush,
    Eraser,
}

pub const DEFAULT_BRUSH_WIDTH: f32 = 6.0;
/// Erasing wants a wider footprint than painting.
pub const DEFAULT_ERASER_WIDTH: f32 = 36.0;

/// Tool, color and width captured at the moment a segment is drawn.
#[derive(Clone, Copy, Debug)]
pub struct StrokeStyle {
    pub tool: Tool,
    pub color: u32,
    pub width: f32,
}

impl StrokeStyle {
    pub fn brush(color: u32, width: f32) -> Self {
        StrokeStyle { tool: Tool::Brush, color, width }
    }

    pub fn eraser(width: f32) -> Self {
        StrokeStyle { tool: Tool::Eraser, color: 0, width }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// InkLayer
// ════════════════════════════════════════════════════════════════════════════

/// Accumulated drawing state for one session.
pub struct InkLayer {
    width: usize,
    height: usize,
    pixels: Vec<u32>,
}

impl InkLayer {
    pub fn new(width: usize, height: usize) -> Self {
        InkLayer {
            width,
            height,
            pixels: vec![0; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Raw ARGB pixels, row-major.  Alpha 0 is untouched raster.
    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    pub fn is_blank(&self) -> bool {
        self.pixels.iter().all(|&p| p >> 24 == 0)
    }

    /// Number of covered pixels.
    pub fn painted_count(&self) -> usize {
        self.pixels.iter().filter(|&&p| p >> 24 != 0).count()
    }

    pub fn pixel(&self, x: usize, y: usize) -> u32 {
        self.pixels[y * self.width + x]
    }

    /// Wipe the whole layer.  Unconditional: runs regardless of any gesture
    /// or tool state.
    pub fn clear(&mut self) {
        self.pixels.fill(0);
    }

    /// Rasterize one stroke segment from `a` to `b`.
    ///
    /// Discs of the stroke width are stamped at sub-width intervals along
    /// the line; a degenerate segment (`a == b`) stamps a single dot.
    pub fn segment(&mut self, a: PixelPoint, b: PixelPoint, style: &StrokeStyle) {
        let radius = (style.width / 2.0).max(0.5);
        let value = match style.tool {
            Tool::Brush => 0xFF00_0000 | (style.color & 0x00FF_FFFF),
            Tool::Eraser => 0,
        };

        let dx = b.x - a.x;
        let dy = b.y - a.y;
        let dist = (dx * dx + dy * dy).sqrt();
        let spacing = (radius * 0.5).max(1.0);
        let steps = (dist / spacing).ceil() as usize;

        for i in 0..=steps {
            let t = if steps == 0 { 0.0 } else { i as f32 / steps as f32 };
            self.stamp_disc(a.x + dx * t, a.y + dy * t, radius, value);
        }
    }

    fn stamp_disc(&mut self, cx: f32, cy: f32, radius: f32, value: u32) {
        if self.width == 0 || self.height == 0 {
            return;
        }
        let r2 = radius * radius;
        let x0 = (cx - radius).floor().max(0.0) as usize;
        let y0 = (cy - radius).floor().max(0.0) as usize;
        let x1 = ((cx + radius).ceil().max(0.0) as usize).min(self.width - 1);
        let y1 = ((cy + radius).ceil().max(0.0) as usize).min(self.height - 1);

        for y in y0..=y1 {
            for x in x0..=x1 {
                let dx = x as f32 - cx;
                let dy = y as f32 - cy;
                if dx * dx + dy * dy <= r2 {
                    self.pixels[y * self.width + x] = value;
                }
            }
        }
    }

    /// Alpha-blend the ink over a background frame of the same dimensions,
    /// producing a flattened opaque image (used by save/export).
    pub fn composite_over(&self, background: &[u32]) -> Vec<u32> {
        debug_assert_eq!(background.len(), self.pixels.len());
        self.pixels
            .iter()
            .zip(background.iter())
            .map(|(&ink, &bg)| {
                let a = (ink >> 24) as f32 / 255.0;
                if a == 0.0 {
                    0xFF00_0000 | (bg & 0x00FF_FFFF)
                } else if a >= 1.0 {
                    ink
                } else {
                    let ch = |shift: u32| {
                        let i = (ink >> shift) & 0xFF;
                        let b = (bg >> shift) & 0xFF;
                        ((i as f32 * a + b as f32 * (1.0 - a)) as u32) << shift
                    };
                    0xFF00_0000 | ch(16) | ch(8) | ch(0)
                }
            })
            .collect()
    }

    /// Follow a viewport resize, keeping the overlapping region of the
    /// drawing.
    pub fn resize(&mut self, width: usize, height: usize) {
        if width == self.width && height == self.height {
            return;
        }
        let mut pixels = vec![0u32; width * height];
        for y in 0..height.min(self.height) {
            let src = y * self.width;
            let dst = y * width;
            let n = width.min(self.width);
            pixels[dst..dst + n].copy_from_slice(&self.pixels[src..src + n]);
        }
        self.width = width;
        self.height = height;
        self.pixels = pixels;
    }

    /// Stamp a template's line art onto the layer at `origin`, scaled to
    /// `scale` pixels per template unit.  One-shot; the gesture pipeline is
    /// not involved.
    pub fn stamp_template(&mut self, template: &Template, origin: PixelPoint, scale: f32) {
        for line in &template.polylines {
            let style = StrokeStyle::brush(line.color, (line.width_frac * scale).max(1.0));
            for pair in line.points.windows(2) {
                let a = PixelPoint::new(origin.x + pair[0].0 * scale, origin.y + pair[0].1 * scale);
                let b = PixelPoint::new(origin.x + pair[1].0 * scale, origin.y + pair[1].1 * scale);
                self.segment(a, b, &style);
            }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// StrokeTracker — anchor continuity between frames
// ════════════════════════════════════════════════════════════════════════════

/// The single frame of memory the stroke pipeline keeps: where the pinch
/// was last frame.
#[derive(Clone, Copy, Debug, Default)]
pub struct StrokeTracker {
    last_anchor: Option<PixelPoint>,
}

impl StrokeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed this frame's pinch anchor (or `None` when not pinching).
    ///
    /// Returns `true` when a segment was committed to the layer.  The first
    /// frame of a pinch only records the anchor; a `None` frame clears it.
    pub fn feed(
        &mut self,
        layer: &mut InkLayer,
        anchor: Option<PixelPoint>,
        style: &StrokeStyle,
    ) -> bool {
        match anchor {
            Some(current) => {
                let committed = match self.last_anchor {
                    Some(prev) => {
                        layer.segment(prev, current, style);
                        true
                    }
                    None => false,
                };
                self.last_anchor = Some(current);
                committed
            }
            None => {
                self.last_anchor = None;
                false
            }
        }
    }

    pub fn last_anchor(&self) -> Option<PixelPoint> {
        self.last_anchor
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Template — parametric line art
// ════════════════════════════════════════════════════════════════════════════

/// A polyline of a template, in unit space ([0,1] on both axes).
pub struct TemplateLine {
    pub points: Vec<(f32, f32)>,
    pub color: u32,
    /// Stroke width as a fraction of the stamp scale.
    pub width_frac: f32,
}

/// A predefined vector illustration, rasterized on demand by
/// [`InkLayer::stamp_template`].
pub struct Template {
    pub polylines: Vec<TemplateLine>,
}

impl Template {
    /// An eight-petal daisy with a stem and two leaves.
    pub fn daisy() -> Template {
        use std::f32::consts::TAU;

        let mut polylines = Vec::new();
        let head = (0.5_f32, 0.3_f32);

        // Petals: slim closed loops radiating from the head.
        for k in 0..8 {
            let dir = TAU * k as f32 / 8.0;
            let (sin, cos) = dir.sin_cos();
            let mut points = Vec::with_capacity(13);
            for s in 0..=12 {
                let t = TAU * s as f32 / 12.0;
                // Ellipse along the petal axis: long radius out, short across.
                let along = 0.065 + 0.065 * t.cos();
                let across = 0.028 * t.sin();
                points.push((
                    head.0 + cos * along - sin * across,
                    head.1 + sin * along + cos * across,
                ));
            }
            polylines.push(TemplateLine { points, color: 0xF5F5FF, width_frac: 0.012 });
        }

        // Flower centre: a small circle.
        let mut centre = Vec::with_capacity(13);
        for s in 0..=12 {
            let t = TAU * s as f32 / 12.0;
            centre.push((head.0 + 0.045 * t.cos(), head.1 + 0.045 * t.sin()));
        }
        polylines.push(TemplateLine { points: centre, color: 0xFFC940, width_frac: 0.02 });

        // Stem: gentle S-curve down to the bottom of the unit square.
        let stem = (0..=10)
            .map(|s| {
                let t = s as f32 / 10.0;
                (head.0 + 0.04 * (t * TAU / 2.0).sin(), head.1 + 0.045 + t * 0.58)
            })
            .collect();
        polylines.push(TemplateLine { points: stem, color: 0x3FA34D, width_frac: 0.016 });

        // Two leaves branching off the stem.
        for (side, t0) in [(1.0_f32, 0.35_f32), (-1.0, 0.55)] {
            let base = (head.0, head.1 + 0.045 + t0 * 0.58);
            let leaf = (0..=8)
                .map(|s| {
                    let t = s as f32 / 8.0;
                    let reach = 0.11 * (t * TAU / 2.0).sin();
                    (base.0 + side * t * 0.13, base.1 - reach * 0.45)
                })
                .collect();
            polylines.push(TemplateLine { points: leaf, color: 0x3FA34D, width_frac: 0.014 });
        }

        Template { polylines }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn layer() -> InkLayer {
        InkLayer::new(200, 120)
    }

    fn brush() -> StrokeStyle {
        StrokeStyle::brush(0xFF2D70, 6.0)
    }

    #[test]
    fn new_layer_is_blank() {
        assert!(layer().is_blank());
    }

    #[test]
    fn first_pinch_frame_records_without_drawing() {
        let mut l = layer();
        let mut t = StrokeTracker::new();
        let committed = t.feed(&mut l, Some(PixelPoint::new(50.0, 50.0)), &brush());
        assert!(!committed);
        assert!(l.is_blank());
        assert!(t.last_anchor().is_some());
    }

    #[test]
    fn consecutive_anchors_commit_one_segment() {
        let mut l = layer();
        let mut t = StrokeTracker::new();
        let a = PixelPoint::new(40.0, 60.0);
        let b = PixelPoint::new(120.0, 60.0);
        t.feed(&mut l, Some(a), &brush());
        assert!(t.feed(&mut l, Some(b), &brush()));
        // The midpoint of A→B is covered; rounded caps cover both endpoints.
        assert_ne!(l.pixel(80, 60) >> 24, 0);
        assert_ne!(l.pixel(40, 60) >> 24, 0);
        assert_ne!(l.pixel(120, 60) >> 24, 0);
    }

    #[test]
    fn released_pinch_never_bridges_the_gap() {
        let mut l = layer();
        let mut t = StrokeTracker::new();
        let b = PixelPoint::new(20.0, 20.0);
        let c = PixelPoint::new(180.0, 100.0);
        t.feed(&mut l, Some(b), &brush());
        t.feed(&mut l, None, &brush());
        let committed = t.feed(&mut l, Some(c), &brush());
        assert!(!committed);
        assert!(l.is_blank(), "no segment may connect across a released pinch");
    }

    #[test]
    fn eraser_subtracts_coverage() {
        let mut l = layer();
        let a = PixelPoint::new(30.0, 30.0);
        let b = PixelPoint::new(90.0, 30.0);
        l.segment(a, b, &brush());
        assert_ne!(l.pixel(60, 30) >> 24, 0);

        l.segment(
            PixelPoint::new(55.0, 30.0),
            PixelPoint::new(65.0, 30.0),
            &StrokeStyle::eraser(20.0),
        );
        assert_eq!(l.pixel(60, 30), 0);
        // Ink outside the eraser footprint survives.
        assert_ne!(l.pixel(30, 30) >> 24, 0);
    }

    #[test]
    fn clear_wipes_everything() {
        let mut l = layer();
        l.segment(PixelPoint::new(10.0, 10.0), PixelPoint::new(150.0, 100.0), &brush());
        assert!(!l.is_blank());
        l.clear();
        assert!(l.is_blank());
    }

    #[test]
    fn composite_mixes_ink_and_background() {
        let mut l = layer();
        l.segment(PixelPoint::new(50.0, 50.0), PixelPoint::new(50.0, 50.0), &brush());
        let bg = vec![0x0010_2030u32; l.width() * l.height()];
        let out = l.composite_over(&bg);
        // Untouched raster shows the background, opaque.
        assert_eq!(out[0], 0xFF10_2030);
        // Painted raster shows the ink.
        assert_eq!(out[50 * l.width() + 50] & 0x00FF_FFFF, 0x00FF_2D70);
    }

    #[test]
    fn resize_preserves_overlap_and_crops_rest() {
        let mut l = layer();
        l.segment(PixelPoint::new(20.0, 20.0), PixelPoint::new(20.0, 20.0), &brush());
        l.resize(300, 200);
        assert_ne!(l.pixel(20, 20) >> 24, 0);
        l.resize(10, 10);
        assert_eq!(l.width(), 10);
        assert!(l.is_blank(), "ink outside the new viewport is cropped");
    }

    #[test]
    fn template_stamp_is_one_shot_and_tracker_independent() {
        let mut l = layer();
        let t = StrokeTracker::new();
        l.stamp_template(&Template::daisy(), PixelPoint::new(40.0, 10.0), 100.0);
        assert!(!l.is_blank());
        assert!(t.last_anchor().is_none());
    }

    #[test]
    fn degenerate_segment_stamps_a_dot() {
        let mut l = layer();
        let p = PixelPoint::new(100.0, 60.0);
        l.segment(p, p, &brush());
        assert_ne!(l.pixel(100, 60) >> 24, 0);
        assert_eq!(l.pixel(100, 70), 0);
    }
}
