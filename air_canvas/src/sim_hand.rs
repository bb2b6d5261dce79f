//! Pointer-driven hand simulation.
//!
//! The default input mode: the mouse stands in for a hand, and a synthetic
//! 21-point skeleton is rebuilt around the pointer every frame.  Holding the
//! left button curls the middle finger (fist) and brings the thumb to the
//! index tip (pinch), so the *real* classifiers run unchanged over simulated
//! input; nothing downstream knows there is no model.
//!
//! The window loop samples the pointer and sends it over a channel; the
//! source drains the channel and keeps only the newest sample, the same
//! latest-wins rule the frame path uses.

use std::sync::mpsc::{self, Receiver, Sender};

use hand_track::{landmark, DetectError, FrameRef, Keypoint, KeypointSet, LandmarkSource};

/// One pointer observation from the window loop.
#[derive(Clone, Copy, Debug, Default)]
pub struct PointerSample {
    /// Pointer position normalized to the window (0.0–1.0).
    pub x: f32,
    pub y: f32,
    /// Left button held: fist in the particle view, pinch in the drawing view.
    pub pressed: bool,
    /// False when the pointer is outside the window (no hand this frame).
    pub present: bool,
}

pub struct SimHandSource {
    rx: Receiver<PointerSample>,
    latest: PointerSample,
    /// Must match the classifier's `mirror_x` so the on-screen anchor lands
    /// under the pointer after the self-view flip.
    mirror_x: bool,
}

impl SimHandSource {
    /// Build the source plus the sender the window loop feeds.
    pub fn channel(mirror_x: bool) -> (Sender<PointerSample>, SimHandSource) {
        let (tx, rx) = mpsc::channel();
        (
            tx,
            SimHandSource {
                rx,
                latest: PointerSample::default(),
                mirror_x,
            },
        )
    }

    /// Skeleton around the pointer.  Only the landmarks the classifiers
    /// read are meaningful; the rest sit at plausible offsets.
    fn skeleton(&self, s: PointerSample) -> KeypointSet {
        // Undo the classifier's mirror so the anchor maps back onto the
        // pointer.
        let hx = if self.mirror_x { 1.0 - s.x } else { s.x };
        let hy = s.y.clamp(0.0, 1.0);
        let hx = hx.clamp(0.0, 1.0);

        let wrist = Keypoint::new(hx, hy + 0.07, 0.0);
        let middle_mcp = Keypoint::new(hx, hy - 0.07, 0.0);
        let middle_tip = if s.pressed {
            // Curled: tip pulled back near the palm.
            Keypoint::new(hx, hy, 0.0)
        } else {
            Keypoint::new(hx, hy - 0.30, 0.0)
        };
        let index_tip = Keypoint::new(hx, hy, 0.0);
        let thumb_tip = if s.pressed {
            index_tip
        } else {
            Keypoint::new(hx - 0.20, hy + 0.02, 0.0)
        };

        KeypointSet::from_fn(|i| match i {
            landmark::WRIST => wrist,
            landmark::MIDDLE_MCP => middle_mcp,
            landmark::MIDDLE_TIP => middle_tip,
            landmark::INDEX_TIP => index_tip,
            landmark::THUMB_TIP => thumb_tip,
            landmark::INDEX_MCP => Keypoint::new(hx + 0.02, hy - 0.06, 0.0),
            landmark::RING_MCP => Keypoint::new(hx - 0.02, hy - 0.06, 0.0),
            landmark::RING_TIP => middle_tip,
            landmark::PINKY_TIP => middle_tip,
            _ => Keypoint::new(hx, hy, 0.0),
        })
    }
}

impl LandmarkSource for SimHandSource {
    fn detect(
        &mut self,
        _frame: FrameRef<'_>,
        _timestamp_ms: u64,
    ) -> Result<Option<KeypointSet>, DetectError> {
        while let Ok(sample) = self.rx.try_recv() {
            self.latest = sample;
        }
        if !self.latest.present {
            return Ok(None);
        }
        Ok(Some(self.skeleton(self.latest)))
    }

    fn label(&self) -> &str {
        "pointer hand"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hand_track::{classify_hand, classify_pinch, ClassifierConfig, HandState};

    const W: f32 = 960.0;
    const H: f32 = 540.0;

    fn detect(sample: PointerSample) -> Option<KeypointSet> {
        let (tx, mut src) = SimHandSource::channel(true);
        tx.send(sample).unwrap();
        src.detect(FrameRef::empty(), 1).unwrap()
    }

    fn sample(x: f32, y: f32, pressed: bool) -> PointerSample {
        PointerSample { x, y, pressed, present: true }
    }

    #[test]
    fn absent_pointer_means_no_hand() {
        assert!(detect(PointerSample::default()).is_none());
    }

    #[test]
    fn released_button_reads_as_open_hand() {
        let kps = detect(sample(0.5, 0.5, false)).unwrap();
        let state = classify_hand(Some(&kps), W, H, &ClassifierConfig::default());
        assert!(matches!(state, HandState::Open { .. }));
    }

    #[test]
    fn held_button_reads_as_fist_at_the_pointer() {
        let kps = detect(sample(0.25, 0.5, true)).unwrap();
        let state = classify_hand(Some(&kps), W, H, &ClassifierConfig::default());
        let anchor = state.anchor().unwrap();
        assert!(matches!(state, HandState::Closed { .. }));
        // Mirror undone by the source, re-applied by the classifier: the
        // anchor lands back under the pointer.
        assert!((anchor.x - 0.25 * W).abs() < 1.0);
        assert!((anchor.y - 0.5 * H).abs() < 1.0);
    }

    #[test]
    fn held_button_reads_as_pinch_at_the_pointer() {
        let cfg = ClassifierConfig::default();
        let kps = detect(sample(0.4, 0.6, true)).unwrap();
        let pinch = classify_pinch(Some(&kps), W, H, &cfg);
        let anchor = pinch.anchor().unwrap();
        assert!((anchor.x - 0.4 * W).abs() < 1.0);
        assert!((anchor.y - 0.6 * H).abs() < 1.0);

        let kps = detect(sample(0.4, 0.6, false)).unwrap();
        assert!(!classify_pinch(Some(&kps), W, H, &cfg).is_pinching());
    }

    #[test]
    fn channel_keeps_only_the_newest_sample() {
        let (tx, mut src) = SimHandSource::channel(false);
        tx.send(sample(0.1, 0.1, false)).unwrap();
        tx.send(sample(0.9, 0.9, true)).unwrap();
        let kps = src.detect(FrameRef::empty(), 1).unwrap().unwrap();
        let tip = kps.point(landmark::INDEX_TIP);
        assert!((tip.x - 0.9).abs() < 1e-3);
    }
}
