//! The per-frame pipeline driver.
//!
//! Each window-loop iteration calls [`Driver::pump`] exactly once.  The pump
//! pulls the newest frame (never a queued backlog), stamps a strictly
//! increasing timestamp, and runs the landmark source.  Everything that can
//! go wrong mid-loop is degraded, never raised: a failed frame fetch renders
//! as an idle frame, a failed detector call is logged and becomes "no hand
//! this frame".  A session that is not `Running` pumps to an inert step, so
//! any work finishing after a release is discarded rather than applied.

use std::time::Instant;

use hand_track::KeypointSet;
use tracing::warn;

use crate::camera::VideoFrame;
use crate::session::CaptureSession;

// ════════════════════════════════════════════════════════════════════════════
// FrameClock
// ════════════════════════════════════════════════════════════════════════════

/// Millisecond timestamps for the detector contract: strictly increasing
/// within a session, even when two frames land inside the same millisecond.
pub struct FrameClock {
    start: Instant,
    last_ms: Option<u64>,
}

impl FrameClock {
    pub fn new() -> Self {
        FrameClock { start: Instant::now(), last_ms: None }
    }

    pub fn next_timestamp(&mut self) -> u64 {
        let now = self.start.elapsed().as_millis() as u64;
        let ts = match self.last_ms {
            Some(last) if now <= last => last + 1,
            _ => now,
        };
        self.last_ms = Some(ts);
        ts
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Driver
// ════════════════════════════════════════════════════════════════════════════

/// What one pipeline step produced, ready for classification.
pub struct FrameStep {
    pub frame: VideoFrame,
    pub hand: Option<KeypointSet>,
}

impl FrameStep {
    /// The step an idle or stopped pipeline yields: render-worthy, handless.
    fn idle() -> Self {
        FrameStep { frame: VideoFrame::empty(), hand: None }
    }
}

pub struct Driver {
    clock: FrameClock,
}

impl Driver {
    pub fn new() -> Self {
        Driver { clock: FrameClock::new() }
    }

    /// One frame's worth of acquisition and detection.
    ///
    /// The detector only runs on frames with real dimensions; a not-yet-ready
    /// stream still produces a step so the view keeps redrawing instead of
    /// stalling.
    pub fn pump(&mut self, session: &mut CaptureSession) -> FrameStep {
        let Some((frames, detector)) = session.parts() else {
            return FrameStep::idle();
        };

        let frame = match frames.next_frame() {
            Ok(f) => f,
            Err(e) => {
                warn!(error = %e, "frame fetch failed, rendering idle frame");
                VideoFrame::empty()
            }
        };

        let hand = if frame.is_empty() {
            None
        } else {
            let ts = self.clock.next_timestamp();
            match detector.detect(frame.as_ref(), ts) {
                Ok(hand) => hand,
                Err(e) => {
                    warn!(error = %e, "detector failed, treating frame as handless");
                    None
                }
            }
        };

        FrameStep { frame, hand }
    }
}

impl Default for Driver {
    fn default() -> Self {
        Self::new()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{FrameSource, SyntheticStage};
    use crate::error::CanvasError;
    use crate::session::CaptureSession;
    use hand_track::{
        DetectError, FrameRef, Keypoint, KeypointSet, LandmarkSource, ScriptedSource,
        LANDMARK_COUNT,
    };
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Test detector sharing its script with the outside, so assertions can
    /// inspect what the driver fed it.
    struct SharedSource(Rc<RefCell<ScriptedSource>>);

    impl LandmarkSource for SharedSource {
        fn detect(
            &mut self,
            frame: FrameRef<'_>,
            timestamp_ms: u64,
        ) -> Result<Option<KeypointSet>, DetectError> {
            self.0.borrow_mut().detect(frame, timestamp_ms)
        }
    }

    fn flat_hand() -> KeypointSet {
        KeypointSet::new([Keypoint::new(0.5, 0.5, 0.0); LANDMARK_COUNT])
    }

    fn running_session(script: Rc<RefCell<ScriptedSource>>) -> CaptureSession {
        let mut s = CaptureSession::new();
        s.start(
            || Ok(Box::new(SyntheticStage::new(64, 48)) as Box<dyn FrameSource>),
            move || Ok(Box::new(SharedSource(script)) as Box<dyn LandmarkSource>),
        )
        .unwrap();
        s
    }

    #[test]
    fn clock_is_strictly_increasing() {
        let mut clock = FrameClock::new();
        let mut last = clock.next_timestamp();
        for _ in 0..1000 {
            let ts = clock.next_timestamp();
            assert!(ts > last);
            last = ts;
        }
    }

    #[test]
    fn stopped_session_pumps_inert_steps() {
        let mut driver = Driver::new();
        let mut session = CaptureSession::new();
        let step = driver.pump(&mut session);
        assert!(step.frame.is_empty());
        assert!(step.hand.is_none());
    }

    #[test]
    fn detector_failure_is_swallowed_as_no_hand() {
        let script = Rc::new(RefCell::new(ScriptedSource::new()));
        script.borrow_mut().push_failure("transient backend fault");
        script.borrow_mut().push_hand(flat_hand());

        let mut session = running_session(script.clone());
        let mut driver = Driver::new();

        let step = driver.pump(&mut session);
        assert!(!step.frame.is_empty(), "the loop keeps its frame");
        assert!(step.hand.is_none(), "failure degrades to no-hand");

        let step = driver.pump(&mut session);
        assert!(step.hand.is_some(), "the very next frame recovers");
    }

    #[test]
    fn detector_sees_strictly_increasing_timestamps() {
        let script = Rc::new(RefCell::new(ScriptedSource::new()));
        let mut session = running_session(script.clone());
        let mut driver = Driver::new();
        for _ in 0..50 {
            driver.pump(&mut session);
        }
        let seen = script.borrow().seen_timestamps.clone();
        assert_eq!(seen.len(), 50);
        assert!(seen.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn released_session_discards_late_work() {
        let script = Rc::new(RefCell::new(ScriptedSource::new()));
        script.borrow_mut().push_hand(flat_hand());

        let mut session = running_session(script.clone());
        let mut driver = Driver::new();
        session.release();

        let step = driver.pump(&mut session);
        assert!(step.hand.is_none());
        // The detector was never invoked after the release.
        assert!(script.borrow().seen_timestamps.is_empty());
        assert_eq!(script.borrow().remaining(), 1);
    }

    #[test]
    fn frame_fetch_failure_degrades_to_idle_frame() {
        struct FailingFrames;
        impl FrameSource for FailingFrames {
            fn next_frame(&mut self) -> Result<VideoFrame, CanvasError> {
                Err(CanvasError::DeviceNotFound("unplugged".into()))
            }
            fn resolution(&self) -> (usize, usize) {
                (0, 0)
            }
        }

        let mut session = CaptureSession::new();
        session
            .start(
                || Ok(Box::new(FailingFrames) as Box<dyn FrameSource>),
                || Ok(Box::new(ScriptedSource::new()) as Box<dyn LandmarkSource>),
            )
            .unwrap();

        let mut driver = Driver::new();
        let step = driver.pump(&mut session);
        assert!(step.frame.is_empty());
        assert!(step.hand.is_none());
        assert!(session.is_running(), "a bad frame never stops the loop");
    }
}
