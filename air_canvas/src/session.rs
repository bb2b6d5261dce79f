//! Session lifecycle: acquiring and releasing the frame source and the
//! landmark detector.
//!
//! A view owns exactly one `CaptureSession`.  The render loop may only run
//! while the session is `Running`, and `Running` is only reached once *both*
//! resources are acquired; the acquisition order itself is free.  Release is
//! unconditional and idempotent, and `Drop` re-runs it so teardown without
//! an explicit stop still lets go of the hardware.

use hand_track::LandmarkSource;
use tracing::{debug, info};

use crate::camera::FrameSource;
use crate::error::CanvasError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionStatus {
    Stopped,
    Starting,
    Running,
}

pub struct CaptureSession {
    status: SessionStatus,
    frames: Option<Box<dyn FrameSource>>,
    detector: Option<Box<dyn LandmarkSource>>,
}

impl CaptureSession {
    pub fn new() -> Self {
        CaptureSession {
            status: SessionStatus::Stopped,
            frames: None,
            detector: None,
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == SessionStatus::Running
    }

    /// Acquire both resources and transition `Stopped → Starting → Running`.
    ///
    /// Either acquisition may block (camera permission prompts, model asset
    /// loads).  If one fails the other is let go again, the session is back
    /// at `Stopped`, and the categorized error propagates to the caller.
    pub fn start(
        &mut self,
        acquire_frames: impl FnOnce() -> Result<Box<dyn FrameSource>, CanvasError>,
        acquire_detector: impl FnOnce() -> Result<Box<dyn LandmarkSource>, CanvasError>,
    ) -> Result<(), CanvasError> {
        self.release();
        self.status = SessionStatus::Starting;

        let frames = match acquire_frames() {
            Ok(f) => f,
            Err(e) => {
                self.release();
                return Err(e);
            }
        };
        let detector = match acquire_detector() {
            Ok(d) => d,
            Err(e) => {
                self.release();
                return Err(e);
            }
        };

        info!(
            frames = frames.label(),
            detector = detector.label(),
            "capture session running"
        );
        self.frames = Some(frames);
        self.detector = Some(detector);
        self.status = SessionStatus::Running;
        Ok(())
    }

    /// Stop everything.  All steps run even mid-frame, in order: the loop
    /// gate closes (status leaves `Running`), the media stream stops (frame
    /// source dropped), the detector handle clears, the status resets.
    /// Safe to call any number of times.
    pub fn release(&mut self) {
        if self.status == SessionStatus::Stopped
            && self.frames.is_none()
            && self.detector.is_none()
        {
            return;
        }
        self.status = SessionStatus::Stopped;
        self.frames = None;
        self.detector = None;
        debug!("capture session released");
    }

    /// Both pipeline ends, only while running.  A released session hands out
    /// nothing, so results of any late detector call have nowhere to land.
    pub fn parts(&mut self) -> Option<(&mut dyn FrameSource, &mut dyn LandmarkSource)> {
        if self.status != SessionStatus::Running {
            return None;
        }
        match (&mut self.frames, &mut self.detector) {
            (Some(f), Some(d)) => Some((f.as_mut(), d.as_mut())),
            _ => None,
        }
    }

    /// HUD line describing the active backends.
    pub fn describe(&self) -> String {
        match (&self.frames, &self.detector) {
            (Some(f), Some(d)) => format!("{} + {}", f.label(), d.label()),
            _ => "stopped".to_string(),
        }
    }
}

impl Default for CaptureSession {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.release();
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::SyntheticStage;
    use hand_track::ScriptedSource;

    fn frames() -> Result<Box<dyn FrameSource>, CanvasError> {
        Ok(Box::new(SyntheticStage::new(64, 48)))
    }

    fn detector() -> Result<Box<dyn LandmarkSource>, CanvasError> {
        Ok(Box::new(ScriptedSource::new()))
    }

    #[test]
    fn starts_only_when_both_resources_acquire() {
        let mut s = CaptureSession::new();
        s.start(frames, detector).unwrap();
        assert_eq!(s.status(), SessionStatus::Running);
        assert!(s.parts().is_some());
    }

    #[test]
    fn frame_acquisition_failure_returns_to_stopped() {
        let mut s = CaptureSession::new();
        let err = s
            .start(
                || Err(CanvasError::PermissionDenied("denied".into())),
                detector,
            )
            .unwrap_err();
        assert!(matches!(err, CanvasError::PermissionDenied(_)));
        assert_eq!(s.status(), SessionStatus::Stopped);
        assert!(s.parts().is_none());
    }

    #[test]
    fn detector_acquisition_failure_releases_the_frames_too() {
        let mut s = CaptureSession::new();
        let err = s
            .start(frames, || Err(CanvasError::ModelLoad("404".into())))
            .unwrap_err();
        assert!(matches!(err, CanvasError::ModelLoad(_)));
        assert_eq!(s.status(), SessionStatus::Stopped);
        assert!(s.parts().is_none());
    }

    #[test]
    fn release_is_idempotent() {
        let mut s = CaptureSession::new();
        s.start(frames, detector).unwrap();
        s.release();
        let after_one = s.status();
        s.release();
        assert_eq!(s.status(), after_one);
        assert_eq!(s.status(), SessionStatus::Stopped);
        assert!(s.parts().is_none());
        // Releasing a session that never started is equally fine.
        CaptureSession::new().release();
    }

    #[test]
    fn restart_after_release_works() {
        let mut s = CaptureSession::new();
        s.start(frames, detector).unwrap();
        s.release();
        s.start(frames, detector).unwrap();
        assert!(s.is_running());
    }
}
