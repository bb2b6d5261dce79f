//! # hand_track
//!
//! Hand keypoint model and gesture classification.
//!
//! A *landmark source* (camera-backed inference model, simulated pointer
//! hand, or a scripted replay in tests) delivers at most one hand per video
//! frame as a [`KeypointSet`]: 21 normalized 3D points whose indices are
//! fixed by anatomy.  The classifiers in this crate reduce a keypoint set to
//! a discrete gesture state:
//!
//! | Classifier | States | Heuristic |
//! |---|---|---|
//! | [`classify_hand`]  | `None` / `Open` / `Closed` | wrist→middle-tip vs wrist→middle-knuckle distance ratio |
//! | [`classify_pinch`] | `NotPinching` / `Pinching` | thumb-tip↔index-tip distance in output pixels |
//!
//! Both classifiers are total: every input, including "no hand detected",
//! maps to exactly one enumerated state.  All thresholds live in
//! [`ClassifierConfig`] rather than in the classification logic.

use std::collections::VecDeque;
use std::fmt;

// ════════════════════════════════════════════════════════════════════════════
// Keypoint model
// ════════════════════════════════════════════════════════════════════════════

/// One normalized hand landmark.  `x` and `y` are fractions of the frame
/// (0.0–1.0, origin top-left); `z` is relative depth from the detector.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Keypoint {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Keypoint { x, y, z }
    }

    /// Planar distance to another keypoint in normalized space.
    /// Depth is ignored: monocular detectors report `z` on a different
    /// scale than `x`/`y`.
    pub fn planar_distance(self, other: Keypoint) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Midpoint of two keypoints (component-wise).
    pub fn midpoint(self, other: Keypoint) -> Keypoint {
        Keypoint {
            x: (self.x + other.x) / 2.0,
            y: (self.y + other.y) / 2.0,
            z: (self.z + other.z) / 2.0,
        }
    }
}

/// Number of landmarks a detector reports for one hand.
pub const LANDMARK_COUNT: usize = 21;

/// Anatomical landmark indices, fixed across every detector backend.
pub mod landmark {
    pub const WRIST: usize = 0;
    pub const THUMB_MCP: usize = 2;
    pub const THUMB_TIP: usize = 4;
    pub const INDEX_MCP: usize = 5;
    pub const INDEX_TIP: usize = 8;
    pub const MIDDLE_MCP: usize = 9;
    pub const MIDDLE_TIP: usize = 12;
    pub const RING_MCP: usize = 13;
    pub const RING_TIP: usize = 16;
    pub const PINKY_MCP: usize = 17;
    pub const PINKY_TIP: usize = 20;
}

/// The 21 landmarks of one detected hand in one frame.
///
/// Produced fresh by a [`LandmarkSource`] each frame and consumed by the
/// classifiers; there is no cross-frame keypoint state.
#[derive(Clone, Debug, PartialEq)]
pub struct KeypointSet {
    points: [Keypoint; LANDMARK_COUNT],
}

impl KeypointSet {
    pub fn new(points: [Keypoint; LANDMARK_COUNT]) -> Self {
        KeypointSet { points }
    }

    /// Build a set by evaluating `f` at every landmark index.
    pub fn from_fn(f: impl FnMut(usize) -> Keypoint) -> Self {
        let mut f = f;
        let mut points = [Keypoint::default(); LANDMARK_COUNT];
        for (i, p) in points.iter_mut().enumerate() {
            *p = f(i);
        }
        KeypointSet { points }
    }

    /// Landmark at `index` (see the [`landmark`] constants).
    pub fn point(&self, index: usize) -> Keypoint {
        self.points[index]
    }

    pub fn points(&self) -> &[Keypoint; LANDMARK_COUNT] {
        &self.points
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Output-surface coordinates
// ════════════════════════════════════════════════════════════════════════════

/// A point in output-surface pixel coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PixelPoint {
    pub x: f32,
    pub y: f32,
}

impl PixelPoint {
    pub fn new(x: f32, y: f32) -> Self {
        PixelPoint { x, y }
    }

    pub fn distance(self, other: PixelPoint) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Map a normalized keypoint into output-surface pixels.
///
/// With `mirror_x` the X axis is flipped so the rendered hand moves the way
/// a user facing the camera expects (self-view mirror).
pub fn to_pixels(kp: Keypoint, width: f32, height: f32, mirror_x: bool) -> PixelPoint {
    let x = if mirror_x { (1.0 - kp.x) * width } else { kp.x * width };
    PixelPoint { x, y: kp.y * height }
}

// ════════════════════════════════════════════════════════════════════════════
// LandmarkSource — the injected detector capability
// ════════════════════════════════════════════════════════════════════════════

/// Borrowed view of one video frame handed to a landmark source.
///
/// Pixels are packed `0x00RRGGBB`, row-major.  Sources that do not inspect
/// pixels (scripted and simulated hands) ignore the buffer.
#[derive(Clone, Copy, Debug)]
pub struct FrameRef<'a> {
    pub width: usize,
    pub height: usize,
    pub pixels: &'a [u32],
}

impl FrameRef<'_> {
    pub fn empty() -> FrameRef<'static> {
        FrameRef { width: 0, height: 0, pixels: &[] }
    }

    /// A frame with a zero dimension carries no usable image.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Transient failure of a single detector invocation.
///
/// Callers treat a failed invocation as "no hand this frame"; it never
/// terminates a session.
#[derive(Clone, Debug)]
pub struct DetectError(pub String);

impl fmt::Display for DetectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "landmark detection failed: {}", self.0)
    }
}

impl std::error::Error for DetectError {}

/// Anything that can turn a video frame into at most one hand's keypoints.
///
/// Implementations must be invoked with strictly increasing `timestamp_ms`
/// values within one session.
pub trait LandmarkSource {
    fn detect(
        &mut self,
        frame: FrameRef<'_>,
        timestamp_ms: u64,
    ) -> Result<Option<KeypointSet>, DetectError>;

    /// Short human-readable backend name for logs and HUD.
    fn label(&self) -> &str {
        "landmark source"
    }
}

// ════════════════════════════════════════════════════════════════════════════
// ScriptedSource — deterministic replay for tests and scenarios
// ════════════════════════════════════════════════════════════════════════════

/// A landmark source that replays a prepared sequence of results.
///
/// Once the script is exhausted every further call reports no hand.  The
/// timestamps it was invoked with are recorded so tests can assert the
/// strictly-increasing contract.
#[derive(Default)]
pub struct ScriptedSource {
    script: VecDeque<Result<Option<KeypointSet>, DetectError>>,
    pub seen_timestamps: Vec<u64>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_hand(&mut self, kps: KeypointSet) {
        self.script.push_back(Ok(Some(kps)));
    }

    pub fn push_no_hand(&mut self) {
        self.script.push_back(Ok(None));
    }

    pub fn push_failure(&mut self, reason: &str) {
        self.script.push_back(Err(DetectError(reason.to_string())));
    }

    /// Queue `n` consecutive frames with the same result.
    pub fn repeat_hand(&mut self, kps: &KeypointSet, n: usize) {
        for _ in 0..n {
            self.push_hand(kps.clone());
        }
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl LandmarkSource for ScriptedSource {
    fn detect(
        &mut self,
        _frame: FrameRef<'_>,
        timestamp_ms: u64,
    ) -> Result<Option<KeypointSet>, DetectError> {
        self.seen_timestamps.push(timestamp_ms);
        self.script.pop_front().unwrap_or(Ok(None))
    }

    fn label(&self) -> &str {
        "scripted"
    }
}

// ════════════════════════════════════════════════════════════════════════════
// ClassifierConfig
// ════════════════════════════════════════════════════════════════════════════

/// Thresholds for both classifiers.  Defaults are the empirically chosen
/// values the views run with.
#[derive(Clone, Debug)]
pub struct ClassifierConfig {
    /// A hand is a fist when wrist→middle-tip distance falls below this
    /// multiple of the wrist→middle-knuckle distance.
    pub fist_tip_ratio: f32,
    /// Thumb-tip↔index-tip pixel distance below which the hand pinches.
    /// The comparison is strict: exactly this distance is not a pinch.
    pub pinch_max_px: f32,
    /// Mirror the X axis when mapping into output pixels (self-view).
    pub mirror_x: bool,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        ClassifierConfig {
            fist_tip_ratio: 1.2,
            pinch_max_px: 60.0,
            mirror_x: true,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Gesture states
// ════════════════════════════════════════════════════════════════════════════

/// Discrete hand pose for the particle view.  The anchor is where the hand
/// acts on the surface, in output pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum HandState {
    /// No hand detected this frame.
    None,
    /// Open palm at `anchor`.
    Open { anchor: PixelPoint },
    /// Closed fist at `anchor`.
    Closed { anchor: PixelPoint },
}

impl HandState {
    pub fn anchor(&self) -> Option<PixelPoint> {
        match *self {
            HandState::None => None,
            HandState::Open { anchor } | HandState::Closed { anchor } => Some(anchor),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            HandState::None => "none",
            HandState::Open { .. } => "open",
            HandState::Closed { .. } => "closed",
        }
    }
}

/// Pinch pose for the drawing view.  The anchor is the index fingertip in
/// output pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PinchState {
    NotPinching,
    Pinching { anchor: PixelPoint },
}

impl PinchState {
    pub fn anchor(&self) -> Option<PixelPoint> {
        match *self {
            PinchState::NotPinching => None,
            PinchState::Pinching { anchor } => Some(anchor),
        }
    }

    pub fn is_pinching(&self) -> bool {
        matches!(self, PinchState::Pinching { .. })
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Classification
// ════════════════════════════════════════════════════════════════════════════

/// Classify a hand as open, closed, or absent.
///
/// The fist test compares only the middle finger: if the middle fingertip
/// sits closer to the wrist than `fist_tip_ratio` times the wrist→knuckle
/// distance, the fingers are curled.  A single-finger ratio is a deliberate
/// approximation tuned for interaction feel, not a per-finger curl vote.
///
/// The anchor is the wrist/middle-knuckle midpoint, which tracks the palm
/// centre more steadily than any fingertip.
pub fn classify_hand(
    hand: Option<&KeypointSet>,
    width: f32,
    height: f32,
    cfg: &ClassifierConfig,
) -> HandState {
    let Some(kps) = hand else {
        return HandState::None;
    };

    let wrist = kps.point(landmark::WRIST);
    let mcp = kps.point(landmark::MIDDLE_MCP);
    let tip = kps.point(landmark::MIDDLE_TIP);

    let d_tip = wrist.planar_distance(tip);
    let d_mcp = wrist.planar_distance(mcp);

    let anchor = to_pixels(wrist.midpoint(mcp), width, height, cfg.mirror_x);

    if d_tip < cfg.fist_tip_ratio * d_mcp {
        HandState::Closed { anchor }
    } else {
        HandState::Open { anchor }
    }
}

/// Classify a thumb/index pinch in output-surface pixel space.
///
/// Both fingertips are mapped into pixels first so the threshold is an
/// on-screen distance, independent of frame resolution.
pub fn classify_pinch(
    hand: Option<&KeypointSet>,
    width: f32,
    height: f32,
    cfg: &ClassifierConfig,
) -> PinchState {
    let Some(kps) = hand else {
        return PinchState::NotPinching;
    };

    let thumb = to_pixels(kps.point(landmark::THUMB_TIP), width, height, cfg.mirror_x);
    let index = to_pixels(kps.point(landmark::INDEX_TIP), width, height, cfg.mirror_x);

    if thumb.distance(index) < cfg.pinch_max_px {
        PinchState::Pinching { anchor: index }
    } else {
        PinchState::NotPinching
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
