//! Per-frame facial metrics derived from a face mesh.
//!
//! [`MetricsEngine::compute`] is total: it never fails, and a mesh that lacks
//! the points a metric needs simply leaves that metric at zero. No state is
//! carried between frames.

use serde::{Deserialize, Serialize};

use crate::landmarks::{self, index, Landmark, Point2};

/// Scaling multipliers that map normalized distances onto a 0–100 range.
///
/// These were tuned empirically against a typical webcam framing and are
/// kept configurable so they can be recalibrated without code changes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Calibration {
    pub mouth_opening: f64,
    pub lateral_movement: f64,
    pub smile_width: f64,
    pub smile_lift: f64,
    pub eye_openness: f64,
    pub eyebrow_raise: f64,
    pub tongue_inner_gap: f64,
    pub tongue_lip_separation: f64,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            mouth_opening: 500.0,
            lateral_movement: 500.0,
            smile_width: 300.0,
            smile_lift: 500.0,
            eye_openness: 1000.0,
            eyebrow_raise: 400.0,
            tongue_inner_gap: 800.0,
            tongue_lip_separation: 1000.0,
        }
    }
}

/// Metrics for one frame. Every percentage field is in [0, 100];
/// `jaw_position` and `tongue_position` are raw normalized coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacialMetrics {
    pub mouth_opening: f64,
    pub lateral_movement: f64,
    pub jaw_position: Point2,
    pub smile: f64,
    pub left_eye_openness: f64,
    pub right_eye_openness: f64,
    pub eyebrows_raised: f64,
    /// Approximate: the mesh has no tongue points, so this is inferred from
    /// the inner mouth gap and lip separation.
    pub tongue_visible: f64,
    pub tongue_position: Point2,
}

impl FacialMetrics {
    pub fn zero() -> Self {
        Self::default()
    }
}

fn pct(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MetricsEngine {
    calibration: Calibration,
}

impl MetricsEngine {
    pub fn new(calibration: Calibration) -> Self {
        Self { calibration }
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    /// Compute all metrics for one frame. An empty mesh yields the zero record.
    pub fn compute(&self, landmarks: &[Landmark]) -> FacialMetrics {
        let mut m = FacialMetrics::zero();
        if landmarks.is_empty() {
            return m;
        }
        let cal = &self.calibration;

        if let Some((upper, lower)) =
            landmarks::pair(landmarks, index::UPPER_LIP_CENTER, index::LOWER_LIP_CENTER)
        {
            m.mouth_opening = pct((lower.y - upper.y).abs() * cal.mouth_opening);
        }

        if let Some((chin, nose)) = landmarks::pair(landmarks, index::CHIN, index::NOSE_TIP) {
            m.lateral_movement = pct((chin.x - nose.x).abs() * cal.lateral_movement);
            m.jaw_position = chin.to_point2();
        }

        if let (Some((left, right)), Some(upper)) = (
            landmarks::pair(landmarks, index::MOUTH_CORNER_LEFT, index::MOUTH_CORNER_RIGHT),
            landmarks::get(landmarks, index::UPPER_LIP_CENTER),
        ) {
            let width = left.planar_distance(right) * cal.smile_width;
            // Positive when the corners sit above the lip centre (smaller y).
            let lift = ((upper.y - left.y) + (upper.y - right.y)) / 2.0 * cal.smile_lift;
            m.smile = pct(width + lift);
        }

        if let Some((upper, lower)) =
            landmarks::pair(landmarks, index::LEFT_EYE_UPPER, index::LEFT_EYE_LOWER)
        {
            m.left_eye_openness = pct((lower.y - upper.y).abs() * cal.eye_openness);
        }
        if let Some((upper, lower)) =
            landmarks::pair(landmarks, index::RIGHT_EYE_UPPER, index::RIGHT_EYE_LOWER)
        {
            m.right_eye_openness = pct((lower.y - upper.y).abs() * cal.eye_openness);
        }

        if let (Some((left, right)), Some(bridge)) = (
            landmarks::pair(landmarks, index::LEFT_EYEBROW, index::RIGHT_EYEBROW),
            landmarks::get(landmarks, index::NOSE_BRIDGE),
        ) {
            let avg = ((bridge.y - left.y).abs() + (bridge.y - right.y).abs()) / 2.0;
            m.eyebrows_raised = pct(avg * cal.eyebrow_raise);
        }

        if let (Some((inner_upper, inner_lower)), Some((lip_upper, lip_lower))) = (
            landmarks::pair(landmarks, index::INNER_MOUTH_UPPER, index::INNER_MOUTH_LOWER),
            landmarks::pair(landmarks, index::UPPER_LIP_CENTER, index::LOWER_LIP_CENTER),
        ) {
            let inner_gap = (inner_lower.y - inner_upper.y).abs() * cal.tongue_inner_gap;
            let separation = (lip_lower.y - lip_upper.y).abs() * cal.tongue_lip_separation;
            m.tongue_visible = pct((inner_gap + separation) / 2.0);
            m.tongue_position = inner_upper.midpoint(inner_lower);
        }

        m
    }
}

/// Convenience wrapper using the default calibration.
pub fn compute_metrics(landmarks: &[Landmark]) -> FacialMetrics {
    MetricsEngine::default().compute(landmarks)
}
