//! Face landmark types and the anatomical index table.
//!
//! The upstream tracker emits a fixed-size mesh (468 points, or 478 with iris
//! refinement) in normalized image space. Every anatomical role the metrics
//! depend on is named in [`index`]; if the upstream mesh layout changes, that
//! table is the only place that needs to follow.

use serde::{Deserialize, Serialize};

/// Number of points in the base face mesh.
pub const FACE_MESH_POINTS: usize = 468;

/// Number of points when iris refinement is enabled.
pub const FACE_MESH_POINTS_WITH_IRIS: usize = 478;

/// Anatomical roles mapped to face mesh indices.
pub mod index {
    pub const NOSE_TIP: usize = 1;
    pub const NOSE_BRIDGE: usize = 6;
    pub const CHIN: usize = 152;

    // Lip centre line
    pub const UPPER_LIP_CENTER: usize = 13;
    pub const LOWER_LIP_CENTER: usize = 14;
    pub const MOUTH_CORNER_LEFT: usize = 61;
    pub const MOUTH_CORNER_RIGHT: usize = 291;

    // Inner mouth, one row inside the lip centre line
    pub const INNER_MOUTH_UPPER: usize = 12;
    pub const INNER_MOUTH_LOWER: usize = 15;

    // Eyelids
    pub const LEFT_EYE_UPPER: usize = 159;
    pub const LEFT_EYE_LOWER: usize = 145;
    pub const RIGHT_EYE_UPPER: usize = 386;
    pub const RIGHT_EYE_LOWER: usize = 374;

    // Mid-brow points
    pub const LEFT_EYEBROW: usize = 105;
    pub const RIGHT_EYEBROW: usize = 334;
}

/// A single face mesh point. `x`/`y` are normalized to [0, 1], `z` is
/// relative depth.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

impl Landmark {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Euclidean distance in the image plane.
    pub fn planar_distance(&self, other: &Landmark) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn midpoint(&self, other: &Landmark) -> Point2 {
        Point2 {
            x: (self.x + other.x) / 2.0,
            y: (self.y + other.y) / 2.0,
        }
    }

    pub fn to_point2(self) -> Point2 {
        Point2 {
            x: self.x,
            y: self.y,
        }
    }
}

/// A 2D position in normalized image space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

/// Look up a landmark by index. Out-of-range or non-finite points count as
/// missing.
pub fn get(landmarks: &[Landmark], idx: usize) -> Option<&Landmark> {
    landmarks.get(idx).filter(|p| p.is_finite())
}

/// Look up two landmarks at once; `None` if either is missing.
pub fn pair(landmarks: &[Landmark], a: usize, b: usize) -> Option<(&Landmark, &Landmark)> {
    Some((get(landmarks, a)?, get(landmarks, b)?))
}
