//! Classification parameters and load options.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{MeshError, MeshResult};
use crate::vertices::VertexPolicy;

/// Default vertex-merge distance for the strict vertex policy.
pub const DEFAULT_PROXIMITY_TOLERANCE: f64 = 1e-4;

/// Parameters of one classification pass.
///
/// # Example
///
/// ```
/// use mesh_overhang::ClassificationParams;
///
/// let params = ClassificationParams::default()
///     .with_ignore_grounded(true)
///     .with_ground_level(2.5);
/// assert!(params.ignore_grounded);
/// assert!((params.phi_min - std::f64::consts::FRAC_PI_4).abs() < f64::EPSILON);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ClassificationParams {
    /// Angle between a face normal and straight down below which the face
    /// overhangs, in radians.
    pub phi_min: f64,

    /// Treat floor-resting faces like any other face.
    pub ignore_grounded: bool,

    /// Z coordinate of the build plate.
    pub ground_level: f64,

    /// Maximum distance from `ground_level` for a vertex to count as on the plate.
    pub ground_tolerance: f64,

    /// Half-width of the forgiveness band around `phi_min`, in radians.
    pub angle_tolerance: f64,
}

impl Default for ClassificationParams {
    fn default() -> Self {
        Self {
            phi_min: std::f64::consts::FRAC_PI_4,
            ignore_grounded: false,
            ground_level: 0.0,
            ground_tolerance: 0.01,
            angle_tolerance: 0.017,
        }
    }
}

impl ClassificationParams {
    /// Set the overhang threshold in radians.
    #[must_use]
    pub fn with_phi_min(mut self, phi_min: f64) -> Self {
        self.phi_min = phi_min;
        self
    }

    /// Set the overhang threshold in degrees.
    #[must_use]
    pub fn with_phi_min_degrees(mut self, degrees: f64) -> Self {
        self.phi_min = degrees.to_radians();
        self
    }

    #[must_use]
    pub fn with_ignore_grounded(mut self, ignore: bool) -> Self {
        self.ignore_grounded = ignore;
        self
    }

    #[must_use]
    pub fn with_ground_level(mut self, level: f64) -> Self {
        self.ground_level = level;
        self
    }

    #[must_use]
    pub fn with_ground_tolerance(mut self, tolerance: f64) -> Self {
        self.ground_tolerance = tolerance;
        self
    }

    #[must_use]
    pub fn with_angle_tolerance(mut self, tolerance: f64) -> Self {
        self.angle_tolerance = tolerance;
        self
    }

    /// Reject NaN or negative thresholds before a pass starts.
    pub fn validate(&self) -> MeshResult<()> {
        let checks = [
            ("phi_min", self.phi_min),
            ("ground_tolerance", self.ground_tolerance),
            ("angle_tolerance", self.angle_tolerance),
        ];
        for (name, value) in checks {
            if !value.is_finite() || value < 0.0 {
                return Err(MeshError::InvalidConfig {
                    details: format!("{name} must be finite and non-negative, got {value}"),
                });
            }
        }
        if !self.ground_level.is_finite() {
            return Err(MeshError::InvalidConfig {
                details: format!("ground_level must be finite, got {}", self.ground_level),
            });
        }
        Ok(())
    }
}

/// Options controlling how raw triangles become a [`Mesh`](crate::Mesh).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LoadOptions {
    /// Merge raw points closer than `proximity_tolerance` into one vertex.
    /// Slower, but required for edge sharing and leak detection.
    pub strict_vertex_policy: bool,

    /// Merge distance used by the strict policy.
    pub proximity_tolerance: f64,

    /// Skip edge tracking entirely (no leak detection).
    pub ignore_edges: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            strict_vertex_policy: true,
            proximity_tolerance: DEFAULT_PROXIMITY_TOLERANCE,
            ignore_edges: false,
        }
    }
}

impl LoadOptions {
    /// Fast path: no vertex merging and no edges.
    #[must_use]
    pub fn fast() -> Self {
        Self {
            strict_vertex_policy: false,
            ignore_edges: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_strict_vertex_policy(mut self, strict: bool) -> Self {
        self.strict_vertex_policy = strict;
        self
    }

    #[must_use]
    pub fn with_proximity_tolerance(mut self, tolerance: f64) -> Self {
        self.proximity_tolerance = tolerance;
        self
    }

    #[must_use]
    pub fn with_ignore_edges(mut self, ignore: bool) -> Self {
        self.ignore_edges = ignore;
        self
    }

    /// The vertex policy these options select.
    pub fn vertex_policy(&self) -> VertexPolicy {
        if self.strict_vertex_policy {
            VertexPolicy::Strict {
                tolerance: self.proximity_tolerance,
            }
        } else {
            VertexPolicy::Permissive
        }
    }
}
