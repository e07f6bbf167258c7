//! Triangle faces and the per-face overhang test.
//!
//! A face overhangs when its outward normal points close enough to straight
//! down. The angle between the unit normal and `-Z` is compared against
//! `phi_min`:
//!
//! * below `phi_min` the face needs support, unless it rests on the build
//!   plate or lies inside the `angle_tolerance` band around `phi_min`;
//! * at or above `phi_min` the face is self-supporting.
//!
//! The pure [`assess_face`] function does the math so that passes can run it
//! on a thread pool; [`Triangle::classify`] stores the outcome.

use nalgebra::{Point3, Vector3};

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::params::ClassificationParams;
use crate::types::{Classification, EdgeId, TriangleId, VertexId};

/// Straight down, the build direction's opposite.
const DOWN: Vector3<f64> = Vector3::new(0.0, 0.0, -1.0);

/// Everything one overhang test computes for a face.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct FaceAssessment {
    pub classification: Classification,
    /// All three corners lie within `ground_tolerance` of the ground level.
    pub grounded: bool,
    /// Angle between the unit normal and `-Z`, in radians.
    pub angle: f64,
    pub area: f64,
    pub projected_area: f64,
    /// Area this face adds to the mesh total (0 unless it contributes).
    pub affected_area: f64,
    pub affected_area_projected: f64,
    pub support_volume: f64,
}

impl FaceAssessment {
    /// Check whether this face adds to the mesh totals.
    #[inline]
    pub fn contributes(&self) -> bool {
        self.classification.is_problematic()
    }
}

/// Compute the raw edge vectors and normal of a corner triple.
///
/// Returns `(vector1, vector2, normal, unit_normal)`. A degenerate triple
/// gets a zero unit normal.
pub fn face_vectors(
    corners: &[Point3<f64>; 3],
) -> (Vector3<f64>, Vector3<f64>, Vector3<f64>, Vector3<f64>) {
    let vector1 = corners[1] - corners[0];
    let vector2 = corners[2] - corners[0];
    let normal = vector1.cross(&vector2);
    let len = normal.norm();
    let unit = if len > 0.0 && len.is_finite() {
        normal / len
    } else {
        Vector3::zeros()
    };
    (vector1, vector2, normal, unit)
}

/// Check whether all corners lie within `tolerance` of `ground_level`.
#[inline]
pub fn is_grounded(corners: &[Point3<f64>; 3], ground_level: f64, tolerance: f64) -> bool {
    corners
        .iter()
        .all(|p| (p.z - ground_level).abs() <= tolerance)
}

/// Run the overhang test on a face given by its current corners.
pub fn assess_face(corners: &[Point3<f64>; 3], params: &ClassificationParams) -> FaceAssessment {
    let (vector1, vector2, _, unit) = face_vectors(corners);

    let angle = unit.dot(&DOWN).clamp(-1.0, 1.0).acos();
    let grounded = is_grounded(corners, params.ground_level, params.ground_tolerance);
    let exempt = grounded && !params.ignore_grounded;

    let classification = if (0.0..params.phi_min).contains(&angle) {
        let delta = angle - params.phi_min;
        if exempt || delta * delta < params.angle_tolerance * params.angle_tolerance {
            Classification::Acceptable
        } else {
            Classification::Problematic
        }
    } else {
        Classification::Acceptable
    };

    let area = vector1.cross(&vector2).norm() / 2.0;
    let flat1 = Vector3::new(vector1.x, vector1.y, 0.0);
    let flat2 = Vector3::new(vector2.x, vector2.y, 0.0);
    let projected_area = flat1.cross(&flat2).norm() / 2.0;

    let mut assessment = FaceAssessment {
        classification,
        grounded,
        angle,
        area,
        projected_area,
        affected_area: 0.0,
        affected_area_projected: 0.0,
        support_volume: 0.0,
    };

    // Problematic faces are never exempt: exemption short-circuits to acceptable above.
    if classification.is_problematic() {
        let mean_z = (corners[0].z + corners[1].z + corners[2].z) / 3.0;
        assessment.affected_area = area;
        assessment.affected_area_projected = projected_area;
        assessment.support_volume = projected_area * (mean_z - params.ground_level).max(0.0);
    }

    assessment
}

/// One triangle face of a [`Mesh`](crate::Mesh).
///
/// Corners are referenced by vertex index; geometry is refreshed from the
/// owning vertex table whenever the mesh classifies it.
#[derive(Debug, Clone)]
pub struct Triangle {
    pub id: TriangleId,
    /// Corner indices in file winding order.
    pub vertices: [VertexId; 3],
    /// Edges v0-v1, v1-v2 and v2-v0. `None` when edges are not tracked or
    /// when two corners merged into one vertex.
    pub edges: [Option<EdgeId>; 3],
    /// Normal stored in the source file.
    pub declared_normal: Vector3<f64>,
    pub vector1: Vector3<f64>,
    pub vector2: Vector3<f64>,
    /// `vector1 x vector2`, not normalized.
    pub normal: Vector3<f64>,
    pub unit_normal: Vector3<f64>,
    /// Unit normal as computed at load time, before any rotation.
    pub original_unit_normal: Vector3<f64>,
    pub classification: Classification,
    pub grounded: bool,
    pub angle: f64,
    pub area: f64,
    pub projected_area: f64,
    pub affected_area: f64,
    pub affected_area_projected: f64,
    pub support_volume: f64,
}

impl Triangle {
    /// Create an unclassified triangle and compute its geometry from `corners`.
    pub fn new(
        id: TriangleId,
        vertices: [VertexId; 3],
        declared_normal: Vector3<f64>,
        corners: &[Point3<f64>; 3],
    ) -> Self {
        let (vector1, vector2, normal, unit_normal) = face_vectors(corners);
        let area = normal.norm() / 2.0;
        let projected_area = Vector3::new(0.0, 0.0, normal.z).norm() / 2.0;
        Self {
            id,
            vertices,
            edges: [None; 3],
            declared_normal,
            vector1,
            vector2,
            normal,
            unit_normal,
            original_unit_normal: unit_normal,
            classification: Classification::Unclassified,
            grounded: false,
            angle: unit_normal.dot(&DOWN).clamp(-1.0, 1.0).acos(),
            area,
            projected_area,
            affected_area: 0.0,
            affected_area_projected: 0.0,
            support_volume: 0.0,
        }
    }

    /// Recompute edge vectors and normals from the current corner positions.
    pub fn refresh_normal(&mut self, corners: &[Point3<f64>; 3]) -> Vector3<f64> {
        let (vector1, vector2, normal, unit) = face_vectors(corners);
        self.vector1 = vector1;
        self.vector2 = vector2;
        self.normal = normal;
        self.unit_normal = unit;
        unit
    }

    /// Refresh, run the overhang test and store the outcome on this triangle.
    pub fn classify(
        &mut self,
        corners: &[Point3<f64>; 3],
        params: &ClassificationParams,
    ) -> FaceAssessment {
        self.refresh_normal(corners);
        let assessment = assess_face(corners, params);
        self.apply(&assessment);
        assessment
    }

    /// Run the overhang test without touching any stored state.
    pub fn inspect(
        &self,
        corners: &[Point3<f64>; 3],
        params: &ClassificationParams,
    ) -> FaceAssessment {
        assess_face(corners, params)
    }

    /// Store a previously computed assessment.
    pub(crate) fn apply(&mut self, assessment: &FaceAssessment) {
        self.classification = assessment.classification;
        self.grounded = assessment.grounded;
        self.angle = assessment.angle;
        self.area = assessment.area;
        self.projected_area = assessment.projected_area;
        self.affected_area = assessment.affected_area;
        self.affected_area_projected = assessment.affected_area_projected;
        self.support_volume = assessment.support_volume;
    }

    /// Two triangles are the same face when they use the same vertex set.
    pub fn same_face(&self, other: &Triangle) -> bool {
        let mut a = self.vertices;
        let mut b = other.vertices;
        a.sort_unstable();
        b.sort_unstable();
        a == b
    }

    /// Forget classification results, e.g. after the mesh moved.
    pub(crate) fn mark_stale(&mut self) {
        self.grounded = false;
    }
}

/// Highest Z among a corner triple.
#[inline]
pub fn top_z(corners: &[Point3<f64>; 3]) -> f64 {
    corners[0].z.max(corners[1].z).max(corners[2].z)
}
