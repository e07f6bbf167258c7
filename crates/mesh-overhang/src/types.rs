//! Core data types shared by the vertex table, edge topology and mesh.

use hashbrown::HashSet;
use nalgebra::{Point3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Stable index of a vertex in its [`SpatialVertexTable`](crate::SpatialVertexTable).
pub type VertexId = u32;

/// Stable index of an edge in its [`EdgeTopology`](crate::EdgeTopology).
pub type EdgeId = u32;

/// Stable index of a triangle in its [`Mesh`](crate::Mesh), in ingestion order.
pub type TriangleId = u32;

/// A unique vertex of the mesh.
///
/// The index is assigned at first insertion and never reused. Coordinates are
/// unit-agnostic; STL files are usually in millimeters.
#[derive(Debug, Clone)]
pub struct Vertex {
    /// Index of this vertex in the owning table.
    pub index: VertexId,

    /// 3D position.
    pub position: Point3<f64>,

    /// Vertices sharing at least one triangle with this one.
    pub neighbors: HashSet<VertexId>,
}

impl Vertex {
    /// Create a vertex with no neighbors.
    #[inline]
    pub fn new(index: VertexId, position: Point3<f64>) -> Self {
        Self {
            index,
            position,
            neighbors: HashSet::new(),
        }
    }

    /// Check whether `other` shares a triangle with this vertex.
    #[inline]
    pub fn is_adjacent_to(&self, other: VertexId) -> bool {
        self.neighbors.contains(&other)
    }
}

/// One decoded STL record: the normal stored in the file and three corners.
///
/// This is the contract between the format readers and mesh ingestion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawTriangle {
    /// Normal as declared by the file (often zero or inaccurate).
    pub normal: Vector3<f64>,
    /// Corners in file winding order.
    pub vertices: [Point3<f64>; 3],
}

impl RawTriangle {
    /// Create a record from plain coordinate arrays.
    pub fn new(normal: [f64; 3], v0: [f64; 3], v1: [f64; 3], v2: [f64; 3]) -> Self {
        Self {
            normal: Vector3::from(normal),
            vertices: [Point3::from(v0), Point3::from(v1), Point3::from(v2)],
        }
    }

    /// Create a record from corners, deriving the declared normal from the winding.
    pub fn from_corners(v0: Point3<f64>, v1: Point3<f64>, v2: Point3<f64>) -> Self {
        let n = (v1 - v0).cross(&(v2 - v0));
        let len = n.norm();
        let normal = if len > f64::EPSILON { n / len } else { Vector3::zeros() };
        Self {
            normal,
            vertices: [v0, v1, v2],
        }
    }

    /// Check that every coordinate is finite.
    pub fn is_finite(&self) -> bool {
        self.vertices
            .iter()
            .all(|p| p.x.is_finite() && p.y.is_finite() && p.z.is_finite())
    }
}

/// Outcome of the overhang test for one triangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Classification {
    /// No classification pass has seen this triangle yet.
    #[default]
    Unclassified,
    /// Printable without support.
    Acceptable,
    /// Needs support material.
    Problematic,
}

impl Classification {
    #[inline]
    pub fn is_problematic(self) -> bool {
        self == Self::Problematic
    }
}

/// Selection of triangles by classification outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Partition {
    /// Every triangle, in ingestion order.
    All,
    /// Triangles from the last pass that need support.
    Problematic,
    /// Triangles from the last pass that do not need support.
    Acceptable,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-10
    }

    #[test]
    fn test_raw_triangle_from_corners_normal() {
        let raw = RawTriangle::from_corners(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        );
        assert!(approx_eq(raw.normal.z, 1.0));
        assert!(approx_eq(raw.normal.x, 0.0));
    }

    #[test]
    fn test_raw_triangle_degenerate_normal_is_zero() {
        let raw = RawTriangle::from_corners(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        );
        assert_eq!(raw.normal, Vector3::zeros());
    }

    #[test]
    fn test_raw_triangle_finite_check() {
        let ok = RawTriangle::new([0.0; 3], [0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]);
        assert!(ok.is_finite());

        let bad = RawTriangle::new([0.0; 3], [f64::NAN, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0; 3]);
        assert!(!bad.is_finite());
    }

    #[test]
    fn test_vertex_adjacency_lookup() {
        let mut v = Vertex::new(0, Point3::origin());
        assert!(!v.is_adjacent_to(1));
        v.neighbors.insert(1);
        assert!(v.is_adjacent_to(1));
    }

    #[test]
    fn test_default_classification() {
        assert_eq!(Classification::default(), Classification::Unclassified);
        assert!(Classification::Problematic.is_problematic());
        assert!(!Classification::Acceptable.is_problematic());
    }
}
