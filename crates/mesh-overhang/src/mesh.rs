//! The analysed mesh: vertex table, edges, triangles and overhang totals.

use std::path::Path;

use nalgebra::Point3;
use rayon::prelude::*;
use tracing::{debug, info};

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::edges::EdgeTopology;
use crate::error::{MeshError, MeshResult};
use crate::ingest::MeshIngestor;
use crate::io::{self, StlEncoding};
use crate::params::{ClassificationParams, LoadOptions};
use crate::report::MeshReport;
use crate::transform::{Axis, RigidTransform};
use crate::triangle::{self, FaceAssessment, Triangle};
use crate::types::{Classification, Partition, RawTriangle, TriangleId};
use crate::vertices::SpatialVertexTable;

/// Outcome of one classification pass.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct ClassificationSummary {
    /// Triangles needing support, in insertion order.
    pub problematic: Vec<TriangleId>,
    /// Remaining triangles, in insertion order.
    pub acceptable: Vec<TriangleId>,
    /// Surface area of the model touching support material.
    pub affected_area: f64,
    /// Footprint of that area on the build plate.
    pub affected_area_projected: f64,
    /// Estimated support material volume.
    pub support_volume: f64,
}

impl ClassificationSummary {
    #[inline]
    pub fn problematic_count(&self) -> usize {
        self.problematic.len()
    }

    #[inline]
    pub fn acceptable_count(&self) -> usize {
        self.acceptable.len()
    }
}

/// A triangle mesh prepared for overhang analysis.
///
/// Built by [`MeshIngestor`], [`Mesh::from_records`] or [`Mesh::load`].
/// Classification results live on the triangles and in the mesh totals and
/// are recomputed in full by every pass.
#[derive(Debug, Clone)]
pub struct Mesh {
    vertices: SpatialVertexTable,
    edges: Option<EdgeTopology>,
    triangles: Vec<Triangle>,
    header: String,
    ground_level: f64,
    summary: ClassificationSummary,
    stale: bool,
}

impl Mesh {
    pub(crate) fn from_parts(
        vertices: SpatialVertexTable,
        edges: Option<EdgeTopology>,
        triangles: Vec<Triangle>,
        header: String,
    ) -> Self {
        let ground_level = vertices.lowest_z().unwrap_or(0.0);
        Self {
            vertices,
            edges,
            triangles,
            header,
            ground_level,
            summary: ClassificationSummary::default(),
            stale: true,
        }
    }

    /// Build a mesh from decoded records.
    pub fn from_records<'a, I>(records: I, options: &LoadOptions) -> MeshResult<Self>
    where
        I: IntoIterator<Item = &'a RawTriangle>,
    {
        let mut ingest = MeshIngestor::new(options)?;
        ingest.extend(records)?;
        Ok(ingest.finish())
    }

    /// Load an STL file (ASCII, binary or colored binary).
    ///
    /// Count mismatches in the file are logged and otherwise ignored.
    pub fn load<P: AsRef<Path>>(path: P, options: &LoadOptions) -> MeshResult<Self> {
        let path = path.as_ref();
        let document = io::read_stl(path)?;

        if document.records.is_empty() {
            return Err(MeshError::EmptyMesh {
                details: format!("{} contains no triangles", path.display()),
            });
        }

        let mut ingest = MeshIngestor::new(options)?.with_header(document.header.clone());
        ingest.reserve(document.records.len());
        ingest.extend(&document.records)?;
        Ok(ingest.finish())
    }

    /// Write the mesh as STL with current positions and normals.
    pub fn save<P: AsRef<Path>>(&self, path: P, encoding: StlEncoding) -> MeshResult<()> {
        io::write_stl(self, path.as_ref(), encoding)
    }

    /// Header text of the source file, empty for in-memory meshes.
    #[inline]
    pub fn header(&self) -> &str {
        &self.header
    }

    #[inline]
    pub fn vertices(&self) -> &SpatialVertexTable {
        &self.vertices
    }

    /// Edge registry, `None` when loaded with `ignore_edges`.
    #[inline]
    pub fn edges(&self) -> Option<&EdgeTopology> {
        self.edges.as_ref()
    }

    #[inline]
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    #[inline]
    pub fn triangle(&self, id: TriangleId) -> Option<&Triangle> {
        self.triangles.get(id as usize)
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    #[inline]
    pub fn edge_count(&self) -> Option<usize> {
        self.edges.as_ref().map(EdgeTopology::len)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Current corner positions of a triangle.
    pub fn corners(&self, id: TriangleId) -> Option<[Point3<f64>; 3]> {
        self.triangle(id).map(|t| corners_of(&self.vertices, t))
    }

    /// Axis-aligned bounding box as (min_corner, max_corner).
    pub fn bounds(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let mut iter = self.vertices.iter();
        let first = iter.next()?.position;
        let (min, max) = iter.fold((first, first), |(mut min, mut max), v| {
            let p = v.position;
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            min.z = min.z.min(p.z);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
            max.z = max.z.max(p.z);
            (min, max)
        });
        Some((min, max))
    }

    /// Lowest Z over all vertices in the current orientation.
    #[inline]
    pub fn ground_level(&self) -> f64 {
        self.ground_level
    }

    /// Recompute the ground level from the vertex table.
    pub fn recompute_ground_level(&mut self) -> f64 {
        self.ground_level = self.vertices.lowest_z().unwrap_or(0.0);
        self.ground_level
    }

    /// Whether the stored classification predates the current geometry.
    #[inline]
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Classify every triangle in insertion order and recompute the totals.
    pub fn run_classification_pass(
        &mut self,
        params: &ClassificationParams,
    ) -> MeshResult<ClassificationSummary> {
        params.validate()?;
        let vertices = &self.vertices;
        let assessments: Vec<FaceAssessment> = self
            .triangles
            .iter_mut()
            .map(|t| {
                let corners = corners_of(vertices, t);
                t.classify(&corners, params)
            })
            .collect();
        Ok(self.fold_pass(&assessments, params))
    }

    /// Same as [`run_classification_pass`](Self::run_classification_pass),
    /// classifying triangles on the rayon pool.
    ///
    /// Totals are folded in insertion order, so the result is identical to
    /// the sequential pass.
    pub fn run_classification_pass_parallel(
        &mut self,
        params: &ClassificationParams,
    ) -> MeshResult<ClassificationSummary> {
        params.validate()?;
        let vertices = &self.vertices;
        let assessments: Vec<FaceAssessment> = self
            .triangles
            .par_iter_mut()
            .map(|t| {
                let corners = corners_of(vertices, t);
                t.classify(&corners, params)
            })
            .collect();
        Ok(self.fold_pass(&assessments, params))
    }

    fn fold_pass(
        &mut self,
        assessments: &[FaceAssessment],
        params: &ClassificationParams,
    ) -> ClassificationSummary {
        let mut summary = ClassificationSummary::default();

        for (id, a) in assessments.iter().enumerate() {
            let id = id as TriangleId;
            if a.contributes() {
                summary.problematic.push(id);
                summary.affected_area += a.affected_area;
                summary.affected_area_projected += a.affected_area_projected;
                summary.support_volume += a.support_volume;
            } else {
                summary.acceptable.push(id);
            }
        }

        debug!(
            phi_min = params.phi_min,
            ignore_grounded = params.ignore_grounded,
            ground_level = params.ground_level,
            "Classification pass parameters"
        );
        info!(
            "Classified {} triangles: {} problematic, affected area {:.3}, support volume {:.3}",
            assessments.len(),
            summary.problematic.len(),
            summary.affected_area,
            summary.support_volume
        );

        self.summary = summary.clone();
        self.stale = false;
        summary
    }

    /// Run the overhang test on one triangle without changing any state.
    pub fn classify_triangle(
        &self,
        id: TriangleId,
        params: &ClassificationParams,
    ) -> Option<FaceAssessment> {
        let t = self.triangle(id)?;
        Some(t.inspect(&corners_of(&self.vertices, t), params))
    }

    /// Result of the last classification pass.
    #[inline]
    pub fn summary(&self) -> &ClassificationSummary {
        &self.summary
    }

    #[inline]
    pub fn affected_area(&self) -> f64 {
        self.summary.affected_area
    }

    #[inline]
    pub fn affected_area_projected(&self) -> f64 {
        self.summary.affected_area_projected
    }

    #[inline]
    pub fn support_volume(&self) -> f64 {
        self.summary.support_volume
    }

    /// Number of triangles flagged by the last pass.
    #[inline]
    pub fn warning_count(&self) -> usize {
        self.summary.problematic.len()
    }

    /// Triangle indices in a partition, in insertion order.
    pub fn partition(&self, partition: Partition) -> Vec<TriangleId> {
        match partition {
            Partition::All => (0..self.triangles.len() as TriangleId).collect(),
            Partition::Problematic => self.summary.problematic.clone(),
            Partition::Acceptable => self.summary.acceptable.clone(),
        }
    }

    /// Corner coordinates of every triangle in a partition.
    pub fn triangle_corners(&self, partition: Partition) -> Vec<[Point3<f64>; 3]> {
        let to_corners = |t: &Triangle| corners_of(&self.vertices, t);
        match partition {
            Partition::All => self.triangles.iter().map(to_corners).collect(),
            _ => self
                .partition(partition)
                .into_iter()
                .filter_map(|id| self.triangle(id))
                .map(to_corners)
                .collect(),
        }
    }

    /// Problematic triangles ordered by their highest corner, top first.
    pub fn problematic_by_height(&self) -> Vec<TriangleId> {
        let mut keyed: Vec<(f64, TriangleId)> = self
            .summary
            .problematic
            .iter()
            .filter_map(|&id| self.corners(id).map(|c| (triangle::top_z(&c), id)))
            .collect();
        keyed.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
        keyed.into_iter().map(|(_, id)| id).collect()
    }

    /// Rotate the model about the X or Y axis through the origin.
    ///
    /// Rebuilds the vertex index, recomputes the ground level and marks the
    /// classification stale. Z rotations fail and leave the mesh untouched.
    pub fn rotate(&mut self, angle: f64, axis: Axis) -> MeshResult<()> {
        let transform = RigidTransform::rotation(angle, axis)?;
        self.apply_transform(&transform);
        Ok(())
    }

    /// Apply a rigid transform to every vertex.
    pub fn apply_transform(&mut self, transform: &RigidTransform) {
        self.vertices.transform_positions(|p| transform.apply(p));

        let vertices = &self.vertices;
        for t in &mut self.triangles {
            let corners = corners_of(vertices, t);
            t.refresh_normal(&corners);
            t.mark_stale();
        }

        let previous = self.ground_level;
        self.recompute_ground_level();
        self.stale = true;

        debug!(
            axis = %transform.axis(),
            angle = transform.angle(),
            previous_ground = previous,
            ground = self.ground_level,
            "Rotated mesh"
        );
    }

    /// Summarize the mesh and its last classification.
    pub fn report(&self) -> MeshReport {
        MeshReport::from_mesh(self)
    }

    /// Classification outcome of a triangle, `Unclassified` for unknown ids.
    pub fn classification(&self, id: TriangleId) -> Classification {
        self.triangle(id)
            .map(|t| t.classification)
            .unwrap_or_default()
    }
}

fn corners_of(vertices: &SpatialVertexTable, t: &Triangle) -> [Point3<f64>; 3] {
    [
        vertices.position(t.vertices[0]),
        vertices.position(t.vertices[1]),
        vertices.position(t.vertices[2]),
    ]
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Axis-aligned cube with edge `s`, bottom face at `z0`, outward winding.
    pub(crate) fn cube_records(s: f64, z0: f64) -> Vec<RawTriangle> {
        let v = [
            [0.0, 0.0, z0],
            [s, 0.0, z0],
            [s, s, z0],
            [0.0, s, z0],
            [0.0, 0.0, z0 + s],
            [s, 0.0, z0 + s],
            [s, s, z0 + s],
            [0.0, s, z0 + s],
        ];
        let faces: [[usize; 3]; 12] = [
            [0, 2, 1],
            [0, 3, 2],
            [4, 5, 6],
            [4, 6, 7],
            [0, 1, 5],
            [0, 5, 4],
            [3, 6, 2],
            [3, 7, 6],
            [0, 4, 7],
            [0, 7, 3],
            [1, 2, 6],
            [1, 6, 5],
        ];
        faces
            .iter()
            .map(|&[a, b, c]| {
                RawTriangle::from_corners(v[a].into(), v[b].into(), v[c].into())
            })
            .collect()
    }

    fn cube(s: f64, z0: f64) -> Mesh {
        Mesh::from_records(&cube_records(s, z0), &LoadOptions::default()).unwrap()
    }

    #[test]
    fn test_cube_topology() {
        let mesh = cube(100.0, 0.0);
        assert_eq!(mesh.vertex_count(), 8);
        assert_eq!(mesh.triangle_count(), 12);
        assert_eq!(mesh.edge_count(), Some(18));
        let edges = mesh.edges().unwrap();
        assert!(edges.is_watertight());
        assert!(edges.iter().all(|(_, e)| e.faces.len() == 2));
        assert_relative_eq!(mesh.ground_level(), 0.0);
    }

    #[test]
    fn test_grounded_cube_has_no_overhang() {
        let mut mesh = cube(100.0, 0.0);
        let summary = mesh
            .run_classification_pass(&ClassificationParams::default())
            .unwrap();
        assert_eq!(summary.problematic_count(), 0);
        assert_eq!(summary.acceptable_count(), 12);
        assert!(summary.affected_area.abs() < 1e-9);
        assert!(!mesh.is_stale());
    }

    #[test]
    fn test_ignore_grounded_flags_bottom() {
        let mut mesh = cube(100.0, 0.0);
        let params = ClassificationParams::default().with_ignore_grounded(true);
        let summary = mesh.run_classification_pass(&params).unwrap();
        assert_eq!(summary.problematic, vec![0, 1]);
        assert_relative_eq!(summary.affected_area, 10000.0, epsilon = 1e-6);
        assert_relative_eq!(summary.affected_area_projected, 10000.0, epsilon = 1e-6);
        assert!(summary.support_volume.abs() < 1e-9);
        assert_eq!(mesh.warning_count(), 2);
        assert_eq!(mesh.classification(0), Classification::Problematic);
        assert_eq!(mesh.classification(2), Classification::Acceptable);
    }

    #[test]
    fn test_hovering_cube_support_volume() {
        let mut mesh = cube(100.0, 50.0);
        let summary = mesh
            .run_classification_pass(&ClassificationParams::default())
            .unwrap();
        assert_eq!(summary.problematic_count(), 2);
        assert_relative_eq!(summary.support_volume, 500_000.0, epsilon = 1e-6);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let params = ClassificationParams::default().with_ignore_grounded(true);
        let mut a = cube(10.0, 3.0);
        let mut b = a.clone();
        a.rotate(0.4, Axis::X).unwrap();
        b.rotate(0.4, Axis::X).unwrap();
        let seq = a.run_classification_pass(&params).unwrap();
        let par = b.run_classification_pass_parallel(&params).unwrap();
        assert_eq!(seq, par);
    }

    #[test]
    fn test_inspection_leaves_state_alone() {
        let mut mesh = cube(100.0, 50.0);
        let params = ClassificationParams::default();
        let a = mesh.classify_triangle(0, &params).unwrap();
        assert_eq!(a.classification, Classification::Problematic);
        assert_eq!(mesh.classification(0), Classification::Unclassified);
        assert!(mesh.affected_area().abs() < f64::EPSILON);

        mesh.run_classification_pass(&params).unwrap();
        assert_eq!(mesh.triangle(0).unwrap().affected_area, a.affected_area);
        assert!(mesh.classify_triangle(99, &params).is_none());
    }

    #[test]
    fn test_rotate_z_leaves_mesh_untouched() {
        let mut mesh = cube(10.0, 0.0);
        let before = mesh.triangle_corners(Partition::All);
        let err = mesh.rotate(0.3, Axis::Z).unwrap_err();
        assert!(matches!(err, MeshError::UnsupportedOperation { .. }));
        assert_eq!(mesh.triangle_corners(Partition::All), before);
    }

    #[test]
    fn test_rotate_updates_ground_and_staleness() {
        let mut mesh = cube(10.0, 0.0);
        mesh.run_classification_pass(&ClassificationParams::default())
            .unwrap();
        assert!(!mesh.is_stale());

        mesh.rotate(std::f64::consts::FRAC_PI_2, Axis::X).unwrap();
        assert!(mesh.is_stale());
        // y in [0, 10] maps to z in [0, 10] and z in [0, 10] maps to y in [-10, 0].
        assert_relative_eq!(mesh.ground_level(), 0.0, epsilon = 1e-9);
        assert!(mesh.triangles().iter().all(|t| !t.grounded));

        mesh.rotate(std::f64::consts::FRAC_PI_2, Axis::Y).unwrap();
        assert_relative_eq!(mesh.ground_level(), -10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_partitions_and_height_order() {
        let mut mesh = cube(10.0, 5.0);
        mesh.rotate(0.2, Axis::Y).unwrap();
        let ground = mesh.ground_level();
        let params = ClassificationParams::default().with_ground_level(ground);
        mesh.run_classification_pass(&params).unwrap();

        assert_eq!(mesh.partition(Partition::All).len(), 12);
        assert_eq!(
            mesh.partition(Partition::Problematic).len() + mesh.partition(Partition::Acceptable).len(),
            12
        );
        assert_eq!(mesh.triangle_corners(Partition::Problematic).len(), mesh.warning_count());

        let ordered = mesh.problematic_by_height();
        let tops: Vec<f64> = ordered
            .iter()
            .map(|&id| triangle::top_z(&mesh.corners(id).unwrap()))
            .collect();
        assert!(tops.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_bounds() {
        let mesh = cube(2.0, 1.0);
        let (min, max) = mesh.bounds().unwrap();
        assert_relative_eq!(min, Point3::new(0.0, 0.0, 1.0));
        assert_relative_eq!(max, Point3::new(2.0, 2.0, 3.0));
    }
}
