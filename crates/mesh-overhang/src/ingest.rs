//! Building a [`Mesh`] from a stream of decoded STL records.

use std::time::Instant;

use tracing::{debug, info};

use crate::edges::EdgeTopology;
use crate::error::{MeshError, MeshResult};
use crate::mesh::Mesh;
use crate::params::LoadOptions;
use crate::triangle::Triangle;
use crate::types::{RawTriangle, TriangleId};
use crate::vertices::SpatialVertexTable;

/// Incremental mesh builder.
///
/// Records must arrive in file order: vertex and triangle indices are handed
/// out sequentially.
///
/// # Example
///
/// ```
/// use mesh_overhang::{LoadOptions, MeshIngestor, RawTriangle};
///
/// let mut ingest = MeshIngestor::new(&LoadOptions::default()).unwrap();
/// ingest
///     .push(&RawTriangle::new([0.0; 3], [0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]))
///     .unwrap();
/// let mesh = ingest.finish();
/// assert_eq!(mesh.triangle_count(), 1);
/// assert_eq!(mesh.edge_count(), Some(3));
/// ```
#[derive(Debug)]
pub struct MeshIngestor {
    vertices: SpatialVertexTable,
    edges: Option<EdgeTopology>,
    triangles: Vec<Triangle>,
    header: String,
    started: Instant,
}

impl MeshIngestor {
    pub fn new(options: &LoadOptions) -> MeshResult<Self> {
        let vertices = SpatialVertexTable::new(options.vertex_policy())?;
        let edges = (!options.ignore_edges).then(|| EdgeTopology::new(vertices.tolerance()));
        Ok(Self {
            vertices,
            edges,
            triangles: Vec::new(),
            header: String::new(),
            started: Instant::now(),
        })
    }

    /// Attach the file header carried through to the finished mesh.
    #[must_use]
    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = header.into();
        self
    }

    /// Reserve room for `additional` more triangles.
    pub fn reserve(&mut self, additional: usize) {
        self.triangles.reserve(additional);
    }

    /// Add one record, returning the new triangle's index.
    ///
    /// Fails on non-finite coordinates and, when edges are tracked, on an
    /// edge that would be shared by a third triangle. A rejected record
    /// leaves the builder unchanged.
    pub fn push(&mut self, raw: &RawTriangle) -> MeshResult<TriangleId> {
        if !raw.is_finite() {
            return Err(MeshError::InvalidVertex {
                details: format!(
                    "triangle {} has non-finite coordinates",
                    self.triangles.len()
                ),
            });
        }

        let id = TriangleId::try_from(self.triangles.len()).map_err(|_| MeshError::InvalidConfig {
            details: "triangle count exceeds u32 index space".to_string(),
        })?;

        // Reject a leaking record before touching any state. Only corners
        // that merge into existing vertices can reach an existing edge.
        if let Some(edges) = self.edges.as_ref() {
            let existing = raw.vertices.map(|p| self.vertices.lookup(&p));
            for (a, b) in [(0, 1), (1, 2), (2, 0)] {
                if let (Some(a), Some(b)) = (existing[a], existing[b]) {
                    if a != b {
                        edges.check_between(a, b, id)?;
                    }
                }
            }
        }

        let v0 = self.vertices.add(raw.vertices[0])?;
        let v1 = self.vertices.add(raw.vertices[1])?;
        let v2 = self.vertices.add(raw.vertices[2])?;

        self.vertices.set_adjacency(v0, v1);
        self.vertices.set_adjacency(v0, v2);
        self.vertices.set_adjacency(v1, v2);

        let corners = [
            self.vertices.position(v0),
            self.vertices.position(v1),
            self.vertices.position(v2),
        ];
        let mut triangle = Triangle::new(id, [v0, v1, v2], raw.normal, &corners);

        if let Some(edges) = self.edges.as_mut() {
            for (slot, (a, b)) in [(v0, v1), (v1, v2), (v2, v0)].into_iter().enumerate() {
                // Corners merged into one vertex: no edge.
                if a == b {
                    continue;
                }
                let edge = edges.add(a, b);
                edges.associate(edge, id)?;
                triangle.edges[slot] = Some(edge);
            }
        }

        self.triangles.push(triangle);
        Ok(id)
    }

    /// Add every record of `records` in order.
    pub fn extend<'a, I>(&mut self, records: I) -> MeshResult<()>
    where
        I: IntoIterator<Item = &'a RawTriangle>,
    {
        for raw in records {
            self.push(raw)?;
        }
        Ok(())
    }

    /// Finish ingestion and compute the ground level.
    pub fn finish(self) -> Mesh {
        let elapsed = self.started.elapsed();
        let mesh = Mesh::from_parts(self.vertices, self.edges, self.triangles, self.header);

        debug!(
            vertices = mesh.vertex_count(),
            edges = mesh.edge_count().unwrap_or(0),
            triangles = mesh.triangle_count(),
            ?elapsed,
            "Mesh ingestion timing"
        );
        info!(
            "Built mesh: {} vertices, {} triangles",
            mesh.vertex_count(),
            mesh.triangle_count()
        );

        mesh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tri(v0: [f64; 3], v1: [f64; 3], v2: [f64; 3]) -> RawTriangle {
        RawTriangle::new([0.0; 3], v0, v1, v2)
    }

    #[test]
    fn test_shared_corners_are_merged() {
        let mut ingest = MeshIngestor::new(&LoadOptions::default()).unwrap();
        ingest
            .push(&tri([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]))
            .unwrap();
        ingest
            .push(&tri([1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.00001, 0.0]))
            .unwrap();
        let mesh = ingest.finish();

        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.edge_count(), Some(5));
        let edges = mesh.edges().unwrap();
        let shared = edges.edge_between(1, 2).unwrap();
        assert_eq!(edges.faces_for_edge(shared), &[0, 1]);
    }

    #[test]
    fn test_permissive_fast_path() {
        let mut ingest = MeshIngestor::new(&LoadOptions::fast()).unwrap();
        ingest
            .push(&tri([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]))
            .unwrap();
        ingest
            .push(&tri([1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]))
            .unwrap();
        let mesh = ingest.finish();

        assert_eq!(mesh.vertex_count(), 6);
        assert!(mesh.edges().is_none());
        assert!(mesh.triangles().iter().all(|t| t.edges == [None; 3]));
    }

    #[test]
    fn test_adjacency_recorded() {
        let mut ingest = MeshIngestor::new(&LoadOptions::default()).unwrap();
        ingest
            .push(&tri([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]))
            .unwrap();
        let mesh = ingest.finish();
        let table = mesh.vertices();
        for id in 0..3 {
            assert_eq!(table.neighbors(id).count(), 2);
        }
    }

    #[test]
    fn test_collapsed_corner_skips_edge() {
        let mut ingest = MeshIngestor::new(&LoadOptions::default()).unwrap();
        ingest
            .push(&tri([0.0, 0.0, 0.0], [0.00001, 0.0, 0.0], [0.0, 1.0, 0.0]))
            .unwrap();
        let mesh = ingest.finish();
        let t = &mesh.triangles()[0];
        assert_eq!(t.vertices[0], t.vertices[1]);
        assert_eq!(t.edges[0], None);
        assert!(t.edges[1].is_some());
        assert_eq!(mesh.edge_count(), Some(1));
    }

    #[test]
    fn test_non_finite_record_rejected() {
        let mut ingest = MeshIngestor::new(&LoadOptions::default()).unwrap();
        let result = ingest.push(&tri([f64::NAN, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]));
        assert!(matches!(result, Err(MeshError::InvalidVertex { .. })));
    }

    #[test]
    fn test_invalid_tolerance_rejected() {
        let options = LoadOptions::default().with_proximity_tolerance(0.0);
        assert!(matches!(
            MeshIngestor::new(&options),
            Err(MeshError::InvalidConfig { .. })
        ));
        // Permissive mode ignores the tolerance.
        assert!(MeshIngestor::new(&options.with_strict_vertex_policy(false)).is_ok());
    }

    #[test]
    fn test_leaking_record_leaves_builder_unchanged() {
        let mut ingest = MeshIngestor::new(&LoadOptions::default()).unwrap();
        let a = [0.0, 0.0, 0.0];
        let b = [1.0, 0.0, 0.0];
        ingest.push(&tri(a, b, [0.0, 1.0, 0.0])).unwrap();
        ingest.push(&tri(b, a, [0.0, -1.0, 0.0])).unwrap();

        // Fresh corner first, shared edge last.
        let fin = tri([0.5, 0.0, 1.0], a, b);
        let err = ingest.push(&fin).unwrap_err();
        assert!(matches!(err, MeshError::Leak { triangle: 2, .. }));

        let id = ingest.push(&tri([0.0, 1.0, 0.0], [0.0, 1.0, 1.0], a)).unwrap();
        assert_eq!(id, 2);
        let mesh = ingest.finish();

        assert_eq!(mesh.triangle_count(), 3);
        assert_eq!(mesh.vertex_count(), 5);
        let edges = mesh.edges().unwrap();
        assert_eq!(edges.len(), 7);
        assert!(edges.edge_between(0, 4).is_some());
        assert!(edges.iter().all(|(_, e)| e.faces.len() <= 2));
        assert_eq!(edges.faces_for_edge(edges.edge_between(0, 2).unwrap()), &[0, 2]);
        let apex = mesh.vertices().position(4);
        assert_eq!((apex.x, apex.y, apex.z), (0.0, 1.0, 1.0));
    }
}
