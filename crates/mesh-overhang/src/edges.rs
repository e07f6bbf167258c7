//! Undirected edges and their face membership.

use std::hash::{Hash, Hasher};

use hashbrown::HashMap;
use tracing::warn;

use crate::error::{MeshError, MeshResult};
use crate::types::{EdgeId, TriangleId, VertexId};

/// An undirected edge between two vertices.
///
/// Equality and hashing ignore endpoint order, so `Edge(a, b) == Edge(b, a)`.
#[derive(Debug, Clone)]
pub struct Edge {
    /// Endpoints in the order the edge was first seen.
    pub vertices: (VertexId, VertexId),

    /// Triangles using this edge (at most two).
    pub faces: Vec<TriangleId>,
}

impl Edge {
    pub fn new(a: VertexId, b: VertexId) -> Self {
        Self {
            vertices: (a, b),
            faces: Vec::with_capacity(2),
        }
    }

    /// Canonical key: the sorted endpoint pair.
    #[inline]
    pub fn key(&self) -> (VertexId, VertexId) {
        edge_key(self.vertices.0, self.vertices.1)
    }

    /// Check whether exactly one triangle uses this edge.
    #[inline]
    pub fn is_boundary(&self) -> bool {
        self.faces.len() == 1
    }
}

impl PartialEq for Edge {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Edge {}

impl Hash for Edge {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

#[inline]
fn edge_key(a: VertexId, b: VertexId) -> (VertexId, VertexId) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Registry of the edges of a mesh.
///
/// Every edge may be shared by at most two triangles; offering a third one is
/// reported as a [`MeshError::Leak`].
#[derive(Debug, Clone, Default)]
pub struct EdgeTopology {
    edges: Vec<Edge>,
    lookup: HashMap<(VertexId, VertexId), EdgeId>,
    merge_tolerance: f64,
}

impl EdgeTopology {
    /// Create an empty registry. `merge_tolerance` is the vertex-merge
    /// distance in effect, quoted in leak errors.
    pub fn new(merge_tolerance: f64) -> Self {
        Self {
            edges: Vec::new(),
            lookup: HashMap::new(),
            merge_tolerance,
        }
    }

    /// Return the edge between `a` and `b`, creating it if needed.
    pub fn add(&mut self, a: VertexId, b: VertexId) -> EdgeId {
        let key = edge_key(a, b);
        if let Some(&id) = self.lookup.get(&key) {
            return id;
        }
        let id = self.edges.len() as EdgeId;
        self.edges.push(Edge::new(a, b));
        self.lookup.insert(key, id);
        id
    }

    /// Record that `triangle` uses `edge`.
    ///
    /// Re-associating a triangle already on the edge is a no-op.
    pub fn associate(&mut self, edge: EdgeId, triangle: TriangleId) -> MeshResult<()> {
        self.check_edge(edge, triangle)?;
        if let Some(record) = self.edges.get_mut(edge as usize) {
            if !record.faces.contains(&triangle) {
                record.faces.push(triangle);
            }
        }
        Ok(())
    }

    /// Fail with [`MeshError::Leak`] if joining `a` and `b` in `triangle`
    /// would give an existing edge a third face. Nothing is modified.
    pub fn check_between(&self, a: VertexId, b: VertexId, triangle: TriangleId) -> MeshResult<()> {
        match self.edge_between(a, b) {
            Some(edge) => self.check_edge(edge, triangle),
            None => Ok(()),
        }
    }

    fn check_edge(&self, edge: EdgeId, triangle: TriangleId) -> MeshResult<()> {
        let Some(record) = self.edges.get(edge as usize) else {
            return Err(MeshError::InvalidConfig {
                details: format!("unknown edge id {edge}"),
            });
        };

        if record.faces.len() >= 2 && !record.faces.contains(&triangle) {
            warn!(
                edge,
                vertices = ?record.vertices,
                triangle,
                existing = ?record.faces,
                "Edge already shared by two triangles"
            );
            return Err(MeshError::Leak {
                edge,
                vertices: record.vertices,
                triangle,
                tolerance: self.merge_tolerance,
            });
        }
        Ok(())
    }

    #[inline]
    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id as usize)
    }

    /// Look up the edge joining two vertices, in either order.
    pub fn edge_between(&self, a: VertexId, b: VertexId) -> Option<EdgeId> {
        self.lookup.get(&edge_key(a, b)).copied()
    }

    /// Triangles that use `edge`. Empty for an unknown id.
    pub fn faces_for_edge(&self, edge: EdgeId) -> &[TriangleId] {
        self.edge(edge).map(|e| e.faces.as_slice()).unwrap_or(&[])
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn merge_tolerance(&self) -> f64 {
        self.merge_tolerance
    }

    pub fn iter(&self) -> impl Iterator<Item = (EdgeId, &Edge)> + '_ {
        self.edges
            .iter()
            .enumerate()
            .map(|(i, e)| (i as EdgeId, e))
    }

    /// Edges used by exactly one triangle.
    ///
    /// In a watertight mesh, this returns an empty iterator.
    pub fn boundary_edges(&self) -> impl Iterator<Item = (EdgeId, &Edge)> + '_ {
        self.iter().filter(|(_, e)| e.is_boundary())
    }

    pub fn boundary_edge_count(&self) -> usize {
        self.boundary_edges().count()
    }

    /// Check if every edge is shared by exactly two triangles.
    pub fn is_watertight(&self) -> bool {
        self.edges.iter().all(|e| e.faces.len() == 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hashbrown::HashSet;

    #[test]
    fn test_edge_symmetry() {
        let ab = Edge::new(3, 7);
        let ba = Edge::new(7, 3);
        assert_eq!(ab, ba);
        assert_eq!(ab.key(), (3, 7));

        let mut set = HashSet::new();
        set.insert(ab);
        assert!(set.contains(&ba));
    }

    #[test]
    fn test_add_returns_existing() {
        let mut topo = EdgeTopology::new(1e-4);
        let e1 = topo.add(0, 1);
        let e2 = topo.add(1, 0);
        let e3 = topo.add(1, 2);
        assert_eq!(e1, e2);
        assert_ne!(e1, e3);
        assert_eq!(topo.len(), 2);
        assert_eq!(topo.edge_between(2, 1), Some(e3));
        assert_eq!(topo.edge_between(0, 2), None);
    }

    #[test]
    fn test_associate_idempotent() {
        let mut topo = EdgeTopology::new(1e-4);
        let e = topo.add(0, 1);
        topo.associate(e, 5).unwrap();
        topo.associate(e, 5).unwrap();
        assert_eq!(topo.faces_for_edge(e), &[5]);
        assert!(topo.edge(e).unwrap().is_boundary());
    }

    #[test]
    fn test_third_triangle_is_leak() {
        let mut topo = EdgeTopology::new(0.25);
        let e = topo.add(4, 2);
        topo.associate(e, 0).unwrap();
        topo.associate(e, 1).unwrap();
        // Re-offering a known triangle still succeeds.
        topo.associate(e, 1).unwrap();

        let err = topo.associate(e, 2).unwrap_err();
        match err {
            MeshError::Leak {
                edge,
                vertices,
                triangle,
                tolerance,
            } => {
                assert_eq!(edge, e);
                assert_eq!(vertices, (4, 2));
                assert_eq!(triangle, 2);
                assert!((tolerance - 0.25).abs() < f64::EPSILON);
            }
            other => panic!("expected leak, got {other:?}"),
        }
        assert_eq!(topo.faces_for_edge(e).len(), 2);
    }

    #[test]
    fn test_check_between_does_not_modify() {
        let mut topo = EdgeTopology::new(1e-4);
        let e = topo.add(0, 1);
        topo.associate(e, 0).unwrap();
        topo.associate(e, 1).unwrap();

        assert!(topo.check_between(1, 0, 1).is_ok());
        assert!(topo.check_between(5, 6, 2).is_ok());
        assert!(matches!(
            topo.check_between(1, 0, 2),
            Err(MeshError::Leak { triangle: 2, .. })
        ));
        assert_eq!(topo.faces_for_edge(e), &[0, 1]);
        assert_eq!(topo.len(), 1);
    }

    #[test]
    fn test_boundary_and_watertight() {
        let mut topo = EdgeTopology::new(1e-4);
        // Two triangles sharing edge (1, 2): [0,1,2] and [2,1,3]
        for (tri, [a, b, c]) in [[0u32, 1, 2], [2, 1, 3]].into_iter().enumerate() {
            for (u, v) in [(a, b), (b, c), (c, a)] {
                let e = topo.add(u, v);
                topo.associate(e, tri as TriangleId).unwrap();
            }
        }
        assert_eq!(topo.len(), 5);
        assert_eq!(topo.boundary_edge_count(), 4);
        assert!(!topo.is_watertight());

        let shared = topo.edge_between(1, 2).unwrap();
        assert_eq!(topo.faces_for_edge(shared), &[0, 1]);
    }

    #[test]
    fn test_unknown_edge() {
        let mut topo = EdgeTopology::new(1e-4);
        assert!(topo.faces_for_edge(9).is_empty());
        assert!(topo.associate(9, 0).is_err());
    }
}
