//! Tolerance-based vertex deduplication.
//!
//! Raw STL corners are canonicalized into indexed [`Vertex`] records. In
//! strict mode, points closer than the proximity tolerance collapse into the
//! vertex that was inserted first; lookups go through a uniform spatial hash
//! so each insertion only inspects the 3x3x3 block of cells around the point.

use hashbrown::HashMap;
use nalgebra::Point3;
use tracing::debug;

use crate::error::{MeshError, MeshResult};
use crate::types::{Vertex, VertexId};

type Cell = (i64, i64, i64);

/// How raw points map onto vertex records.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VertexPolicy {
    /// Reuse any stored vertex closer than `tolerance`.
    Strict { tolerance: f64 },
    /// Every point becomes a new vertex.
    Permissive,
}

/// Indexed vertex storage with optional proximity merging.
#[derive(Debug, Clone)]
pub struct SpatialVertexTable {
    policy: VertexPolicy,
    vertices: Vec<Vertex>,
    cell_size: f64,
    grid: HashMap<Cell, Vec<VertexId>>,
}

impl SpatialVertexTable {
    /// Create an empty table.
    ///
    /// Fails with [`MeshError::InvalidConfig`] for a strict policy whose
    /// tolerance is not a positive finite number.
    pub fn new(policy: VertexPolicy) -> MeshResult<Self> {
        let cell_size = match policy {
            VertexPolicy::Strict { tolerance } => {
                if !tolerance.is_finite() || tolerance <= 0.0 {
                    return Err(MeshError::InvalidConfig {
                        details: format!(
                            "proximity tolerance must be positive and finite, got {tolerance}"
                        ),
                    });
                }
                tolerance * 2.0
            }
            VertexPolicy::Permissive => 0.0,
        };

        Ok(Self {
            policy,
            vertices: Vec::new(),
            cell_size,
            grid: HashMap::new(),
        })
    }

    /// Strict table merging points within `tolerance`.
    pub fn strict(tolerance: f64) -> MeshResult<Self> {
        Self::new(VertexPolicy::Strict { tolerance })
    }

    /// Table that never merges.
    pub fn permissive() -> Self {
        Self {
            policy: VertexPolicy::Permissive,
            vertices: Vec::new(),
            cell_size: 0.0,
            grid: HashMap::new(),
        }
    }

    #[inline]
    pub fn policy(&self) -> VertexPolicy {
        self.policy
    }

    /// Merge distance in effect, 0 for the permissive policy.
    pub fn tolerance(&self) -> f64 {
        match self.policy {
            VertexPolicy::Strict { tolerance } => tolerance,
            VertexPolicy::Permissive => 0.0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Insert a point, or return the vertex it merges into.
    pub fn add(&mut self, point: Point3<f64>) -> MeshResult<VertexId> {
        if !(point.x.is_finite() && point.y.is_finite() && point.z.is_finite()) {
            return Err(MeshError::InvalidVertex {
                details: format!("non-finite coordinates ({}, {}, {})", point.x, point.y, point.z),
            });
        }

        let VertexPolicy::Strict { tolerance } = self.policy else {
            return self.push(point);
        };

        if let Some(existing) = self.find_within(&point, tolerance) {
            return Ok(existing);
        }

        let id = self.push(point)?;
        let cell = pos_to_cell(&point, self.cell_size);
        self.grid.entry(cell).or_default().push(id);
        Ok(id)
    }

    /// The vertex `add` would merge `point` into, without inserting it.
    pub fn lookup(&self, point: &Point3<f64>) -> Option<VertexId> {
        match self.policy {
            VertexPolicy::Strict { tolerance } => self.find_within(point, tolerance),
            VertexPolicy::Permissive => None,
        }
    }

    /// Lowest-index stored vertex strictly closer than `tolerance` to `point`.
    fn find_within(&self, point: &Point3<f64>, tolerance: f64) -> Option<VertexId> {
        let cell = pos_to_cell(point, self.cell_size);
        let mut best: Option<VertexId> = None;

        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    // Cells clamp at the i64 range for huge coordinates.
                    let neighbor_cell = (
                        cell.0.saturating_add(dx),
                        cell.1.saturating_add(dy),
                        cell.2.saturating_add(dz),
                    );
                    let Some(candidates) = self.grid.get(&neighbor_cell) else {
                        continue;
                    };
                    for &idx in candidates {
                        if best.is_some_and(|b| b <= idx) {
                            continue;
                        }
                        let dist = (self.vertices[idx as usize].position - point).norm();
                        if dist < tolerance {
                            best = Some(idx);
                        }
                    }
                }
            }
        }

        best
    }

    fn push(&mut self, point: Point3<f64>) -> MeshResult<VertexId> {
        let id = VertexId::try_from(self.vertices.len()).map_err(|_| MeshError::InvalidVertex {
            details: "vertex count exceeds u32 index space".to_string(),
        })?;
        self.vertices.push(Vertex::new(id, point));
        Ok(id)
    }

    #[inline]
    pub fn get(&self, id: VertexId) -> Option<&Vertex> {
        self.vertices.get(id as usize)
    }

    /// Position of a vertex. Panics on an index this table never handed out.
    #[inline]
    pub fn position(&self, id: VertexId) -> Point3<f64> {
        self.vertices[id as usize].position
    }

    pub fn iter(&self) -> impl Iterator<Item = &Vertex> + '_ {
        self.vertices.iter()
    }

    /// Indices of the vertices adjacent to `id`.
    pub fn neighbors(&self, id: VertexId) -> impl Iterator<Item = VertexId> + '_ {
        self.get(id).into_iter().flat_map(|v| v.neighbors.iter().copied())
    }

    /// Record that `a` and `b` share a triangle. Self-pairs are ignored.
    pub fn set_adjacency(&mut self, a: VertexId, b: VertexId) {
        if a == b || a as usize >= self.vertices.len() || b as usize >= self.vertices.len() {
            return;
        }
        self.vertices[a as usize].neighbors.insert(b);
        self.vertices[b as usize].neighbors.insert(a);
    }

    /// Minimum Z over all vertices, `None` when empty.
    pub fn lowest_z(&self) -> Option<f64> {
        self.vertices
            .iter()
            .map(|v| v.position.z)
            .min_by(|a, b| a.total_cmp(b))
    }

    /// Move every vertex through `f` and rebuild the spatial index.
    ///
    /// `f` must be distance-preserving for the strict-mode separation
    /// guarantee to keep holding.
    pub fn transform_positions<F>(&mut self, f: F)
    where
        F: Fn(&Point3<f64>) -> Point3<f64>,
    {
        for vertex in &mut self.vertices {
            vertex.position = f(&vertex.position);
        }
        self.rebuild_index();
    }

    fn rebuild_index(&mut self) {
        self.grid.clear();
        if matches!(self.policy, VertexPolicy::Permissive) {
            return;
        }
        for vertex in &self.vertices {
            let cell = pos_to_cell(&vertex.position, self.cell_size);
            self.grid.entry(cell).or_default().push(vertex.index);
        }
        debug!(
            vertices = self.vertices.len(),
            cells = self.grid.len(),
            "Rebuilt vertex spatial index"
        );
    }
}

fn pos_to_cell(pos: &Point3<f64>, cell_size: f64) -> Cell {
    (
        (pos.x / cell_size).floor() as i64,
        (pos.y / cell_size).floor() as i64,
        (pos.z / cell_size).floor() as i64,
    )
}
