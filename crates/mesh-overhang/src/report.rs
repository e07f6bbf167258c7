//! Mesh summary reporting.

use nalgebra::Point3;
use tracing::{info, warn};

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::mesh::Mesh;

/// Summary of a mesh and its most recent classification pass.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct MeshReport {
    /// File header, empty for in-memory meshes.
    pub header: String,

    /// Total vertex count.
    pub vertex_count: usize,

    /// Total triangle count.
    pub triangle_count: usize,

    /// Edge count, `None` when edges are not tracked.
    pub edge_count: Option<usize>,

    /// Number of boundary edges (edges with 1 adjacent triangle).
    pub boundary_edge_count: Option<usize>,

    /// Whether every edge is shared by exactly two triangles.
    pub is_watertight: Option<bool>,

    /// Bounding box as (min_corner, max_corner).
    pub bounds: Option<(Point3<f64>, Point3<f64>)>,

    /// Dimensions (x, y, z).
    pub dimensions: Option<(f64, f64, f64)>,

    /// Lowest Z in the current orientation.
    pub ground_level: f64,

    /// Classification results are older than the geometry.
    pub stale: bool,

    pub problematic_count: usize,
    pub acceptable_count: usize,
    pub affected_area: f64,
    pub affected_area_projected: f64,
    pub support_volume: f64,
}

impl MeshReport {
    pub fn from_mesh(mesh: &Mesh) -> Self {
        let edges = mesh.edges();
        let bounds = mesh.bounds();
        let dimensions = bounds.map(|(min, max)| (max.x - min.x, max.y - min.y, max.z - min.z));
        let summary = mesh.summary();

        Self {
            header: mesh.header().to_string(),
            vertex_count: mesh.vertex_count(),
            triangle_count: mesh.triangle_count(),
            edge_count: edges.map(|e| e.len()),
            boundary_edge_count: edges.map(|e| e.boundary_edge_count()),
            is_watertight: edges.map(|e| e.is_watertight()),
            bounds,
            dimensions,
            ground_level: mesh.ground_level(),
            stale: mesh.is_stale(),
            problematic_count: summary.problematic_count(),
            acceptable_count: summary.acceptable_count(),
            affected_area: summary.affected_area,
            affected_area_projected: summary.affected_area_projected,
            support_volume: summary.support_volume,
        }
    }

    /// Check if the mesh needs any support material.
    pub fn needs_support(&self) -> bool {
        self.problematic_count > 0
    }
}

impl std::fmt::Display for MeshReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Mesh Report:")?;
        if !self.header.is_empty() {
            writeln!(f, "  Header: {}", self.header)?;
        }
        writeln!(f, "  Vertices: {}", self.vertex_count)?;
        writeln!(f, "  Triangles: {}", self.triangle_count)?;

        if let Some((min, max)) = &self.bounds {
            writeln!(
                f,
                "  Bounds: [{:.1}, {:.1}, {:.1}] to [{:.1}, {:.1}, {:.1}]",
                min.x, min.y, min.z, max.x, max.y, max.z
            )?;
        }

        if let Some((dx, dy, dz)) = &self.dimensions {
            writeln!(f, "  Dimensions: {:.1} x {:.1} x {:.1}", dx, dy, dz)?;
        }

        match (self.edge_count, self.is_watertight) {
            (Some(edges), Some(watertight)) => {
                writeln!(f, "  Edges: {}", edges)?;
                writeln!(
                    f,
                    "  Watertight: {} (boundary edges: {})",
                    if watertight { "yes" } else { "NO" },
                    self.boundary_edge_count.unwrap_or(0)
                )?;
            }
            _ => writeln!(f, "  Edges: not tracked")?,
        }

        writeln!(f, "  Ground level: {:.3}", self.ground_level)?;
        if self.stale {
            writeln!(f, "  Overhangs: not classified for the current orientation")?;
        } else {
            writeln!(
                f,
                "  Overhangs: {} problematic, {} acceptable",
                self.problematic_count, self.acceptable_count
            )?;
            writeln!(f, "  Affected area: {:.3}", self.affected_area)?;
            writeln!(f, "  Projected area: {:.3}", self.affected_area_projected)?;
            writeln!(f, "  Support volume: {:.3}", self.support_volume)?;
        }

        Ok(())
    }
}

/// Log a summary of a mesh report.
pub fn log_report(report: &MeshReport) {
    info!(
        "Mesh: {} verts, {} triangles, {}x{}x{}",
        report.vertex_count,
        report.triangle_count,
        report.dimensions.map(|d| format!("{:.1}", d.0)).unwrap_or_default(),
        report.dimensions.map(|d| format!("{:.1}", d.1)).unwrap_or_default(),
        report.dimensions.map(|d| format!("{:.1}", d.2)).unwrap_or_default(),
    );

    if report.is_watertight == Some(false) {
        warn!(
            "Not watertight: {} boundary edges",
            report.boundary_edge_count.unwrap_or(0)
        );
    }

    if report.stale {
        return;
    }
    if report.needs_support() {
        info!(
            "{} triangles need support: area {:.3}, support volume {:.3}",
            report.problematic_count, report.affected_area, report.support_volume
        );
    } else {
        info!("No overhangs need support");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::tests::cube_records;
    use crate::{ClassificationParams, LoadOptions, RawTriangle};

    fn single_triangle() -> Mesh {
        let raw = RawTriangle::new([0.0; 3], [0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]);
        Mesh::from_records(&[raw], &LoadOptions::default()).unwrap()
    }

    #[test]
    fn test_report_watertight_cube() {
        let mut mesh = Mesh::from_records(&cube_records(100.0, 50.0), &LoadOptions::default())
            .unwrap();
        mesh.run_classification_pass(&ClassificationParams::default())
            .unwrap();
        let report = mesh.report();

        assert_eq!(report.vertex_count, 8);
        assert_eq!(report.triangle_count, 12);
        assert_eq!(report.edge_count, Some(18));
        assert_eq!(report.is_watertight, Some(true));
        assert_eq!(report.boundary_edge_count, Some(0));
        assert_eq!(report.problematic_count, 2);
        assert!(report.needs_support());
        assert!(!report.stale);
        assert_eq!(report.dimensions, Some((100.0, 100.0, 100.0)));
    }

    #[test]
    fn test_report_open_mesh() {
        let report = single_triangle().report();
        assert_eq!(report.is_watertight, Some(false));
        assert_eq!(report.boundary_edge_count, Some(3));
        assert!(report.stale);
    }

    #[test]
    fn test_report_without_edges() {
        let raw = RawTriangle::new([0.0; 3], [0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]);
        let mesh = Mesh::from_records(&[raw], &LoadOptions::fast()).unwrap();
        let report = mesh.report();
        assert_eq!(report.edge_count, None);
        assert!(format!("{report}").contains("Edges: not tracked"));
    }

    #[test]
    fn test_report_display() {
        let mut mesh = Mesh::from_records(&cube_records(10.0, 0.0), &LoadOptions::default())
            .unwrap();
        mesh.run_classification_pass(&ClassificationParams::default())
            .unwrap();
        let output = format!("{}", mesh.report());

        assert!(output.contains("Vertices: 8"));
        assert!(output.contains("Triangles: 12"));
        assert!(output.contains("Watertight: yes"));
        assert!(output.contains("0 problematic, 12 acceptable"));
    }
}
