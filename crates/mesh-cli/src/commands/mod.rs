//! CLI command implementations and the argument groups they share.

pub mod analyze;
pub mod convert;
pub mod info;

use std::path::Path;

use anyhow::{Context as _, Result};
use clap::Args;
use mesh_overhang::{Axis, ClassificationParams, LoadOptions, Mesh};
use serde::Serialize;

use crate::config::{ClassificationSection, FileConfig};

/// How raw corners become vertices and edges.
#[derive(Args, Debug, Clone, Default)]
pub struct LoadArgs {
    /// Keep every corner as its own vertex (fast, disables leak detection).
    #[arg(long)]
    pub permissive: bool,

    /// Vertex merge distance for the strict policy.
    #[arg(long, value_name = "DIST")]
    pub tolerance: Option<f64>,

    /// Do not track edges (`--ignore-edges=false` overrides the config file).
    #[arg(
        long,
        value_name = "BOOL",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub ignore_edges: Option<bool>,
}

impl LoadArgs {
    pub fn resolve(&self, file: &FileConfig) -> LoadOptions {
        let mut options = file.load;
        if self.permissive {
            options = options.with_strict_vertex_policy(false).with_ignore_edges(true);
        }
        if let Some(tolerance) = self.tolerance {
            options = options.with_proximity_tolerance(tolerance);
        }
        if let Some(ignore) = self.ignore_edges {
            options = options.with_ignore_edges(ignore);
        }
        options
    }
}

/// Overhang test settings.
#[derive(Args, Debug, Clone, Default)]
pub struct ClassifyArgs {
    /// Overhang threshold in degrees from straight down.
    #[arg(long, value_name = "DEG")]
    pub phi_min: Option<f64>,

    /// Treat faces resting on the build plate like any other face
    /// (`--ignore-grounded=false` overrides the config file).
    #[arg(
        long,
        value_name = "BOOL",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub ignore_grounded: Option<bool>,

    /// Build plate height (defaults to the model's lowest point).
    #[arg(long, value_name = "Z", allow_negative_numbers = true)]
    pub ground_level: Option<f64>,

    /// Distance from the plate within which a corner counts as grounded.
    #[arg(long, value_name = "DIST")]
    pub ground_tolerance: Option<f64>,

    /// Half-width of the accepted band around the threshold, in radians.
    #[arg(long, value_name = "RAD")]
    pub angle_tolerance: Option<f64>,
}

impl ClassifyArgs {
    /// Merge flags over the config file over library defaults.
    pub fn resolve(&self, file: &ClassificationSection, mesh: &Mesh) -> ClassificationParams {
        let defaults = ClassificationParams::default();
        let mut params = defaults
            .with_ignore_grounded(
                self.ignore_grounded
                    .or(file.ignore_grounded)
                    .unwrap_or(defaults.ignore_grounded),
            )
            .with_ground_level(
                self.ground_level
                    .or(file.ground_level)
                    .unwrap_or_else(|| mesh.ground_level()),
            )
            .with_ground_tolerance(
                self.ground_tolerance
                    .or(file.ground_tolerance)
                    .unwrap_or(defaults.ground_tolerance),
            )
            .with_angle_tolerance(
                self.angle_tolerance
                    .or(file.angle_tolerance)
                    .unwrap_or(defaults.angle_tolerance),
            );
        if let Some(deg) = self.phi_min.or(file.phi_min_degrees) {
            params = params.with_phi_min_degrees(deg);
        }
        params
    }
}

/// Re-orientation applied after loading, X first.
#[derive(Args, Debug, Clone, Default)]
pub struct RotateArgs {
    /// Rotate about the X axis by this many degrees.
    #[arg(long, value_name = "DEG", allow_negative_numbers = true)]
    pub rotate_x: Option<f64>,

    /// Rotate about the Y axis by this many degrees.
    #[arg(long, value_name = "DEG", allow_negative_numbers = true)]
    pub rotate_y: Option<f64>,
}

/// A rotation that was applied, for reporting.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct AppliedRotation {
    pub axis: Axis,
    pub degrees: f64,
}

impl RotateArgs {
    pub fn apply(&self, mesh: &mut Mesh) -> Result<Vec<AppliedRotation>> {
        let mut applied = Vec::new();
        for (axis, degrees) in [(Axis::X, self.rotate_x), (Axis::Y, self.rotate_y)] {
            let Some(degrees) = degrees else { continue };
            mesh.rotate(degrees.to_radians(), axis)
                .with_context(|| format!("failed to rotate about {axis}"))?;
            applied.push(AppliedRotation { axis, degrees });
        }
        Ok(applied)
    }
}

/// Load an STL file with context on failure.
pub fn load_mesh(path: &Path, options: &LoadOptions) -> Result<Mesh> {
    Mesh::load(path, options).with_context(|| format!("failed to load {}", path.display()))
}
