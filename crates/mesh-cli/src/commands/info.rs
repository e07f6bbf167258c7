//! `info`: container details and topology statistics.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::Args;
use mesh_overhang::{read_stl, Mesh, StlFormat};
use serde::Serialize;

use super::LoadArgs;
use crate::{output, Context};

#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Input STL file.
    pub input: PathBuf,

    #[command(flatten)]
    pub load: LoadArgs,
}

#[derive(Debug, Serialize)]
struct InfoOutput {
    input: PathBuf,
    header: String,
    format: StlFormat,
    declared_count: Option<u32>,
    decoded_count: usize,
    warnings: Vec<String>,
    vertex_count: usize,
    edge_count: Option<usize>,
    boundary_edge_count: Option<usize>,
    is_watertight: Option<bool>,
    ground_level: f64,
}

pub fn run(args: &InfoArgs, ctx: &Context) -> Result<()> {
    let document = read_stl(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    let options = args.load.resolve(&ctx.config);
    let mesh = Mesh::from_records(&document.records, &options)
        .with_context(|| format!("failed to build mesh from {}", args.input.display()))?;

    let edges = mesh.edges();
    let out = InfoOutput {
        input: args.input.clone(),
        header: document.header.clone(),
        format: document.format,
        declared_count: document.declared_count,
        decoded_count: document.records.len(),
        warnings: document.warnings.iter().map(ToString::to_string).collect(),
        vertex_count: mesh.vertex_count(),
        edge_count: edges.map(|e| e.len()),
        boundary_edge_count: edges.map(|e| e.boundary_edge_count()),
        is_watertight: edges.map(|e| e.is_watertight()),
        ground_level: mesh.ground_level(),
    };

    output::info(&format!("File: {}", out.input.display()), ctx);
    output::info(&format!("  Header: {}", out.header), ctx);
    output::info(&format!("  Format: {}", out.format), ctx);
    if let Some(declared) = out.declared_count {
        output::info(&format!("  Declared triangles: {declared}"), ctx);
    }
    output::info(&format!("  Decoded triangles: {}", out.decoded_count), ctx);
    output::info(&format!("  Vertices: {}", out.vertex_count), ctx);
    match (out.edge_count, out.is_watertight) {
        (Some(edges), Some(watertight)) => output::info(
            &format!(
                "  Edges: {} ({}, {} boundary)",
                edges,
                if watertight { "watertight" } else { "open" },
                out.boundary_edge_count.unwrap_or(0)
            ),
            ctx,
        ),
        _ => output::info("  Edges: not tracked", ctx),
    }
    output::info(&format!("  Ground level: {:.3}", out.ground_level), ctx);
    for warning in &out.warnings {
        output::warning(warning, ctx);
    }

    output::json(&out, ctx)
}
