//! `analyze`: overhang classification report.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use mesh_overhang::{log_report, MeshReport, TriangleId};
use serde::Serialize;
use tracing::info;

use super::{load_mesh, AppliedRotation, ClassifyArgs, LoadArgs, RotateArgs};
use crate::{output, Context};

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Input STL file.
    pub input: PathBuf,

    #[command(flatten)]
    pub load: LoadArgs,

    #[command(flatten)]
    pub classify: ClassifyArgs,

    #[command(flatten)]
    pub rotate: RotateArgs,

    /// Classify triangles on all cores.
    #[arg(long)]
    pub parallel: bool,

    /// List the N highest problematic triangles.
    #[arg(long, value_name = "N", default_value_t = 0)]
    pub top: usize,
}

#[derive(Debug, Serialize)]
struct ParamsOutput {
    phi_min_degrees: f64,
    ignore_grounded: bool,
    ground_level: f64,
    ground_tolerance: f64,
    angle_tolerance: f64,
}

#[derive(Debug, Serialize)]
struct HighFace {
    triangle: TriangleId,
    top_z: f64,
    area: f64,
}

#[derive(Debug, Serialize)]
struct AnalyzeOutput {
    input: PathBuf,
    rotations: Vec<AppliedRotation>,
    parameters: ParamsOutput,
    report: MeshReport,
    highest_problematic: Vec<HighFace>,
}

pub fn run(args: &AnalyzeArgs, ctx: &Context) -> Result<()> {
    let options = args.load.resolve(&ctx.config);
    let mut mesh = load_mesh(&args.input, &options)?;
    let rotations = args.rotate.apply(&mut mesh)?;

    let params = args.classify.resolve(&ctx.config.classification, &mesh);
    let summary = if args.parallel {
        mesh.run_classification_pass_parallel(&params)?
    } else {
        mesh.run_classification_pass(&params)?
    };
    info!(
        "Analyzed {:?}: {} of {} triangles need support",
        args.input,
        summary.problematic_count(),
        mesh.triangle_count()
    );

    let report = mesh.report();
    log_report(&report);

    let highest_problematic: Vec<HighFace> = mesh
        .problematic_by_height()
        .into_iter()
        .take(args.top)
        .filter_map(|id| {
            let corners = mesh.corners(id)?;
            let tri = mesh.triangle(id)?;
            Some(HighFace {
                triangle: id,
                top_z: mesh_overhang::triangle::top_z(&corners),
                area: tri.area,
            })
        })
        .collect();

    output::text(&report, ctx);
    for face in &highest_problematic {
        output::info(
            &format!(
                "  triangle {:>6}  top z {:>10.3}  area {:>10.3}",
                face.triangle, face.top_z, face.area
            ),
            ctx,
        );
    }
    if report.needs_support() {
        output::warning(
            &format!(
                "{} triangles need support (support volume {:.3})",
                report.problematic_count, report.support_volume
            ),
            ctx,
        );
    } else {
        output::success("No overhangs need support", ctx);
    }

    output::json(
        &AnalyzeOutput {
            input: args.input.clone(),
            rotations,
            parameters: ParamsOutput {
                phi_min_degrees: params.phi_min.to_degrees(),
                ignore_grounded: params.ignore_grounded,
                ground_level: params.ground_level,
                ground_tolerance: params.ground_tolerance,
                angle_tolerance: params.angle_tolerance,
            },
            report,
            highest_problematic,
        },
        ctx,
    )
}
