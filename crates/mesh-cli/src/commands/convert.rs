//! `convert`: re-encode as ASCII or binary STL.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::{Args, ValueEnum};
use mesh_overhang::StlEncoding;
use serde::Serialize;

use super::{load_mesh, AppliedRotation, LoadArgs, RotateArgs};
use crate::{output, Context};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    Ascii,
    Binary,
}

impl From<Encoding> for StlEncoding {
    fn from(e: Encoding) -> Self {
        match e {
            Encoding::Ascii => StlEncoding::Ascii,
            Encoding::Binary => StlEncoding::Binary,
        }
    }
}

#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Input STL file.
    pub input: PathBuf,

    /// Output STL file.
    pub output: PathBuf,

    /// Output encoding.
    #[arg(long, value_enum, default_value = "binary")]
    pub encoding: Encoding,

    #[command(flatten)]
    pub load: LoadArgs,

    #[command(flatten)]
    pub rotate: RotateArgs,
}

#[derive(Debug, Serialize)]
struct ConvertOutput {
    input: PathBuf,
    output: PathBuf,
    encoding: Encoding,
    rotations: Vec<AppliedRotation>,
    triangle_count: usize,
    ground_level: f64,
}

pub fn run(args: &ConvertArgs, ctx: &Context) -> Result<()> {
    let options = args.load.resolve(&ctx.config);
    let mut mesh = load_mesh(&args.input, &options)?;
    let rotations = args.rotate.apply(&mut mesh)?;

    mesh.save(&args.output, args.encoding.into())
        .with_context(|| format!("failed to write {}", args.output.display()))?;

    output::success(
        &format!(
            "Wrote {} triangles to {} ({:?})",
            mesh.triangle_count(),
            args.output.display(),
            args.encoding
        ),
        ctx,
    );

    output::json(
        &ConvertOutput {
            input: args.input.clone(),
            output: args.output.clone(),
            encoding: args.encoding,
            rotations,
            triangle_count: mesh.triangle_count(),
            ground_level: mesh.ground_level(),
        },
        ctx,
    )
}
