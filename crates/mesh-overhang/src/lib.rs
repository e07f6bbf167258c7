//! STL mesh topology and overhang analysis for 3D printing.
//!
//! This crate loads triangle meshes, rebuilds their topology and finds the
//! faces that will need support material when printed. Common operations
//! include:
//!
//! - **Loading/Saving**: ASCII, binary and colored binary STL
//! - **Topology**: tolerance-based vertex merging, shared edges, leak
//!   (non-manifold edge) detection
//! - **Overhangs**: per-face classification, affected surface area and
//!   support volume estimates
//! - **Orientation**: rotation about X or Y with ground level tracking
//!
//! # Example
//!
//! ```no_run
//! use mesh_overhang::{Axis, ClassificationParams, LoadOptions, Mesh};
//!
//! // Load a mesh, merging corners closer than 1e-4
//! let mut mesh = Mesh::load("model.stl", &LoadOptions::default()).unwrap();
//!
//! // Tip it over by 30 degrees
//! mesh.rotate(30f64.to_radians(), Axis::X).unwrap();
//!
//! // Classify against the new build plate
//! let params = ClassificationParams::default().with_ground_level(mesh.ground_level());
//! let summary = mesh.run_classification_pass(&params).unwrap();
//! println!("{} faces need support", summary.problematic_count());
//!
//! println!("{}", mesh.report());
//! ```

#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod error;
mod types;

pub mod edges;
pub mod ingest;
pub mod io;
pub mod mesh;
pub mod params;
pub mod report;
pub mod transform;
pub mod triangle;
pub mod vertices;

// Re-export core types at crate root
pub use error::{MeshError, MeshResult};
pub use types::{
    Classification, EdgeId, Partition, RawTriangle, TriangleId, Vertex, VertexId,
};

pub use edges::{Edge, EdgeTopology};
pub use ingest::MeshIngestor;
pub use mesh::{ClassificationSummary, Mesh};
pub use params::{ClassificationParams, LoadOptions, DEFAULT_PROXIMITY_TOLERANCE};
pub use report::{log_report, MeshReport};
pub use transform::{Axis, RigidTransform};
pub use triangle::{assess_face, FaceAssessment, Triangle};
pub use vertices::{SpatialVertexTable, VertexPolicy};

// Re-export commonly used functions
pub use io::{
    load_mesh, parse_stl, read_stl, save_mesh, write_stl, write_stl_to, LoadWarning,
    StlDocument, StlEncoding, StlFormat,
};
