//! Error types for mesh construction and analysis.

use std::path::PathBuf;
use thiserror::Error;

use crate::types::{EdgeId, TriangleId, VertexId};

/// Result type alias for mesh operations.
pub type MeshResult<T> = Result<T, MeshError>;

/// Errors that can occur while loading, building or analysing a mesh.
#[derive(Debug, Error)]
pub enum MeshError {
    /// Error reading from a file.
    #[error("failed to read mesh from {path}: {source}")]
    IoRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error writing to a file.
    #[error("failed to write mesh to {path}: {source}")]
    IoWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed or undecodable STL content. No partial mesh is produced.
    #[error("failed to decode STL data: {details}")]
    Format { details: String },

    /// The requested operation is not supported. The mesh is left unchanged.
    #[error("unsupported operation: {operation}")]
    UnsupportedOperation { operation: String },

    /// An edge was offered a third distinct triangle.
    #[error(
        "the model contains leaks: edge {edge} between vertices {vertices:?} already joins two \
         triangles and cannot take triangle {triangle}. The model is non-manifold. Reducing the \
         vertex proximity tolerance (currently {tolerance}) may resolve it; if edges are not \
         needed, load with ignore_edges enabled"
    )]
    Leak {
        edge: EdgeId,
        vertices: (VertexId, VertexId),
        triangle: TriangleId,
        tolerance: f64,
    },

    /// A raw vertex could not be accepted into the vertex table.
    #[error("invalid vertex: {details}")]
    InvalidVertex { details: String },

    /// Unknown rotation axis name.
    #[error("invalid axis {axis:?}: expected one of x, y or z")]
    InvalidAxis { axis: String },

    /// Invalid configuration value.
    #[error("invalid configuration: {details}")]
    InvalidConfig { details: String },

    /// Empty mesh (no vertices or triangles).
    #[error("mesh is empty: {details}")]
    EmptyMesh { details: String },
}

impl MeshError {
    pub(crate) fn format(details: impl Into<String>) -> Self {
        Self::Format {
            details: details.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leak_message_mentions_tolerance_and_workaround() {
        let err = MeshError::Leak {
            edge: 7,
            vertices: (1, 2),
            triangle: 9,
            tolerance: 0.0001,
        };
        let msg = err.to_string();
        assert!(msg.contains("non-manifold"));
        assert!(msg.contains("0.0001"));
        assert!(msg.contains("ignore_edges"));
        assert!(msg.contains("(1, 2)"));
    }
}
