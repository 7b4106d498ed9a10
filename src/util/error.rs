//! Error types for the exporter.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for export and archive operations.
#[derive(Error, Debug)]
pub enum Error {
    /// File does not exist or cannot be accessed
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// A face could not be handed to the codec as a triangle
    #[error("Mesh '{mesh}': face {face} is not a valid triangle ({detail})")]
    NonTriangularFace {
        mesh: String,
        face: usize,
        detail: String,
    },

    /// Mesh attributes are inconsistent (e.g. normal count != vertex count)
    #[error("Invalid mesh: {0}")]
    InvalidMesh(String),

    /// Mesh block does not start with the serialized-format magic
    #[error("Invalid mesh block at offset {offset}: expected magic 0x041C, found {found:#06x}")]
    InvalidMagic { offset: u64, found: u16 },

    /// Unsupported mesh block version
    #[error("Unsupported serialized mesh version: {0}")]
    UnsupportedVersion(u8),

    /// Mesh block stores double precision data
    #[error("Double precision mesh data is not supported")]
    UnsupportedPrecision,

    /// File is truncated or corrupted
    #[error("Unexpected end of data at position {0}")]
    UnexpectedEof(u64),

    /// Invalid data structure in file
    #[error("Invalid file structure: {0}")]
    InvalidStructure(String),

    /// Mesh index out of bounds
    #[error("Mesh index {index} out of bounds (count: {count})")]
    MeshOutOfBounds { index: usize, count: usize },

    /// Integrator name or index outside the supported set
    #[error("Unknown integrator type: {0}")]
    UnknownIntegrator(String),

    /// Instance reference points at a definition that produced no content
    #[error("Instance definition '{0}' has no exportable content")]
    EmptyInstanceDefinition(String),

    /// Document refers to an id that was never declared before it
    #[error("Unresolved reference to id '{0}'")]
    UnresolvedReference(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Archive was already closed
    #[error("Archive is closed and cannot be modified")]
    Frozen,

    /// Memory mapping failed
    #[error("Memory mapping failed: {0}")]
    MmapFailed(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (settings or scene description) error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// UTF-8 conversion error
    #[error("Invalid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl Error {
    /// Create an invalid structure error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidStructure(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a non-triangular face error.
    pub fn face(mesh: &str, face: usize, detail: impl Into<String>) -> Self {
        Self::NonTriangularFace {
            mesh: mesh.to_string(),
            face,
            detail: detail.into(),
        }
    }

    /// Whether the session may continue after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::EmptyInstanceDefinition(_))
    }
}

/// Result type alias for exporter operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = Error::InvalidMagic { offset: 16, found: 0x1234 };
        assert!(e.to_string().contains("magic"));
        assert!(e.to_string().contains("0x1234"));

        let e = Error::MeshOutOfBounds { index: 5, count: 3 };
        assert!(e.to_string().contains("5"));
        assert!(e.to_string().contains("3"));

        let e = Error::face("cube", 7, "index 9 >= vertex count 8");
        assert!(e.to_string().contains("cube"));
        assert!(e.to_string().contains("face 7"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_recoverable() {
        assert!(Error::EmptyInstanceDefinition("block".into()).is_recoverable());
        assert!(!Error::UnknownIntegrator("foo".into()).is_recoverable());
        assert!(!Error::Frozen.is_recoverable());
    }
}
