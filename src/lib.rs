//! # mts-export
//!
//! Exports 3D scenes to the Mitsuba renderer: an XML scene document plus a
//! companion `.serialized` binary mesh archive.
//!
//! ## Modules
//!
//! - [`util`] - Errors and math helpers
//! - [`serialized`] - Binary mesh archive writer and reader
//! - [`document`] - Typed scene document and its XML rendering
//! - [`scene`] - Read-only host scene interface and a JSON-backed scene
//! - [`export`] - Export settings and the export session
//!
//! ## Example
//!
//! ```ignore
//! use mts_export::prelude::*;
//!
//! let scene = MemoryScene::load("room.json")?;
//! let report = Exporter::new(ExportSettings::load(), "out", "room.xml").export(&scene)?;
//! println!("{} shapes, {} meshes", report.shapes, report.meshes);
//! ```

pub mod util;
pub mod serialized;
pub mod document;
pub mod scene;
pub mod export;

// Re-export commonly used types
pub use util::{Error, Result};
pub use serialized::{ArchiveReader, MeshArchive};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::util::{Error, Result};
    pub use crate::serialized::{ArchiveReader, GeometrySource, MeshArchive, MeshRecord};
    pub use crate::document::Document;
    pub use crate::scene::{HostScene, MemoryScene};
    pub use crate::export::{ExportReport, ExportSettings, Exporter, Integrator};
}
