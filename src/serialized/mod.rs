//! Binary `.serialized` mesh archive.
//!
//! ## File Structure
//!
//! ```text
//! +----------------------+
//! | Mesh block 0         |  magic 0x041C (u16 LE), version 4 (u8),
//! |                      |  zlib stream (flags, name, counts, arrays)
//! +----------------------+
//! | Mesh block 1 ...     |
//! +----------------------+
//! | Offset directory     |  one u64 LE per mesh, in index order
//! +----------------------+
//! | Mesh count           |  u32 LE
//! +----------------------+
//! ```
//!
//! Inside each zlib stream:
//!
//! ```text
//! flags u32 | name\0 | vertex count u64 | triangle count u64
//! positions [f32; 3] * V
//! normals   [f32; 3] * V   (HAS_NORMALS)
//! texcoords [f32; 2] * V   (HAS_TEXCOORDS)
//! indices   [u32; 3] * T
//! ```

mod format;
mod mesh;
mod reader;
mod stream;
mod wire;
mod writer;

pub use format::*;
pub use mesh::{GeometrySource, MeshRecord};
pub(crate) use mesh::collect_triangles;
pub use reader::{ArchiveReader, MeshInfo};
pub use stream::OStream;
pub use wire::{WireReader, WireValue, WireWrite};
pub use writer::{MeshArchive, MeshIndex};
