//! Serialized mesh archive writer.

use std::path::{Path, PathBuf};

use flate2::write::ZlibEncoder;
use flate2::Compression;

use super::format::{MeshFlags, FILEFORMAT_HEADER, FILEFORMAT_VERSION_V4};
use super::mesh::{collect_triangles, GeometrySource};
use super::stream::OStream;
use super::wire::WireWrite;
use crate::util::{Error, Result};

/// 0-based position of a mesh inside an archive.
pub type MeshIndex = u32;

/// Append-only writer for a `.serialized` mesh archive.
///
/// Blocks are written as meshes arrive; the offset directory and mesh count
/// are written once when the archive is closed. Dropping an archive that
/// was never closed writes the directory as well, so the file is always
/// readable up to the last complete mesh.
pub struct MeshArchive {
    path: PathBuf,
    filename: String,
    stream: Option<OStream>,
    offsets: Vec<u64>,
}

impl MeshArchive {
    /// Create a new archive, truncating any existing file.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let stream = OStream::create(&path)?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        tracing::debug!("MeshArchive: created {}", path.display());
        Ok(Self {
            path,
            filename,
            stream: Some(stream),
            offsets: Vec::new(),
        })
    }

    /// File name (without directory) for references from the scene document.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of meshes appended so far.
    pub fn mesh_count(&self) -> usize {
        self.offsets.len()
    }

    /// Block offsets in mesh index order.
    pub fn offsets(&self) -> &[u64] {
        &self.offsets
    }

    /// Append a mesh under its own name.
    pub fn append<G: GeometrySource + ?Sized>(&mut self, mesh: &G) -> Result<MeshIndex> {
        self.append_named(mesh.name(), mesh)
    }

    /// Append a mesh and return its index.
    ///
    /// Attribute lengths and triangles are validated before any byte is written, so
    /// a rejected mesh leaves the archive untouched.
    pub fn append_named<G: GeometrySource + ?Sized>(&mut self, name: &str, mesh: &G) -> Result<MeshIndex> {
        let stream = self.stream.as_mut().ok_or(Error::Frozen)?;
        // The count after this append must still fit the directory.
        let index = mesh_count_u32(self.offsets.len() + 1)? - 1;
        let triangles = collect_triangles(mesh, name)?;
        let vertex_count = mesh.vertex_count();
        let flags = MeshFlags::single(mesh.has_normals(), mesh.has_texcoords());

        tracing::debug!(
            "MeshArchive[{}]: adding mesh with {} vertices, {} triangles{}",
            index,
            vertex_count,
            triangles.len(),
            if name.is_empty() { String::new() } else { format!(" (\"{}\")", name) }
        );

        let offset = stream.pos();
        stream.put(&FILEFORMAT_HEADER)?;
        stream.put(&FILEFORMAT_VERSION_V4)?;

        let mut z = ZlibEncoder::new(&mut *stream, Compression::best());
        z.put(&flags.bits())?;
        z.put(name)?;
        z.put(&(vertex_count as u64))?;
        z.put(&(triangles.len() as u64))?;

        for i in 0..vertex_count {
            let p = mesh.position(i);
            z.put(&p.x)?;
            z.put(&p.y)?;
            z.put(&p.z)?;
        }

        if flags.has_normals() {
            for i in 0..vertex_count {
                let n = mesh.normal(i);
                z.put(&n.x)?;
                z.put(&n.y)?;
                z.put(&n.z)?;
            }
        }

        if flags.has_texcoords() {
            for i in 0..vertex_count {
                let uv = mesh.texcoord(i);
                z.put(&uv.x)?;
                z.put(&uv.y)?;
            }
        }

        for [a, b, c] in &triangles {
            z.put(a)?;
            z.put(b)?;
            z.put(c)?;
        }
        z.finish()?;

        self.offsets.push(offset);
        Ok(index)
    }

    /// Write the directory and release the file.
    pub fn close(mut self) -> Result<()> {
        match self.stream.take() {
            Some(stream) => Self::finish(stream, &self.offsets, &self.path),
            None => Err(Error::Frozen),
        }
    }

    fn finish(mut stream: OStream, offsets: &[u64], path: &Path) -> Result<()> {
        let count = mesh_count_u32(offsets.len())?;
        for offset in offsets {
            stream.write_u64(*offset)?;
        }
        stream.write_u32(count)?;
        let size = stream.pos();
        stream.finish()?;
        tracing::info!(
            "MeshArchive: wrote {} meshes ({} bytes) to {}",
            offsets.len(),
            size,
            path.display()
        );
        Ok(())
    }
}

/// The directory stores the mesh count as a `u32`.
fn mesh_count_u32(count: usize) -> Result<MeshIndex> {
    MeshIndex::try_from(count)
        .map_err(|_| Error::invalid(format!("{} meshes exceed the archive limit of {}", count, MeshIndex::MAX)))
}

impl Drop for MeshArchive {
    fn drop(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Err(e) = Self::finish(stream, &self.offsets, &self.path) {
                tracing::warn!("MeshArchive: failed to finalize {}: {}", self.path.display(), e);
            }
        }
    }
}
