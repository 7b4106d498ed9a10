//! Serialized mesh archive reader.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian};
use flate2::read::ZlibDecoder;
use memmap2::Mmap;

use super::format::*;
use super::mesh::{check_triangle, MeshRecord};
use super::wire::WireReader;
use crate::util::{Error, Result, Vec2, Vec3};

enum Bytes {
    /// Memory-mapped file (preferred for large files)
    Mmap(Mmap),
    /// Owned buffer
    Owned(Vec<u8>),
}

impl Bytes {
    fn as_slice(&self) -> &[u8] {
        match self {
            Bytes::Mmap(m) => &m[..],
            Bytes::Owned(v) => v.as_slice(),
        }
    }
}

/// Summary of one mesh block, read without decoding vertex data.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshInfo {
    pub offset: u64,
    pub flags: MeshFlags,
    pub name: String,
    pub vertex_count: u64,
    pub triangle_count: u64,
}

/// Random-access reader over a `.serialized` archive.
pub struct ArchiveReader {
    data: Bytes,
    offsets: Vec<u64>,
    /// Start of the directory; every block lies before it.
    data_end: u64,
}

impl ArchiveReader {
    /// Open an archive with memory mapping.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_opts(path, true)
    }

    /// Open an archive, optionally reading it fully into memory instead of mapping.
    pub fn open_opts(path: impl AsRef<Path>, use_mmap: bool) -> Result<Self> {
        let path = path.as_ref();
        let mut file = File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound(path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;

        let size = file.metadata()?.len();
        let data = if use_mmap && size > 0 {
            // Safety: the file is opened read-only and not modified while mapped.
            let mmap = unsafe { Mmap::map(&file) }.map_err(|e| Error::MmapFailed(e.to_string()))?;
            Bytes::Mmap(mmap)
        } else {
            let mut buf = Vec::with_capacity(size as usize);
            file.read_to_end(&mut buf)?;
            Bytes::Owned(buf)
        };
        Self::with_bytes(data)
    }

    /// Parse an archive held in memory.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        Self::with_bytes(Bytes::Owned(bytes))
    }

    fn with_bytes(data: Bytes) -> Result<Self> {
        let (offsets, data_end) = Self::parse_directory(data.as_slice())?;
        Ok(Self { data, offsets, data_end })
    }

    /// Read the trailing count and the offset table in front of it.
    fn parse_directory(buf: &[u8]) -> Result<(Vec<u64>, u64)> {
        let size = buf.len() as u64;
        if size < COUNT_SIZE {
            return Err(Error::UnexpectedEof(COUNT_SIZE));
        }

        let count_pos = size - COUNT_SIZE;
        let count = LittleEndian::read_u32(&buf[count_pos as usize..]) as u64;
        let dir_len = count * DIRECTORY_ENTRY_SIZE;
        if dir_len > count_pos {
            return Err(Error::invalid(format!(
                "directory of {} entries does not fit in {} bytes",
                count, size
            )));
        }

        let dir_start = count_pos - dir_len;
        let mut offsets = Vec::with_capacity(count as usize);
        for i in 0..count {
            let pos = (dir_start + i * DIRECTORY_ENTRY_SIZE) as usize;
            let offset = LittleEndian::read_u64(&buf[pos..pos + 8]);
            if offset.checked_add(BLOCK_PREFIX_SIZE).map_or(true, |end| end > dir_start) {
                return Err(Error::invalid(format!(
                    "mesh {} offset {} lies outside the data region (ends at {})",
                    i, offset, dir_start
                )));
            }
            offsets.push(offset);
        }

        Ok((offsets, dir_start))
    }

    /// Number of meshes in the directory.
    #[inline]
    pub fn mesh_count(&self) -> usize {
        self.offsets.len()
    }

    /// Block offsets in mesh index order.
    #[inline]
    pub fn offsets(&self) -> &[u64] {
        &self.offsets
    }

    /// Total archive size in bytes.
    #[inline]
    pub fn size(&self) -> u64 {
        self.data.as_slice().len() as u64
    }

    fn block_offset(&self, index: usize) -> Result<u64> {
        self.offsets.get(index).copied().ok_or(Error::MeshOutOfBounds {
            index,
            count: self.offsets.len(),
        })
    }

    /// Validate the block prefix and inflate the sub-stream.
    fn inflate(&self, index: usize) -> Result<(u64, Vec<u8>)> {
        let offset = self.block_offset(index)?;
        let buf = &self.data.as_slice()[..self.data_end as usize];
        let start = offset as usize;

        let magic = LittleEndian::read_u16(&buf[start..start + 2]);
        if magic != FILEFORMAT_HEADER {
            return Err(Error::InvalidMagic { offset, found: magic });
        }
        let version = buf[start + 2];
        if version != FILEFORMAT_VERSION_V4 {
            return Err(Error::UnsupportedVersion(version));
        }

        // The zlib stream marks its own end; no length is stored.
        let mut decoder = ZlibDecoder::new(&buf[start + BLOCK_PREFIX_SIZE as usize..]);
        let mut out = Vec::new();
        decoder
            .read_to_end(&mut out)
            .map_err(|e| Error::invalid(format!("mesh {}: corrupt compressed stream: {}", index, e)))?;
        Ok((offset, out))
    }

    fn read_header(r: &mut WireReader<'_>, offset: u64) -> Result<MeshInfo> {
        let flags = MeshFlags(r.read_u32()?);
        let name = r.read_string()?;
        let vertex_count = r.read_u64()?;
        let triangle_count = r.read_u64()?;
        Ok(MeshInfo {
            offset,
            flags,
            name,
            vertex_count,
            triangle_count,
        })
    }

    /// Read the header fields of mesh `index`.
    pub fn mesh_info(&self, index: usize) -> Result<MeshInfo> {
        let (offset, raw) = self.inflate(index)?;
        Self::read_header(&mut WireReader::new(&raw), offset)
    }

    /// Decode mesh `index` completely.
    pub fn read_mesh(&self, index: usize) -> Result<MeshRecord> {
        let (offset, raw) = self.inflate(index)?;
        let mut r = WireReader::new(&raw);
        let info = Self::read_header(&mut r, offset)?;

        if info.flags.is_double_precision() {
            return Err(Error::UnsupportedPrecision);
        }
        if info.flags.face_normals() {
            return Err(Error::invalid(format!("mesh {}: face normals are not supported", index)));
        }
        if info.flags.has_colors() {
            return Err(Error::invalid(format!("mesh {}: vertex colors are not supported", index)));
        }

        // Every vertex needs 12 bytes, every triangle 12; reject sizes the
        // payload cannot possibly hold before allocating.
        let needed = info
            .vertex_count
            .saturating_add(info.triangle_count)
            .saturating_mul(12);
        if needed > r.remaining() as u64 {
            return Err(Error::UnexpectedEof(r.pos() as u64 + needed));
        }

        let n = info.vertex_count as usize;
        let positions = to_vec3(&r.read_f32_array(n * 3)?);
        let normals = if info.flags.has_normals() {
            Some(to_vec3(&r.read_f32_array(n * 3)?))
        } else {
            None
        };
        let texcoords = if info.flags.has_texcoords() {
            Some(to_vec2(&r.read_f32_array(n * 2)?))
        } else {
            None
        };

        let indices = r.read_u32_array(info.triangle_count as usize * 3)?;
        let triangles: Vec<[u32; 3]> = indices.chunks_exact(3).map(|t| [t[0], t[1], t[2]]).collect();
        for (face, tri) in triangles.iter().enumerate() {
            check_triangle(&info.name, face, *tri, n)?;
        }

        Ok(MeshRecord {
            name: info.name,
            positions,
            normals,
            texcoords,
            triangles,
        })
    }

    /// Iterate over all meshes in index order.
    pub fn meshes(&self) -> impl Iterator<Item = Result<MeshRecord>> + '_ {
        (0..self.mesh_count()).map(move |i| self.read_mesh(i))
    }
}

// `read_f32_array` always returns whole vectors, so the casts cannot fail.
fn to_vec3(flat: &[f32]) -> Vec<Vec3> {
    bytemuck::cast_slice(flat).to_vec()
}

fn to_vec2(flat: &[f32]) -> Vec<Vec2> {
    bytemuck::cast_slice(flat).to_vec()
}
