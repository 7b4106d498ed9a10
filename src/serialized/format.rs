//! Serialized mesh format constants and the per-block flag word.

use std::fmt;

/// Magic value at the start of every mesh block.
pub const FILEFORMAT_HEADER: u16 = 0x041C;

/// Mesh block format version written by this crate.
pub const FILEFORMAT_VERSION_V4: u8 = 0x04;

/// Size of the uncompressed block prefix (magic + version).
pub const BLOCK_PREFIX_SIZE: u64 = 3;

/// Size of the trailing mesh count.
pub const COUNT_SIZE: u64 = 4;

/// Size of one directory entry.
pub const DIRECTORY_ENTRY_SIZE: u64 = 8;

/// Flag word stored at the start of every compressed mesh sub-stream.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MeshFlags(pub u32);

impl MeshFlags {
    /// Per-vertex normals follow the positions.
    pub const HAS_NORMALS: u32 = 0x0001;
    /// Per-vertex texture coordinates follow the normals.
    pub const HAS_TEXCOORDS: u32 = 0x0002;
    /// Per-vertex colors (reserved, never written).
    pub const HAS_COLORS: u32 = 0x0008;
    /// Normals are per face (reserved, never written).
    pub const FACE_NORMALS: u32 = 0x0010;
    /// Floating point data is single precision.
    pub const SINGLE_PRECISION: u32 = 0x0100;
    /// Floating point data is double precision (reserved).
    pub const DOUBLE_PRECISION: u32 = 0x0200;

    /// Flags for a single precision mesh with the given optional attributes.
    pub const fn single(normals: bool, texcoords: bool) -> Self {
        let mut bits = Self::SINGLE_PRECISION;
        if normals {
            bits |= Self::HAS_NORMALS;
        }
        if texcoords {
            bits |= Self::HAS_TEXCOORDS;
        }
        Self(bits)
    }

    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn contains(self, flag: u32) -> bool {
        self.0 & flag == flag
    }

    #[inline]
    pub const fn has_normals(self) -> bool {
        self.contains(Self::HAS_NORMALS)
    }

    #[inline]
    pub const fn has_texcoords(self) -> bool {
        self.contains(Self::HAS_TEXCOORDS)
    }

    #[inline]
    pub const fn has_colors(self) -> bool {
        self.contains(Self::HAS_COLORS)
    }

    #[inline]
    pub const fn face_normals(self) -> bool {
        self.contains(Self::FACE_NORMALS)
    }

    #[inline]
    pub const fn is_single_precision(self) -> bool {
        self.contains(Self::SINGLE_PRECISION)
    }

    #[inline]
    pub const fn is_double_precision(self) -> bool {
        self.contains(Self::DOUBLE_PRECISION)
    }
}

impl fmt::Debug for MeshFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();
        if self.has_normals() {
            names.push("normals");
        }
        if self.has_texcoords() {
            names.push("texcoords");
        }
        if self.has_colors() {
            names.push("colors");
        }
        if self.face_normals() {
            names.push("face_normals");
        }
        if self.is_single_precision() {
            names.push("single");
        }
        if self.is_double_precision() {
            names.push("double");
        }
        write!(f, "MeshFlags({:#06x}: {})", self.0, names.join("|"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        assert_eq!(FILEFORMAT_HEADER.to_le_bytes(), [0x1C, 0x04]);
        assert_eq!(FILEFORMAT_VERSION_V4, 4);
    }

    #[test]
    fn test_flags() {
        let f = MeshFlags::single(false, false);
        assert_eq!(f.bits(), 0x0100);
        assert!(f.is_single_precision());
        assert!(!f.has_normals());

        let f = MeshFlags::single(true, true);
        assert_eq!(f.bits(), 0x0103);
        assert!(f.has_normals());
        assert!(f.has_texcoords());
        assert!(!f.face_normals());
        assert!(!f.is_double_precision());

        let f = MeshFlags(MeshFlags::DOUBLE_PRECISION | MeshFlags::HAS_COLORS);
        assert!(f.is_double_precision());
        assert!(f.has_colors());
        assert!(format!("{:?}", f).contains("double"));
    }
}
