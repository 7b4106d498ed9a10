//! Math type re-exports and small transform helpers.
//!
//! Geometry is single precision (`Vec3`, `Vec2`) because that is what the
//! serialized format stores; transforms coming from the host scene are
//! double precision (`DMat4`).

pub use glam::{DMat4, DVec3, DVec4, Vec2, Vec3};

use std::fmt;

/// 3D bounding box with single precision.
#[derive(Clone, Copy, PartialEq)]
pub struct BBox3f {
    pub min: Vec3,
    pub max: Vec3,
}

impl BBox3f {
    /// Empty bounding box (inverted, will expand on first point).
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    /// Bounding box of a point set (`EMPTY` for no points).
    pub fn from_points(points: &[Vec3]) -> Self {
        let mut b = Self::EMPTY;
        for p in points {
            b.expand_by_point(*p);
        }
        b
    }

    /// True until the first point is added.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Expand this box to include a point.
    #[inline]
    pub fn expand_by_point(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }
}

impl fmt::Debug for BBox3f {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BBox3f({:?} - {:?})", self.min, self.max)
    }
}

/// Reflection through the plane with the given normal passing through the origin.
///
/// `I - 2 n n^T` in the upper 3x3, identity translation.
pub fn mirror(normal: DVec3) -> DMat4 {
    let n = normal.normalize();
    DMat4::from_cols(
        DVec4::new(1.0 - 2.0 * n.x * n.x, -2.0 * n.y * n.x, -2.0 * n.z * n.x, 0.0),
        DVec4::new(-2.0 * n.x * n.y, 1.0 - 2.0 * n.y * n.y, -2.0 * n.z * n.y, 0.0),
        DVec4::new(-2.0 * n.x * n.z, -2.0 * n.y * n.z, 1.0 - 2.0 * n.z * n.z, 0.0),
        DVec4::W,
    )
}

/// Row-major array of a matrix (`m[row * 4 + col]`).
pub fn to_row_major(m: &DMat4) -> [f64; 16] {
    m.transpose().to_cols_array()
}

/// Matrix from a row-major array.
pub fn from_row_major(values: &[f64; 16]) -> DMat4 {
    DMat4::from_cols_array(values).transpose()
}

/// HSL lightness of an RGB color, `(max + min) / 2`.
pub fn brightness(rgb: [f32; 3]) -> f32 {
    let max = rgb[0].max(rgb[1]).max(rgb[2]);
    let min = rgb[0].min(rgb[1]).min(rgb[2]);
    (max + min) * 0.5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbox3f() {
        let mut b = BBox3f::EMPTY;
        assert!(b.is_empty());

        b.expand_by_point(Vec3::ZERO);
        assert!(!b.is_empty());
        assert_eq!(b.min, Vec3::ZERO);

        b.expand_by_point(Vec3::ONE);
        assert_eq!(b.max, Vec3::ONE);

        let b = BBox3f::from_points(&[Vec3::new(-1.0, 2.0, 0.0), Vec3::new(1.0, -2.0, 3.0)]);
        assert_eq!(b.min, Vec3::new(-1.0, -2.0, 0.0));
        assert_eq!(b.max, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_mirror() {
        let mz = mirror(DVec3::new(0.0, 0.0, -1.0));
        assert_eq!(mz, DMat4::from_diagonal(DVec4::new(1.0, 1.0, -1.0, 1.0)));

        let mx = mirror(DVec3::new(-1.0, 0.0, 0.0));
        assert_eq!(mx, DMat4::from_diagonal(DVec4::new(-1.0, 1.0, 1.0, 1.0)));
    }

    #[test]
    fn test_row_major() {
        let m = DMat4::from_translation(DVec3::new(1.0, 2.0, 3.0));
        let rows = to_row_major(&m);
        assert_eq!(rows[3], 1.0);
        assert_eq!(rows[7], 2.0);
        assert_eq!(rows[11], 3.0);
        assert_eq!(from_row_major(&rows), m);
    }

    #[test]
    fn test_brightness() {
        assert_eq!(brightness([0.0, 0.0, 0.0]), 0.0);
        assert_eq!(brightness([1.0, 0.0, 0.0]), 0.5);
        assert_eq!(brightness([1.0, 1.0, 1.0]), 1.0);
    }
}
