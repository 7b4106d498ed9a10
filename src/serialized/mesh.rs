//! Triangle mesh record and the geometry source interface.

use crate::util::{BBox3f, Error, Result, Vec2, Vec3};

/// Read-only access to a triangulated mesh.
///
/// Implemented by host scene meshes and by [`MeshRecord`] itself.
/// `triangle(i)` must fail with [`Error::NonTriangularFace`] when face `i`
/// could not be turned into a triangle.
pub trait GeometrySource {
    /// Display name (may be empty).
    fn name(&self) -> &str {
        ""
    }

    fn vertex_count(&self) -> usize;

    /// Number of triangles after triangulation.
    fn triangle_count(&self) -> usize;

    fn position(&self, index: usize) -> Vec3;

    fn has_normals(&self) -> bool;

    /// Per-vertex normal; only called when `has_normals()`.
    fn normal(&self, index: usize) -> Vec3;

    fn has_texcoords(&self) -> bool;

    /// Per-vertex texture coordinate; only called when `has_texcoords()`.
    fn texcoord(&self, index: usize) -> Vec2;

    fn triangle(&self, index: usize) -> Result<[u32; 3]>;

    /// Check that every present attribute has one entry per vertex.
    ///
    /// Sources that cannot get this wrong keep the default.
    fn check_attributes(&self) -> Result<()> {
        Ok(())
    }
}

/// One triangulated mesh as stored in a serialized archive.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshRecord {
    pub name: String,
    pub positions: Vec<Vec3>,
    pub normals: Option<Vec<Vec3>>,
    pub texcoords: Option<Vec<Vec2>>,
    pub triangles: Vec<[u32; 3]>,
}

impl MeshRecord {
    /// Create a mesh with positions and triangles only.
    pub fn new(name: impl Into<String>, positions: Vec<Vec3>, triangles: Vec<[u32; 3]>) -> Self {
        Self {
            name: name.into(),
            positions,
            normals: None,
            texcoords: None,
            triangles,
        }
    }

    pub fn with_normals(mut self, normals: Vec<Vec3>) -> Self {
        self.normals = Some(normals);
        self
    }

    pub fn with_texcoords(mut self, texcoords: Vec<Vec2>) -> Self {
        self.texcoords = Some(texcoords);
        self
    }

    /// Copy any geometry source into a record, validating it on the way.
    pub fn from_source<G: GeometrySource + ?Sized>(source: &G) -> Result<Self> {
        source.check_attributes()?;
        let vertex_count = source.vertex_count();
        let positions = (0..vertex_count).map(|i| source.position(i)).collect();
        let normals = source
            .has_normals()
            .then(|| (0..vertex_count).map(|i| source.normal(i)).collect());
        let texcoords = source
            .has_texcoords()
            .then(|| (0..vertex_count).map(|i| source.texcoord(i)).collect());
        let triangles = collect_triangles(source, source.name())?;

        Ok(Self {
            name: source.name().to_string(),
            positions,
            normals,
            texcoords,
            triangles,
        })
    }

    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn num_triangles(&self) -> usize {
        self.triangles.len()
    }

    pub fn bounds(&self) -> BBox3f {
        BBox3f::from_points(&self.positions)
    }

    /// Check attribute lengths and triangle indices.
    pub fn validate(&self) -> Result<()> {
        self.check_attributes()?;
        for (face, tri) in self.triangles.iter().enumerate() {
            check_triangle(&self.name, face, *tri, self.positions.len())?;
        }
        Ok(())
    }
}

impl GeometrySource for MeshRecord {
    fn name(&self) -> &str {
        &self.name
    }

    fn check_attributes(&self) -> Result<()> {
        let n = self.positions.len();
        if let Some(normals) = &self.normals {
            if normals.len() != n {
                return Err(Error::InvalidMesh(format!(
                    "'{}': {} normals for {} vertices",
                    self.name,
                    normals.len(),
                    n
                )));
            }
        }
        if let Some(uvs) = &self.texcoords {
            if uvs.len() != n {
                return Err(Error::InvalidMesh(format!(
                    "'{}': {} texcoords for {} vertices",
                    self.name,
                    uvs.len(),
                    n
                )));
            }
        }
        Ok(())
    }

    fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    fn position(&self, index: usize) -> Vec3 {
        self.positions[index]
    }

    fn has_normals(&self) -> bool {
        self.normals.is_some()
    }

    fn normal(&self, index: usize) -> Vec3 {
        self.normals.as_ref().map_or(Vec3::ZERO, |n| n[index])
    }

    fn has_texcoords(&self) -> bool {
        self.texcoords.is_some()
    }

    fn texcoord(&self, index: usize) -> Vec2 {
        self.texcoords.as_ref().map_or(Vec2::ZERO, |t| t[index])
    }

    fn triangle(&self, index: usize) -> Result<[u32; 3]> {
        Ok(self.triangles[index])
    }
}

/// Reject a triangle referencing a vertex outside `0..vertex_count`.
pub(crate) fn check_triangle(mesh: &str, face: usize, tri: [u32; 3], vertex_count: usize) -> Result<()> {
    if let Some(bad) = tri.iter().find(|&&i| i as usize >= vertex_count) {
        return Err(Error::face(
            mesh,
            face,
            format!("index {} >= vertex count {}", bad, vertex_count),
        ));
    }
    Ok(())
}

/// Pull every triangle out of a source, checking attribute lengths and
/// indices against its vertex count.
///
/// Errors carry `name`, which overrides the source's own name.
pub(crate) fn collect_triangles<G: GeometrySource + ?Sized>(source: &G, name: &str) -> Result<Vec<[u32; 3]>> {
    source.check_attributes()?;
    let vertex_count = source.vertex_count();
    let count = source.triangle_count();
    let mut triangles = Vec::with_capacity(count);
    for face in 0..count {
        let tri = source.triangle(face).map_err(|e| match e {
            Error::NonTriangularFace { face, detail, .. } => Error::face(name, face, detail),
            other => other,
        })?;
        check_triangle(name, face, tri, vertex_count)?;
        triangles.push(tri);
    }
    Ok(triangles)
}
