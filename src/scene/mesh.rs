//! Host render meshes with mixed triangle/quad faces.

use serde::Deserialize;

use crate::serialized::GeometrySource;
use crate::util::{Error, Result, Vec2, Vec3};

/// One face after triangulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Face {
    Triangle([u32; 3]),
    /// A source face with a vertex count other than 3 or 4.
    Unsupported { face: usize, sides: usize },
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct PolygonMeshData {
    positions: Vec<[f32; 3]>,
    normals: Option<Vec<[f32; 3]>>,
    texcoords: Option<Vec<[f32; 2]>>,
    faces: Vec<Vec<u32>>,
}

/// A render mesh as the host stores it: polygons with 3 or 4 corners.
///
/// Quads `(a, b, c, d)` split into `(a, b, c)` and `(a, c, d)`.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(from = "PolygonMeshData")]
pub struct PolygonMesh {
    positions: Vec<Vec3>,
    normals: Option<Vec<Vec3>>,
    texcoords: Option<Vec<Vec2>>,
    faces: Vec<Face>,
}

impl From<PolygonMeshData> for PolygonMesh {
    fn from(data: PolygonMeshData) -> Self {
        let mut mesh = Self::new(data.positions.into_iter().map(Vec3::from).collect(), &data.faces);
        mesh.normals = data.normals.map(|n| n.into_iter().map(Vec3::from).collect());
        mesh.texcoords = data.texcoords.map(|t| t.into_iter().map(Vec2::from).collect());
        mesh
    }
}

impl PolygonMesh {
    pub fn new(positions: Vec<Vec3>, polygons: &[Vec<u32>]) -> Self {
        let mut faces = Vec::with_capacity(polygons.len());
        for (i, poly) in polygons.iter().enumerate() {
            match poly.as_slice() {
                &[a, b, c] => faces.push(Face::Triangle([a, b, c])),
                &[a, b, c, d] => {
                    faces.push(Face::Triangle([a, b, c]));
                    faces.push(Face::Triangle([a, c, d]));
                }
                other => faces.push(Face::Unsupported { face: i, sides: other.len() }),
            }
        }
        Self {
            positions,
            normals: None,
            texcoords: None,
            faces,
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

    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() && self.faces.is_empty()
    }
}

impl GeometrySource for PolygonMesh {
    fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    fn triangle_count(&self) -> usize {
        self.faces.len()
    }

    fn position(&self, index: usize) -> Vec3 {
        self.positions[index]
    }

    fn has_normals(&self) -> bool {
        self.normals.as_ref().is_some_and(|n| n.len() == self.positions.len())
    }

    fn normal(&self, index: usize) -> Vec3 {
        self.normals.as_ref().map_or(Vec3::ZERO, |n| n[index])
    }

    fn has_texcoords(&self) -> bool {
        self.texcoords.as_ref().is_some_and(|t| t.len() == self.positions.len())
    }

    fn texcoord(&self, index: usize) -> Vec2 {
        self.texcoords.as_ref().map_or(Vec2::ZERO, |t| t[index])
    }

    fn triangle(&self, index: usize) -> Result<[u32; 3]> {
        match self.faces[index] {
            Face::Triangle(tri) => Ok(tri),
            Face::Unsupported { face, sides } => Err(Error::face(
                "",
                face,
                format!("polygon with {} corners", sides),
            )),
        }
    }
}
