//! Read-only view of the host scene being exported.
//!
//! The exporter only ever reads through [`HostScene`]; [`MemoryScene`] is a
//! plain in-memory implementation that can be loaded from JSON.

mod memory;
mod mesh;

pub use memory::MemoryScene;
pub use mesh::{Face, PolygonMesh};

use serde::{Deserialize, Serialize};

use crate::util::{DMat4, DVec3};

/// Stable identity of a host object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(pub u64);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Material {
    pub name: String,
    /// Number of objects using this material; unused materials are not exported.
    pub use_count: u32,
    /// 0 = opaque, 1 = fully transparent.
    pub transparency: f64,
    pub shine: f64,
    /// Emission color, components in `0..=1`.
    pub emission: [f32; 3],
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: String::new(),
            use_count: 1,
            transparency: 0.0,
            shine: 0.0,
            emission: [0.0; 3],
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Layer {
    pub name: String,
    pub render_material: Option<usize>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    #[default]
    Mesh,
    Brep,
    Extrusion,
    Surface,
    Curve,
    Point,
    Light,
    Other,
}

impl ObjectKind {
    /// Kinds that carry render meshes.
    pub fn has_render_mesh(self) -> bool {
        matches!(self, Self::Mesh | Self::Brep | Self::Extrusion | Self::Surface)
    }
}

/// Where an object takes its material from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialSource {
    #[default]
    FromLayer,
    FromObject,
    FromParent,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct SceneObject {
    pub id: ObjectId,
    pub name: String,
    pub kind: ObjectKind,
    pub layer: usize,
    pub material_source: MaterialSource,
    pub material_index: Option<usize>,
    /// Render meshes of the object.
    pub meshes: Vec<PolygonMesh>,
}

impl SceneObject {
    /// Resolve the material index for this object.
    pub fn resolve_material(&self, layers: &[Layer]) -> Option<usize> {
        match self.material_source {
            MaterialSource::FromLayer => layers.get(self.layer).and_then(|l| l.render_material),
            MaterialSource::FromObject => self.material_index,
            MaterialSource::FromParent => None,
        }
    }
}

/// A reusable block of objects.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct InstanceDefinition {
    pub id: ObjectId,
    pub name: String,
    /// Number of references placing this definition.
    pub use_count: u32,
    pub objects: Vec<SceneObject>,
}

impl InstanceDefinition {
    pub fn in_use(&self) -> bool {
        self.use_count > 0
    }
}

/// One placement of an instance definition.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstanceReference {
    pub name: String,
    pub definition: ObjectId,
    #[serde(with = "row_major")]
    pub transform: DMat4,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Projection {
    #[default]
    Perspective,
    Parallel,
    /// Anything else the host supports (two-point perspective etc.).
    Other,
}

/// View frustum bounds in camera space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Frustum {
    pub left: f64,
    pub right: f64,
    pub bottom: f64,
    pub top: f64,
    pub near: f64,
    pub far: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Viewport {
    pub projection: Projection,
    #[serde(with = "row_major")]
    pub camera_to_world: DMat4,
    pub frustum: Frustum,
    pub location: DVec3,
    pub target: DVec3,
    /// Half of the diagonal field of view, in radians.
    pub half_diagonal_angle: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            projection: Projection::Perspective,
            camera_to_world: DMat4::IDENTITY,
            frustum: Frustum {
                left: -1.0,
                right: 1.0,
                bottom: -1.0,
                top: 1.0,
                near: 0.1,
                far: 1000.0,
            },
            location: DVec3::ZERO,
            target: DVec3::NEG_Z,
            half_diagonal_angle: 25f64.to_radians(),
        }
    }
}

/// Read-only access to everything the exporter needs from the host.
pub trait HostScene {
    fn materials(&self) -> &[Material];

    fn layers(&self) -> &[Layer];

    fn instance_definitions(&self) -> &[InstanceDefinition];

    fn instance_references(&self) -> &[InstanceReference];

    /// Top-level objects (not part of any instance definition).
    fn objects(&self) -> &[SceneObject];

    fn active_viewport(&self) -> Option<&Viewport>;

    fn find_definition(&self, id: ObjectId) -> Option<&InstanceDefinition> {
        self.instance_definitions().iter().find(|d| d.id == id)
    }
}

/// Serde adapter storing a matrix as 16 row-major numbers.
mod row_major {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use crate::util::{from_row_major, to_row_major, DMat4};

    pub fn serialize<S: Serializer>(m: &DMat4, s: S) -> Result<S::Ok, S::Error> {
        to_row_major(m).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DMat4, D::Error> {
        let values = <[f64; 16]>::deserialize(d)?;
        Ok(from_row_major(&values))
    }
}
