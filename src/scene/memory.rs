//! JSON-backed scene for driving the exporter without a host application.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use super::{HostScene, InstanceDefinition, InstanceReference, Layer, Material, SceneObject, Viewport};
use crate::util::{Error, Result};

/// A complete scene held in memory.
///
/// ```json
/// {
///   "materials": [{ "name": "Glass", "transparency": 1.0 }],
///   "layers": [{ "name": "Default", "render_material": 0 }],
///   "objects": [{ "id": 1, "name": "box", "meshes": [ ... ] }],
///   "viewport": { "projection": "perspective", ... }
/// }
/// ```
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct MemoryScene {
    pub materials: Vec<Material>,
    pub layers: Vec<Layer>,
    pub instance_definitions: Vec<InstanceDefinition>,
    pub instance_references: Vec<InstanceReference>,
    pub objects: Vec<SceneObject>,
    pub viewport: Option<Viewport>,
}

impl MemoryScene {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load a scene description from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        let text = fs::read_to_string(path)?;
        let scene = Self::from_json(&text)?;
        tracing::debug!(
            "Loaded scene {:?}: {} objects, {} materials, {} definitions",
            path,
            scene.objects.len(),
            scene.materials.len(),
            scene.instance_definitions.len()
        );
        Ok(scene)
    }
}

impl HostScene for MemoryScene {
    fn materials(&self) -> &[Material] {
        &self.materials
    }

    fn layers(&self) -> &[Layer] {
        &self.layers
    }

    fn instance_definitions(&self) -> &[InstanceDefinition] {
        &self.instance_definitions
    }

    fn instance_references(&self) -> &[InstanceReference] {
        &self.instance_references
    }

    fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    fn active_viewport(&self) -> Option<&Viewport> {
        self.viewport.as_ref()
    }
}
