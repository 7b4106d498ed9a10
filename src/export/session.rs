//! One export run: scene traversal, id allocation and geometry storage.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::obj::ObjStore;
use super::settings::{ExportSettings, Integrator};
use crate::document::builder::{self, MaterialKind, MaterialNames, ShapeMaterial, ShapeSource};
use crate::document::{Document, Element};
use crate::scene::{HostScene, InstanceDefinition, InstanceReference, ObjectId, PolygonMesh, SceneObject};
use crate::serialized::{MeshArchive, MeshIndex};
use crate::util::{Error, Result};

/// Export statistics
#[derive(Debug, Default)]
pub struct ExportReport {
    pub materials: usize,
    pub groups: usize,
    pub instances: usize,
    /// Shape nodes written, including those inside groups.
    pub shapes: usize,
    /// Meshes handed to the geometry store.
    pub meshes: usize,
    /// Objects without render meshes.
    pub skipped_objects: usize,
    /// Recoverable problems, such as references to empty definitions.
    pub warnings: Vec<Error>,
    pub sensor: bool,
    pub scene_path: PathBuf,
    /// Archive file, or the directory holding OBJ files.
    pub geometry_path: PathBuf,
    pub elapsed: Duration,
}

impl ExportReport {
    /// Instance references that were left out.
    pub fn skipped_instances(&self) -> usize {
        self.warnings
            .iter()
            .filter(|e| matches!(e, Error::EmptyInstanceDefinition(_)))
            .count()
    }
}

/// Exports host scenes into a scene document plus geometry files.
#[derive(Debug, Clone)]
pub struct Exporter {
    settings: ExportSettings,
    base_path: PathBuf,
    scene_filename: String,
}

impl Exporter {
    pub fn new(settings: ExportSettings, base_path: impl Into<PathBuf>, scene_filename: impl Into<String>) -> Self {
        Self {
            settings,
            base_path: base_path.into(),
            scene_filename: scene_filename.into(),
        }
    }

    pub fn settings(&self) -> &ExportSettings {
        &self.settings
    }

    pub fn scene_path(&self) -> PathBuf {
        self.base_path.join(&self.scene_filename)
    }

    /// `<scene stem>.serialized`
    pub fn archive_filename(&self) -> String {
        let stem = Path::new(&self.scene_filename)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "scene".to_string());
        format!("{}.serialized", stem)
    }

    /// Export `scene`, writing the document and its geometry under the base path.
    ///
    /// The geometry store is closed on every path out of this function; on
    /// failure the first error is returned and a close error is only logged.
    pub fn export<S: HostScene + ?Sized>(&self, scene: &S) -> Result<ExportReport> {
        let start = Instant::now();
        let integrator = self.settings.integrator()?;

        let store = if self.settings.write_serialized {
            let path = self.base_path.join(self.archive_filename());
            GeometryStore::Serialized(MeshArchive::create(path)?)
        } else {
            GeometryStore::Obj(ObjStore::new(&self.base_path))
        };

        let mut session = Session {
            scene,
            settings: &self.settings,
            integrator,
            geometry_path: store.path(),
            store,
            document: Document::new(),
            id_counter: 0,
            id_map: HashMap::new(),
            material_ids: HashMap::new(),
            material_names: MaterialNames::new(),
            report: ExportReport::default(),
        };

        info!("Exporting to {}", self.scene_path().display());
        let result = session
            .build()
            .and_then(|()| session.write_document(&self.scene_path()));

        let Session { store, mut report, geometry_path, .. } = session;
        let closed = store.close();
        match (result, closed) {
            (Ok(()), Ok(())) => {}
            (Ok(()), Err(e)) => return Err(e),
            (Err(e), closed) => {
                if let Err(close_err) = closed {
                    warn!("Failed to close geometry store: {}", close_err);
                }
                return Err(e);
            }
        }

        report.scene_path = self.scene_path();
        report.geometry_path = geometry_path;
        report.elapsed = start.elapsed();
        info!("Export is done (took {} ms)", report.elapsed.as_millis());
        Ok(report)
    }
}

/// Where meshes go.
enum GeometryStore {
    Serialized(MeshArchive),
    Obj(ObjStore),
}

impl GeometryStore {
    fn path(&self) -> PathBuf {
        match self {
            Self::Serialized(archive) => archive.path().to_path_buf(),
            Self::Obj(store) => store.base_path().to_path_buf(),
        }
    }

    fn store(&mut self, name: &str, mesh: &PolygonMesh) -> Result<StoredMesh> {
        match self {
            Self::Serialized(archive) => Ok(StoredMesh::Serialized(archive.append_named(name, mesh)?)),
            Self::Obj(store) => Ok(StoredMesh::Obj(store.store(name, mesh)?)),
        }
    }

    /// Archive file name for shape nodes; empty for OBJ output.
    fn filename(&self) -> &str {
        match self {
            Self::Serialized(archive) => archive.filename(),
            Self::Obj(_) => "",
        }
    }

    fn close(self) -> Result<()> {
        match self {
            Self::Serialized(archive) => archive.close(),
            Self::Obj(_) => Ok(()),
        }
    }
}

enum StoredMesh {
    Serialized(MeshIndex),
    Obj(String),
}

struct Session<'a, S: ?Sized> {
    scene: &'a S,
    settings: &'a ExportSettings,
    integrator: Integrator,
    store: GeometryStore,
    geometry_path: PathBuf,
    document: Document,
    id_counter: u32,
    /// Instance definition to shape group id.
    id_map: HashMap<ObjectId, String>,
    /// Material index to bsdf id.
    material_ids: HashMap<usize, String>,
    material_names: MaterialNames,
    report: ExportReport,
}

impl<S: HostScene + ?Sized> Session<'_, S> {
    fn build(&mut self) -> Result<()> {
        self.document.push(builder::default_environment());
        self.document
            .push(builder::integrator_element(self.integrator, self.settings.path_length));

        for index in 0..self.scene.materials().len() {
            self.export_material(index);
        }

        let scene = self.scene;
        for definition in scene.instance_definitions() {
            self.export_definition(definition)?;
        }
        for instance in scene.instance_references() {
            self.export_instance(instance);
        }
        for object in scene.objects() {
            let shapes = self.export_object(object)?;
            for shape in shapes {
                self.document.push(shape);
            }
        }

        match scene.active_viewport() {
            Some(view) => {
                if let Some(sensor) = builder::sensor_element(view, self.integrator, self.settings) {
                    self.document.push(sensor);
                    self.report.sensor = true;
                }
            }
            None => warn!("No active viewport, not exporting a sensor"),
        }
        Ok(())
    }

    fn write_document(&mut self, path: &Path) -> Result<()> {
        self.document.check_references()?;
        self.document.save(path)?;
        debug!("Wrote scene document {}", path.display());
        Ok(())
    }

    fn next_id(&mut self, prefix: &str) -> String {
        let id = format!("{}{}", prefix, self.id_counter);
        self.id_counter += 1;
        id
    }

    fn export_material(&mut self, index: usize) {
        let scene = self.scene;
        let material = &scene.materials()[index];
        if material.use_count == 0 {
            debug!("Skipping unused material '{}'", material.name);
            return;
        }
        let kind = MaterialKind::classify(material);
        let id = self.material_names.unique_id(&material.name);
        debug!("Exporting material '{}' -> type = {}", id, kind.type_tag());

        self.document.push(builder::material_element(kind, &id));
        self.material_ids.insert(index, id);
        self.report.materials += 1;
    }

    fn export_definition(&mut self, definition: &InstanceDefinition) -> Result<()> {
        if !definition.in_use() {
            debug!("Skipping unused instance definition '{}'", definition.name);
            return Ok(());
        }
        debug!("Exporting instance definition '{}'", definition.name);

        let mut shapes = Vec::new();
        for object in &definition.objects {
            shapes.extend(self.export_object(object)?);
        }
        if shapes.is_empty() {
            debug!("Instance definition '{}' has no content", definition.name);
            return Ok(());
        }

        let id = self.next_id("group");
        let mut group = builder::shape_group(&id, &definition.name);
        for shape in shapes {
            group.push(shape);
        }
        self.document.push(group);
        self.id_map.insert(definition.id, id);
        self.report.groups += 1;
        Ok(())
    }

    fn export_instance(&mut self, instance: &InstanceReference) {
        let scene = self.scene;
        let definition_name = scene
            .find_definition(instance.definition)
            .map(|d| d.name.clone())
            .unwrap_or_default();

        let Some(group_id) = self.id_map.get(&instance.definition) else {
            warn!(
                "Instance '{}': no content found, perhaps the instance definition was empty?",
                instance.name
            );
            let label = if definition_name.is_empty() {
                format!("{:?}", instance.definition)
            } else {
                definition_name
            };
            self.report.warnings.push(Error::EmptyInstanceDefinition(label));
            return;
        };

        if !instance.name.is_empty() {
            debug!("Exporting instance reference '{}'", instance.name);
        }
        let element = builder::instance_element(&instance.name, &definition_name, group_id, &instance.transform);
        self.document.push(element);
        self.report.instances += 1;
    }

    /// Shape nodes for every render mesh of `object`.
    fn export_object(&mut self, object: &SceneObject) -> Result<Vec<Element>> {
        if !object.kind.has_render_mesh() {
            debug!("Not exporting object of type {:?}", object.kind);
            self.report.skipped_objects += 1;
            return Ok(Vec::new());
        }

        let scene = self.scene;
        let material = object
            .resolve_material(scene.layers())
            .and_then(|index| {
                let id = self.material_ids.get(&index)?;
                let emission = scene.materials().get(index)?.emission;
                Some((id.clone(), emission))
            });

        let mut shapes = Vec::with_capacity(object.meshes.len());
        for mesh in &object.meshes {
            debug!("Exporting mesh '{}'", object.name);
            let stored = self.store.store(&object.name, mesh)?;
            self.report.meshes += 1;

            let source = match &stored {
                StoredMesh::Serialized(index) => ShapeSource::Serialized {
                    filename: self.store.filename(),
                    index: *index,
                },
                StoredMesh::Obj(filename) => ShapeSource::Obj {
                    filename: filename.as_str(),
                },
            };
            let material = material
                .as_ref()
                .map(|(id, emission)| ShapeMaterial {
                    id: id.as_str(),
                    emission: *emission,
                });
            shapes.push(builder::shape_element(&object.name, source, material));
            self.report.shapes += 1;
        }
        Ok(shapes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Material, MemoryScene, ObjectKind};
    use crate::serialized::ArchiveReader;
    use crate::util::Vec3;
    use tempfile::tempdir;

    fn square() -> PolygonMesh {
        PolygonMesh::new(
            vec![Vec3::ZERO, Vec3::X, Vec3::new(1.0, 1.0, 0.0), Vec3::Y],
            &[vec![0, 1, 2, 3]],
        )
    }

    fn object(id: u64, name: &str) -> SceneObject {
        SceneObject {
            id: ObjectId(id),
            name: name.to_string(),
            meshes: vec![square()],
            ..Default::default()
        }
    }

    #[test]
    fn test_archive_filename() {
        let e = Exporter::new(ExportSettings::default(), "/tmp", "room.xml");
        assert_eq!(e.archive_filename(), "room.serialized");
        assert_eq!(e.scene_path(), PathBuf::from("/tmp/room.xml"));
    }

    #[test]
    fn test_unknown_integrator_creates_nothing() {
        let dir = tempdir().unwrap();
        let settings = ExportSettings { integrator: "photon".into(), ..Default::default() };
        let exporter = Exporter::new(settings, dir.path(), "scene.xml");
        let err = exporter.export(&MemoryScene::default()).unwrap_err();
        assert!(matches!(err, Error::UnknownIntegrator(_)));
        assert!(!dir.path().join("scene.serialized").exists());
        assert!(!dir.path().join("scene.xml").exists());
    }

    #[test]
    fn test_report_counts() {
        let dir = tempdir().unwrap();
        let mut scene = MemoryScene::default();
        scene.materials.push(Material { name: "Red".into(), ..Default::default() });
        scene.objects.push(object(1, "a"));
        scene.objects.push(SceneObject { kind: ObjectKind::Curve, ..object(2, "curve") });

        let report = Exporter::new(ExportSettings::default(), dir.path(), "scene.xml")
            .export(&scene)
            .unwrap();
        assert_eq!(report.materials, 1);
        assert_eq!(report.shapes, 1);
        assert_eq!(report.meshes, 1);
        assert_eq!(report.skipped_objects, 1);
        assert!(!report.sensor);
        assert_eq!(report.geometry_path, dir.path().join("scene.serialized"));

        let reader = ArchiveReader::open(&report.geometry_path).unwrap();
        assert_eq!(reader.mesh_count(), 1);
        let mesh = reader.read_mesh(0).unwrap();
        assert_eq!(mesh.name, "a");
        assert_eq!(mesh.triangles, vec![[0, 1, 2], [0, 2, 3]]);
    }

    #[test]
    fn test_group_ids_skip_empty_definitions() {
        let dir = tempdir().unwrap();
        let mut scene = MemoryScene::default();
        scene.instance_definitions.push(InstanceDefinition {
            id: ObjectId(10),
            name: "Empty".into(),
            use_count: 1,
            objects: vec![SceneObject { kind: ObjectKind::Curve, ..object(11, "c") }],
        });
        scene.instance_definitions.push(InstanceDefinition {
            id: ObjectId(20),
            name: "Full".into(),
            use_count: 1,
            objects: vec![object(21, "part")],
        });
        scene.instance_references.push(InstanceReference {
            name: "e".into(),
            definition: ObjectId(10),
            ..Default::default()
        });
        scene.instance_references.push(InstanceReference {
            name: "f".into(),
            definition: ObjectId(20),
            ..Default::default()
        });

        let report = Exporter::new(ExportSettings::default(), dir.path(), "scene.xml")
            .export(&scene)
            .unwrap();
        assert_eq!(report.groups, 1);
        assert_eq!(report.instances, 1);
        assert_eq!(report.skipped_instances(), 1);
        assert!(report.warnings.iter().all(|w| w.is_recoverable()));

        let xml = std::fs::read_to_string(dir.path().join("scene.xml")).unwrap();
        assert!(xml.contains("id=\"group0\""));
        assert!(xml.contains("<ref id=\"group0\"/>"));
    }

    #[test]
    fn test_obj_output() {
        let dir = tempdir().unwrap();
        let mut scene = MemoryScene::default();
        scene.objects.push(object(1, "floor"));
        let settings = ExportSettings { write_serialized: false, ..Default::default() };

        let report = Exporter::new(settings, dir.path(), "scene.xml").export(&scene).unwrap();
        assert_eq!(report.meshes, 1);
        assert!(dir.path().join("floor.obj").exists());
        assert!(!dir.path().join("scene.serialized").exists());

        let xml = std::fs::read_to_string(dir.path().join("scene.xml")).unwrap();
        assert!(xml.contains("<shape type=\"obj\">"));
        assert!(xml.contains("<string name=\"filename\" value=\"floor.obj\"/>"));
    }
}
