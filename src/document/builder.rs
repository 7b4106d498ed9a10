//! Scene entities to document nodes.
//!
//! Every function here is pure: it builds an [`Element`] and leaves id
//! allocation and cross-referencing to the export session.

use std::collections::HashSet;

use super::property::{property, reference, transform_element, Element, PropertyNode, Srgb};
use crate::export::{ExportSettings, Integrator};
use crate::scene::{Material, Projection, Viewport};
use crate::util::{brightness, mirror, DMat4, DVec3};

/// Id given to materials without a display name.
pub const UNNAMED_MATERIAL: &str = "Unnamed material";

/// Comment naming a host object inside a shape.
pub fn object_comment(name: &str) -> Option<PropertyNode> {
    (!name.is_empty()).then(|| PropertyNode::Comment(format!(" Object '{}' ", name)))
}

/// Sun and sky environment rotated to a Z-up world.
pub fn default_environment() -> Element {
    let to_world = Element::new("transform").attr("name", "toWorld").with(
        Element::new("rotate")
            .attr("x", "1")
            .attr("angle", "90"),
    );
    Element::typed("emitter", "sunsky")
        .with(to_world)
        .with(property("extend", true))
        .with(property("sunRadiusScale", 10.0))
}

pub fn integrator_element(integrator: Integrator, path_length: u32) -> Element {
    let mut e = Element::typed("integrator", integrator.type_tag());
    if integrator.has_max_depth() {
        e.push(property("maxDepth", path_length));
    }
    e
}

/// BSDF family chosen for a host material.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MaterialKind {
    Diffuse,
    Dielectric,
    Conductor,
}

impl MaterialKind {
    pub fn classify(material: &Material) -> Self {
        if material.transparency == 1.0 {
            Self::Dielectric
        } else if material.shine > 0.0 {
            Self::Conductor
        } else {
            Self::Diffuse
        }
    }

    pub fn type_tag(self) -> &'static str {
        match self {
            Self::Diffuse => "diffuse",
            Self::Dielectric => "dielectric",
            Self::Conductor => "conductor",
        }
    }
}

/// Set of material ids handed out so far in one document.
#[derive(Debug, Default)]
pub struct MaterialNames {
    used: HashSet<String>,
}

impl MaterialNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim an id for `name`: the name itself, else `name_1`, `name_2`, ...
    pub fn unique_id(&mut self, name: &str) -> String {
        let base = if name.is_empty() { UNNAMED_MATERIAL } else { name };
        let mut id = base.to_string();
        let mut counter = 1;
        while self.used.contains(&id) {
            id = format!("{}_{}", base, counter);
            counter += 1;
        }
        self.used.insert(id.clone());
        id
    }

    pub fn len(&self) -> usize {
        self.used.len()
    }

    pub fn is_empty(&self) -> bool {
        self.used.is_empty()
    }
}

pub fn material_element(kind: MaterialKind, id: &str) -> Element {
    Element::typed("bsdf", kind.type_tag()).attr("id", id)
}

/// Camera-to-world transform in the renderer's camera convention.
pub fn sensor_to_world(camera_to_world: &DMat4) -> DMat4 {
    *camera_to_world * mirror(DVec3::new(0.0, 0.0, -1.0)) * mirror(DVec3::new(-1.0, 0.0, 0.0))
}

/// Sensor for a viewport, or `None` for projections other than
/// perspective and parallel.
pub fn sensor_element(view: &Viewport, integrator: Integrator, settings: &ExportSettings) -> Option<Element> {
    let ty = match view.projection {
        Projection::Perspective => "perspective",
        Projection::Parallel => "orthographic",
        Projection::Other => {
            tracing::warn!("Camera type not supported, ignoring");
            return None;
        }
    };

    let to_world = sensor_to_world(&view.camera_to_world);
    let frustum = &view.frustum;
    let mut sensor = Element::typed("sensor", ty);

    if view.projection == Projection::Perspective {
        let focus_distance = view.location.distance(view.target);
        sensor.push(property("fovAxis", "diagonal"));
        sensor.push(property("fov", 2.0 * view.half_diagonal_angle * 180.0 / std::f64::consts::PI));
        sensor.push(property("focusDistance", focus_distance));
        sensor.push(property("toWorld", to_world));
    } else {
        let scale = (frustum.right - frustum.left) / 2.0;
        let mut transform = transform_element("toWorld", &to_world);
        transform.prepend(
            Element::new("scale")
                .attr("x", super::xml::format_float(scale))
                .attr("y", super::xml::format_float(scale)),
        );
        sensor.push(transform);
    }

    // Extra room for navigating in an interactive viewer.
    sensor.push(property("nearClip", frustum.near / 10.0));
    sensor.push(property("farClip", frustum.far * 10.0));

    sensor.push(
        Element::typed("film", "hdrfilm")
            .with(property("width", settings.xres))
            .with(property("height", settings.yres)),
    );

    let sampler = if integrator.requires_independent_sampler() {
        "independent"
    } else {
        "ldsampler"
    };
    sensor.push(Element::typed("sampler", sampler).with(property("sampleCount", settings.samples_per_pixel)));

    Some(sensor)
}

/// Where a shape's geometry lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShapeSource<'a> {
    /// Block `index` of a serialized archive.
    Serialized { filename: &'a str, index: u32 },
    Obj { filename: &'a str },
}

/// Exported material attached to a shape.
#[derive(Clone, Copy, Debug)]
pub struct ShapeMaterial<'a> {
    pub id: &'a str,
    pub emission: [f32; 3],
}

pub fn area_emitter(radiance: Srgb) -> Element {
    Element::typed("emitter", "area").with(property("radiance", radiance))
}

/// One shape node for one render mesh of `object_name`.
pub fn shape_element(object_name: &str, source: ShapeSource<'_>, material: Option<ShapeMaterial<'_>>) -> Element {
    let mut shape = match source {
        ShapeSource::Serialized { filename, index } => {
            let mut e = Element::typed("shape", "serialized");
            e.children.extend(object_comment(object_name));
            e.with(property("filename", filename))
                .with(property("shapeIndex", index))
        }
        ShapeSource::Obj { filename } => {
            let mut e = Element::typed("shape", "obj");
            e.children.extend(object_comment(object_name));
            e.with(property("filename", filename))
        }
    };

    if let Some(material) = material {
        shape.push(reference(material.id));
        if brightness(material.emission) > 0.0 {
            shape.push(area_emitter(Srgb(material.emission)));
        }
    }
    shape
}

/// Empty shape group; shapes are pushed into it by the caller.
pub fn shape_group(id: &str, name: &str) -> Element {
    let mut group = Element::typed("shape", "shapegroup").attr("id", id);
    group.children.extend(object_comment(name));
    group
}

pub fn instance_element(name: &str, definition_name: &str, group_id: &str, transform: &DMat4) -> Element {
    let mut instance = Element::typed("shape", "instance");
    instance.children.extend(object_comment(name));
    if !definition_name.is_empty() {
        instance.push(PropertyNode::Comment(format!(" (references '{}') ", definition_name)));
    }
    instance
        .with(reference(group_id))
        .with(property("toWorld", *transform))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::PropertyValue;
    use crate::scene::Frustum;

    fn values(e: &Element) -> Vec<(&str, &PropertyValue)> {
        e.children
            .iter()
            .filter_map(|c| match c {
                PropertyNode::Property { name, value } => Some((name.as_str(), value)),
                _ => None,
            })
            .collect()
    }

    fn find<'a>(e: &'a Element, key: &str) -> Option<&'a PropertyValue> {
        values(e).into_iter().find(|(n, _)| *n == key).map(|(_, v)| v)
    }

    #[test]
    fn test_default_environment() {
        let e = default_environment();
        assert_eq!(e.get_attr("type"), Some("sunsky"));
        let t = e.elements("transform").next().unwrap();
        let rotate = t.elements("rotate").next().unwrap();
        assert_eq!(rotate.get_attr("x"), Some("1"));
        assert_eq!(rotate.get_attr("angle"), Some("90"));
        assert_eq!(find(&e, "extend"), Some(&PropertyValue::Boolean(true)));
        assert_eq!(find(&e, "sunRadiusScale"), Some(&PropertyValue::Float(10.0)));
    }

    #[test]
    fn test_integrator_max_depth() {
        let e = integrator_element(Integrator::Direct, 5);
        assert_eq!(e.get_attr("type"), Some("direct"));
        assert!(e.children.is_empty());

        let e = integrator_element(Integrator::KelemenMLT, 5);
        assert_eq!(e.get_attr("type"), Some("pssmlt"));
        assert_eq!(find(&e, "maxDepth"), Some(&PropertyValue::Integer(5)));
    }

    #[test]
    fn test_material_classification() {
        let glass = Material { transparency: 1.0, shine: 1.0, ..Default::default() };
        let metal = Material { shine: 0.5, ..Default::default() };
        let almost = Material { transparency: 0.99, ..Default::default() };
        assert_eq!(MaterialKind::classify(&glass), MaterialKind::Dielectric);
        assert_eq!(MaterialKind::classify(&metal), MaterialKind::Conductor);
        assert_eq!(MaterialKind::classify(&almost), MaterialKind::Diffuse);
    }

    #[test]
    fn test_unique_material_ids() {
        let mut names = MaterialNames::new();
        assert_eq!(names.unique_id("Glass"), "Glass");
        assert_eq!(names.unique_id("Glass"), "Glass_1");
        assert_eq!(names.unique_id("Glass"), "Glass_2");
        assert_eq!(names.unique_id(""), UNNAMED_MATERIAL);
        assert_eq!(names.unique_id(""), "Unnamed material_1");
        assert_eq!(names.len(), 5);
    }

    #[test]
    fn test_unique_id_skips_taken_suffix() {
        let mut names = MaterialNames::new();
        names.unique_id("Glass_1");
        names.unique_id("Glass");
        assert_eq!(names.unique_id("Glass"), "Glass_2");
    }

    #[test]
    fn test_perspective_sensor() {
        let view = Viewport {
            location: DVec3::new(0.0, 0.0, 10.0),
            target: DVec3::ZERO,
            half_diagonal_angle: std::f64::consts::FRAC_PI_8,
            frustum: Frustum { left: -1.0, right: 1.0, bottom: -1.0, top: 1.0, near: 1.0, far: 100.0 },
            ..Default::default()
        };
        let settings = ExportSettings::default();
        let e = sensor_element(&view, Integrator::Direct, &settings).unwrap();
        assert_eq!(e.get_attr("type"), Some("perspective"));
        assert_eq!(find(&e, "fovAxis"), Some(&PropertyValue::String("diagonal".into())));
        match find(&e, "fov") {
            Some(PropertyValue::Float(fov)) => assert!((fov - 45.0).abs() < 1e-9),
            other => panic!("unexpected fov {:?}", other),
        }
        assert_eq!(find(&e, "focusDistance"), Some(&PropertyValue::Float(10.0)));
        assert_eq!(find(&e, "nearClip"), Some(&PropertyValue::Float(0.1)));
        assert_eq!(find(&e, "farClip"), Some(&PropertyValue::Float(1000.0)));

        let film = e.elements("film").next().unwrap();
        assert_eq!(find(film, "width"), Some(&PropertyValue::Integer(1024)));
        assert_eq!(find(film, "height"), Some(&PropertyValue::Integer(768)));
        let sampler = e.elements("sampler").next().unwrap();
        assert_eq!(sampler.get_attr("type"), Some("ldsampler"));
        assert_eq!(find(sampler, "sampleCount"), Some(&PropertyValue::Integer(4)));
    }

    #[test]
    fn test_orthographic_scale() {
        let view = Viewport {
            projection: Projection::Parallel,
            frustum: Frustum { left: -5.0, right: 5.0, bottom: -3.0, top: 3.0, near: 1.0, far: 10.0 },
            ..Default::default()
        };
        let e = sensor_element(&view, Integrator::VeachMLT, &ExportSettings::default()).unwrap();
        assert_eq!(e.get_attr("type"), Some("orthographic"));
        assert!(find(&e, "fov").is_none());

        let t = e.elements("transform").next().unwrap();
        assert_eq!(t.get_attr("name"), Some("toWorld"));
        match t.children.first() {
            Some(PropertyNode::Element(scale)) => {
                assert_eq!(scale.kind, "scale");
                assert_eq!(scale.get_attr("x"), Some("5"));
                assert_eq!(scale.get_attr("y"), Some("5"));
            }
            other => panic!("expected scale first, got {:?}", other),
        }
        assert_eq!(t.elements("matrix").count(), 1);

        let sampler = e.elements("sampler").next().unwrap();
        assert_eq!(sampler.get_attr("type"), Some("independent"));
    }

    #[test]
    fn test_other_projection_skipped() {
        let view = Viewport { projection: Projection::Other, ..Default::default() };
        assert!(sensor_element(&view, Integrator::Direct, &ExportSettings::default()).is_none());
    }

    #[test]
    fn test_sensor_flip() {
        // Both mirrors together turn the camera half a turn around Y.
        let m = sensor_to_world(&DMat4::IDENTITY);
        let p = m.transform_point3(DVec3::new(1.0, 2.0, 3.0));
        assert!((p - DVec3::new(-1.0, 2.0, -3.0)).length() < 1e-12);
    }

    #[test]
    fn test_shape_with_emitter() {
        let material = ShapeMaterial { id: "Lamp", emission: [1.0, 0.5, 0.0] };
        let e = shape_element(
            "bulb",
            ShapeSource::Serialized { filename: "scene.serialized", index: 3 },
            Some(material),
        );
        assert_eq!(e.get_attr("type"), Some("serialized"));
        assert!(matches!(&e.children[0], PropertyNode::Comment(c) if c == " Object 'bulb' "));
        assert_eq!(find(&e, "filename"), Some(&PropertyValue::String("scene.serialized".into())));
        assert_eq!(find(&e, "shapeIndex"), Some(&PropertyValue::Integer(3)));
        assert!(e.children.contains(&reference("Lamp")));
        let emitter = e.elements("emitter").next().unwrap();
        assert_eq!(find(emitter, "radiance"), Some(&PropertyValue::Color(Srgb([1.0, 0.5, 0.0]))));
    }

    #[test]
    fn test_shape_without_emission() {
        let material = ShapeMaterial { id: "Wall", emission: [0.0; 3] };
        let e = shape_element("", ShapeSource::Obj { filename: "wall.obj" }, Some(material));
        assert_eq!(e.get_attr("type"), Some("obj"));
        assert!(!e.children.iter().any(|c| matches!(c, PropertyNode::Comment(_))));
        assert_eq!(e.elements("emitter").count(), 0);
        assert!(e.children.contains(&reference("Wall")));
    }

    #[test]
    fn test_instance_element() {
        let t = DMat4::from_translation(DVec3::new(1.0, 0.0, 0.0));
        let e = instance_element("left", "Chair", "group0", &t);
        assert_eq!(e.get_attr("type"), Some("instance"));
        assert!(e.children.contains(&PropertyNode::Comment(" (references 'Chair') ".into())));
        assert!(e.children.contains(&reference("group0")));
        assert_eq!(find(&e, "toWorld"), Some(&PropertyValue::Transform(t)));
    }
}
