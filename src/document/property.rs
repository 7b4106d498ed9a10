//! Typed property nodes of a scene document.

use crate::util::DMat4;

/// RGB color with components in `0..=1`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Srgb(pub [f32; 3]);

/// Value carried by a property leaf.
///
/// The variant picks the element tag; there is no untyped fallback.
#[derive(Clone, Debug, PartialEq)]
pub enum PropertyValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Transform(DMat4),
    Color(Srgb),
}

impl PropertyValue {
    /// Element tag used when the property is rendered.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::Boolean(_) => "boolean",
            Self::Transform(_) => "transform",
            Self::Color(_) => "srgb",
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<i32> for PropertyValue {
    fn from(v: i32) -> Self {
        Self::Integer(v as i64)
    }
}

impl From<u32> for PropertyValue {
    fn from(v: u32) -> Self {
        Self::Integer(v as i64)
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<f32> for PropertyValue {
    fn from(v: f32) -> Self {
        Self::Float(v as f64)
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<DMat4> for PropertyValue {
    fn from(v: DMat4) -> Self {
        Self::Transform(v)
    }
}

impl From<Srgb> for PropertyValue {
    fn from(v: Srgb) -> Self {
        Self::Color(v)
    }
}

/// One node of the document tree.
#[derive(Clone, Debug, PartialEq)]
pub enum PropertyNode {
    /// Named typed leaf (`<float name=".." value=".."/>` and friends).
    Property { name: String, value: PropertyValue },
    /// Reference to a previously declared id.
    Reference(String),
    Comment(String),
    Element(Element),
}

/// Build a named property node.
pub fn property(name: &str, value: impl Into<PropertyValue>) -> PropertyNode {
    PropertyNode::Property {
        name: name.to_string(),
        value: value.into(),
    }
}

/// Build a reference node.
pub fn reference(id: &str) -> PropertyNode {
    PropertyNode::Reference(id.to_string())
}

impl From<Element> for PropertyNode {
    fn from(e: Element) -> Self {
        Self::Element(e)
    }
}

/// Container node: a kind (the element name), ordered attributes and children.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Element {
    pub kind: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<PropertyNode>,
}

impl Element {
    pub fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            ..Default::default()
        }
    }

    /// Element with a `type` attribute, the usual plugin form.
    pub fn typed(kind: &str, ty: &str) -> Self {
        Self::new(kind).attr("type", ty)
    }

    /// Builder-style attribute setter.
    pub fn attr(mut self, key: &str, value: impl ToString) -> Self {
        self.set_attr(key, value);
        self
    }

    /// Set an attribute, replacing an existing one with the same key.
    pub fn set_attr(&mut self, key: &str, value: impl ToString) {
        let value = value.to_string();
        match self.attributes.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((key.to_string(), value)),
        }
    }

    pub fn get_attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Declared id, if any.
    pub fn id(&self) -> Option<&str> {
        self.get_attr("id")
    }

    pub fn push(&mut self, node: impl Into<PropertyNode>) {
        self.children.push(node.into());
    }

    pub fn with(mut self, node: impl Into<PropertyNode>) -> Self {
        self.push(node);
        self
    }

    pub fn prepend(&mut self, node: impl Into<PropertyNode>) {
        self.children.insert(0, node.into());
    }

    /// Whether the element carries anything besides comments.
    pub fn has_content(&self) -> bool {
        self.children
            .iter()
            .any(|c| !matches!(c, PropertyNode::Comment(_)))
    }

    /// Direct child elements of the given kind.
    pub fn elements<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter_map(move |c| match c {
            PropertyNode::Element(e) if e.kind == kind => Some(e),
            _ => None,
        })
    }
}

/// Expand a transform leaf into its element form
/// (`<transform name=".."><matrix value=".."/></transform>`).
///
/// Used when extra operations (such as a `scale`) have to precede the matrix.
pub fn transform_element(name: &str, m: &DMat4) -> Element {
    Element::new("transform")
        .attr("name", name)
        .with(Element::new("matrix").attr("value", super::xml::format_matrix(m)))
}
