//! Scene description document.
//!
//! A document is a tree of [`PropertyNode`]s under a `<scene version="..">`
//! root. [`builder`] maps scene entities to nodes, [`xml`] renders the tree.

pub mod builder;
mod property;
pub mod xml;

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub use property::{property, reference, transform_element, Element, PropertyNode, PropertyValue, Srgb};

use crate::util::{Error, Result};

/// Scene format version written on the root element.
pub const SCENE_VERSION: &str = "0.4.0";

/// A scene document under construction.
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    root: Element,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Empty document with a versioned `scene` root.
    pub fn new() -> Self {
        Self {
            root: Element::new("scene").attr("version", SCENE_VERSION),
        }
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Element {
        &mut self.root
    }

    /// Append a top-level node.
    pub fn push(&mut self, node: impl Into<PropertyNode>) {
        self.root.push(node);
    }

    /// Check that every reference names an id declared earlier in document order.
    pub fn check_references(&self) -> Result<()> {
        fn visit<'a>(e: &'a Element, declared: &mut HashSet<&'a str>) -> Result<()> {
            if let Some(id) = e.id() {
                declared.insert(id);
            }
            for child in &e.children {
                match child {
                    PropertyNode::Reference(id) if !declared.contains(id.as_str()) => {
                        return Err(Error::UnresolvedReference(id.clone()));
                    }
                    PropertyNode::Element(inner) => visit(inner, declared)?,
                    _ => {}
                }
            }
            Ok(())
        }

        visit(&self.root, &mut HashSet::new())
    }

    /// Render the document to a string.
    pub fn to_xml_string(&self) -> String {
        let mut out = Vec::new();
        // Writing into a Vec cannot fail.
        let _ = xml::write_document(&mut out, self);
        String::from_utf8_lossy(&out).into_owned()
    }

    /// Write the document to `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut w = BufWriter::new(File::create(path.as_ref())?);
        xml::write_document(&mut w, self)?;
        w.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root() {
        let doc = Document::new();
        assert_eq!(
            doc.to_xml_string(),
            "<?xml version=\"1.0\"?>\n<scene version=\"0.4.0\"/>\n"
        );
    }

    #[test]
    fn test_backward_references_resolve() {
        let mut doc = Document::new();
        doc.push(Element::typed("bsdf", "diffuse").attr("id", "white"));
        doc.push(Element::typed("shape", "serialized").with(reference("white")));
        assert!(doc.check_references().is_ok());
    }

    #[test]
    fn test_forward_reference_rejected() {
        let mut doc = Document::new();
        doc.push(Element::typed("shape", "instance").with(reference("group0")));
        doc.push(Element::typed("shape", "shapegroup").attr("id", "group0"));
        assert!(matches!(
            doc.check_references(),
            Err(Error::UnresolvedReference(id)) if id == "group0"
        ));
    }
}
