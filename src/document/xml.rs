//! Indented XML rendering of a scene document.

use std::io::{self, Write};

use super::property::{transform_element, Element, PropertyNode, PropertyValue, Srgb};
use super::Document;
use crate::util::{to_row_major, DMat4};

const INDENT: &str = "    ";

/// Render a float in invariant, shortest round-trip form (`5`, `0.25`).
pub fn format_float(v: f64) -> String {
    format!("{}", v)
}

/// Row-major, comma separated matrix entries.
pub fn format_matrix(m: &DMat4) -> String {
    to_row_major(m)
        .iter()
        .map(|v| format_float(*v))
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_color(c: &Srgb) -> String {
    let [r, g, b] = c.0;
    format!("{}, {}, {}", r, g, b)
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

fn indent<W: Write + ?Sized>(w: &mut W, depth: usize) -> io::Result<()> {
    for _ in 0..depth {
        w.write_all(INDENT.as_bytes())?;
    }
    Ok(())
}

fn write_leaf<W: Write + ?Sized>(w: &mut W, tag: &str, name: &str, value: &str, depth: usize) -> io::Result<()> {
    indent(w, depth)?;
    writeln!(w, "<{} name=\"{}\" value=\"{}\"/>", tag, escape(name), escape(value))
}

fn write_node<W: Write + ?Sized>(w: &mut W, node: &PropertyNode, depth: usize) -> io::Result<()> {
    match node {
        PropertyNode::Property { name, value } => {
            let tag = value.tag();
            match value {
                PropertyValue::Transform(m) => write_element(w, &transform_element(name, m), depth),
                PropertyValue::String(s) => write_leaf(w, tag, name, s, depth),
                PropertyValue::Integer(i) => write_leaf(w, tag, name, &i.to_string(), depth),
                PropertyValue::Float(f) => write_leaf(w, tag, name, &format_float(*f), depth),
                PropertyValue::Boolean(b) => write_leaf(w, tag, name, &b.to_string(), depth),
                PropertyValue::Color(c) => write_leaf(w, tag, name, &format_color(c), depth),
            }
        }
        PropertyNode::Reference(id) => {
            indent(w, depth)?;
            writeln!(w, "<ref id=\"{}\"/>", escape(id))
        }
        PropertyNode::Comment(text) => {
            indent(w, depth)?;
            writeln!(w, "<!--{}-->", comment_text(text))
        }
        PropertyNode::Element(e) => write_element(w, e, depth),
    }
}

/// Comment body with no `--` run and no trailing `-`.
fn comment_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c == '-' && out.ends_with('-') {
            out.push(' ');
        }
        out.push(c);
    }
    if out.ends_with('-') {
        out.push(' ');
    }
    out
}

fn write_element<W: Write + ?Sized>(w: &mut W, e: &Element, depth: usize) -> io::Result<()> {
    indent(w, depth)?;
    write!(w, "<{}", e.kind)?;
    for (k, v) in &e.attributes {
        write!(w, " {}=\"{}\"", k, escape(v))?;
    }
    if e.children.is_empty() {
        return writeln!(w, "/>");
    }
    writeln!(w, ">")?;
    for child in &e.children {
        write_node(w, child, depth + 1)?;
    }
    indent(w, depth)?;
    writeln!(w, "</{}>", e.kind)
}

/// Write the XML declaration followed by the document tree.
pub fn write_document<W: Write + ?Sized>(w: &mut W, doc: &Document) -> io::Result<()> {
    writeln!(w, "<?xml version=\"1.0\"?>")?;
    write_element(w, doc.root(), 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::property::{property, reference};
    use crate::util::DVec3;

    fn render(e: &Element) -> String {
        let mut out = Vec::new();
        write_element(&mut out, e, 0).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(5.0), "5");
        assert_eq!(format_float(0.25), "0.25");
        assert_eq!(format_float(-10.0), "-10");
    }

    #[test]
    fn test_format_matrix_row_major() {
        let m = DMat4::from_translation(DVec3::new(1.0, 2.0, 3.0));
        assert_eq!(
            format_matrix(&m),
            "1, 0, 0, 1, 0, 1, 0, 2, 0, 0, 1, 3, 0, 0, 0, 1"
        );
    }

    #[test]
    fn test_leaf_properties() {
        let e = Element::typed("sensor", "perspective")
            .with(property("fovAxis", "diagonal"))
            .with(property("fov", 45.0))
            .with(property("width", 640))
            .with(property("extend", true))
            .with(property("radiance", Srgb([1.0, 0.5, 0.0])))
            .with(reference("mat"));
        let xml = render(&e);
        assert!(xml.starts_with("<sensor type=\"perspective\">\n"));
        assert!(xml.contains("    <string name=\"fovAxis\" value=\"diagonal\"/>\n"));
        assert!(xml.contains("    <float name=\"fov\" value=\"45\"/>\n"));
        assert!(xml.contains("    <integer name=\"width\" value=\"640\"/>\n"));
        assert!(xml.contains("    <boolean name=\"extend\" value=\"true\"/>\n"));
        assert!(xml.contains("    <srgb name=\"radiance\" value=\"1, 0.5, 0\"/>\n"));
        assert!(xml.contains("    <ref id=\"mat\"/>\n"));
        assert!(xml.ends_with("</sensor>\n"));
    }

    #[test]
    fn test_transform_nested() {
        let e = Element::typed("shape", "instance").with(property("toWorld", DMat4::IDENTITY));
        let xml = render(&e);
        assert!(xml.contains("    <transform name=\"toWorld\">\n"));
        assert!(xml.contains(
            "        <matrix value=\"1, 0, 0, 0, 0, 1, 0, 0, 0, 0, 1, 0, 0, 0, 0, 1\"/>\n"
        ));
    }

    #[test]
    fn test_escaping_and_comments() {
        let e = Element::typed("bsdf", "diffuse")
            .attr("id", "a<b & \"c\"")
            .with(PropertyNode::Comment(" object 'x--y' ".into()));
        let xml = render(&e);
        assert!(xml.contains("id=\"a&lt;b &amp; &quot;c&quot;\""));
        assert!(xml.contains("<!-- object 'x- -y' -->"));
    }

    #[test]
    fn test_comment_dash_runs() {
        assert_eq!(comment_text("a---b"), "a- - -b");
        assert_eq!(comment_text("x-"), "x- ");
        assert_eq!(comment_text(" plain-name "), " plain-name ");

        let e = Element::typed("shape", "serialized")
            .with(PropertyNode::Comment(" Object 'a---b' ".into()))
            .with(PropertyNode::Comment("trailing-".into()));
        let xml = render(&e);
        assert!(xml.contains("<!-- Object 'a- - -b' -->"));
        let doc = roxmltree::Document::parse(&xml).unwrap();
        let comments: Vec<&str> = doc
            .descendants()
            .filter(|n| n.is_comment())
            .filter_map(|n| n.text())
            .collect();
        assert_eq!(comments, vec![" Object 'a- - -b' ", "trailing- "]);
    }

    #[test]
    fn test_self_closing() {
        assert_eq!(render(&Element::typed("bsdf", "diffuse")), "<bsdf type=\"diffuse\"/>\n");
    }
}
