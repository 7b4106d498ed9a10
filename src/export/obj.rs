//! Per-mesh Wavefront OBJ output, used when the binary archive is disabled.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::serialized::{collect_triangles, GeometrySource};
use crate::util::Result;

/// Writes each stored mesh to its own `<name>.obj` file.
pub struct ObjStore {
    base_path: PathBuf,
    mesh_count: usize,
    filenames: HashSet<String>,
}

impl ObjStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            mesh_count: 0,
            filenames: HashSet::new(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Number of files written so far.
    pub fn mesh_count(&self) -> usize {
        self.mesh_count
    }

    /// Write one mesh and return the file name (relative to the base path).
    pub fn store<G: GeometrySource + ?Sized>(&mut self, name: &str, mesh: &G) -> Result<String> {
        let triangles = collect_triangles(mesh, name)?;
        let name = if name.is_empty() {
            format!("mesh{}", self.mesh_count)
        } else {
            sanitize(name)
        };
        let filename = self.claim_filename(&name);

        let vertex_count = mesh.vertex_count();
        tracing::debug!(
            "ObjStore[{}]: saving {} ({} vertices, {} triangles)",
            self.mesh_count,
            filename,
            vertex_count,
            triangles.len()
        );

        let mut w = BufWriter::new(File::create(self.base_path.join(&filename))?);
        writeln!(w, "# Object {}", name)?;
        writeln!(w, "# Generated by mts-export.")?;
        writeln!(w, "# Vertices: {}", vertex_count)?;
        writeln!(w, "# Faces: {}", triangles.len())?;

        for i in 0..vertex_count {
            let p = mesh.position(i);
            writeln!(w, "v {} {} {}", p.x, p.y, p.z)?;
        }
        let normals = mesh.has_normals();
        if normals {
            for i in 0..vertex_count {
                let n = mesh.normal(i);
                writeln!(w, "vn {} {} {}", n.x, n.y, n.z)?;
            }
        }
        let texcoords = mesh.has_texcoords();
        if texcoords {
            for i in 0..vertex_count {
                let uv = mesh.texcoord(i);
                writeln!(w, "vt {} {}", uv.x, uv.y)?;
            }
        }

        for &tri in &triangles {
            let [a, b, c] = tri.map(|i| face_vertex(i + 1, texcoords, normals));
            writeln!(w, "f {} {} {}", a, b, c)?;
        }
        w.flush()?;

        self.mesh_count += 1;
        Ok(filename)
    }

    /// `<name>.obj`, suffixed with `_N` when an earlier mesh took the name.
    fn claim_filename(&mut self, name: &str) -> String {
        let mut filename = format!("{}.obj", name);
        let mut counter = 1;
        while self.filenames.contains(&filename) {
            filename = format!("{}_{}.obj", name, counter);
            counter += 1;
        }
        self.filenames.insert(filename.clone());
        filename
    }
}

/// One 1-based face corner, referencing only the attributes that exist.
fn face_vertex(i: u32, texcoords: bool, normals: bool) -> String {
    match (texcoords, normals) {
        (true, true) => format!("{0}/{0}/{0}", i),
        (true, false) => format!("{0}/{0}", i),
        (false, true) => format!("{0}//{0}", i),
        (false, false) => i.to_string(),
    }
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}
