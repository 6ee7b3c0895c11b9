//! OBJ and MTL parsing.

use std::io::BufRead;

use glam::{Vec2, Vec3};
use tracing::debug;

use super::DEFAULT_GROUP;
use crate::error::{CodecResult, IoContext};
use crate::material::{Material, MaterialLibrary, NULL_TEXTURE};
use crate::model::{Corner, ObjGroup, ObjMesh, ObjRun, ObjTriangle};
use crate::naming::change_extension;

/// Call `visit` with every line of `reader`, decoded lossily and without its
/// line terminator.
pub(crate) fn for_each_line<R: BufRead>(
    mut reader: R,
    what: &str,
    mut visit: impl FnMut(&str) -> CodecResult<()>,
) -> CodecResult<()> {
    let mut buf = Vec::new();
    for number in 1.. {
        buf.clear();
        let read = reader
            .read_until(b'\n', &mut buf)
            .reading(|| format!("line {number} of the {what}"))?;
        if read == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buf);
        visit(line.trim_end_matches(['\n', '\r']))?;
    }
    Ok(())
}

/// Split a line into its directive keyword and the remaining text.
fn directive(line: &str) -> (&str, &str) {
    let line = line.trim_start();
    match line.split_once(|c: char| c.is_ascii_whitespace()) {
        Some((keyword, rest)) => (keyword, rest.trim()),
        None => (line, ""),
    }
}

fn floats<const N: usize>(text: &str) -> Option<[f32; N]> {
    let mut values = [0.0; N];
    let mut tokens = text.split_ascii_whitespace();
    for value in &mut values {
        *value = tokens.next()?.parse().ok()?;
    }
    Some(values)
}

/// Resolve a possibly relative OBJ index against the current list length.
///
/// Zero stays zero, meaning "absent".
fn absolute_index(value: i32, len: usize) -> i32 {
    if value >= 0 {
        return value;
    }
    i32::try_from(len as i64 + 1 + i64::from(value)).unwrap_or(0)
}

/// Accumulates groups while an OBJ file is read.
struct ObjBuilder {
    mesh: ObjMesh,
    current: Option<usize>,
    run: ObjRun,
}

impl ObjBuilder {
    fn new() -> Self {
        Self {
            mesh: ObjMesh::default(),
            current: None,
            run: ObjRun::default(),
        }
    }

    fn corner(&self, text: &str) -> Option<Corner> {
        let mut parts = text.split('/');
        let mut component = |len: usize| -> Option<i32> {
            match parts.next() {
                None | Some("") => Some(0),
                Some(value) => value.parse().ok().map(|v| absolute_index(v, len)),
            }
        };
        Some(Corner {
            position: component(self.mesh.positions.len())?,
            tex_coord: component(self.mesh.tex_coords.len())?,
            normal: component(self.mesh.normals.len())?,
        })
    }

    /// Fan-triangulate a face. Faces with a malformed corner are dropped.
    fn face(&mut self, text: &str) {
        let corners: Option<Vec<Corner>> = text
            .split_ascii_whitespace()
            .map(|corner| self.corner(corner))
            .collect();
        let Some(corners) = corners.filter(|c| c.len() >= 3) else {
            return;
        };
        let first = corners[0];
        self.run.triangles.extend(
            corners[1..]
                .windows(2)
                .map(|pair| -> ObjTriangle { [first, pair[0], pair[1]] }),
        );
    }

    /// Move the pending triangles into the current group.
    fn flush_run(&mut self) {
        if self.run.triangles.is_empty() {
            return;
        }
        let index = match self.current {
            Some(index) => index,
            None => self.group_index(DEFAULT_GROUP),
        };
        self.current = Some(index);
        let run = ObjRun {
            material: self.run.material.clone(),
            triangles: std::mem::take(&mut self.run.triangles),
        };
        self.mesh.groups[index].runs.push(run);
    }

    fn group_index(&mut self, name: &str) -> usize {
        match self.mesh.groups.iter().position(|g| g.name == name) {
            Some(index) => index,
            None => {
                self.mesh.groups.push(ObjGroup::new(name));
                self.mesh.groups.len() - 1
            }
        }
    }

    fn use_material(&mut self, name: &str) {
        self.flush_run();
        self.run.material = name.to_string();
    }

    fn start_group(&mut self, name: &str) {
        if self
            .current
            .is_some_and(|index| self.mesh.groups[index].name == name)
        {
            return;
        }
        self.flush_run();
        self.current = Some(self.group_index(name));
    }

    fn finish(mut self) -> ObjMesh {
        self.flush_run();
        self.mesh.groups.retain(|g| !g.is_empty());
        self.mesh
    }
}

/// Parse an OBJ file.
///
/// Directives are matched ignoring case and lines that fail to parse are
/// skipped. `g` and `o` both start a group, or resume one seen earlier; faces
/// before the first group land in [`DEFAULT_GROUP`]. Groups without faces
/// are dropped.
///
/// # Errors
///
/// Only fails when `reader` does.
pub fn parse_obj<R: BufRead>(reader: R) -> CodecResult<ObjMesh> {
    let mut builder = ObjBuilder::new();

    for_each_line(reader, "OBJ file", |line| {
        let (keyword, rest) = directive(line);
        let is = |name: &str| keyword.eq_ignore_ascii_case(name);
        if is("v") {
            if let Some([x, y, z]) = floats(rest) {
                builder.mesh.positions.push(Vec3::new(x, y, z));
            }
        } else if is("vt") {
            if let Some([u, v]) = floats(rest) {
                builder.mesh.tex_coords.push(Vec2::new(u, v));
            }
        } else if is("vn") {
            if let Some([x, y, z]) = floats(rest) {
                builder.mesh.normals.push(Vec3::new(x, y, z));
            }
        } else if is("f") {
            builder.face(rest);
        } else if is("usemtl") {
            builder.use_material(rest);
        } else if is("g") || is("o") {
            builder.start_group(rest);
        } else if is("mtllib") && !rest.is_empty() {
            builder.mesh.material_library = Some(rest.to_string());
        }
        Ok(())
    })?;

    let mesh = builder.finish();
    debug!(
        positions = mesh.positions.len(),
        tex_coords = mesh.tex_coords.len(),
        normals = mesh.normals.len(),
        groups = mesh.groups.len(),
        "parsed OBJ"
    );
    Ok(mesh)
}

/// Parse an MTL file into `library`.
///
/// Each `newmtl` starts an untextured material; `map_Kd` gives it a texture,
/// whose extension is changed to `tga`. Materials whose names are already in
/// the library (ignoring case) are skipped.
///
/// # Errors
///
/// Fails when `reader` does or the library overflows.
pub fn parse_mtl<R: BufRead>(reader: R, library: &mut MaterialLibrary) -> CodecResult<()> {
    let mut pending: Option<Material> = None;

    for_each_line(reader, "MTL file", |line| {
        let (keyword, rest) = directive(line);
        if keyword.eq_ignore_ascii_case("newmtl") {
            if let Some(material) = pending.replace(Material::new(rest, NULL_TEXTURE)) {
                library.insert(material)?;
            }
        } else if keyword.eq_ignore_ascii_case("map_Kd") {
            if let Some(material) = pending.as_mut() {
                material.texture = change_extension(rest, "tga");
            }
        }
        Ok(())
    })?;

    if let Some(material) = pending {
        library.insert(material)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn parse(text: &str) -> ObjMesh {
        parse_obj(Cursor::new(text)).unwrap()
    }

    #[test]
    fn test_parse_groups_and_materials() {
        let mesh = parse(
            "mtllib ship.mtl\n\
             v 0 0 0\nv 1 0 0\nv 0 1 0\nv 1 1 0\n\
             vt 0.5 0.25\nvn 0 0 1\n\
             g Hull_0\nusemtl Steel\nf 1/1/1 2/1/1 3/1/1\n\
             usemtl Glass\nf 2/1/1 4/1/1 3/1/1\n",
        );
        assert_eq!(mesh.material_library.as_deref(), Some("ship.mtl"));
        assert_eq!(mesh.positions.len(), 4);
        assert_eq!(mesh.tex_coords, [Vec2::new(0.5, 0.25)]);
        assert_eq!(mesh.groups.len(), 1);
        let group = &mesh.groups[0];
        assert_eq!(group.name, "Hull_0");
        assert_eq!(group.runs.len(), 2);
        assert_eq!(group.runs[0].material, "Steel");
        assert_eq!(group.runs[1].material, "Glass");
        assert_eq!(group.runs[1].triangles[0][1], Corner::new(4, 1, 1));
    }

    #[test]
    fn test_default_group_and_case_insensitive_directives() {
        let mesh = parse("V 0 0 0\nV 1 0 0\nV 0 1 0\nF 1 2 3\n");
        assert_eq!(mesh.groups.len(), 1);
        assert_eq!(mesh.groups[0].name, DEFAULT_GROUP);
        assert_eq!(mesh.groups[0].runs[0].triangles[0][2], Corner::new(3, 0, 0));
    }

    #[test]
    fn test_group_resume_merges_faces() {
        let mesh = parse(
            "v 0 0 0\nv 1 0 0\nv 0 1 0\n\
             g A\nf 1 2 3\ng B\nf 1 2 3\no A\nf 3 2 1\ng Empty\n",
        );
        let names: Vec<_> = mesh.groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, ["A", "B"]);
        assert_eq!(mesh.groups[0].triangle_count(), 2);
    }

    #[test]
    fn test_bad_lines_are_skipped() {
        let mesh = parse("v 0 0 zero\nv 1 2 3\nvt x\nf 1 2\nf 1/a 1 1\nf 1 1 1\n");
        assert_eq!(mesh.positions, [Vec3::new(1.0, 2.0, 3.0)]);
        assert!(mesh.tex_coords.is_empty());
        assert_eq!(mesh.groups[0].triangle_count(), 1);
    }

    #[test]
    fn test_relative_indices_and_fan_triangulation() {
        let mesh = parse("v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf -4//  -3 -2 -1\n");
        let triangles: Vec<_> = mesh.groups[0].triangles().collect();
        assert_eq!(triangles.len(), 2);
        let positions = |t: &ObjTriangle| (*t).map(|c| c.position);
        assert_eq!(positions(triangles[0]), [1, 2, 3]);
        assert_eq!(positions(triangles[1]), [1, 3, 4]);
    }

    #[test]
    fn test_crlf_and_invalid_utf8_names() {
        let mut bytes = b"g Caf".to_vec();
        bytes.extend([0xE9, b'\r', b'\n']);
        bytes.extend(b"v 0 0 0\r\nv 1 0 0\r\nv 0 1 0\r\nf 1 2 3\r\n");
        let mesh = parse_obj(Cursor::new(bytes)).unwrap();
        assert_eq!(mesh.groups[0].name, "Caf\u{FFFD}");
    }

    #[test]
    fn test_parse_mtl() {
        let text = "newmtl Hull\nKd 1 1 1\nmap_Kd textures/hull.dds\n\n\
                    newmtl Glass\n\
                    newmtl HULL\nMAP_KD other.png\n";
        let mut library = MaterialLibrary::new();
        parse_mtl(Cursor::new(text), &mut library).unwrap();
        let materials = library.to_vec();
        assert_eq!(
            materials,
            [
                Material::new("Hull", "textures/hull.tga"),
                Material::new("Glass", NULL_TEXTURE),
            ]
        );
    }
}
