//! OBJ, MTL and collision description writing.

use std::io::{self, Write};

use crate::axes::{flip_tex_coord, normal_from_angles, position_to_obj};
use crate::cbox::CollisionBox;
use crate::error::{CodecError, CodecResult, IoContext};
use crate::material::MaterialLibrary;
use crate::model::{MdbMesh, MdbModel};
use crate::naming::change_extension;

/// Faces of a box wireframe, as offsets into its eight corners.
const BOX_FACES: [[usize; 3]; 12] = [
    [0, 1, 2],
    [3, 4, 2],
    [5, 6, 2],
    [4, 7, 5],
    [6, 7, 0],
    [1, 7, 3],
    [6, 0, 2],
    [7, 1, 0],
    [1, 3, 2],
    [4, 5, 2],
    [7, 6, 5],
    [7, 4, 3],
];

/// Running state shared by every mesh appended to one OBJ stream.
///
/// The index counters are the 1-based OBJ indices the next mesh starts at.
/// Box numbering is never restarted, so box names stay unique across a
/// whole batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjCounters {
    pub position: usize,
    pub tex_coord: usize,
    pub normal: usize,
    pub next_box: u32,
}

impl Default for ObjCounters {
    fn default() -> Self {
        Self {
            position: 1,
            tex_coord: 1,
            normal: 1,
            next_box: 0,
        }
    }
}

impl ObjCounters {
    /// Start index numbering over for a new OBJ file.
    pub fn restart_indices(&mut self) {
        *self = Self {
            next_box: self.next_box,
            ..Self::default()
        };
    }

    fn advance(&mut self, vertex_count: usize) {
        self.position += vertex_count;
        self.tex_coord += vertex_count;
        self.normal += vertex_count;
    }
}

/// Append a decoded mdb mesh to an OBJ stream.
///
/// `material_names` maps the mesh's material indices to the names used in
/// `usemtl`. When `description` is given, the collision tree is appended as
/// `_BOX<n>` wireframe objects and its shape is recorded there under
/// `mesh_name`.
///
/// # Errors
///
/// Fails with [`CodecError::MissingReference`] for a material index outside
/// `material_names`, or with [`CodecError::Write`].
pub fn write_mesh<W: Write>(
    out: &mut W,
    description: Option<&mut dyn Write>,
    mesh: &MdbMesh,
    mesh_name: &str,
    material_names: &[String],
    counters: &mut ObjCounters,
) -> CodecResult<()> {
    write_points(out, &mesh.models).writing(|| "points".into())?;

    for model in &mesh.models {
        write_group(out, model, material_names, counters)?;
        counters.advance(model.vertices.len());
    }

    if let (Some(description), Some(root)) = (description, mesh.collision.as_ref()) {
        let mut root = root.clone();
        name_boxes(&mut root, &mut counters.next_box);
        (|| -> io::Result<()> {
            writeln!(description, "MESH\t{mesh_name}")?;
            write_box(out, description, &root, &mut counters.position)
        })()
        .writing(|| format!("collision boxes of {mesh_name}"))?;
    }
    Ok(())
}

fn write_points<W: Write>(out: &mut W, models: &[MdbModel]) -> io::Result<()> {
    let vertices = || models.iter().flat_map(|m| m.vertices.iter());
    for v in vertices() {
        let p = position_to_obj(v.position);
        writeln!(out, "v {} {} {}", p.x, p.y, p.z)?;
    }
    for v in vertices() {
        let t = flip_tex_coord(v.tex_coord);
        writeln!(out, "vt {} {}", t.x, t.y)?;
    }
    for v in vertices() {
        let n = normal_from_angles(v.normal);
        writeln!(out, "vn {} {} {}", n.x, n.y, n.z)?;
    }
    Ok(())
}

fn write_group<W: Write>(
    out: &mut W,
    model: &MdbModel,
    material_names: &[String],
    counters: &ObjCounters,
) -> CodecResult<()> {
    let name = &model.name;
    writeln!(out, "g {name}\no {name}").writing(|| format!("group {name}"))?;

    for run in &model.runs {
        let material = material_names
            .get(usize::from(run.material))
            .ok_or_else(|| CodecError::MissingReference {
                context: format!("material of {name}"),
                index: i64::from(run.material),
            })?;
        writeln!(out, "usemtl {material}").writing(|| format!("material of {name}"))?;

        for (j, tri) in run.triangles.iter().enumerate() {
            let corner = |p: u16| {
                let p = usize::from(p);
                format!(
                    "{}/{}/{}",
                    p + counters.position,
                    p + counters.tex_coord,
                    p + counters.normal
                )
            };
            writeln!(out, "f {} {} {}", corner(tri[2]), corner(tri[1]), corner(tri[0]))
                .writing(|| format!("triangle {j} of {name}"))?;
        }
    }
    Ok(())
}

/// Give every box a `_BOX<n>` name, parents before children.
fn name_boxes(b: &mut CollisionBox, next: &mut u32) {
    b.name = format!("_BOX{next}");
    *next += 1;
    if let Some(left) = b.left.as_deref_mut() {
        name_boxes(left, next);
    }
    if let Some(right) = b.right.as_deref_mut() {
        name_boxes(right, next);
    }
}

fn write_box<W: Write>(
    out: &mut W,
    description: &mut dyn Write,
    b: &CollisionBox,
    position: &mut usize,
) -> io::Result<()> {
    for p in b.corners() {
        writeln!(out, "v {} {} {}", p.x, p.y, p.z)?;
    }
    writeln!(out, "o {0}\ng {0}", b.name)?;
    for [i, j, k] in BOX_FACES {
        writeln!(out, "f {} {} {}", *position + i, *position + j, *position + k)?;
    }
    *position += 8;

    let left = b.left.as_deref().map_or("", |c| c.name.as_str());
    let right = b.right.as_deref().map_or("", |c| c.name.as_str());
    match (left.is_empty(), right.is_empty()) {
        (true, true) => writeln!(description, "CBOX\t{}", b.name)?,
        (false, true) => writeln!(description, "CBOX\t{}\t{left}", b.name)?,
        _ => writeln!(description, "CBOX\t{}\t{left}\t{right}", b.name)?,
    }

    for child in b.children() {
        write_box(out, description, child, position)?;
    }
    Ok(())
}

/// Write an MTL file for `library`.
///
/// Texture references get `texture_extension` and are prefixed with
/// `texture_directory` verbatim.
pub fn write_mtl<W: Write>(
    out: &mut W,
    library: &MaterialLibrary,
    texture_directory: &str,
    texture_extension: &str,
) -> CodecResult<()> {
    for material in library.iter() {
        let texture = change_extension(&material.texture, texture_extension);
        write!(
            out,
            "newmtl {}\n\
             Ka 0.200000 0.200000 0.200000\n\
             Kd 1.000000 1.000000 1.000000\n\
             Ks 0.000000 0.000000 0.000000\n\
             illum 2\n\
             Ns 8.000000\n\
             map_Kd {texture_directory}{texture}\n\n",
            material.name
        )
        .writing(|| format!("material {}", material.name))?;
    }
    out.flush().writing(|| "MTL file".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cbox::hierarchy::parse_description;
    use crate::material::Material;
    use crate::model::MdbVertex;
    use crate::obj::parse_obj;
    use glam::{Vec2, Vec3};
    use std::io::Cursor;

    fn triangle_model(name: &str) -> MdbModel {
        let vertex = |x: f32, y: f32| MdbVertex {
            position: Vec3::new(x, y, 0.5),
            tex_coord: Vec2::new(x, y),
            normal: Vec2::ZERO,
        };
        let mut model = MdbModel {
            name: name.into(),
            vertices: vec![vertex(0.0, 0.0), vertex(1.0, 0.0), vertex(0.0, 1.0)],
            runs: Vec::new(),
        };
        model.push_triangle([0, 1, 2], 0);
        model
    }

    fn write(mesh: &MdbMesh, counters: &mut ObjCounters, boxes: bool) -> (String, String) {
        let mut obj = Vec::new();
        let mut description = Vec::new();
        let names = ["Hull".to_string()];
        let sink: Option<&mut dyn Write> = boxes.then_some(&mut description as &mut dyn Write);
        write_mesh(&mut obj, sink, mesh, "ship", &names, counters).unwrap();
        (
            String::from_utf8(obj).unwrap(),
            String::from_utf8(description).unwrap(),
        )
    }

    #[test]
    fn test_faces_use_running_counters() {
        let mesh = MdbMesh {
            models: vec![triangle_model("ship_0"), triangle_model("ship_1")],
            ..MdbMesh::default()
        };
        let mut counters = ObjCounters::default();
        let (obj, _) = write(&mesh, &mut counters, false);

        let lines: Vec<&str> = obj.lines().collect();
        assert_eq!(lines[0], "v 0 0.5 -0");
        assert_eq!(lines[6], "vt 0 -0");
        assert!(lines.contains(&"g ship_0"));
        assert!(lines.contains(&"usemtl Hull"));
        assert!(lines.contains(&"f 3/3/3 2/2/2 1/1/1"));
        assert!(lines.contains(&"f 6/6/6 5/5/5 4/4/4"));
        assert_eq!(counters.position, 7);
        assert_eq!(counters.normal, 7);

        // A second mesh continues where the first stopped.
        let (obj, _) = write(&mesh, &mut counters, false);
        assert!(obj.contains("f 9/9/9 8/8/8 7/7/7"));
    }

    #[test]
    fn test_missing_material_name() {
        let mut model = triangle_model("ship_0");
        model.runs[0].material = 4;
        let mesh = MdbMesh {
            models: vec![model],
            ..MdbMesh::default()
        };
        let err = write_mesh(&mut Vec::new(), None, &mesh, "ship", &[], &mut ObjCounters::default())
            .unwrap_err();
        assert!(matches!(err, CodecError::MissingReference { index: 4, .. }));
    }

    #[test]
    fn test_boxes_and_description() {
        let mut root = CollisionBox {
            half_lengths: Vec3::ONE,
            ..CollisionBox::default()
        };
        root.right = Some(Box::new(CollisionBox::new("", 1)));
        let mesh = MdbMesh {
            models: vec![triangle_model("ship_0")],
            collision: Some(root),
            ..MdbMesh::default()
        };
        let mut counters = ObjCounters {
            next_box: 7,
            ..ObjCounters::default()
        };
        let (obj, description) = write(&mesh, &mut counters, true);

        assert_eq!(description, "MESH\tship\nCBOX\t_BOX7\t\t_BOX8\nCBOX\t_BOX8\n");
        assert_eq!(counters.next_box, 9);
        assert_eq!(counters.position, 4 + 16);
        assert!(obj.contains("o _BOX7\ng _BOX7\nf 4 5 6\n"));
        assert!(obj.contains("f 19 15 14\n"));

        // The wireframes read back as groups the description names.
        let parsed = parse_obj(Cursor::new(obj)).unwrap();
        let hierarchy = parse_description(Cursor::new(description)).unwrap();
        assert_eq!(parsed.groups.len(), 3);
        assert_eq!(parsed.groups[1].name, hierarchy[0].root.name);
        assert_eq!(parsed.groups[1].triangle_count(), 12);
    }

    #[test]
    fn test_restart_keeps_box_numbering() {
        let mut counters = ObjCounters {
            position: 40,
            tex_coord: 30,
            normal: 20,
            next_box: 5,
        };
        counters.restart_indices();
        assert_eq!(
            counters,
            ObjCounters {
                next_box: 5,
                ..ObjCounters::default()
            }
        );
    }

    #[test]
    fn test_write_mtl() {
        let mut library = MaterialLibrary::new();
        library.insert(Material::from_texture("hull.tga")).unwrap();
        let mut out = Vec::new();
        write_mtl(&mut out, &library, "textures/", "dds").unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("newmtl hull\nKa 0.200000"));
        assert!(text.ends_with("map_Kd textures/hull.dds\n\n"));
    }
}
