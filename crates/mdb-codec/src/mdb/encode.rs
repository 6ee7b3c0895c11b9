//! mdb encoding.

use std::collections::HashMap;
use std::io::{self, Seek, Write};

use glam::Vec3;
use tracing::debug;

use super::{
    HITBOX_TRIANGLE_LEN, MATERIAL_PARAMS_LEN, SCHEMA_STRINGS, TRIANGLE_TAG, VERTEX_COLOR,
    VERTEX_TAG,
};
use crate::axes::{angles_from_normal, flip_tex_coord, position_to_mdb};
use crate::binary::{MdbWriter, encode_latin1};
use crate::cbox::CollisionBox;
use crate::error::{CodecError, CodecResult, IoContext};
use crate::material::{Material, MaterialLibrary};
use crate::model::{Corner, MdbMesh, MdbModel, MdbVertex, ObjGroup, ObjMesh};
use crate::naming::file_name;
use crate::{MAX_BOX_LEVEL, MAX_INDEX_COUNT};

/// Default shading parameters written after every material name.
const MATERIAL_PARAMS: [f32; 18] = [
    1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0,
];

/// Convert an OBJ group into an mdb model.
///
/// Corner tuples are deduplicated into a compact vertex table and triangle
/// winding is reversed. `usemtl` names are resolved against `materials`,
/// which may gain a null material.
///
/// # Errors
///
/// - [`CodecError::CapacityExceeded`] past 65535 vertices or triangles
/// - [`CodecError::MissingReference`] for a corner without a position
pub fn pack_group(
    mesh: &ObjMesh,
    group: &ObjGroup,
    materials: &mut MaterialLibrary,
) -> CodecResult<MdbModel> {
    let mut model = MdbModel {
        name: group.name.clone(),
        ..MdbModel::default()
    };
    let mut indices: HashMap<Corner, u16> = HashMap::new();
    let mut triangle_count = 0usize;

    for run in group.runs.iter().filter(|run| !run.triangles.is_empty()) {
        let material = materials.resolve(&run.material)?;
        for (j, tri) in run.triangles.iter().enumerate() {
            triangle_count += 1;
            if triangle_count > MAX_INDEX_COUNT {
                return Err(CodecError::CapacityExceeded {
                    what: "triangle",
                    limit: MAX_INDEX_COUNT,
                });
            }

            let mut index_of = |corner: &Corner| -> CodecResult<u16> {
                if let Some(&index) = indices.get(corner) {
                    return Ok(index);
                }
                if model.vertices.len() >= MAX_INDEX_COUNT {
                    return Err(CodecError::CapacityExceeded {
                        what: "point",
                        limit: MAX_INDEX_COUNT,
                    });
                }
                let position = mesh.position(corner).ok_or_else(|| CodecError::MissingReference {
                    context: format!("position of triangle {j} in {}", group.name),
                    index: i64::from(corner.position),
                })?;
                let index = model.vertices.len() as u16;
                model.vertices.push(MdbVertex {
                    position: position_to_mdb(position),
                    tex_coord: flip_tex_coord(mesh.tex_coord(corner)),
                    normal: angles_from_normal(mesh.normal(corner)),
                });
                indices.insert(*corner, index);
                Ok(index)
            };

            let p2 = index_of(&tri[2])?;
            let p1 = index_of(&tri[1])?;
            let p0 = index_of(&tri[0])?;
            model.push_triangle([p2, p1, p0], material);
        }
    }

    debug!(
        group = %group.name,
        points = model.vertices.len(),
        triangles = triangle_count,
        "packed group"
    );
    Ok(model)
}

/// Write a complete mdb file.
///
/// File bounds, root box indices and the hitbox list are derived from the
/// first model. A mesh without a collision tree gets a single default box.
///
/// # Errors
///
/// Fails with [`CodecError::Write`] when the output rejects a write, or
/// [`CodecError::MissingReference`] when a first-model triangle points past
/// its vertex table.
pub fn encode_mdb<W: Write + Seek>(out: W, mesh: &MdbMesh) -> CodecResult<()> {
    let mut w = MdbWriter::new(out);
    let first = mesh.models.first();
    let hitbox = hitbox_triangles(first)?;

    w.write_bytes(&[0; 16]).writing(|| "file header".into())?;
    for (i, model) in mesh.models.iter().enumerate() {
        write_model(&mut w, i, model)?;
    }
    write_materials(&mut w, &mesh.materials)?;
    write_bounds(&mut w, first).writing(|| "bounding values".into())?;

    let default_box = CollisionBox::default();
    let root = mesh.collision.as_ref().unwrap_or(&default_box);
    let triangle_count = hitbox.len() as u32;

    let data_end = (|| -> io::Result<_> {
        let start = w.begin_block()?;
        w.write_u32(1)?;
        write_box(&mut w, root, triangle_count)?;
        w.write_u32(17)?;
        w.write_u32(MAX_BOX_LEVEL)?;
        w.write_u32(18)?;
        w.write_u32(triangle_count)?;
        for [p0, p1, p2] in &hitbox {
            w.write_u32(19)?;
            w.write_u32(HITBOX_TRIANGLE_LEN)?;
            w.write_u32(20)?;
            w.write_vec3(*p0)?;
            w.write_u32(21)?;
            w.write_vec3(*p1)?;
            w.write_u32(22)?;
            w.write_vec3(*p2)?;
        }
        w.end_block(start)?;
        w.position()
    })()
    .writing(|| "collision boxes".into())?;

    (|| -> io::Result<_> {
        w.write_bool(false)?;
        let model_count = mesh.models.len() as u32;
        w.patch(0, |w| {
            w.write_u64(data_end + 1)?;
            w.write_u32(data_end.saturating_sub(11) as u32)?;
            w.write_u32(model_count)
        })?;
        w.write_u32(SCHEMA_STRINGS.len() as u32)?;
        for name in SCHEMA_STRINGS {
            w.write_string(name)?;
        }
        w.flush()
    })()
    .writing(|| "file length and strings".into())
}

fn write_model<W: Write + Seek>(w: &mut MdbWriter<W>, i: usize, model: &MdbModel) -> CodecResult<()> {
    (|| -> io::Result<_> {
        let start = w.begin_block()?;
        w.write_u32(i as u32)?;
        w.write_u32(model.vertices.len() as u32)?;
        for vertex in &model.vertices {
            w.write_u32(VERTEX_TAG)?;
            w.write_vec3(vertex.position)?;
            w.write_vec2(vertex.tex_coord)?;
            w.write_vec2(vertex.normal)?;
            w.write_u32(VERTEX_COLOR)?;
        }
        w.write_u32(model.triangle_count() as u32)?;
        for run in &model.runs {
            for tri in &run.triangles {
                w.write_u32(TRIANGLE_TAG)?;
                for index in tri {
                    w.write_u16(*index)?;
                }
                w.write_u16(run.material)?;
            }
        }
        w.end_block(start)?;
        // Animation count.
        w.write_u32(0)
    })()
    .writing(|| format!("model {i} ({})", model.name))
}

fn write_materials<W: Write + Seek>(w: &mut MdbWriter<W>, materials: &[Material]) -> CodecResult<()> {
    w.write_u32(materials.len() as u32)
        .writing(|| "material count".into())?;
    for (i, material) in materials.iter().enumerate() {
        let texture = file_name(&material.texture);
        (|| -> io::Result<_> {
            let length = encode_latin1(texture).len() as u32;
            w.write_u32(4 + MATERIAL_PARAMS_LEN + length)?;
            w.write_string(texture)?;
            for value in MATERIAL_PARAMS {
                w.write_f32(value)?;
            }
            Ok(())
        })()
        .writing(|| format!("material {i}"))?;
    }
    // No bones.
    w.write_u32(0).writing(|| "bone count".into())
}

/// Axis-aligned bounds of the first model followed by its bounding sphere.
fn write_bounds<W: Write + Seek>(w: &mut MdbWriter<W>, model: Option<&MdbModel>) -> io::Result<()> {
    let positions = model.into_iter().flat_map(|m| m.vertices.iter().map(|v| v.position));
    let (min, max) = positions.fold(None, |bounds: Option<(Vec3, Vec3)>, p| match bounds {
        Some((min, max)) => Some((min.min(p), max.max(p))),
        None => Some((p, p)),
    })
    .unwrap_or((Vec3::ZERO, Vec3::ZERO));

    w.write_vec3(min)?;
    w.write_vec3(max)?;
    w.write_vec3((min + max) / 2.0)?;
    w.write_f32((max - min).length() / 2.0)
}

fn write_box<W: Write + Seek>(
    w: &mut MdbWriter<W>,
    b: &CollisionBox,
    triangle_count: u32,
) -> io::Result<()> {
    let start = w.begin_block()?;
    w.write_u32(2)?;
    w.write_u32(72)?;
    w.write_u32(3)?;
    w.write_vec3(position_to_mdb(b.center))?;
    w.write_u32(4)?;
    w.write_u32(0)?;
    w.write_u32(5)?;
    w.write_vec3(position_to_mdb(b.cross))?;
    w.write_u32(6)?;
    w.write_vec3(position_to_mdb(b.up))?;
    w.write_u32(7)?;
    w.write_vec3(position_to_mdb(b.forward))?;
    w.write_u32(8)?;
    w.write_vec3(b.half_lengths)?;
    w.write_u32(9)?;
    w.write_f32(b.radius())?;
    w.write_u32(10)?;
    w.write_u32(b.level)?;
    w.write_u32(11)?;
    w.write_bool(b.left.is_some())?;
    w.write_u32(12)?;
    w.write_bool(b.right.is_some())?;
    if let Some(left) = &b.left {
        w.write_u32(13)?;
        write_box(w, left, triangle_count)?;
    }
    if let Some(right) = &b.right {
        w.write_u32(16)?;
        write_box(w, right, triangle_count)?;
    }
    w.write_u32(14)?;
    if b.level == 0 {
        w.write_u32(triangle_count)?;
        for i in 0..triangle_count {
            w.write_u32(15)?;
            w.write_u32(i)?;
        }
    } else {
        w.write_u32(0)?;
    }
    w.end_block(start)?;
    Ok(())
}

/// Corner positions of every triangle of `model`, in mdb axes and winding.
fn hitbox_triangles(model: Option<&MdbModel>) -> CodecResult<Vec<[Vec3; 3]>> {
    let Some(model) = model else {
        return Ok(Vec::new());
    };
    let position = |index: u16| {
        model
            .vertices
            .get(usize::from(index))
            .map(|v| v.position)
            .ok_or_else(|| CodecError::MissingReference {
                context: format!("hitbox vertex of {}", model.name),
                index: i64::from(index),
            })
    };
    model
        .runs
        .iter()
        .flat_map(|run| run.triangles.iter())
        .map(|&[a, b, c]| Ok([position(a)?, position(b)?, position(c)?]))
        .collect()
}
