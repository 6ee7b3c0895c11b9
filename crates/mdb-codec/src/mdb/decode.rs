//! mdb decoding.

use std::io::{self, Read, Seek};

use tracing::debug;

use super::{BOUNDS_LEN, HEADER_SKIP, MATERIAL_PARAMS_LEN, MAX_BOX_NESTING, capacity_hint};
use crate::axes::position_to_obj;
use crate::binary::MdbReader;
use crate::cbox::CollisionBox;
use crate::error::{CodecError, CodecResult, IoContext};
use crate::material::Material;
use crate::model::{MdbMesh, MdbModel, MdbVertex};

/// Decode one mdb file.
///
/// Models are named `<group_prefix>_<index>`. Bones and unknown trailing
/// model data are skipped. The collision tree is returned in OBJ axes with
/// empty box names.
///
/// # Errors
///
/// Fails with a [`CodecError::Read`] naming the record that could not be
/// read, e.g. `vertex 12 of model 0`.
pub fn decode_mdb<R: Read + Seek>(reader: R, group_prefix: &str) -> CodecResult<MdbMesh> {
    let mut r = MdbReader::new(reader);

    r.skip(HEADER_SKIP).reading(|| "file header".into())?;
    let model_count = r.read_u32().reading(|| "model count".into())?;

    let mut models = Vec::with_capacity(capacity_hint(model_count));
    for i in 0..model_count {
        models.push(read_model(&mut r, i, group_prefix)?);
    }
    debug!(models = models.len(), "read models");

    let materials = read_materials(&mut r)?;

    let bone_count = r.read_u32().reading(|| "bone count".into())?;
    for i in 0..bone_count {
        let length = r.read_u32().reading(|| format!("bone {i}"))?;
        r.skip(u64::from(length)).reading(|| format!("bone {i}"))?;
    }

    // Bounds are recomputed on encode; the collision block length and its
    // constant lead-in follow.
    r.skip(BOUNDS_LEN + 8)
        .reading(|| "collision box block".into())?;
    let collision = read_box(&mut r, 0)?;

    Ok(MdbMesh {
        models,
        materials,
        collision: Some(collision),
    })
}

fn read_model<R: Read + Seek>(
    r: &mut MdbReader<R>,
    i: u32,
    group_prefix: &str,
) -> CodecResult<MdbModel> {
    let (length, start, vertex_count) = (|| -> io::Result<_> {
        let length = r.read_u32()?;
        let start = r.position()?;
        r.skip(4)?;
        Ok((length, start, r.read_u32()?))
    })()
    .reading(|| format!("point count of model {i}"))?;

    let mut model = MdbModel {
        name: format!("{group_prefix}_{i}"),
        vertices: Vec::with_capacity(capacity_hint(vertex_count)),
        runs: Vec::new(),
    };

    for j in 0..vertex_count {
        let vertex = (|| -> io::Result<_> {
            r.skip(4)?;
            let vertex = MdbVertex {
                position: r.read_vec3()?,
                tex_coord: r.read_vec2()?,
                normal: r.read_vec2()?,
            };
            r.skip(4)?;
            Ok(vertex)
        })()
        .reading(|| format!("vertex {j} of model {i}"))?;
        model.vertices.push(vertex);
    }

    let triangle_count = r
        .read_u32()
        .reading(|| format!("triangle count of model {i}"))?;
    for j in 0..triangle_count {
        let (triangle, material) = (|| -> io::Result<_> {
            r.skip(4)?;
            let triangle = [r.read_u16()?, r.read_u16()?, r.read_u16()?];
            Ok((triangle, r.read_u16()?))
        })()
        .reading(|| format!("triangle {j} of model {i}"))?;
        model.push_triangle(triangle, material);
    }

    // Animation count, then whatever else the block holds.
    (|| -> io::Result<_> {
        r.skip(4)?;
        let consumed = r.position()? - start;
        if consumed < u64::from(length) {
            r.skip(u64::from(length) - consumed)?;
        }
        Ok(())
    })()
    .reading(|| format!("the end of model {i}"))?;

    Ok(model)
}

fn read_materials<R: Read + Seek>(r: &mut MdbReader<R>) -> CodecResult<Vec<Material>> {
    let count = r.read_u32().reading(|| "material count".into())?;
    let mut materials = Vec::with_capacity(capacity_hint(count));
    for i in 0..count {
        let texture = (|| -> io::Result<_> {
            r.skip(4)?;
            // A negative length is stored as `-len - 1`.
            let length = r.read_i32()?;
            let length = usize::try_from(if length < 0 { !length } else { length })
                .unwrap_or_default();
            let texture = r.read_string(length)?;
            r.skip(u64::from(MATERIAL_PARAMS_LEN))?;
            Ok(texture)
        })()
        .reading(|| format!("material {i}"))?;
        materials.push(Material::from_texture(texture));
    }
    Ok(materials)
}

fn read_box<R: Read + Seek>(r: &mut MdbReader<R>, nesting: u32) -> CodecResult<CollisionBox> {
    if nesting > MAX_BOX_NESTING {
        return Err(CodecError::InvalidFormat {
            context: "collision box",
            detail: format!("nested deeper than {MAX_BOX_NESTING} levels"),
        });
    }

    let (mut b, has_left, has_right) = (|| -> io::Result<_> {
        let mut b = CollisionBox::default();
        r.skip(16)?;
        b.center = position_to_obj(r.read_vec3()?);
        r.skip(12)?;
        b.cross = position_to_obj(r.read_vec3()?);
        r.skip(4)?;
        b.up = position_to_obj(r.read_vec3()?);
        r.skip(4)?;
        b.forward = position_to_obj(r.read_vec3()?);
        r.skip(4)?;
        b.half_lengths = r.read_vec3()?;
        r.skip(12)?;
        b.level = r.read_u32()?;
        r.skip(4)?;
        let has_left = r.read_bool()?;
        r.skip(4)?;
        let has_right = r.read_bool()?;
        Ok((b, has_left, has_right))
    })()
    .reading(|| format!("collision box at depth {nesting}"))?;

    if has_left {
        r.skip(4).reading(|| format!("left child at depth {nesting}"))?;
        b.left = Some(Box::new(read_box(r, nesting + 1)?));
    }
    if has_right {
        r.skip(4).reading(|| format!("right child at depth {nesting}"))?;
        b.right = Some(Box::new(read_box(r, nesting + 1)?));
    }

    (|| -> io::Result<_> {
        r.skip(4)?;
        let count = r.read_u32()?;
        r.skip(u64::from(count) * 8)
    })()
    .reading(|| format!("triangle indices of collision box at depth {nesting}"))?;

    Ok(b)
}
