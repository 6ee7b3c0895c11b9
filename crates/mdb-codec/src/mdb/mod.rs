//! The mdb binary model format.
//!
//! # Format
//!
//! Little-endian throughout. Every structure is framed by a `u32` length
//! that counts the length field itself:
//!
//! - File header: `u64` total length, `u32` data length, `u32` model count
//! - Models: index, vertices (position, texcoord, normal angles) and
//!   triangles (three `u16` indices plus a `u16` material)
//! - Materials: texture name and 72 bytes of shading parameters
//! - Bones (skipped), object bounds, collision box tree, hitbox triangles
//! - A terminator byte and the schema string table

mod decode;
mod encode;

pub use decode::decode_mdb;
pub use encode::{encode_mdb, pack_group};

/// Size tag written before every vertex record.
const VERTEX_TAG: u32 = 32;
/// Size tag written before every triangle record.
const TRIANGLE_TAG: u32 = 8;
/// Vertex color, always opaque white.
const VERTEX_COLOR: u32 = 0xFFFF_FFFF;
/// Bytes of shading parameters following each material name.
const MATERIAL_PARAMS_LEN: u32 = 72;
/// Object bounds: min, max and center as three floats each, then a radius.
const BOUNDS_LEN: u64 = 40;
/// Bytes of a header the decoder does not need before the model count.
const HEADER_SKIP: u64 = 12;
/// Payload size tag of one hitbox triangle.
const HITBOX_TRIANGLE_LEN: u32 = 48;
/// Nesting limit applied when reading untrusted box trees.
const MAX_BOX_NESTING: u32 = 32;

/// Field names referenced by the keys of the collision block.
const SCHEMA_STRINGS: [&str; 21] = [
    "MeshData",
    "Root",
    "LocalBasis",
    "Position",
    "LookAt Vector Length",
    "Orientation - Cross",
    "Orientation - Forward",
    "Orientation - Up",
    "Length",
    "Radius",
    "Level",
    "HasLeftChild",
    "HasRightChild",
    "Valid Collision Triangle Indices - Size",
    "Valid Collision Triangle Indices - Element",
    "MaxLevel",
    "CollisionTriangles - Size",
    "CollisionTriangles - Element",
    "P0",
    "P1",
    "P2",
];

/// Cap a capacity hint read from an untrusted count.
fn capacity_hint(count: u32) -> usize {
    (count as usize).min(crate::MAX_INDEX_COUNT + 1)
}
