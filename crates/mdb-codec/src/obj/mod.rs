//! Wavefront OBJ and MTL text.
//!
//! Reading produces an [`ObjMesh`](crate::model::ObjMesh) whose groups keep
//! their OBJ corner tuples; writing takes decoded mdb meshes and appends them
//! to an OBJ stream, continuing the 1-based index counters of whatever was
//! written before.

mod decode;
mod encode;

pub(crate) use decode::for_each_line;
pub use decode::{parse_mtl, parse_obj};
pub use encode::{ObjCounters, write_mesh, write_mtl};

/// Group receiving faces that appear before any `g` or `o` directive.
pub const DEFAULT_GROUP: &str = "UnnamedMesh";
