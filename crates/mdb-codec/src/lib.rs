//! Convert mdb ship models to and from Wavefront OBJ.
//!
//! This crate is the pure synchronous codec: every entry point takes
//! `Read`/`BufRead`/`Write` values and never touches the file system, so the
//! caller controls I/O and parallelism.
//!
//! # Pipelines
//!
//! - mdb → OBJ: [`decode_mdb`] into an [`MdbMesh`], then [`write_mesh`] and
//!   [`write_mtl`]
//! - OBJ → mdb: [`parse_obj`] and [`parse_mtl`], [`pack_group`] for every
//!   group, a [`CollisionBox`] tree, then [`encode_mdb`]
//!
//! # Conventions
//!
//! - [`ObjMesh`] and [`CollisionBox`] data is in OBJ axes (Y up)
//! - [`MdbModel`] vertices are in mdb axes (Z up) with reversed winding
//! - Every count stored in mdb files fits in 16 bits

mod binary;
mod error;

pub mod axes;
pub mod cbox;
pub mod material;
pub mod math;
pub mod mdb;
pub mod model;
pub mod naming;
pub mod obj;

pub use cbox::CollisionBox;
pub use cbox::hierarchy::{BoxHierarchy, parse_description};
pub use error::{CodecError, CodecResult};
pub use material::{Material, MaterialLibrary};
pub use mdb::{decode_mdb, encode_mdb, pack_group};
pub use model::{MdbMesh, MdbModel, ObjGroup, ObjMesh};
pub use obj::{ObjCounters, parse_mtl, parse_obj, write_mesh, write_mtl};

/// Deepest level a collision box may have; the root is level 0.
pub const MAX_BOX_LEVEL: u32 = 5;

/// Most vertices, triangles or materials one mdb model can index.
pub const MAX_INDEX_COUNT: usize = 65535;
