//! Batch conversion between mdb ship models and Wavefront OBJ files.
//!
//! Each entry point takes a list of inputs, an output location, the
//! [`ConvertOptions`] and an [`Observer`]. Inputs are converted one at a
//! time; an input that fails is logged and skipped, and progress is reported
//! after every input either way.
//!
//! # Entry points
//!
//! - [`mdbs_to_obj`]: many mdb files into one OBJ
//! - [`mdbs_to_objs`]: one OBJ per mdb file
//! - [`objs_to_grouped_mdbs`]: one mdb per group name found in the OBJs
//! - [`objs_to_mdbs`]: one mdb per OBJ
//!
//! Outputs are staged in a temporary file next to their destination and
//! only moved into place once complete.

mod batch;
mod error;
mod observer;
mod options;
mod staged;
mod to_mdb;
mod to_obj;

pub use batch::{BatchReport, Failure};
pub use error::{Error, Result};
pub use observer::{FnObserver, Observer, TracingObserver};
pub use options::ConvertOptions;
pub use to_mdb::{objs_to_grouped_mdbs, objs_to_mdbs};
pub use to_obj::{mdbs_to_obj, mdbs_to_objs};
