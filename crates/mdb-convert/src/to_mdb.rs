//! OBJ → mdb batch jobs.

use std::path::{Path, PathBuf};

use mdb_codec::naming::{natural_cmp, output_stem};
use mdb_codec::{
    BoxHierarchy, CodecResult, CollisionBox, MaterialLibrary, MdbMesh, ObjGroup, ObjMesh,
    encode_mdb, pack_group, parse_description, parse_mtl, parse_obj,
};
use tracing::{debug, warn};

use crate::batch::{BatchReport, file_stem, stage};
use crate::error::Result;
use crate::observer::Observer;
use crate::options::ConvertOptions;
use crate::staged::{StagedFile, open, open_if_exists};

/// An OBJ with its materials and collision description applied.
struct LoadedObj {
    mesh: ObjMesh,
    library: MaterialLibrary,
    hierarchies: Vec<BoxHierarchy>,
}

impl LoadedObj {
    /// Hierarchy declared for `mesh`, used unless boxes are generated.
    fn hierarchy(&self, mesh: &str) -> Option<&BoxHierarchy> {
        self.hierarchies.iter().find(|h| h.mesh == mesh)
    }
}

fn warn_observer(observer: &mut dyn Observer, message: &str) {
    warn!("{message}");
    observer.log(&format!("Warning: {message}"));
}

/// Material file named by `mtllib`, or the OBJ's sibling `.mtl`.
fn mtl_path(input: &Path, mesh: &ObjMesh) -> PathBuf {
    match mesh.material_library.as_deref() {
        Some(name) if !name.trim().is_empty() => input.with_file_name(name),
        _ => input.with_extension("mtl"),
    }
}

fn load_obj(input: &Path, options: &ConvertOptions, observer: &mut dyn Observer) -> Result<LoadedObj> {
    let mut mesh = stage(observer, &format!("Reading {}", input.display()), || {
        Ok(parse_obj(open(input)?)?)
    })?;

    let mut library = MaterialLibrary::new();
    let mtl = mtl_path(input, &mesh);
    match open_if_exists(&mtl)? {
        Some(reader) => stage(observer, "Reading mtl file", || {
            Ok(parse_mtl(reader, &mut library)?)
        })?,
        None => warn_observer(
            observer,
            &format!("{} not found, every material will be untextured", mtl.display()),
        ),
    }

    let mut hierarchies = Vec::new();
    match open_if_exists(&input.with_extension("txt"))? {
        Some(reader) => {
            match stage(observer, "Reading collision box file", || {
                Ok(parse_description(reader)?)
            }) {
                Ok(parsed) => hierarchies = parsed,
                Err(err) => warn_observer(
                    observer,
                    &format!("unable to read collision box file for {}: {err}", input.display()),
                ),
            }
        }
        None if !options.collision_boxes => warn_observer(
            observer,
            &format!("no collision box file for {}", input.display()),
        ),
        None => {}
    }

    if options.collision_boxes {
        // Box wireframes from an earlier export are not geometry.
        for hierarchy in &hierarchies {
            hierarchy.strip_groups(&mut mesh);
        }
        hierarchies.clear();
    } else {
        let mut missing = Vec::new();
        stage(observer, "Reading collision boxes values", || {
            for hierarchy in &mut hierarchies {
                missing.extend(hierarchy.reconstruct(&mut mesh));
            }
            Ok(())
        })?;
        for name in missing {
            warn_observer(observer, &format!("the group {name} doesn't exist"));
        }
    }

    mesh.groups.sort_by(|a, b| natural_cmp(&a.name, &b.name));
    Ok(LoadedObj {
        mesh,
        library,
        hierarchies,
    })
}

/// Pack `groups` into one mdb at `path`.
///
/// The collision tree comes from `hierarchy` when given, otherwise it is
/// generated from the first group.
fn write_mdb(
    path: &Path,
    mesh: &ObjMesh,
    groups: &[&ObjGroup],
    library: &mut MaterialLibrary,
    hierarchy: Option<&BoxHierarchy>,
    observer: &mut dyn Observer,
) -> Result<()> {
    observer.log(&format!("---- {} ----", path.display()));
    let models = stage(observer, "Processing groups", || {
        Ok(groups
            .iter()
            .map(|group| pack_group(mesh, group, library))
            .collect::<CodecResult<Vec<_>>>()?)
    })?;

    let collision = match (hierarchy, groups.first()) {
        (Some(hierarchy), _) => hierarchy.root.clone(),
        (None, Some(first)) => stage(observer, "Creating collision boxes", || {
            Ok(CollisionBox::auto_generate(mesh, first))
        })?,
        (None, None) => CollisionBox::default(),
    };
    debug!(boxes = collision.count(), depth = collision.depth(), "collision tree");

    let out = MdbMesh {
        models,
        materials: library.to_vec(),
        collision: Some(collision),
    };
    stage(observer, "Writing mdb", || {
        let mut staged = StagedFile::create(path)?;
        encode_mdb(staged.writer(), &out)?;
        staged.commit()
    })
}

/// Pick the hierarchy for an output mesh, warning when one was expected but
/// none matches.
fn hierarchy_for<'a>(
    loaded: &'a LoadedObj,
    mesh: &str,
    options: &ConvertOptions,
    observer: &mut dyn Observer,
) -> Option<&'a BoxHierarchy> {
    if options.collision_boxes {
        return None;
    }
    let hierarchy = loaded.hierarchy(mesh);
    if hierarchy.is_none() {
        warn_observer(
            observer,
            &format!("no collision boxes found for {mesh}, generating new ones"),
        );
    }
    hierarchy
}

fn convert_grouped(
    input: &Path,
    output_dir: &Path,
    options: &ConvertOptions,
    observer: &mut dyn Observer,
) -> Result<()> {
    let mut loaded = load_obj(input, options, observer)?;
    let mut library = std::mem::take(&mut loaded.library);
    for (stem, chunk) in split_by_stem(&loaded.mesh.groups) {
        let hierarchy = hierarchy_for(&loaded, stem, options, observer);
        let path = output_dir.join(format!("{stem}.mdb"));
        write_mdb(&path, &loaded.mesh, &chunk, &mut library, hierarchy, observer)?;
    }
    Ok(())
}

/// Gather groups by output stem, stems in first-seen order and groups in
/// their existing order within each stem.
fn split_by_stem(groups: &[ObjGroup]) -> Vec<(&str, Vec<&ObjGroup>)> {
    let mut chunks: Vec<(&str, Vec<&ObjGroup>)> = Vec::new();
    for group in groups {
        let stem = output_stem(&group.name);
        match chunks.iter_mut().find(|(s, _)| *s == stem) {
            Some((_, chunk)) => chunk.push(group),
            None => chunks.push((stem, vec![group])),
        }
    }
    chunks
}

/// Split every OBJ into mdb files by group name.
///
/// Groups are sorted naturally and those sharing a name once a trailing
/// `_<integer>` is removed go to the same `<name>.mdb` in `output_dir`, in
/// that order. All files written from one OBJ share its material table.
///
/// # Errors
///
/// Per-input failures are reported in the [`BatchReport`]; this never fails
/// as a whole.
pub fn objs_to_grouped_mdbs<P: AsRef<Path>>(
    inputs: &[P],
    output_dir: &Path,
    options: &ConvertOptions,
    observer: &mut dyn Observer,
) -> Result<BatchReport> {
    let mut report = BatchReport::default();
    for input in inputs {
        let input = input.as_ref();
        let outcome = convert_grouped(input, output_dir, options, observer);
        report.record(input, outcome, observer);
    }
    Ok(report)
}

fn convert_whole(
    input: &Path,
    output_dir: &Path,
    options: &ConvertOptions,
    observer: &mut dyn Observer,
) -> Result<()> {
    let mut loaded = load_obj(input, options, observer)?;
    let mut library = std::mem::take(&mut loaded.library);
    let stem = file_stem(input);
    let hierarchy = hierarchy_for(&loaded, &stem, options, observer);
    let path = output_dir.join(format!("{stem}.mdb"));
    let groups: Vec<&ObjGroup> = loaded.mesh.groups.iter().collect();
    write_mdb(
        &path,
        &loaded.mesh,
        &groups,
        &mut library,
        hierarchy,
        observer,
    )
}

/// Convert every OBJ into one mdb named after it, each group becoming a
/// model.
///
/// # Errors
///
/// Per-input failures are reported in the [`BatchReport`]; this never fails
/// as a whole.
pub fn objs_to_mdbs<P: AsRef<Path>>(
    inputs: &[P],
    output_dir: &Path,
    options: &ConvertOptions,
    observer: &mut dyn Observer,
) -> Result<BatchReport> {
    let mut report = BatchReport::default();
    for input in inputs {
        let input = input.as_ref();
        let outcome = convert_whole(input, output_dir, options, observer);
        report.record(input, outcome, observer);
    }
    Ok(report)
}
