//! mdb → OBJ batch jobs.

use std::io::Write;
use std::path::Path;

use mdb_codec::{MaterialLibrary, ObjCounters, decode_mdb, write_mesh, write_mtl};
use tracing::info;

use crate::batch::{BatchReport, file_stem, stage};
use crate::error::Result;
use crate::observer::Observer;
use crate::options::ConvertOptions;
use crate::staged::{StagedFile, open};

/// State carried from one mdb to the next within an OBJ.
#[derive(Default)]
struct ObjState {
    library: MaterialLibrary,
    counters: ObjCounters,
}

/// OBJ text and description lines produced for one mdb.
struct ObjChunk {
    obj: Vec<u8>,
    description: Vec<u8>,
}

/// Decode `input` and render it against `state`, which is only advanced when
/// the whole file converts.
fn convert_mdb(
    input: &Path,
    state: &mut ObjState,
    export_boxes: bool,
    observer: &mut dyn Observer,
) -> Result<ObjChunk> {
    let stem = file_stem(input);
    let mesh = stage(observer, &format!("Reading {}", input.display()), || {
        Ok(decode_mdb(open(input)?, &stem)?)
    })?;

    let mut library = state.library.clone();
    let mut counters = state.counters;
    let mut chunk = ObjChunk {
        obj: Vec::new(),
        description: Vec::new(),
    };
    stage(observer, "Writing obj", || {
        let names = library.merge(&mesh.materials)?;
        let description = export_boxes.then_some(&mut chunk.description as &mut dyn Write);
        write_mesh(&mut chunk.obj, description, &mesh, &stem, &names, &mut counters)?;
        Ok(())
    })?;

    state.library = library;
    state.counters = counters;
    Ok(chunk)
}

fn mtllib_line(mtl_path: &Path) -> String {
    let name = mtl_path.file_name().unwrap_or_default().to_string_lossy();
    format!("mtllib {name}\n")
}

fn stage_mtl(path: &Path, library: &MaterialLibrary, options: &ConvertOptions) -> Result<StagedFile> {
    let mut staged = StagedFile::create(path)?;
    write_mtl(
        staged.writer(),
        library,
        &options.texture_directory,
        &options.texture_extension,
    )?;
    Ok(staged)
}

/// Stage the MTL and, when exporting boxes, the description next to `obj`,
/// then commit all of them with the OBJ last.
fn commit_outputs(
    obj: StagedFile,
    obj_path: &Path,
    library: &MaterialLibrary,
    description: &[u8],
    options: &ConvertOptions,
) -> Result<()> {
    let mut files = vec![stage_mtl(&obj_path.with_extension("mtl"), library, options)?];
    if options.collision_boxes {
        let mut txt = StagedFile::create(&obj_path.with_extension("txt"))?;
        txt.write_all(description)?;
        files.push(txt);
    }
    files.push(obj);
    StagedFile::commit_all(files)
}

/// Convert many mdb files into a single OBJ at `obj_path`, with a sibling
/// MTL and, when exporting boxes, a sibling `.txt` description.
///
/// Index counters continue from one input to the next, and the MTL lists
/// the materials of every converted input. A failed input contributes
/// nothing.
///
/// # Errors
///
/// Per-input failures are reported in the [`BatchReport`]; an error is only
/// returned when an output file cannot be written.
pub fn mdbs_to_obj<P: AsRef<Path>>(
    inputs: &[P],
    obj_path: &Path,
    options: &ConvertOptions,
    observer: &mut dyn Observer,
) -> Result<BatchReport> {
    let mtl_path = obj_path.with_extension("mtl");
    let mut obj = StagedFile::create(obj_path)?;
    obj.write_all(mtllib_line(&mtl_path).as_bytes())?;

    let mut state = ObjState::default();
    let mut description = Vec::new();
    let mut report = BatchReport::default();

    for input in inputs {
        let input = input.as_ref();
        let outcome = convert_mdb(input, &mut state, options.collision_boxes, observer)
            .and_then(|chunk| {
                obj.write_all(&chunk.obj)?;
                description.extend(chunk.description);
                Ok(())
            });
        report.record(input, outcome, observer);
    }

    stage(observer, "Writing outputs", || {
        commit_outputs(obj, obj_path, &state.library, &description, options)
    })?;

    info!(
        output = %obj_path.display(),
        completed = report.completed.len(),
        failed = report.failed.len(),
        "wrote OBJ"
    );
    Ok(report)
}

/// Convert every mdb file into its own OBJ, MTL and, when exporting boxes,
/// `.txt` description inside `output_dir`.
///
/// # Errors
///
/// Per-input failures are reported in the [`BatchReport`]; this never fails
/// as a whole.
pub fn mdbs_to_objs<P: AsRef<Path>>(
    inputs: &[P],
    output_dir: &Path,
    options: &ConvertOptions,
    observer: &mut dyn Observer,
) -> Result<BatchReport> {
    let mut report = BatchReport::default();
    let mut next_box = 0;

    for input in inputs {
        let input = input.as_ref();
        let obj_path = output_dir.join(file_stem(input) + ".obj");
        observer.log(&format!("---- {} ----", obj_path.display()));

        let mut state = ObjState::default();
        state.counters.next_box = next_box;
        let outcome = convert_mdb(input, &mut state, options.collision_boxes, observer)
            .and_then(|chunk| {
                let mut obj = StagedFile::create(&obj_path)?;
                obj.write_all(mtllib_line(&obj_path.with_extension("mtl")).as_bytes())?;
                obj.write_all(&chunk.obj)?;
                commit_outputs(obj, &obj_path, &state.library, &chunk.description, options)
            });
        next_box = state.counters.next_box;
        report.record(input, outcome, observer);
    }
    Ok(report)
}
