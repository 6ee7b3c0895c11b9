//! Print a JSON summary of mdb files.
//!
//! Run: `cargo run -p mdb-convert --features test-tools --bin mdb_summary -- <file.mdb>...`

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};
use mdb_codec::{MdbMesh, decode_mdb};
use serde_json::{Value, json};

fn summarize(path: &Path) -> Result<Value> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mesh: MdbMesh = decode_mdb(BufReader::new(file), &stem)
        .with_context(|| format!("decoding {}", path.display()))?;

    let models: Vec<Value> = mesh
        .models
        .iter()
        .map(|m| {
            json!({
                "name": m.name,
                "vertices": m.vertices.len(),
                "triangles": m.triangle_count(),
                "material_runs": m.runs.len(),
            })
        })
        .collect();
    let materials: Vec<Value> = mesh
        .materials
        .iter()
        .map(|m| json!({ "name": m.name, "texture": m.texture }))
        .collect();
    let boxes = mesh.collision.as_ref().map_or(Value::Null, |root| {
        json!({ "count": root.count(), "depth": root.depth() })
    });

    Ok(json!({
        "file": path.display().to_string(),
        "models": models,
        "materials": materials,
        "collision_boxes": boxes,
    }))
}

fn main() -> Result<()> {
    let paths: Vec<String> = std::env::args().skip(1).collect();
    if paths.is_empty() {
        anyhow::bail!("usage: mdb_summary <file.mdb>...");
    }

    let summaries = paths
        .iter()
        .map(|p| summarize(Path::new(p)))
        .collect::<Result<Vec<_>>>()?;
    println!("{}", serde_json::to_string_pretty(&summaries)?);
    Ok(())
}
