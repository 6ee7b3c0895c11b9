//! Convert mdb ship models to and from Wavefront OBJ.
//!
//! Run: `cargo run -p mdb-convert --bin mdbconv -- to-obj ships/*.mdb -o fleet.obj`

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use mdb_convert::{
    BatchReport, ConvertOptions, TracingObserver, mdbs_to_obj, mdbs_to_objs,
    objs_to_grouped_mdbs, objs_to_mdbs,
};
use tracing::Level;

#[derive(Parser, Debug)]
#[command(name = "mdbconv", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log every conversion stage.
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Combine mdb files into a single OBJ.
    ToObj(Job),
    /// Write one OBJ per mdb file into a folder.
    ToObjs(Job),
    /// Split OBJ files into one mdb per group name.
    ToGroupedMdbs(Job),
    /// Write one mdb per OBJ file into a folder.
    ToMdbs(Job),
}

#[derive(Args, Debug)]
struct Job {
    /// Files to convert.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output OBJ for `to-obj`, output folder otherwise.
    #[arg(long, short)]
    output: PathBuf,

    /// mdb → OBJ: export collision box wireframes and their description.
    /// OBJ → mdb: generate collision boxes instead of reading the description.
    #[arg(long)]
    boxes: bool,

    /// Prefix for texture paths in written MTL files.
    #[arg(long, default_value = "")]
    texture_dir: String,

    /// Texture extension used in written MTL files.
    #[arg(long, default_value = "dds")]
    texture_ext: String,
}

impl Job {
    fn options(&self) -> ConvertOptions {
        ConvertOptions {
            collision_boxes: self.boxes,
            texture_directory: self.texture_dir.clone(),
            texture_extension: self.texture_ext.clone(),
        }
    }
}

fn run(command: &Command) -> Result<BatchReport> {
    let mut observer = TracingObserver;
    let report = match command {
        Command::ToObj(job) => mdbs_to_obj(&job.inputs, &job.output, &job.options(), &mut observer),
        Command::ToObjs(job) => {
            std::fs::create_dir_all(&job.output)
                .with_context(|| format!("creating {}", job.output.display()))?;
            mdbs_to_objs(&job.inputs, &job.output, &job.options(), &mut observer)
        }
        Command::ToGroupedMdbs(job) => {
            std::fs::create_dir_all(&job.output)
                .with_context(|| format!("creating {}", job.output.display()))?;
            objs_to_grouped_mdbs(&job.inputs, &job.output, &job.options(), &mut observer)
        }
        Command::ToMdbs(job) => {
            std::fs::create_dir_all(&job.output)
                .with_context(|| format!("creating {}", job.output.display()))?;
            objs_to_mdbs(&job.inputs, &job.output, &job.options(), &mut observer)
        }
    };
    Ok(report?)
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .init();

    let report = run(&cli.command)?;
    println!(
        "{} converted, {} skipped",
        report.completed.len(),
        report.failed.len()
    );
    for failure in &report.failed {
        eprintln!("skipped {}: {}", failure.input.display(), failure.error);
    }
    Ok(if report.failed.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
