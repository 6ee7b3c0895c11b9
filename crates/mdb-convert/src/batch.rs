//! Shared batch bookkeeping.

use std::error::Error as _;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, error, info};

use crate::error::{Error, Result};
use crate::observer::Observer;

/// Outcome of one batch job.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Inputs that were fully converted, in input order.
    pub completed: Vec<PathBuf>,
    /// Inputs that were skipped.
    pub failed: Vec<Failure>,
}

/// An input that could not be converted.
#[derive(Debug)]
pub struct Failure {
    pub input: PathBuf,
    pub error: Error,
}

impl BatchReport {
    /// Number of inputs handled, successful or not.
    #[must_use]
    pub fn processed(&self) -> usize {
        self.completed.len() + self.failed.len()
    }

    pub(crate) fn record(&mut self, input: &Path, outcome: Result<()>, observer: &mut dyn Observer) {
        match outcome {
            Ok(()) => {
                info!(input = %input.display(), "converted");
                self.completed.push(input.to_path_buf());
            }
            Err(err) => {
                let message = describe(&err);
                error!(input = %input.display(), "{message}");
                observer.log(&format!("Skipped {}: {message}", input.display()));
                self.failed.push(Failure {
                    input: input.to_path_buf(),
                    error: err,
                });
            }
        }
        observer.progress(self.processed());
    }
}

/// An error followed by its sources, separated by `: `.
fn describe(err: &Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Run one conversion stage, logging how long it took.
pub(crate) fn stage<T>(
    observer: &mut dyn Observer,
    label: &str,
    run: impl FnOnce() -> Result<T>,
) -> Result<T> {
    let start = Instant::now();
    let value = run()?;
    let elapsed = start.elapsed();
    debug!(?elapsed, "{label}");
    observer.log(&format!("{label} ... done in {elapsed:.2?}"));
    Ok(value)
}

/// File name without directories or extension.
pub(crate) fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}
