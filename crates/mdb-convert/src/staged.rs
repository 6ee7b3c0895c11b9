//! Input files and outputs that only appear once complete.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::{Error, Result};

pub(crate) fn open(path: &Path) -> Result<BufReader<File>> {
    File::open(path).map(BufReader::new).map_err(Error::io(path))
}

/// Open `path`, or `None` when it does not exist.
pub(crate) fn open_if_exists(path: &Path) -> Result<Option<BufReader<File>>> {
    match File::open(path) {
        Ok(file) => Ok(Some(BufReader::new(file))),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::io(path)(e)),
    }
}

/// An output written to a temporary sibling and renamed over `path` by
/// [`StagedFile::commit`]. Dropping it uncommitted removes the temporary.
pub(crate) struct StagedFile {
    path: PathBuf,
    writer: BufWriter<NamedTempFile>,
}

impl StagedFile {
    pub fn create(path: &Path) -> Result<Self> {
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let file = NamedTempFile::new_in(dir).map_err(Error::io(dir))?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        })
    }

    pub fn writer(&mut self) -> &mut BufWriter<NamedTempFile> {
        &mut self.writer
    }

    pub fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer.write_all(bytes).map_err(Error::io(&self.path))
    }

    pub fn commit(self) -> Result<()> {
        Self::commit_all(vec![self])
    }

    /// Flush every file, then move them into place in order.
    ///
    /// Nothing is moved unless every file flushed, so a file that refers to
    /// the others goes last.
    pub fn commit_all(files: Vec<StagedFile>) -> Result<()> {
        let flushed = files
            .into_iter()
            .map(StagedFile::flush)
            .collect::<Result<Vec<_>>>()?;
        for (path, file) in flushed {
            file.persist(&path).map_err(|e| Error::io(&path)(e.error))?;
        }
        Ok(())
    }

    fn flush(self) -> Result<(PathBuf, NamedTempFile)> {
        let Self { path, writer } = self;
        let file = writer
            .into_inner()
            .map_err(|e| Error::io(&path)(e.into_error()))?;
        Ok((path, file))
    }
}
