//! File backed archive mutation state.
//!
//! The state file is replaced atomically on write, guarded by an advisory
//! lock on a sibling `.lock` file that is never removed.

use std::fmt::Display;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use csw_catalog::{MutationRecord, MutationStore, StoreError};
use fslock::LockFile;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct FileMutationStore {
    path: PathBuf,
}

impl FileMutationStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        self.path.with_extension("lock")
    }

    fn acquire_lock(&self) -> Result<LockFile, StoreError> {
        let lock_path = self.lock_path();
        fs::create_dir_all(parent_dir(&lock_path)).map_err(StoreError::Io)?;
        let mut lock = LockFile::open(&lock_path).map_err(lock_error)?;
        lock.lock().map_err(lock_error)?;
        Ok(lock)
    }
}

fn lock_error(err: impl Display) -> StoreError {
    StoreError::Lock(std::io::Error::other(err.to_string()))
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

impl MutationStore for FileMutationStore {
    fn read(&self) -> Result<MutationRecord, StoreError> {
        let _lock = self.acquire_lock()?;

        if !self.path.exists() {
            debug!(path = %self.path.display(), "mutation state not found, using defaults");
            return Ok(MutationRecord::default());
        }

        let contents = fs::read_to_string(&self.path).map_err(StoreError::Io)?;
        serde_json::from_str(&contents).map_err(StoreError::Malformed)
    }

    fn write(&self, record: &MutationRecord) -> Result<(), StoreError> {
        let _lock = self.acquire_lock()?;

        let temp_file =
            tempfile::NamedTempFile::new_in(parent_dir(&self.path)).map_err(StoreError::Io)?;
        {
            let mut writer = BufWriter::new(&temp_file);
            serde_json::to_writer_pretty(&mut writer, record).map_err(StoreError::Malformed)?;
            writer.flush().map_err(StoreError::Io)?;
        }
        temp_file
            .persist(&self.path)
            .map_err(|err| StoreError::Io(err.error))?;

        debug!(path = %self.path.display(), ?record, "wrote mutation state");
        Ok(())
    }
}
