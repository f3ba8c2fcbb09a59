//! Crash-safe persistence of `sync_offset`: `prog.log` holds the last snapshot as 8
//! little-endian bytes; `save` writes to `prog.tmp` and renames it over `prog.log`, which is
//! atomic on the same file system.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub struct ProgressStore {
    path: PathBuf,
    tmp_path: PathBuf,
}

impl ProgressStore {
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join("prog.log"),
            tmp_path: dir.join("prog.tmp"),
        }
    }

    /// Returns the last snapshotted offset, or 0 if `prog.log` doesn't exist yet.
    pub fn load(&self) -> Result<u64> {
        match fs::read(&self.path) {
            Ok(bytes) => {
                let buf: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
                    Error::ConfigurationFailure(format!(
                        "{:?} has unexpected length {}, expected 8",
                        self.path,
                        bytes.len()
                    ))
                })?;
                Ok(u64::from_le_bytes(buf))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(Error::ConfigurationFailure(format!(
                "open {:?}: {e}",
                self.path
            ))),
        }
    }

    pub fn save(&self, offset: u64) -> Result<()> {
        fs::write(&self.tmp_path, offset.to_le_bytes())?;
        fs::rename(&self.tmp_path, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn load_is_zero_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProgressStore::new(dir.path());
        assert_eq!(store.load().unwrap(), 0);
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProgressStore::new(dir.path());
        store.save(4096).unwrap();
        assert_eq!(store.load().unwrap(), 4096);
        assert!(!dir.path().join("prog.tmp").exists());
    }

    #[test]
    fn repeated_saves_overwrite_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProgressStore::new(dir.path());
        store.save(10).unwrap();
        store.save(20).unwrap();
        assert_eq!(store.load().unwrap(), 20);
    }
}
