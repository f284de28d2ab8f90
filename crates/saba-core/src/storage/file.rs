use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, SabaError};

/// Whole-value JSON store with one document per key under a data directory.
/// The production stand-in for the reference build's browser-local storage.
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Open (creating if needed) a file store rooted at `dir`.
    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir).map_err(|e| {
            SabaError::Persistence(format!("cannot create data dir {}: {e}", dir.display()))
        })?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Absent key is not an error — it reads as `None`.
    pub fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&path).map_err(|e| {
            SabaError::Persistence(format!("cannot read {}: {e}", path.display()))
        })?;
        let value = serde_json::from_str(&raw).map_err(|e| {
            SabaError::Persistence(format!("corrupt store at {}: {e}", path.display()))
        })?;
        Ok(Some(value))
    }

    /// Whole-value overwrite. Written via a temp file then renamed so a crash
    /// mid-write cannot leave a truncated document behind.
    pub fn set(&self, key: &str, value: &serde_json::Value) -> Result<()> {
        let path = self.path_for(key);
        let tmp = self.dir.join(format!("{key}.json.tmp"));
        let raw = serde_json::to_string_pretty(value)?;
        fs::write(&tmp, raw).map_err(|e| {
            SabaError::Persistence(format!("cannot write {}: {e}", tmp.display()))
        })?;
        fs::rename(&tmp, &path).map_err(|e| {
            SabaError::Persistence(format!("cannot rename into {}: {e}", path.display()))
        })?;
        Ok(())
    }
}
