//! Atomic JSON file operations.
//!
//! A thin layer for safe access to the JSON state files. Every mutation is
//! a full-document rewrite: serialize to a temporary file in the same
//! directory, fsync, then atomically rename over the target. A failed write
//! can therefore never corrupt previously committed state.

use std::fs::{self, File, OpenOptions};
use std::io::Write as IoWrite;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::{Serialize, de::DeserializeOwned};

use rookery_core::error::{Result, RookeryError};

/// A handle to a JSON file with atomic full-file rewrites.
///
/// - **Atomicity**: updates are all-or-nothing via tmp file + rename
/// - **Isolation**: an advisory file lock serializes `update` calls
/// - **Durability**: explicit fsync before the rename
pub struct AtomicJsonFile<T> {
    path: PathBuf,
    _phantom: PhantomData<T>,
}

impl<T> AtomicJsonFile<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Creates a handle for the file at `path`.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _phantom: PhantomData,
        }
    }

    /// Loads and deserializes the file.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(T))`: loaded and parsed
    /// - `Ok(None)`: the file does not exist or is empty
    /// - `Err`: read or parse failure
    pub fn load(&self) -> Result<Option<T>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path)
            .map_err(|e| RookeryError::store(format!("read {}: {e}", self.path.display())))?;

        if content.trim().is_empty() {
            return Ok(None);
        }

        let data: T = serde_json::from_str(&content)?;
        Ok(Some(data))
    }

    /// Serializes `data` and atomically replaces the file with it.
    pub fn save(&self, data: &T) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)
                    .map_err(|e| RookeryError::store(format!("mkdir {}: {e}", parent.display())))?;
            }
        }

        let json = serde_json::to_string_pretty(data)?;

        // Write to a temporary file in the same directory so the rename
        // stays on one filesystem.
        let tmp_path = self.temp_path()?;
        let mut tmp_file = File::create(&tmp_path)
            .map_err(|e| RookeryError::store(format!("create {}: {e}", tmp_path.display())))?;
        tmp_file
            .write_all(json.as_bytes())
            .map_err(|e| RookeryError::store(format!("write {}: {e}", tmp_path.display())))?;
        tmp_file
            .sync_all()
            .map_err(|e| RookeryError::store(format!("fsync {}: {e}", tmp_path.display())))?;
        drop(tmp_file);

        fs::rename(&tmp_path, &self.path).map_err(|e| {
            RookeryError::store(format!(
                "rename {} -> {}: {e}",
                tmp_path.display(),
                self.path.display()
            ))
        })?;

        Ok(())
    }

    /// Performs a locked read-modify-write.
    ///
    /// Loads the current document (or `default_value` if missing), applies
    /// `f`, and saves atomically, all under an exclusive advisory lock.
    pub fn update<F>(&self, default_value: T, f: F) -> Result<()>
    where
        F: FnOnce(&mut T) -> Result<()>,
    {
        let _lock = FileLock::acquire(&self.path)?;

        let mut data = self.load()?.unwrap_or(default_value);
        f(&mut data)?;
        self.save(&data)?;

        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> Result<PathBuf> {
        let parent = self
            .path
            .parent()
            .ok_or_else(|| RookeryError::store("path has no parent directory"))?;
        let file_name = self
            .path
            .file_name()
            .ok_or_else(|| RookeryError::store("path has no file name"))?;
        let tmp_name = format!(".{}.tmp", file_name.to_string_lossy());
        Ok(parent.join(tmp_name))
    }
}

/// Advisory lock guard; released when dropped.
struct FileLock {
    #[allow(dead_code)]
    file: File,
    lock_path: PathBuf,
}

impl FileLock {
    fn acquire(path: &Path) -> Result<Self> {
        let lock_path = path.with_extension("lock");

        if let Some(parent) = lock_path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)
                    .map_err(|e| RookeryError::store(format!("mkdir {}: {e}", parent.display())))?;
            }
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| RookeryError::store(format!("open {}: {e}", lock_path.display())))?;

        #[cfg(unix)]
        {
            use fs2::FileExt;
            file.lock_exclusive()
                .map_err(|e| RookeryError::store(format!("lock {}: {e}", lock_path.display())))?;
        }

        #[cfg(not(unix))]
        {
            // No advisory locking off Unix; acceptable for a single-operator
            // process.
        }

        Ok(FileLock { file, lock_path })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        // Unlock happens when the handle drops; lock-file removal is best
        // effort.
        let _ = fs::remove_file(&self.lock_path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct TestDoc {
        name: String,
        count: u32,
    }

    #[test]
    fn save_and_load_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let file = AtomicJsonFile::<TestDoc>::new(temp_dir.path().join("doc.json"));

        let doc = TestDoc {
            name: "test".to_string(),
            count: 42,
        };
        file.save(&doc).unwrap();

        let loaded = file.load().unwrap().unwrap();
        assert_eq!(loaded, doc);
    }

    #[test]
    fn load_missing_file_is_none() {
        let temp_dir = TempDir::new().unwrap();
        let file = AtomicJsonFile::<TestDoc>::new(temp_dir.path().join("missing.json"));
        assert!(file.load().unwrap().is_none());
    }

    #[test]
    fn load_empty_file_is_none() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("empty.json");
        fs::write(&path, "").unwrap();
        let file = AtomicJsonFile::<TestDoc>::new(path);
        assert!(file.load().unwrap().is_none());
    }

    #[test]
    fn update_applies_on_top_of_existing_state() {
        let temp_dir = TempDir::new().unwrap();
        let file = AtomicJsonFile::<TestDoc>::new(temp_dir.path().join("doc.json"));
        let default = TestDoc {
            name: "default".to_string(),
            count: 0,
        };

        file.update(default.clone(), |doc| {
            doc.count += 10;
            Ok(())
        })
        .unwrap();
        file.update(default, |doc| {
            doc.count += 5;
            Ok(())
        })
        .unwrap();

        assert_eq!(file.load().unwrap().unwrap().count, 15);
    }

    #[test]
    fn save_leaves_no_temp_file_behind() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("doc.json");
        let file = AtomicJsonFile::<TestDoc>::new(path.clone());

        file.save(&TestDoc {
            name: "test".to_string(),
            count: 1,
        })
        .unwrap();

        assert!(!temp_dir.path().join(".doc.json.tmp").exists());
        assert!(path.exists());
    }
}
