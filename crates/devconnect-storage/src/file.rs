//! JSON file storage backend.

use crate::{StorageError, StorageResult, TokenStore};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

/// Stores key-value pairs as a flat JSON object in a single file.
///
/// The whole map is rewritten on every mutation through a uniquely named
/// temporary file and a rename, so a crash never leaves a half-written file
/// behind. On Unix the temporary file is created with mode `0600`, so tokens
/// are never readable by other users.
pub struct FileStorage {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStorage {
    /// Open the store at `path`, loading existing entries if the file exists.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let entries = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content).map_err(|e| {
                    StorageError::Encoding(format!("{}: {}", path.display(), e))
                })?
            }
        } else {
            BTreeMap::new()
        };

        debug!(path = %path.display(), entries = entries.len(), "Opened token file");

        Ok(Self {
            path: path.to_path_buf(),
            entries: Mutex::new(entries),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `entries` to disk. The caller swaps them into memory only after
    /// this succeeds, so the map never holds state the file does not.
    fn persist(&self, entries: &BTreeMap<String, String>) -> StorageResult<()> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let content = serde_json::to_string_pretty(entries)
            .map_err(|e| StorageError::Encoding(e.to_string()))?;

        let file_name = self
            .path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("tokens.json");
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let tmp_path = dir.join(format!(".{}.tmp.{}.{}", file_name, std::process::id(), nanos));

        let written = write_private(&tmp_path, content.as_bytes())
            .and_then(|()| std::fs::rename(&tmp_path, &self.path));
        if let Err(e) = written {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(e.into());
        }
        Ok(())
    }
}

/// Create `path` (which must not exist) readable by the owner only, and
/// sync its contents.
fn write_private(path: &Path, content: &[u8]) -> io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    file.write_all(content)?;
    file.sync_all()
}

impl TokenStore for FileStorage {
    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut entries = self.entries.lock();
        let mut next = entries.clone();
        next.insert(key.to_string(), value.to_string());
        self.persist(&next)?;
        *entries = next;
        Ok(())
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        let mut entries = self.entries.lock();
        if !entries.contains_key(key) {
            return Ok(false);
        }
        let mut next = entries.clone();
        next.remove(key);
        self.persist(&next)?;
        *entries = next;
        Ok(true)
    }
}
