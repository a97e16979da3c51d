//! # Storage Module - Session Persistence
//!
//! One [`SessionDocument`] per chat session key, behind the [`SessionStore`] trait.
//!
//! ```text
//! data/
//! └── sessions/
//!     ├── chat42.json
//!     └── %2D1001.json      ← keys are percent-encoded into file names
//! ```
//!
//! [`JsonFileStore`] is the on-disk backend: pretty JSON, written through a
//! temp file and renamed over the target while an exclusive `fs2` lock is held, so
//! readers never observe a half-written document. [`MemoryStore`] keeps documents
//! in a map for tests and throwaway runs.
//!
//! Stores are synchronous. The registry calls them while it holds the per-session
//! lock, which is what serializes writers for a key.

use fs2::FileExt;
use log::{debug, warn};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::game::{GameError, SessionDocument};
use crate::validation::session_file_name;

/// Save/load/delete of session documents keyed by chat session id.
pub trait SessionStore: Send + Sync {
    fn save(&self, key: &str, doc: &SessionDocument) -> Result<(), GameError>;

    /// `Ok(None)` when nothing is stored under `key`.
    fn load(&self, key: &str) -> Result<Option<SessionDocument>, GameError>;

    /// Deleting a missing key is not an error.
    fn delete(&self, key: &str) -> Result<(), GameError>;
}

pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Open (and create if needed) the sessions directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, GameError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(JsonFileStore { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(session_file_name(key))
    }

    /// Keys of every stored document, decoded from the file names.
    pub fn keys(&self) -> Result<Vec<String>, GameError> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(stem) = name.strip_suffix(".json") else {
                continue;
            };
            if stem.starts_with('.') {
                continue;
            }
            match percent_encoding::percent_decode_str(stem).decode_utf8() {
                Ok(key) => keys.push(key.into_owned()),
                Err(e) => warn!("skipping undecodable session file {}: {}", name, e),
            }
        }
        keys.sort();
        Ok(keys)
    }
}

/// `.<file>.lock` beside the document.
fn lock_path_for(path: &Path) -> PathBuf {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    dir.join(format!(
        ".{}.lock",
        path.file_name().and_then(|s| s.to_str()).unwrap_or("session")
    ))
}

/// Replace `path` with `content` via temp file + rename under an exclusive lock.
fn write_atomic(path: &Path, content: &str) -> std::io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    // Lock file sits beside the target so the rename does not drop the lock.
    let lock_path = lock_path_for(path);
    let lock_file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(&lock_path)?;
    lock_file.lock_exclusive()?;

    let base = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("session.json");
    let mut counter = 0u32;
    let tmp_path = loop {
        let candidate = dir.join(format!(".{}.tmp-{}-{}", base, std::process::id(), counter));
        match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(mut tmp) => {
                tmp.write_all(content.as_bytes())?;
                tmp.flush()?;
                let _ = tmp.sync_all();
                break candidate;
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                counter = counter.saturating_add(1);
            }
            Err(e) => return Err(e),
        }
    };
    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e);
    }
    if let Ok(dirf) = File::open(dir) {
        let _ = dirf.sync_all();
    }
    let _ = fs2::FileExt::unlock(&lock_file);
    Ok(())
}

impl SessionStore for JsonFileStore {
    fn save(&self, key: &str, doc: &SessionDocument) -> Result<(), GameError> {
        let path = self.path_for(key);
        let content = serde_json::to_string_pretty(doc)?;
        write_atomic(&path, &content)?;
        debug!("saved session document {}", path.display());
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<SessionDocument>, GameError> {
        let path = self.path_for(key);
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&content)?))
    }

    fn delete(&self, key: &str) -> Result<(), GameError> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => debug!("deleted session document {}", path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        match fs::remove_file(lock_path_for(&path)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process store; documents are cloned in and out.
#[derive(Default)]
pub struct MemoryStore {
    docs: Mutex<HashMap<String, SessionDocument>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.docs.lock().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn with_docs<T>(&self, f: impl FnOnce(&mut HashMap<String, SessionDocument>) -> T) -> T {
        let mut guard = self
            .docs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }
}

impl SessionStore for MemoryStore {
    fn save(&self, key: &str, doc: &SessionDocument) -> Result<(), GameError> {
        self.with_docs(|docs| docs.insert(key.to_string(), doc.clone()));
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<SessionDocument>, GameError> {
        Ok(self.with_docs(|docs| docs.get(key).cloned()))
    }

    fn delete(&self, key: &str) -> Result<(), GameError> {
        self.with_docs(|docs| docs.remove(key));
        Ok(())
    }
}
