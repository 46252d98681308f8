//! Enumerable, readable file store.

use crate::error::IngestResult;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub trait FileStore {
    /// Names relative to the store root, in processing order.
    fn list(&self) -> IngestResult<Vec<String>>;

    /// Whole-file content. An unreadable file reads as empty.
    fn read(&self, name: &str) -> String;
}

/// Files under a directory, walked recursively.
pub struct DirFileStore {
    root: PathBuf,
}

impl DirFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn walk(&self, dir: &Path, out: &mut Vec<String>) -> IngestResult<()> {
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                self.walk(&path, out)?;
            } else if let Ok(rel) = path.strip_prefix(&self.root) {
                let name = rel
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                out.push(name);
            }
        }
        Ok(())
    }
}

impl FileStore for DirFileStore {
    fn list(&self) -> IngestResult<Vec<String>> {
        let mut names = Vec::new();
        self.walk(&self.root, &mut names)?;
        names.sort();
        Ok(names)
    }

    fn read(&self, name: &str) -> String {
        match std::fs::read(self.root.join(name)) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                log::warn!(
                    "Cannot read {name}: {e}; treating as empty, which replaces \
                     any risk checks already stored for it with none"
                );
                String::new()
            }
        }
    }
}

/// Name -> content map. Used by tests and by callers that already hold
/// log content in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryFileStore {
    files: BTreeMap<String, String>,
}

impl MemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, content: impl Into<String>) {
        self.files.insert(name.into(), content.into());
    }
}

impl FileStore for MemoryFileStore {
    fn list(&self) -> IngestResult<Vec<String>> {
        Ok(self.files.keys().cloned().collect())
    }

    fn read(&self, name: &str) -> String {
        self.files.get(name).cloned().unwrap_or_default()
    }
}
