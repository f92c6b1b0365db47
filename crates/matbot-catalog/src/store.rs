//! Durable catalog store
//!
//! Write-through persistence: every [`CatalogStore::append`] rewrites the
//! whole document before returning. The new document is staged in a
//! temporary file next to the data file, flushed, and renamed over it, so a
//! crash leaves either the previous or the new document on disk, never a
//! partial one.

use crate::catalog::{Catalog, SkippedEntry};
use crate::error::CatalogError;
use crate::types::{MediaReference, TaskId};
use parking_lot::RwLock;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Where the loaded catalog came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadSource {
    /// No data file yet
    Missing,
    /// Data file parsed
    File,
    /// Data file present but unusable; started empty
    Unreadable(String),
}

/// Outcome of reading the data file
#[derive(Debug, Clone)]
pub struct LoadReport {
    /// Origin of the catalog
    pub source: LoadSource,
    /// Entries dropped during decoding
    pub skipped: Vec<SkippedEntry>,
}

impl LoadReport {
    /// True if the file was read without any complaint
    #[inline]
    #[must_use]
    pub fn is_clean(&self) -> bool {
        !matches!(self.source, LoadSource::Unreadable(_)) && self.skipped.is_empty()
    }

    fn empty(source: LoadSource) -> Self {
        Self {
            source,
            skipped: Vec::new(),
        }
    }
}

/// Catalog bound to its data file
#[derive(Debug)]
pub struct CatalogStore {
    path: PathBuf,
    catalog: RwLock<Catalog>,
}

impl CatalogStore {
    /// Open store, loading whatever is durable at `path`
    ///
    /// Never fails: a missing or corrupt file yields an empty catalog and
    /// problems are logged.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::open_with_report(path).0
    }

    /// Open store and return the load report alongside it
    #[must_use]
    pub fn open_with_report(path: impl Into<PathBuf>) -> (Self, LoadReport) {
        let path = path.into();
        let (catalog, report) = Self::load(&path);
        let store = Self {
            path,
            catalog: RwLock::new(catalog),
        };
        (store, report)
    }

    /// Read durable state from `path`
    ///
    /// A missing file is an empty catalog. A file that cannot be read or is
    /// not a catalog document is logged and also treated as empty.
    #[must_use]
    pub fn load(path: &Path) -> (Catalog, LoadReport) {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!("No catalog at {}, starting empty", path.display());
                return (Catalog::new(), LoadReport::empty(LoadSource::Missing));
            }
            Err(e) => {
                tracing::error!("Cannot read catalog {}: {}", path.display(), e);
                return (
                    Catalog::new(),
                    LoadReport::empty(LoadSource::Unreadable(e.to_string())),
                );
            }
        };

        match Catalog::decode(&text) {
            Ok((catalog, skipped)) => {
                for entry in &skipped {
                    tracing::warn!("Skipping catalog entry in {}: {}", path.display(), entry);
                }
                tracing::info!(
                    "Loaded catalog from {}: {} tasks, {} items",
                    path.display(),
                    catalog.non_empty().len(),
                    catalog.total_items()
                );
                (
                    catalog,
                    LoadReport {
                        source: LoadSource::File,
                        skipped,
                    },
                )
            }
            Err(e) => {
                tracing::error!("Corrupt catalog {}, starting empty: {}", path.display(), e);
                (
                    Catalog::new(),
                    LoadReport::empty(LoadSource::Unreadable(e.to_string())),
                )
            }
        }
    }

    /// Data file location
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append reference to a task and persist before returning
    ///
    /// The in-memory catalog only changes once the new document is durable.
    ///
    /// # Errors
    /// Returns `CatalogError` if the document could not be written; the
    /// store then still reflects the previous durable state.
    pub fn append(&self, task: TaskId, reference: MediaReference) -> Result<(), CatalogError> {
        let mut guard = self.catalog.write();
        let mut next = guard.clone();
        next.push(task, reference);

        if let Err(e) = write_atomic(&self.path, &next) {
            tracing::error!("Failed to persist catalog to {}: {}", self.path.display(), e);
            return Err(e);
        }

        *guard = next;
        Ok(())
    }

    /// References for a task, in display order
    #[must_use]
    pub fn get(&self, task: TaskId) -> Vec<MediaReference> {
        self.catalog.read().get(task).to_vec()
    }

    /// References for a raw task number; empty when out of range
    #[must_use]
    pub fn lookup(&self, task: u64) -> Vec<MediaReference> {
        self.catalog.read().lookup(task).to_vec()
    }

    /// `(task, count)` of every populated task, ascending
    #[must_use]
    pub fn list_non_empty(&self) -> Vec<(TaskId, usize)> {
        self.catalog.read().non_empty()
    }

    /// Copy of the current catalog
    #[must_use]
    pub fn snapshot(&self) -> Catalog {
        self.catalog.read().clone()
    }
}

fn write_atomic(path: &Path, catalog: &Catalog) -> Result<(), CatalogError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut staged = NamedTempFile::new_in(dir).map_err(|e| CatalogError::io(dir, e))?;
    // the staged file is created private; keep whatever mode the data file had
    if let Ok(meta) = std::fs::metadata(path) {
        staged
            .as_file()
            .set_permissions(meta.permissions())
            .map_err(|e| CatalogError::io(staged.path(), e))?;
    }
    serde_json::to_writer_pretty(&mut staged, catalog)?;
    staged
        .write_all(b"\n")
        .and_then(|()| staged.as_file().sync_all())
        .map_err(|e| CatalogError::io(staged.path(), e))?;

    staged.persist(path).map_err(|e| CatalogError::Persist {
        path: path.to_path_buf(),
        source: e.error,
    })?;
    // the new document is already in place
    if let Err(e) = sync_dir(dir) {
        tracing::warn!("Catalog written but directory not synced: {}", e);
    }
    Ok(())
}

/// Flush the directory entry so the rename itself survives a crash
#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<(), CatalogError> {
    std::fs::File::open(dir)
        .and_then(|d| d.sync_all())
        .map_err(|e| CatalogError::io(dir, e))
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<(), CatalogError> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn task(n: u64) -> TaskId {
        TaskId::new(n).unwrap()
    }

    #[test]
    fn missing_file_is_empty_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let (store, report) = CatalogStore::open_with_report(dir.path().join("materials.json"));

        assert_eq!(report.source, LoadSource::Missing);
        assert!(report.is_clean());
        assert!(store.list_non_empty().is_empty());
    }

    #[test]
    fn append_writes_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("materials.json");
        let store = CatalogStore::open(&path);

        store.append(task(2), MediaReference::audio("a1")).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value, serde_json::json!({ "2": [["audio", "a1"]] }));
    }

    #[cfg(unix)]
    #[test]
    fn append_keeps_file_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("materials.json");
        std::fs::write(&path, "{}").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let store = CatalogStore::open(&path);
        store.append(task(1), MediaReference::video("v")).unwrap();
        store.append(task(1), MediaReference::video("w")).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
        assert_eq!(store.get(task(1)).len(), 2);
    }

    #[test]
    fn failed_persist_keeps_previous_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("materials.json");
        let store = CatalogStore::open(&path);

        let err = store
            .append(task(4), MediaReference::document("d"))
            .unwrap_err();

        assert!(err.is_storage());
        assert!(store.get(task(4)).is_empty());
        assert!(!path.exists());
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("materials.json");
        std::fs::write(&path, "{ not json").unwrap();

        let (store, report) = CatalogStore::open_with_report(&path);

        assert!(matches!(report.source, LoadSource::Unreadable(_)));
        assert!(!report.is_clean());
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn lookup_never_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = CatalogStore::open(dir.path().join("materials.json"));

        assert!(store.lookup(0).is_empty());
        assert!(store.lookup(7).is_empty());
        assert!(store.lookup(1000).is_empty());
    }
}
