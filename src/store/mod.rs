// ABOUTME: On-disk release store: versioned release directories plus the current pointer.
// ABOUTME: The pointer is a symlink swapped via rename so readers never see it missing.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::types::{AppName, ReleaseId};

/// Directory under the application root holding one subdirectory per release.
pub const RELEASES_DIR: &str = "releases";

/// Symlink under the application root naming the live release.
pub const CURRENT_LINK: &str = "current";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StoreError {
    fn io(path: &Path, source: io::Error) -> Self {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// One release: its identifier and the directory holding its file tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    pub id: ReleaseId,
    pub dir: PathBuf,
}

/// Store of versioned releases for one application root.
#[derive(Debug, Clone)]
pub struct ReleaseStore {
    app_root: PathBuf,
}

impl ReleaseStore {
    /// Open (creating on first use) the store for `<root>/<app>/`.
    pub fn open(root: &Path, app: &AppName) -> Result<Self, StoreError> {
        let app_root = root.join(app.as_str());
        let releases = app_root.join(RELEASES_DIR);
        fs::create_dir_all(&releases).map_err(|e| StoreError::io(&releases, e))?;
        Ok(Self { app_root })
    }

    pub fn app_root(&self) -> &Path {
        &self.app_root
    }

    pub fn releases_dir(&self) -> PathBuf {
        self.app_root.join(RELEASES_DIR)
    }

    pub fn release_dir(&self, id: &ReleaseId) -> PathBuf {
        self.releases_dir().join(id.as_str())
    }

    fn current_path(&self) -> PathBuf {
        self.app_root.join(CURRENT_LINK)
    }

    /// List release identifiers, newest first. Directory entries that are not
    /// valid release identifiers are skipped with a warning.
    pub fn list(&self) -> Result<Vec<ReleaseId>, StoreError> {
        let dir = self.releases_dir();
        let mut ids = Vec::new();
        for entry in fs::read_dir(&dir).map_err(|e| StoreError::io(&dir, e))? {
            let entry = entry.map_err(|e| StoreError::io(&dir, e))?;
            let name = entry.file_name();
            match ReleaseId::parse(&name.to_string_lossy()) {
                Ok(id) => ids.push(id),
                Err(_) => {
                    tracing::warn!(entry = %name.to_string_lossy(), "ignoring foreign entry in releases directory");
                }
            }
        }
        ids.sort();
        ids.reverse();
        Ok(ids)
    }

    /// Create a fresh release directory with an identifier strictly greater
    /// than all existing ones. Millisecond timestamps are bumped on collision
    /// so rapid repeated deploys still get unique, ordered identifiers.
    pub fn create(&self) -> Result<Release, StoreError> {
        let mut id = ReleaseId::now();
        loop {
            let dir = self.release_dir(&id);
            match fs::create_dir(&dir) {
                Ok(()) => return Ok(Release { id, dir }),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    id = id.bumped();
                }
                Err(e) => return Err(StoreError::io(&dir, e)),
            }
        }
    }

    /// Atomically repoint the current pointer at the given release.
    ///
    /// The new symlink is created at a temporary name and renamed over the
    /// pointer, so a reader observes either the old target or the new one,
    /// never a missing or half-written link.
    pub fn set_current(&self, id: &ReleaseId) -> Result<(), StoreError> {
        let target = PathBuf::from(RELEASES_DIR).join(id.as_str());
        let staging = self
            .app_root
            .join(format!(".{}.tmp.{}", CURRENT_LINK, std::process::id()));

        if let Err(e) = fs::remove_file(&staging)
            && e.kind() != io::ErrorKind::NotFound
        {
            return Err(StoreError::io(&staging, e));
        }

        std::os::unix::fs::symlink(&target, &staging)
            .map_err(|e| StoreError::io(&staging, e))?;
        fs::rename(&staging, self.current_path())
            .map_err(|e| StoreError::io(&self.current_path(), e))?;

        tracing::debug!(release = %id, "current pointer updated");
        Ok(())
    }

    /// Identifier named by the current pointer, or `None` before the first
    /// deploy. The link target is authoritative even if the release directory
    /// it names was deleted out from under us.
    pub fn current(&self) -> Result<Option<ReleaseId>, StoreError> {
        let path = self.current_path();
        let target = match fs::read_link(&path) {
            Ok(t) => t,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(&path, e)),
        };

        let name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        match ReleaseId::parse(&name) {
            Ok(id) => Ok(Some(id)),
            Err(_) => {
                tracing::warn!(target = %target.display(), "current pointer names a foreign target");
                Ok(None)
            }
        }
    }

    /// The rollback target: the release immediately preceding the newest one.
    pub fn previous(&self) -> Result<Option<ReleaseId>, StoreError> {
        Ok(self.list()?.into_iter().nth(1))
    }

    /// Delete all releases except the `keep` most recent non-current ones.
    /// The release named by the current pointer is never deleted, regardless
    /// of its age. Deletion is best-effort per release; individual failures
    /// are logged and do not abort pruning of the rest.
    ///
    /// Returns the identifiers that were actually removed.
    pub fn prune(&self, keep: usize) -> Result<Vec<ReleaseId>, StoreError> {
        let current = self.current()?;
        let candidates: Vec<ReleaseId> = self
            .list()?
            .into_iter()
            .filter(|id| Some(id) != current.as_ref())
            .collect();

        let mut removed = Vec::new();
        for id in candidates.into_iter().skip(keep) {
            let dir = self.release_dir(&id);
            match fs::remove_dir_all(&dir) {
                Ok(()) => {
                    tracing::info!(release = %id, "pruned release");
                    removed.push(id);
                }
                Err(e) => {
                    tracing::warn!(release = %id, error = %e, "failed to prune release");
                }
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(root: &TempDir) -> ReleaseStore {
        let app = AppName::new("api").unwrap();
        ReleaseStore::open(root.path(), &app).unwrap()
    }

    #[test]
    fn empty_store_has_no_releases_and_no_current() {
        let root = TempDir::new().unwrap();
        let store = store(&root);
        assert!(store.list().unwrap().is_empty());
        assert!(store.current().unwrap().is_none());
    }

    #[test]
    fn rapid_creates_yield_unique_ordered_ids() {
        let root = TempDir::new().unwrap();
        let store = store(&root);

        let mut ids = Vec::new();
        for _ in 0..5 {
            ids.push(store.create().unwrap().id);
        }

        for pair in ids.windows(2) {
            assert!(pair[0] < pair[1], "{} should precede {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn list_is_newest_first() {
        let root = TempDir::new().unwrap();
        let store = store(&root);
        let a = store.create().unwrap().id;
        let b = store.create().unwrap().id;
        let c = store.create().unwrap().id;

        assert_eq!(store.list().unwrap(), vec![c, b, a]);
    }

    #[test]
    fn set_current_swaps_atomically_by_rename() {
        let root = TempDir::new().unwrap();
        let store = store(&root);
        let first = store.create().unwrap();
        let second = store.create().unwrap();

        store.set_current(&first.id).unwrap();
        assert_eq!(store.current().unwrap(), Some(first.id.clone()));

        store.set_current(&second.id).unwrap();
        assert_eq!(store.current().unwrap(), Some(second.id));

        // The pointer is a relative symlink into releases/
        let target = std::fs::read_link(store.app_root().join(CURRENT_LINK)).unwrap();
        assert!(target.starts_with(RELEASES_DIR));
    }

    #[test]
    fn current_survives_external_target_deletion() {
        let root = TempDir::new().unwrap();
        let store = store(&root);
        let release = store.create().unwrap();
        store.set_current(&release.id).unwrap();

        std::fs::remove_dir_all(&release.dir).unwrap();
        assert_eq!(store.current().unwrap(), Some(release.id));
    }

    #[test]
    fn prune_keeps_n_noncurrent_plus_current() {
        let root = TempDir::new().unwrap();
        let store = store(&root);

        let mut ids = Vec::new();
        for _ in 0..10 {
            ids.push(store.create().unwrap().id);
        }
        store.set_current(ids.last().unwrap()).unwrap();

        store.prune(3).unwrap();

        let remaining = store.list().unwrap();
        assert_eq!(remaining.len(), 4);
        // current plus the three most recent non-current releases
        assert_eq!(remaining[0], ids[9]);
        assert_eq!(remaining[1], ids[8]);
        assert_eq!(remaining[2], ids[7]);
        assert_eq!(remaining[3], ids[6]);
    }

    #[test]
    fn prune_never_deletes_current_even_when_oldest() {
        let root = TempDir::new().unwrap();
        let store = store(&root);

        let oldest = store.create().unwrap().id;
        for _ in 0..4 {
            store.create().unwrap();
        }
        store.set_current(&oldest).unwrap();

        store.prune(1).unwrap();

        let remaining = store.list().unwrap();
        assert!(remaining.contains(&oldest));
        assert_eq!(remaining.len(), 2);
    }

    #[test]
    fn previous_is_second_newest() {
        let root = TempDir::new().unwrap();
        let store = store(&root);
        assert!(store.previous().unwrap().is_none());

        let a = store.create().unwrap().id;
        assert!(store.previous().unwrap().is_none());

        let _b = store.create().unwrap().id;
        assert_eq!(store.previous().unwrap(), Some(a));
    }

    #[test]
    fn foreign_entries_are_ignored() {
        let root = TempDir::new().unwrap();
        let store = store(&root);
        std::fs::create_dir(store.releases_dir().join("not-a-release")).unwrap();

        let release = store.create().unwrap();
        assert_eq!(store.list().unwrap(), vec![release.id]);
    }
}
