// ABOUTME: Deploy lock to prevent concurrent deployments of the same application.
// ABOUTME: Uses atomic file creation with lock info stored in the application root.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::AppName;

use super::DeployError;

/// Lock file name inside the application root.
pub const LOCK_FILE: &str = ".deploy.lock";

/// Information about who holds a deploy lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    /// Hostname of the machine that holds the lock.
    pub holder: String,
    /// Process ID of the lock holder.
    pub pid: u32,
    /// When the lock was acquired.
    pub started_at: DateTime<Utc>,
    /// Application being deployed.
    pub app: String,
}

impl LockInfo {
    /// Create new lock info for the current process.
    pub fn new(app: &AppName) -> Self {
        Self {
            holder: gethostname::gethostname().to_string_lossy().into_owned(),
            pid: std::process::id(),
            started_at: Utc::now(),
            app: app.to_string(),
        }
    }

    /// Check if this lock is stale (older than 1 hour).
    pub fn is_stale(&self) -> bool {
        let age = Utc::now() - self.started_at;
        age.num_hours() >= 1
    }
}

/// A held deploy lock that releases on drop.
#[derive(Debug)]
pub struct DeployLock {
    path: PathBuf,
}

impl DeployLock {
    /// Acquire the deploy lock for an application root.
    ///
    /// Uses `create_new` for atomic lock acquisition (no TOCTOU race).
    /// Returns `DeployError::LockHeld` if another process holds the lock.
    /// Auto-breaks stale locks (>1 hour) with a warning.
    pub fn acquire(app_root: &Path, app: &AppName, force: bool) -> Result<Self, DeployError> {
        let path = app_root.join(LOCK_FILE);

        match Self::try_create(&path, app) {
            Ok(()) => Ok(Self { path }),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                if !Self::should_break(&path, force) {
                    if let Ok(content) = fs::read_to_string(&path)
                        && let Ok(existing) = serde_json::from_str::<LockInfo>(&content)
                    {
                        return Err(DeployError::LockHeld {
                            holder: existing.holder,
                            pid: existing.pid,
                            started_at: existing.started_at,
                        });
                    }
                    return Err(DeployError::Lock(
                        "lock held by another process".to_string(),
                    ));
                }

                tracing::debug!(path = %path.display(), "removing stale/forced lock");
                let _ = fs::remove_file(&path);

                Self::try_create(&path, app).map_err(|e| {
                    DeployError::Lock(format!(
                        "lock acquired by another process during break: {e}"
                    ))
                })?;
                Ok(Self { path })
            }
            Err(e) => Err(DeployError::Lock(format!("failed to acquire lock: {e}"))),
        }
    }

    fn try_create(path: &Path, app: &AppName) -> io::Result<()> {
        let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
        let info = LockInfo::new(app);
        let json = serde_json::to_string(&info).map_err(io::Error::other)?;
        file.write_all(json.as_bytes())
    }

    /// Check if an existing lock should be broken (stale, forced, or corrupted).
    fn should_break(path: &Path, force: bool) -> bool {
        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => {
                tracing::warn!("lock info unreadable, breaking lock");
                return true;
            }
        };

        match serde_json::from_str::<LockInfo>(&content) {
            Ok(existing) => {
                if force {
                    tracing::warn!(
                        "breaking lock held by {} (pid {}) since {}",
                        existing.holder,
                        existing.pid,
                        existing.started_at
                    );
                    true
                } else if existing.is_stale() {
                    tracing::warn!(
                        "auto-breaking stale lock held by {} (pid {}) since {}",
                        existing.holder,
                        existing.pid,
                        existing.started_at
                    );
                    true
                } else {
                    false
                }
            }
            Err(_) => {
                tracing::warn!("lock info corrupted, breaking lock");
                true
            }
        }
    }

    /// Release the lock.
    pub fn release(self) {
        // Removal happens in Drop.
    }
}

impl Drop for DeployLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}
