// ABOUTME: Error types for deployment runs.
// ABOUTME: Covers staging, hooks, supervisor, health, lock, and rollback failures.

use chrono::{DateTime, Utc};

use crate::health::HealthError;
use crate::stage::StageError;
use crate::store::StoreError;
use crate::supervisor::SupervisorError;
use crate::types::ReleaseId;

/// Errors that can occur during deployment state transitions.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// Artifact acquisition or build failed.
    #[error("staging failed: {0}")]
    Stage(#[from] StageError),

    /// Release store operation failed.
    #[error("release store error: {0}")]
    Store(#[from] StoreError),

    /// Pre-deploy hook exited nonzero; the deployment aborts before any
    /// pointer change.
    #[error("pre-deploy hook failed with exit code {exit_code:?}: {stderr}")]
    PreHookFailed {
        exit_code: Option<i32>,
        stderr: String,
    },

    /// Supervisor start/restart failed.
    #[error("supervisor failed: {0}")]
    Supervisor(#[from] SupervisorError),

    /// No successful health probe within the deadline.
    #[error("health verification failed: {0}")]
    Health(#[from] HealthError),

    /// Health failed but there is no prior release to restore.
    #[error("release {failed} failed health verification and no previous release exists to restore")]
    RollbackUnavailable { failed: ReleaseId },

    /// Another deployment of the same application holds the lock.
    #[error("deployment already in progress: held by {holder} (pid {pid}) since {started_at}")]
    LockHeld {
        holder: String,
        pid: u32,
        started_at: DateTime<Utc>,
    },

    /// Lock bookkeeping failed.
    #[error("deploy lock error: {0}")]
    Lock(String),

    /// Manual rollback requested but no release precedes the current one.
    #[error("no previous release to roll back to")]
    NoPreviousRelease,
}
