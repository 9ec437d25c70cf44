// ABOUTME: Manual rollback: repoint the current pointer at the preceding release.
// ABOUTME: Used by the `rollback` command, outside a deployment run.

use crate::store::ReleaseStore;
use crate::supervisor::Supervisor;
use crate::types::ReleaseId;

use super::DeployError;

/// Repoint the current pointer at the release immediately preceding the
/// current one and re-activate the supervisor against it.
///
/// Unlike automatic rollback inside a deploy run, a supervisor failure here
/// is propagated: the operator asked for a restart and should know it did not
/// happen, even though the pointer has already been restored.
///
/// # Errors
///
/// Returns `DeployError::NoPreviousRelease` if no release precedes the
/// current one.
pub async fn manual_rollback(
    store: &ReleaseStore,
    supervisor: &Supervisor,
) -> Result<ReleaseId, DeployError> {
    let listing = store.list()?;
    let current = store.current()?;

    let target = match current {
        Some(cur) => listing
            .iter()
            .skip_while(|id| **id != cur)
            .nth(1)
            .cloned(),
        None => None,
    }
    .ok_or(DeployError::NoPreviousRelease)?;

    store.set_current(&target)?;
    tracing::info!(restored = %target, "current pointer rolled back");

    supervisor.activate(&store.release_dir(&target)).await?;

    Ok(target)
}
