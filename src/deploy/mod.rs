// ABOUTME: Deployment orchestration using the type state pattern.
// ABOUTME: Drives stage, pre-hook, switch, start, verify, and rollback to an outcome.

mod deployment;
mod error;
mod lock;
mod rollback;
mod state;
mod transitions;

pub use deployment::Deployment;
pub use error::DeployError;
pub use lock::{DeployLock, LockInfo};
pub use rollback::manual_rollback;
pub use state::{Completed, Initialized, PreHooked, Staged, Started, Switched, Verified};
pub use transitions::TransitionResult;

use crate::config::DeployConfig;
use crate::store::ReleaseStore;
use crate::types::ReleaseId;

/// Terminal result of one deployment run.
#[derive(Debug)]
pub enum DeployOutcome {
    /// Health passed; the new release is live and retention was enforced.
    Completed {
        release: ReleaseId,
        pruned: Vec<ReleaseId>,
    },
    /// Health (or start) failed after the switch; the previous release was
    /// restored. Distinct from `Failed` so automation can tell "deployed but
    /// reverted" from "never deployed".
    RolledBack {
        failed: ReleaseId,
        restored: ReleaseId,
        reason: DeployError,
    },
    /// The run ended with no live new release and nothing restored.
    Failed { error: DeployError },
}

impl DeployOutcome {
    /// Process exit code for calling automation: 0 success, 2 failure before
    /// a health verdict could stand, 3 rollback occurred.
    pub fn exit_code(&self) -> i32 {
        match self {
            DeployOutcome::Completed { .. } => 0,
            DeployOutcome::RolledBack { .. } => 3,
            DeployOutcome::Failed { .. } => 2,
        }
    }
}

/// Run one full deployment: stage, pre-hook, atomic switch, supervisor start,
/// health verification, then either finalize (post-hook + prune) or roll back
/// to the previous release.
///
/// Holds the per-application deploy lock for the whole run; a concurrent run
/// against the same root fails fast instead of interleaving.
pub async fn run_deploy(config: DeployConfig) -> DeployOutcome {
    let store = match ReleaseStore::open(&config.root, &config.app) {
        Ok(store) => store,
        Err(e) => {
            return DeployOutcome::Failed { error: e.into() };
        }
    };

    let lock = match DeployLock::acquire(store.app_root(), &config.app, false) {
        Ok(lock) => lock,
        Err(error) => return DeployOutcome::Failed { error },
    };

    let outcome = run_locked(config, &store).await;
    lock.release();
    outcome
}

async fn run_locked(config: DeployConfig, store: &ReleaseStore) -> DeployOutcome {
    let deployment = Deployment::new(config);

    tracing::info!("staging release");
    let staged = match deployment.stage(store).await {
        Ok(d) => d,
        Err(error) => return DeployOutcome::Failed { error },
    };

    let prehooked = match staged.run_pre_hook(store).await {
        Ok(d) => d,
        Err(error) => return DeployOutcome::Failed { error },
    };

    let switched = match prehooked.switch(store) {
        Ok(d) => d,
        Err(error) => return DeployOutcome::Failed { error },
    };

    tracing::info!("starting release under supervisor");
    let started = match switched.start().await {
        Ok(d) => d,
        Err((failed, reason)) => return roll_back_to_outcome(failed, reason, store).await,
    };

    tracing::info!("verifying health");
    let verified = match started.verify().await {
        Ok(d) => d,
        Err((failed, reason)) => return roll_back_to_outcome(failed, reason, store).await,
    };

    let completed = match verified.finalize(store).await {
        Ok(d) => d,
        Err(error) => return DeployOutcome::Failed { error },
    };

    DeployOutcome::Completed {
        release: completed.release().id.clone(),
        pruned: completed.pruned().to_vec(),
    }
}

/// Convert a failed post-switch deployment into its terminal outcome.
async fn roll_back_to_outcome<S>(
    failed: Deployment<S>,
    reason: DeployError,
    store: &ReleaseStore,
) -> DeployOutcome
where
    Deployment<S>: RollBack,
{
    let failed_id = failed.release_id();
    tracing::warn!(release = %failed_id, error = %reason, "deployment failed after switch, rolling back");

    match failed.roll_back_release(store).await {
        Ok(restored) => DeployOutcome::RolledBack {
            failed: failed_id,
            restored,
            reason,
        },
        // The rollback's own failure must not mask the original failure's
        // reporting, but it decides the terminal state.
        Err(error) => {
            tracing::error!(original = %reason, error = %error, "rollback did not restore a previous release");
            DeployOutcome::Failed { error }
        }
    }
}

/// Internal dispatch so both post-switch failure carriers share the outcome
/// conversion above.
trait RollBack {
    fn release_id(&self) -> ReleaseId;
    async fn roll_back_release(self, store: &ReleaseStore) -> Result<ReleaseId, DeployError>;
}

impl RollBack for Deployment<Switched> {
    fn release_id(&self) -> ReleaseId {
        self.release().id.clone()
    }

    async fn roll_back_release(self, store: &ReleaseStore) -> Result<ReleaseId, DeployError> {
        self.roll_back(store).await
    }
}

impl RollBack for Deployment<Started> {
    fn release_id(&self) -> ReleaseId {
        self.release().id.clone()
    }

    async fn roll_back_release(self, store: &ReleaseStore) -> Result<ReleaseId, DeployError> {
        self.roll_back(store).await
    }
}
