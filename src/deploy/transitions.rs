// ABOUTME: State transition methods for deployment orchestration.
// ABOUTME: Each method consumes self and returns the next state on success.

use crate::health::HealthVerifier;
use crate::hooks::{self, HookContext, HookPoint};
use crate::stage;
use crate::store::{Release, ReleaseStore};
use crate::types::ReleaseId;

use super::Deployment;
use super::error::DeployError;
use super::state::{Completed, Initialized, PreHooked, Staged, Started, Switched, Verified};

/// Result type for transitions that may need rollback on failure.
pub type TransitionResult<T, S> = Result<Deployment<T>, (Deployment<S>, DeployError)>;

// =============================================================================
// Initialized -> Staged
// =============================================================================

impl Deployment<Initialized> {
    /// Materialize the release directory from the configured artifact source.
    ///
    /// # Errors
    ///
    /// Returns `DeployError::Stage` on acquisition, build, or I/O failure.
    /// Nothing on the host has been mutated at this point beyond the staged
    /// directory itself, which is left in place for inspection.
    #[must_use = "deployment state must be used"]
    pub async fn stage(self, store: &ReleaseStore) -> Result<Deployment<Staged>, DeployError> {
        let release =
            stage::stage(store, &self.config.source, self.config.env_file.as_deref()).await?;
        tracing::info!(release = %release.id, "release staged");

        Ok(Deployment {
            config: self.config,
            previous: self.previous,
            state: Staged { release },
        })
    }
}

// =============================================================================
// Staged -> PreHooked
// =============================================================================

impl Deployment<Staged> {
    /// Run the pre-deploy hook, if configured. Hook failure is fatal here:
    /// the current pointer has not moved, so aborting leaves the host exactly
    /// as it was.
    ///
    /// # Errors
    ///
    /// Returns `DeployError::PreHookFailed` on nonzero hook exit.
    #[must_use = "deployment state must be used"]
    pub async fn run_pre_hook(
        self,
        store: &ReleaseStore,
    ) -> Result<Deployment<PreHooked>, DeployError> {
        if let Some(command) = &self.config.pre_hook {
            let context = HookContext {
                app: self.config.app.clone(),
                release: self.state.release.id.clone(),
                previous: store.current()?,
            };

            let result = hooks::run_hook(
                command,
                &self.state.release.dir,
                HookPoint::PreDeploy,
                &context,
            )
            .await;

            if !result.success {
                return Err(DeployError::PreHookFailed {
                    exit_code: result.exit_code,
                    stderr: result.stderr,
                });
            }
        }

        Ok(Deployment {
            config: self.config,
            previous: self.previous,
            state: PreHooked {
                release: self.state.release,
            },
        })
    }
}

// =============================================================================
// PreHooked -> Switched
// =============================================================================

impl Deployment<PreHooked> {
    /// Atomically repoint the current pointer at the staged release. This is
    /// the point of no return: recovery from here on means repointing again.
    ///
    /// # Errors
    ///
    /// Returns `DeployError::Store` if the swap fails; the pointer then still
    /// names its prior target.
    #[must_use = "deployment state must be used"]
    pub fn switch(self, store: &ReleaseStore) -> Result<Deployment<Switched>, DeployError> {
        let previous = store.current()?;
        store.set_current(&self.state.release.id)?;
        tracing::info!(
            release = %self.state.release.id,
            previous = ?previous.as_ref().map(|p| p.as_str()),
            "current pointer switched"
        );

        Ok(Deployment {
            config: self.config,
            previous,
            state: Switched {
                release: self.state.release,
            },
        })
    }
}

// =============================================================================
// Switched -> Started
// =============================================================================

impl Deployment<Switched> {
    /// Bring the release up under the configured supervisor.
    ///
    /// # Errors
    ///
    /// Returns `(self, error)` on failure to allow rollback.
    #[must_use = "deployment state must be used"]
    pub async fn start(self) -> TransitionResult<Started, Switched> {
        match self
            .config
            .supervisor
            .activate(&self.state.release.dir)
            .await
        {
            Ok(()) => Ok(Deployment {
                config: self.config,
                previous: self.previous,
                state: Started {
                    release: self.state.release,
                },
            }),
            Err(e) => Err((self, DeployError::Supervisor(e))),
        }
    }

    /// Roll back: repoint the current pointer at the previous release and
    /// re-activate the supervisor against it.
    pub async fn roll_back(self, store: &ReleaseStore) -> Result<ReleaseId, DeployError> {
        restore_previous(&self.config, &self.state.release, store).await
    }
}

// =============================================================================
// Started -> Verified
// =============================================================================

impl Deployment<Started> {
    /// Poll the health endpoint until success or the configured deadline.
    ///
    /// # Errors
    ///
    /// Returns `(self, error)` on timeout to allow rollback.
    #[must_use = "deployment state must be used"]
    pub async fn verify(self) -> TransitionResult<Verified, Started> {
        let verifier = match HealthVerifier::new(
            &self.config.health_url,
            self.config.timeout,
            self.config.poll_interval,
        ) {
            Ok(v) => v,
            Err(e) => return Err((self, DeployError::Health(e))),
        };

        match verifier.wait_ready().await {
            Ok(_probes) => Ok(Deployment {
                config: self.config,
                previous: self.previous,
                state: Verified {
                    release: self.state.release,
                },
            }),
            Err(e) => Err((self, DeployError::Health(e))),
        }
    }

    /// Roll back: repoint the current pointer at the previous release and
    /// re-activate the supervisor against it.
    pub async fn roll_back(self, store: &ReleaseStore) -> Result<ReleaseId, DeployError> {
        restore_previous(&self.config, &self.state.release, store).await
    }
}

// =============================================================================
// Verified -> Completed
// =============================================================================

impl Deployment<Verified> {
    /// Run the post-deploy hook (best-effort) and enforce retention.
    ///
    /// A post-hook failure is logged but does not roll back: the switch
    /// already happened and health already passed. Pruning failures on
    /// individual releases are likewise logged inside the store.
    #[must_use = "deployment state must be used"]
    pub async fn finalize(
        self,
        store: &ReleaseStore,
    ) -> Result<Deployment<Completed>, DeployError> {
        if let Some(command) = &self.config.post_hook {
            let context = HookContext {
                app: self.config.app.clone(),
                release: self.state.release.id.clone(),
                previous: self.previous.clone(),
            };

            let result = hooks::run_hook(
                command,
                &self.state.release.dir,
                HookPoint::PostDeploy,
                &context,
            )
            .await;

            if !result.success {
                tracing::warn!(
                    exit_code = ?result.exit_code,
                    "post-deploy hook failed; deployment stands"
                );
            }
        }

        let pruned = store.prune(self.config.keep)?;

        Ok(Deployment {
            config: self.config,
            previous: self.previous,
            state: Completed {
                release: self.state.release,
                pruned,
            },
        })
    }
}

// =============================================================================
// Rollback
// =============================================================================

/// Restore the release immediately preceding the failed one: second entry of
/// the newest-first listing, the failed release being the first. The pointer
/// restoration is authoritative; a supervisor failure while re-activating the
/// old release is logged but does not change the outcome.
async fn restore_previous(
    config: &crate::config::DeployConfig,
    failed: &Release,
    store: &ReleaseStore,
) -> Result<ReleaseId, DeployError> {
    let restored = store
        .previous()?
        .ok_or_else(|| DeployError::RollbackUnavailable {
            failed: failed.id.clone(),
        })?;

    store.set_current(&restored)?;
    tracing::info!(failed = %failed.id, restored = %restored, "current pointer restored");

    if let Err(e) = config
        .supervisor
        .activate(&store.release_dir(&restored))
        .await
    {
        tracing::warn!(
            error = %e,
            "supervisor restart during rollback failed; pointer restoration stands"
        );
    }

    Ok(restored)
}
