// ABOUTME: Deployment state types for the type state pattern.
// ABOUTME: States carry the staged release so later steps cannot run without one.

use crate::store::Release;
use crate::types::ReleaseId;

/// Initial state: configuration validated, nothing on disk yet.
/// Available actions: `stage()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Initialized;

/// Release directory materialized and environment injected.
/// Available actions: `run_pre_hook()`
#[derive(Debug)]
pub struct Staged {
    pub(crate) release: Release,
}

/// Pre-deploy hook passed (or none configured).
/// Available actions: `switch()`
#[derive(Debug)]
pub struct PreHooked {
    pub(crate) release: Release,
}

/// Current pointer repointed at the new release. Point of no return:
/// recovery from here means repointing again, not undoing.
/// Available actions: `start()`, `roll_back()`
#[derive(Debug)]
pub struct Switched {
    pub(crate) release: Release,
}

/// Supervisor brought the release up.
/// Available actions: `verify()`, `roll_back()`
#[derive(Debug)]
pub struct Started {
    pub(crate) release: Release,
}

/// Health verification passed.
/// Available actions: `finalize()`
#[derive(Debug)]
pub struct Verified {
    pub(crate) release: Release,
}

/// Terminal state: post-hook ran and retention was enforced.
#[derive(Debug)]
pub struct Completed {
    pub(crate) release: Release,
    pub(crate) pruned: Vec<ReleaseId>,
}
