// ABOUTME: Generic deployment struct parameterized by state marker.
// ABOUTME: State types carry their own data for compile-time guarantees.

use crate::config::DeployConfig;
use crate::store::Release;
use crate::types::ReleaseId;

use super::state::{Completed, Initialized, Started, Switched};

/// A deployment in progress, parameterized by its current state.
///
/// The state type parameter `S` carries state-specific data (like the staged
/// release) directly in the state type, so a step that needs a release cannot
/// be reached without one.
#[derive(Debug)]
pub struct Deployment<S> {
    pub(crate) config: DeployConfig,
    /// What the current pointer named before the switch; the rollback target.
    pub(crate) previous: Option<ReleaseId>,
    pub(crate) state: S,
}

impl Deployment<Initialized> {
    pub fn new(config: DeployConfig) -> Self {
        Deployment {
            config,
            previous: None,
            state: Initialized,
        }
    }
}

impl Deployment<Switched> {
    pub fn release(&self) -> &Release {
        &self.state.release
    }
}

impl Deployment<Started> {
    pub fn release(&self) -> &Release {
        &self.state.release
    }
}

impl Deployment<Completed> {
    pub fn release(&self) -> &Release {
        &self.state.release
    }

    /// Releases removed by retention pruning.
    pub fn pruned(&self) -> &[ReleaseId] {
        &self.state.pruned
    }
}
