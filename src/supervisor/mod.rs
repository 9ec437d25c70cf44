// ABOUTME: Supervisor backends that bring a release up after the pointer switch.
// ABOUTME: Closed set of variants: systemd unit, compose stack, or none.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::cmd;

/// Well-known name of the compose manifest copied into a release directory.
pub const COMPOSE_MANIFEST: &str = "docker-compose.yml";

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("`{command}` failed with status {exit_code:?}: {stderr}")]
    CommandFailed {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to copy compose manifest {path}: {source}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// How the application is (re)started for a release. Selected by
/// configuration; `None` covers setups where an external supervisor already
/// resolves through the current pointer.
#[derive(Debug, Clone)]
pub enum Supervisor {
    SystemdUnit {
        unit: String,
    },
    Compose {
        manifest: PathBuf,
        project: String,
    },
    None,
}

impl Supervisor {
    /// Bring the application up for the given release directory. Invoked
    /// identically for the forward switch and for rollback.
    pub async fn activate(&self, release_dir: &Path) -> Result<(), SupervisorError> {
        match self {
            Supervisor::SystemdUnit { unit } => {
                exec("systemctl", &["daemon-reload"], None).await?;
                exec("systemctl", &["restart", unit], None).await
            }
            Supervisor::Compose { manifest, project } => {
                let staged = materialize_manifest(manifest, release_dir)?;
                let file = staged.to_string_lossy().into_owned();
                exec(
                    "docker",
                    &["compose", "-p", project, "-f", &file, "pull"],
                    Some(release_dir),
                )
                .await?;
                exec(
                    "docker",
                    &["compose", "-p", project, "-f", &file, "up", "-d", "--build"],
                    Some(release_dir),
                )
                .await
            }
            Supervisor::None => Ok(()),
        }
    }
}

/// Path of the manifest to drive compose with for this release. The stack
/// definition travels with the release: the configured manifest is copied in
/// only when the release does not already carry one, so re-activating an
/// older release during rollback uses the manifest it was deployed with.
fn materialize_manifest(manifest: &Path, release_dir: &Path) -> Result<PathBuf, SupervisorError> {
    let staged = release_dir.join(COMPOSE_MANIFEST);
    if staged != *manifest && !staged.exists() {
        fs::copy(manifest, &staged).map_err(|e| SupervisorError::Manifest {
            path: manifest.to_path_buf(),
            source: e,
        })?;
    }
    Ok(staged)
}

async fn exec(program: &str, args: &[&str], cwd: Option<&Path>) -> Result<(), SupervisorError> {
    let display = format!("{} {}", program, args.join(" "));
    let out = cmd::run(program, args, cwd)
        .await
        .map_err(|e| SupervisorError::Spawn {
            command: display.clone(),
            source: e,
        })?;

    if !out.success {
        return Err(SupervisorError::CommandFailed {
            command: display,
            exit_code: out.exit_code,
            stderr: out.stderr,
        });
    }
    Ok(())
}
