// ABOUTME: Artifact staging: materializes a release directory from an archive,
// ABOUTME: a source directory, or a shallow source-control fetch plus build step.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

use crate::cmd;
use crate::store::{Release, ReleaseStore};

/// Well-known name of the injected environment file inside a release.
pub const ENV_FILE: &str = ".env";

/// Build entry point looked for at the root of a fetched source tree.
pub const BUILD_SCRIPT: &str = "build.sh";

/// Build output directory that, when present, becomes the release contents.
pub const BUILD_OUTPUT_DIR: &str = "dist";

#[derive(Debug, Error)]
pub enum StageError {
    #[error("invalid artifact: {0} is neither a directory nor a recognized archive")]
    InvalidArtifact(PathBuf),

    #[error("failed to extract {archive}: {detail}")]
    Extract { archive: PathBuf, detail: String },

    #[error("failed to fetch {url}@{reference}: {detail}")]
    Fetch {
        url: String,
        reference: String,
        detail: String,
    },

    #[error("build script exited with status {exit_code:?}: {stderr}")]
    Build {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("release store error: {0}")]
    Store(#[from] crate::store::StoreError),

    #[error("I/O error while staging: {0}")]
    Io(#[from] io::Error),
}

/// Where a release's file tree comes from. Path sources are classified at
/// staging time: an existing directory is mirrored, a recognized archive is
/// extracted, anything else is an invalid artifact.
#[derive(Debug, Clone)]
pub enum ArtifactSource {
    Path(PathBuf),
    Git { url: String, reference: String },
}

/// An opaque producer of release contents. The deployment controller only
/// depends on this seam; tests substitute their own producers.
#[async_trait]
pub trait ArtifactProducer {
    async fn produce(&self, release_dir: &Path, app_root: &Path) -> Result<(), StageError>;
}

#[async_trait]
impl ArtifactProducer for ArtifactSource {
    async fn produce(&self, release_dir: &Path, app_root: &Path) -> Result<(), StageError> {
        match self {
            ArtifactSource::Path(path) => {
                if path.is_dir() {
                    tracing::debug!(source = %path.display(), "mirroring directory artifact");
                    mirror_tree(path, release_dir)?;
                    Ok(())
                } else if path.is_file() && is_recognized_archive(path) {
                    extract_archive(path, release_dir).await
                } else {
                    Err(StageError::InvalidArtifact(path.clone()))
                }
            }
            ArtifactSource::Git { url, reference } => {
                fetch_and_build(url, reference, release_dir, app_root).await
            }
        }
    }
}

/// Materialize a new release from the given producer, then inject the
/// configured environment file under its well-known name.
///
/// On failure the partially staged directory is left in place for operator
/// inspection; it is never linked as current.
pub async fn stage<P: ArtifactProducer + ?Sized>(
    store: &ReleaseStore,
    producer: &P,
    env_file: Option<&Path>,
) -> Result<Release, StageError> {
    let release = store.create()?;

    producer.produce(&release.dir, store.app_root()).await?;

    if let Some(env) = env_file {
        if env.is_file() {
            fs::copy(env, release.dir.join(ENV_FILE))?;
            tracing::debug!(env = %env.display(), "injected environment file");
        } else {
            tracing::warn!(env = %env.display(), "configured environment file does not exist, skipping");
        }
    }

    Ok(release)
}

fn is_recognized_archive(path: &Path) -> bool {
    let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
    name.ends_with(".tar.gz") || name.ends_with(".tgz") || name.ends_with(".tar")
}

async fn extract_archive(archive: &Path, release_dir: &Path) -> Result<(), StageError> {
    let out = cmd::run(
        "tar",
        &["-xf", &archive.to_string_lossy(), "-C", &release_dir.to_string_lossy()],
        None,
    )
    .await
    .map_err(|e| StageError::Extract {
        archive: archive.to_path_buf(),
        detail: e.to_string(),
    })?;

    if !out.success {
        return Err(StageError::Extract {
            archive: archive.to_path_buf(),
            detail: out.stderr,
        });
    }
    Ok(())
}

async fn fetch_and_build(
    url: &str,
    reference: &str,
    release_dir: &Path,
    app_root: &Path,
) -> Result<(), StageError> {
    let scratch = app_root.join(format!(".fetch-{}", std::process::id()));
    if scratch.exists() {
        fs::remove_dir_all(&scratch)?;
    }

    let clone = cmd::run(
        "git",
        &[
            "clone",
            "--depth",
            "1",
            "--branch",
            reference,
            url,
            &scratch.to_string_lossy(),
        ],
        None,
    )
    .await
    .map_err(|e| StageError::Fetch {
        url: url.to_string(),
        reference: reference.to_string(),
        detail: e.to_string(),
    })?;

    if !clone.success {
        return Err(StageError::Fetch {
            url: url.to_string(),
            reference: reference.to_string(),
            detail: clone.stderr,
        });
    }

    let build_script = scratch.join(BUILD_SCRIPT);
    if is_executable(&build_script) {
        tracing::info!(script = %build_script.display(), "running build script");
        let build = cmd::run_shell(&format!("./{}", BUILD_SCRIPT), &scratch).await?;
        if !build.success {
            return Err(StageError::Build {
                exit_code: build.exit_code,
                stderr: build.stderr,
            });
        }
    }

    let build_output = scratch.join(BUILD_OUTPUT_DIR);
    if build_output.is_dir() {
        mirror_tree(&build_output, release_dir)?;
    } else {
        mirror_tree(&scratch, release_dir)?;
        let vcs_dir = release_dir.join(".git");
        if vcs_dir.exists() {
            fs::remove_dir_all(&vcs_dir)?;
        }
    }

    if let Err(e) = fs::remove_dir_all(&scratch) {
        tracing::warn!(scratch = %scratch.display(), error = %e, "failed to remove fetch scratch directory");
    }

    Ok(())
}

fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

/// Mirror `src` into `dst`: copy everything from `src`, and delete entries of
/// `dst` that have no counterpart in `src`. A plain copy would let stale files
/// from an unrelated earlier tree leak into the release.
pub fn mirror_tree(src: &Path, dst: &Path) -> io::Result<()> {
    fs::create_dir_all(dst)?;

    // Reconcile deletions first.
    for entry in fs::read_dir(dst)? {
        let entry = entry?;
        if !src.join(entry.file_name()).exists() {
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                fs::remove_dir_all(&path)?;
            } else {
                fs::remove_file(&path)?;
            }
        }
    }

    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let from = entry.path();
        let to = dst.join(entry.file_name());
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            // A same-named file in dst must give way to the directory.
            if to.is_file() || to.is_symlink() {
                fs::remove_file(&to)?;
            }
            mirror_tree(&from, &to)?;
        } else if file_type.is_symlink() {
            let target = fs::read_link(&from)?;
            if to.exists() || to.is_symlink() {
                remove_any(&to)?;
            }
            std::os::unix::fs::symlink(target, &to)?;
        } else {
            if to.is_dir() {
                fs::remove_dir_all(&to)?;
            }
            fs::copy(&from, &to)?;
        }
    }

    Ok(())
}

fn remove_any(path: &Path) -> io::Result<()> {
    if path.is_dir() && !path.is_symlink() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}
