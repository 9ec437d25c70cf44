// ABOUTME: Deployment configuration: an immutable value object per invocation.
// ABOUTME: Raw flag values are validated once, before any side effect.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::stage::ArtifactSource;
use crate::supervisor::Supervisor;
use crate::types::AppName;

/// Default source-control reference when `--repo` is given without `--ref`.
pub const DEFAULT_GIT_REF: &str = "main";

/// Validated configuration for one deployment run. Never mutated after
/// construction; threaded explicitly through every component.
#[derive(Debug, Clone)]
pub struct DeployConfig {
    pub app: AppName,
    pub root: PathBuf,
    pub source: ArtifactSource,
    pub health_url: String,
    pub timeout: Duration,
    pub poll_interval: Duration,
    pub keep: usize,
    pub env_file: Option<PathBuf>,
    pub pre_hook: Option<String>,
    pub post_hook: Option<String>,
    pub supervisor: Supervisor,
}

/// Unvalidated flag values as collected from the CLI (or constructed by
/// tests). `validate()` turns them into a `DeployConfig` or fails with a
/// configuration error before anything touches the host.
#[derive(Debug, Clone, Default)]
pub struct RawDeployConfig {
    pub app: String,
    pub root: PathBuf,
    pub artifact: Option<PathBuf>,
    pub repo: Option<String>,
    pub reference: Option<String>,
    pub health_url: String,
    pub timeout_secs: u64,
    pub poll_interval_secs: u64,
    pub keep: usize,
    pub env_file: Option<PathBuf>,
    pub pre_hook: Option<String>,
    pub post_hook: Option<String>,
    pub unit: Option<String>,
    pub compose_file: Option<PathBuf>,
    pub project: Option<String>,
}

impl RawDeployConfig {
    pub fn validate(self) -> Result<DeployConfig> {
        let app = AppName::new(&self.app)?;

        let source = match (self.artifact, self.repo) {
            (Some(_), Some(_)) => {
                return Err(Error::InvalidConfig(
                    "--artifact and --repo are mutually exclusive".to_string(),
                ));
            }
            (Some(path), None) => {
                if self.reference.is_some() {
                    return Err(Error::InvalidConfig(
                        "--ref requires --repo".to_string(),
                    ));
                }
                ArtifactSource::Path(path)
            }
            (None, Some(url)) => ArtifactSource::Git {
                url,
                reference: self
                    .reference
                    .unwrap_or_else(|| DEFAULT_GIT_REF.to_string()),
            },
            (None, None) => {
                return Err(Error::InvalidConfig(
                    "an artifact source is required: --artifact or --repo".to_string(),
                ));
            }
        };

        let supervisor = supervisor_from_flags(self.unit, self.compose_file, self.project, &app)?;

        if self.health_url.is_empty() {
            return Err(Error::InvalidConfig("--health-url is required".to_string()));
        }
        reqwest::Url::parse(&self.health_url)
            .map_err(|e| Error::InvalidConfig(format!("invalid health URL: {e}")))?;

        if self.timeout_secs == 0 {
            return Err(Error::InvalidConfig(
                "--timeout must be greater than zero".to_string(),
            ));
        }
        if self.poll_interval_secs == 0 {
            return Err(Error::InvalidConfig(
                "--poll-interval must be greater than zero".to_string(),
            ));
        }

        Ok(DeployConfig {
            app,
            root: self.root,
            source,
            health_url: self.health_url,
            timeout: Duration::from_secs(self.timeout_secs),
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            keep: self.keep,
            env_file: self.env_file,
            pre_hook: self.pre_hook,
            post_hook: self.post_hook,
            supervisor,
        })
    }
}

/// Build a supervisor selection from its flag values. Shared between the
/// deploy configuration and the manual rollback command.
pub fn supervisor_from_flags(
    unit: Option<String>,
    compose_file: Option<PathBuf>,
    project: Option<String>,
    app: &AppName,
) -> Result<Supervisor> {
    match (unit, compose_file) {
        (Some(_), Some(_)) => Err(Error::InvalidConfig(
            "--unit and --compose-file are mutually exclusive".to_string(),
        )),
        (Some(unit), None) => Ok(Supervisor::SystemdUnit { unit }),
        (None, Some(manifest)) => {
            if !manifest.is_file() {
                return Err(Error::InvalidConfig(format!(
                    "compose manifest not found: {}",
                    manifest.display()
                )));
            }
            Ok(Supervisor::Compose {
                manifest,
                project: project.unwrap_or_else(|| app.to_string()),
            })
        }
        (None, None) => Ok(Supervisor::None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw() -> RawDeployConfig {
        RawDeployConfig {
            app: "api".to_string(),
            root: PathBuf::from("/srv/apps"),
            artifact: Some(PathBuf::from("/tmp/build.tar.gz")),
            health_url: "http://127.0.0.1:9000/health".to_string(),
            timeout_secs: 10,
            poll_interval_secs: 1,
            keep: 2,
            ..Default::default()
        }
    }

    #[test]
    fn minimal_config_validates() {
        let config = raw().validate().unwrap();
        assert_eq!(config.app.as_str(), "api");
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert!(matches!(config.supervisor, Supervisor::None));
        assert!(matches!(config.source, ArtifactSource::Path(_)));
    }

    #[test]
    fn artifact_and_repo_conflict() {
        let mut r = raw();
        r.repo = Some("https://example.com/app.git".to_string());
        assert!(r.validate().is_err());
    }

    #[test]
    fn source_is_required() {
        let mut r = raw();
        r.artifact = None;
        assert!(r.validate().is_err());
    }

    #[test]
    fn ref_requires_repo() {
        let mut r = raw();
        r.reference = Some("v1.2".to_string());
        assert!(r.validate().is_err());
    }

    #[test]
    fn repo_defaults_reference() {
        let mut r = raw();
        r.artifact = None;
        r.repo = Some("https://example.com/app.git".to_string());
        let config = r.validate().unwrap();
        match config.source {
            ArtifactSource::Git { reference, .. } => assert_eq!(reference, DEFAULT_GIT_REF),
            other => panic!("unexpected source: {other:?}"),
        }
    }

    #[test]
    fn unit_and_compose_conflict() {
        let mut r = raw();
        r.unit = Some("api.service".to_string());
        r.compose_file = Some(PathBuf::from("/tmp/compose.yml"));
        assert!(r.validate().is_err());
    }

    #[test]
    fn missing_compose_manifest_rejected() {
        let mut r = raw();
        r.compose_file = Some(PathBuf::from("/nonexistent/compose.yml"));
        assert!(r.validate().is_err());
    }

    #[test]
    fn compose_project_defaults_to_app_name() {
        let manifest = tempfile::NamedTempFile::new().unwrap();
        let mut r = raw();
        r.compose_file = Some(manifest.path().to_path_buf());
        let config = r.validate().unwrap();
        match config.supervisor {
            Supervisor::Compose { project, .. } => assert_eq!(project, "api"),
            other => panic!("unexpected supervisor: {other:?}"),
        }
    }

    #[test]
    fn bad_health_url_rejected() {
        let mut r = raw();
        r.health_url = "not a url".to_string();
        assert!(r.validate().is_err());
    }

    #[test]
    fn zero_timeout_rejected() {
        let mut r = raw();
        r.timeout_secs = 0;
        assert!(r.validate().is_err());
    }
}
