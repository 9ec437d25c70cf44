// ABOUTME: Hook execution for deployment lifecycle events.
// ABOUTME: Runs user-supplied shell commands scoped to a release directory.

use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use crate::types::{AppName, ReleaseId};

/// Hook execution points in the deployment lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPoint {
    /// Before the pointer switch. Failure aborts the deployment.
    PreDeploy,
    /// After health verification passed. Failure logs a warning.
    PostDeploy,
}

impl HookPoint {
    pub fn label(&self) -> &'static str {
        match self {
            HookPoint::PreDeploy => "pre-deploy",
            HookPoint::PostDeploy => "post-deploy",
        }
    }

    /// Whether failure at this hook point should abort deployment.
    pub fn is_fatal(&self) -> bool {
        matches!(self, HookPoint::PreDeploy)
    }
}

/// Context passed to hooks via environment variables.
#[derive(Debug, Clone)]
pub struct HookContext {
    pub app: AppName,
    pub release: ReleaseId,
    pub previous: Option<ReleaseId>,
}

impl HookContext {
    /// Convert context to environment variables, layered on top of the
    /// deployer's inherited environment.
    pub fn to_env(&self) -> HashMap<String, String> {
        let mut env = HashMap::new();
        env.insert("RELEVO_APP".to_string(), self.app.to_string());
        env.insert("RELEVO_RELEASE".to_string(), self.release.to_string());
        if let Some(ref prev) = self.previous {
            env.insert("RELEVO_PREVIOUS".to_string(), prev.to_string());
        }
        env
    }
}

/// Result of running a hook.
#[derive(Debug)]
pub struct HookResult {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Run a hook command with the release directory as working directory.
///
/// The command is an arbitrary shell string executed through `sh -c`. Whether
/// a failure is fatal is the caller's decision, driven by the hook point.
pub async fn run_hook(
    command: &str,
    release_dir: &Path,
    point: HookPoint,
    context: &HookContext,
) -> HookResult {
    tracing::info!(hook = point.label(), command, "running hook");

    let output = Command::new("sh")
        .arg("-c")
        .arg(command)
        .current_dir(release_dir)
        .envs(context.to_env())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await;

    match output {
        Ok(output) => {
            let result = HookResult {
                success: output.status.success(),
                exit_code: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            };

            if result.success {
                tracing::info!(hook = point.label(), "hook completed successfully");
            } else {
                tracing::warn!(
                    hook = point.label(),
                    exit_code = ?result.exit_code,
                    stderr = %result.stderr.trim(),
                    "hook failed"
                );
            }

            result
        }
        Err(e) => {
            tracing::error!(hook = point.label(), error = %e, "failed to execute hook");
            HookResult {
                success: false,
                exit_code: None,
                stdout: String::new(),
                stderr: e.to_string(),
            }
        }
    }
}
