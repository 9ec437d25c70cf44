// ABOUTME: Subprocess execution helpers with captured output.
// ABOUTME: All external commands (tar, git, systemctl, docker) go through here.

use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

/// Captured result of a finished subprocess.
#[derive(Debug)]
pub struct CommandOutput {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Run a program with arguments, capturing stdout and stderr.
pub async fn run(
    program: &str,
    args: &[&str],
    cwd: Option<&Path>,
) -> std::io::Result<CommandOutput> {
    tracing::debug!(program, ?args, ?cwd, "running command");

    let mut command = Command::new(program);
    command.args(args).stdout(Stdio::piped()).stderr(Stdio::piped());
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }

    let output = command.output().await?;
    Ok(capture(output))
}

/// Run an arbitrary shell command string via `sh -c` in the given directory.
/// The invoking environment is inherited.
pub async fn run_shell(command: &str, cwd: &Path) -> std::io::Result<CommandOutput> {
    tracing::debug!(command, cwd = %cwd.display(), "running shell command");

    let output = Command::new("sh")
        .arg("-c")
        .arg(command)
        .current_dir(cwd)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    Ok(capture(output))
}

fn capture(output: std::process::Output) -> CommandOutput {
    CommandOutput {
        success: output.status.success(),
        exit_code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_stdout_and_status() {
        let out = run("sh", &["-c", "echo hello"], None).await.unwrap();
        assert!(out.success);
        assert_eq!(out.exit_code, Some(0));
        assert_eq!(out.stdout.trim(), "hello");
    }

    #[tokio::test]
    async fn reports_nonzero_exit() {
        let out = run("sh", &["-c", "echo oops >&2; exit 3"], None)
            .await
            .unwrap();
        assert!(!out.success);
        assert_eq!(out.exit_code, Some(3));
        assert!(out.stderr.contains("oops"));
    }

    #[tokio::test]
    async fn shell_command_runs_in_given_directory() {
        let dir = std::env::temp_dir();
        let out = run_shell("pwd", &dir).await.unwrap();
        assert!(out.success);
        assert!(out.stdout.trim().ends_with(dir.file_name().unwrap().to_str().unwrap()));
    }
}
