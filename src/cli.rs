// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use relevo::config::RawDeployConfig;

#[derive(Parser)]
#[command(name = "relevo")]
#[command(about = "Versioned release deployment with atomic switchover and automatic rollback")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Deploy a new release and verify its health
    Deploy(DeployArgs),

    /// Repoint the current release at the preceding one and restart
    Rollback(RollbackArgs),

    /// List releases, newest first, with the current one marked
    Releases(ReleasesArgs),
}

#[derive(Args)]
pub struct DeployArgs {
    /// Application name (lowercase DNS label)
    #[arg(long)]
    pub app: String,

    /// Root directory holding one subdirectory per application
    #[arg(long)]
    pub root: PathBuf,

    /// Artifact path: an archive (.tar.gz, .tgz, .tar) or a directory tree
    #[arg(long, conflicts_with_all = ["repo", "reference"])]
    pub artifact: Option<PathBuf>,

    /// Source-control URL to fetch the release from
    #[arg(long)]
    pub repo: Option<String>,

    /// Source-control reference to fetch (branch or tag), requires --repo
    #[arg(long = "ref", requires = "repo")]
    pub reference: Option<String>,

    /// Readiness endpoint polled after the switch; any 2xx means healthy
    #[arg(long)]
    pub health_url: String,

    /// Overall health-check deadline in seconds
    #[arg(long, default_value_t = 60)]
    pub timeout: u64,

    /// Seconds between health probes
    #[arg(long, default_value_t = 1)]
    pub poll_interval: u64,

    /// How many non-current releases to retain after a successful deploy
    #[arg(long, default_value_t = 5)]
    pub keep: usize,

    /// Environment file copied into the release as .env
    #[arg(long)]
    pub env_file: Option<PathBuf>,

    /// Shell command run in the release directory before the switch
    #[arg(long)]
    pub pre_hook: Option<String>,

    /// Shell command run in the release directory after health passes
    #[arg(long)]
    pub post_hook: Option<String>,

    /// systemd unit to restart for the new release
    #[arg(long, conflicts_with_all = ["compose_file", "project"])]
    pub unit: Option<String>,

    /// Compose manifest copied into the release and brought up
    #[arg(long)]
    pub compose_file: Option<PathBuf>,

    /// Compose project name, defaults to the application name
    #[arg(long, requires = "compose_file")]
    pub project: Option<String>,
}

impl DeployArgs {
    pub fn into_raw(self) -> RawDeployConfig {
        RawDeployConfig {
            app: self.app,
            root: self.root,
            artifact: self.artifact,
            repo: self.repo,
            reference: self.reference,
            health_url: self.health_url,
            timeout_secs: self.timeout,
            poll_interval_secs: self.poll_interval,
            keep: self.keep,
            env_file: self.env_file,
            pre_hook: self.pre_hook,
            post_hook: self.post_hook,
            unit: self.unit,
            compose_file: self.compose_file,
            project: self.project,
        }
    }
}

#[derive(Args)]
pub struct RollbackArgs {
    /// Application name (lowercase DNS label)
    #[arg(long)]
    pub app: String,

    /// Root directory holding one subdirectory per application
    #[arg(long)]
    pub root: PathBuf,

    /// systemd unit to restart for the restored release
    #[arg(long, conflicts_with_all = ["compose_file", "project"])]
    pub unit: Option<String>,

    /// Compose manifest brought up for the restored release
    #[arg(long)]
    pub compose_file: Option<PathBuf>,

    /// Compose project name, defaults to the application name
    #[arg(long, requires = "compose_file")]
    pub project: Option<String>,
}

#[derive(Args)]
pub struct ReleasesArgs {
    /// Application name (lowercase DNS label)
    #[arg(long)]
    pub app: String,

    /// Root directory holding one subdirectory per application
    #[arg(long)]
    pub root: PathBuf,
}
