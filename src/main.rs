// ABOUTME: Entry point for the relevo CLI application.
// ABOUTME: Parses arguments, dispatches commands, and maps outcomes to exit codes.

mod cli;

use clap::Parser;
use clap::error::ErrorKind;
use cli::{Cli, Commands, ReleasesArgs, RollbackArgs};
use relevo::config::{self, RawDeployConfig};
use relevo::deploy::{self, DeployOutcome};
use relevo::error::Error;
use relevo::store::ReleaseStore;
use relevo::types::AppName;
use tracing_subscriber::EnvFilter;

/// Exit code for configuration and usage errors.
const EXIT_USAGE: i32 = 1;

/// Exit code for failures with no live new release.
const EXIT_FAILED: i32 = 2;

#[tokio::main]
async fn main() {
    // Usage errors must exit 1, not clap's default of 2. Help and version
    // requests also surface as parse errors but are not usage errors.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => {
            let _ = e.print();
            std::process::exit(EXIT_USAGE);
        }
    };

    // Initialize tracing subscriber based on verbose flag
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("relevo=info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let code = run(cli).await;
    std::process::exit(code);
}

async fn run(cli: Cli) -> i32 {
    match cli.command {
        Commands::Deploy(args) => deploy_command(args.into_raw()).await,
        Commands::Rollback(args) => rollback_command(args).await,
        Commands::Releases(args) => releases_command(args),
    }
}

async fn deploy_command(raw: RawDeployConfig) -> i32 {
    let config = match raw.validate() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return EXIT_USAGE;
        }
    };

    println!(
        "Deploying {} from {:?} into {}",
        config.app,
        config.source,
        config.root.display()
    );

    // A termination signal abandons the run mid-step. The pointer swap is
    // atomic, so whatever value was last committed stands.
    let outcome = tokio::select! {
        outcome = deploy::run_deploy(config) => outcome,
        _ = tokio::signal::ctrl_c() => {
            eprintln!("Interrupted; deployment abandoned");
            return EXIT_FAILED;
        }
    };

    match &outcome {
        DeployOutcome::Completed { release, pruned } => {
            println!("  ✓ Deployed release {release}");
            if !pruned.is_empty() {
                println!("  ✓ Pruned {} old release(s)", pruned.len());
            }
        }
        DeployOutcome::RolledBack {
            failed,
            restored,
            reason,
        } => {
            eprintln!("  ✗ Release {failed} failed: {reason}");
            eprintln!("  ✓ Rolled back to {restored}");
        }
        DeployOutcome::Failed { error } => {
            eprintln!("  ✗ Deployment failed: {error}");
        }
    }

    outcome.exit_code()
}

async fn rollback_command(args: RollbackArgs) -> i32 {
    let (app, store) = match open_store(&args.app, &args.root) {
        Ok(pair) => pair,
        Err(code) => return code,
    };

    let supervisor =
        match config::supervisor_from_flags(args.unit, args.compose_file, args.project, &app) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("Error: {e}");
                return EXIT_USAGE;
            }
        };

    match deploy::manual_rollback(&store, &supervisor).await {
        Ok(restored) => {
            println!("  ✓ Rolled back to {restored}");
            0
        }
        Err(e) => {
            eprintln!("  ✗ Rollback failed: {e}");
            EXIT_FAILED
        }
    }
}

fn releases_command(args: ReleasesArgs) -> i32 {
    let (_, store) = match open_store(&args.app, &args.root) {
        Ok(pair) => pair,
        Err(code) => return code,
    };

    let current = match store.current() {
        Ok(current) => current,
        Err(e) => {
            eprintln!("Error: {e}");
            return EXIT_FAILED;
        }
    };

    match store.list() {
        Ok(releases) => {
            for id in releases {
                let marker = if Some(&id) == current.as_ref() { "*" } else { " " };
                println!("{marker} {id}");
            }
            0
        }
        Err(e) => {
            eprintln!("Error: {e}");
            EXIT_FAILED
        }
    }
}

fn open_store(app: &str, root: &std::path::Path) -> Result<(AppName, ReleaseStore), i32> {
    let app = match AppName::new(app) {
        Ok(app) => app,
        Err(e) => {
            eprintln!("Error: {}", Error::AppName(e));
            return Err(EXIT_USAGE);
        }
    };

    match ReleaseStore::open(root, &app) {
        Ok(store) => Ok((app, store)),
        Err(e) => {
            eprintln!("Error: {e}");
            Err(EXIT_FAILED)
        }
    }
}
