//! patchward - software-update deferral and enforcement for managed Macs
//!
//! One invocation is one policy run. The management agent schedules runs
//! and passes the four policy integers; everything else is derived fresh
//! each time. Exit code 0 covers every normal outcome (including
//! "deferred" and "nothing to do"); 255 is a fatal error the agent
//! alerts on.

use clap::Parser;
use patchward_config::{build_policy, Assets, RawParameters, RunPaths};
use patchward_core::EnforcementEngine;
use patchward_host_macos::{
    JamfHelperDialogs, MacEnvironmentProbe, OsaScriptSession, SoftwareUpdateCatalog,
    JAMFHELPER_PATH,
};
use patchward_store::FileDeferralStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Exit code for fatal errors: bad parameters, command timeouts,
/// unreadable manifests.
const FATAL_EXIT: i32 = 255;

/// patchward - software-update deferral and enforcement for managed Macs
#[derive(Parser, Debug)]
#[command(name = "patchward")]
#[command(about = "Software-update deferral and enforcement for managed Macs", long_about = None)]
struct Args {
    /// Days a user may defer a restart-requiring update
    defer_limit_days: i64,

    /// Quiet-hours start hour (0-23)
    quiet_hours_start: i64,

    /// Quiet-hours end hour (0-23)
    quiet_hours_end: i64,

    /// Minimum battery percentage for unattended installs off mains power
    min_battery_percent: i64,

    /// Deferral record path (or set PATCHWARD_DEFER_FILE)
    #[arg(long)]
    defer_file: Option<PathBuf>,

    /// Provisioning lock path (or set PATCHWARD_LOCK_FILE)
    #[arg(long)]
    lock_file: Option<PathBuf>,

    /// Updates cache directory (or set PATCHWARD_UPDATES_CACHE)
    #[arg(long)]
    updates_cache: Option<PathBuf>,

    /// Log file path (or set PATCHWARD_LOG_FILE)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

/// Initialize logging to stderr and to the per-run log file. The file is
/// truncated at startup; if it cannot be opened the run proceeds with
/// stderr only.
fn init_logging(log_level: &str, log_file: &Path) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let file_layer = match std::fs::File::create(log_file) {
        Ok(file) => Some(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(std::sync::Mutex::new(file)),
        ),
        Err(e) => {
            eprintln!(
                "patchward: cannot open log file {}: {e}; logging to stderr only",
                log_file.display()
            );
            None
        }
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(file_layer)
        .init();
}

async fn run(args: Args) -> i32 {
    info!(version = env!("CARGO_PKG_VERSION"), "patchward starting");

    let paths = RunPaths {
        defer_file: args
            .defer_file
            .unwrap_or_else(patchward_util::default_defer_file),
        lock_file: args
            .lock_file
            .unwrap_or_else(patchward_util::default_lock_file),
        updates_cache: args
            .updates_cache
            .unwrap_or_else(patchward_util::default_updates_cache),
    };

    let raw = RawParameters {
        defer_limit_days: args.defer_limit_days,
        quiet_hours_start: args.quiet_hours_start,
        quiet_hours_end: args.quiet_hours_end,
        min_battery_percent: args.min_battery_percent,
    };
    let policy = match build_policy(raw, paths) {
        Ok(policy) => policy,
        Err(e) => {
            error!(error = %e, "Invalid run parameters");
            return FATAL_EXIT;
        }
    };

    let assets = match patchward_host_macos::os_product_version().await {
        Ok(version) => Assets::for_os_version(&version),
        Err(e) => {
            warn!(error = %e, "Could not read OS version, using current asset layout");
            Assets::for_os_version("")
        }
    };

    let catalog = Arc::new(SoftwareUpdateCatalog::new(policy.paths.updates_cache.clone()));
    let dialogs = Arc::new(JamfHelperDialogs::new());
    let session = Arc::new(OsaScriptSession::new(
        JAMFHELPER_PATH,
        assets.update_icon.clone(),
    ));
    let probe = Arc::new(MacEnvironmentProbe::new());
    let store = Arc::new(FileDeferralStore::new(policy.paths.defer_file.clone()));

    let mut engine =
        EnforcementEngine::new(policy, assets, catalog, dialogs, session, probe, store);

    match engine.run().await {
        Ok(outcome) => {
            info!(%outcome, exit_code = outcome.exit_code(), "Run complete");
            outcome.exit_code()
        }
        Err(e) => {
            error!(error = %e, "Run aborted");
            e.exit_code()
        }
    }
}

#[tokio::main]
async fn main() {
    // Bad arguments are a configuration error, reported on the same
    // distinguished exit code as other fatal failures.
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            // Help and version requests are not errors.
            if e.use_stderr() {
                std::process::exit(FATAL_EXIT);
            }
            std::process::exit(0);
        }
    };

    let log_file = args
        .log_file
        .clone()
        .unwrap_or_else(patchward_util::default_log_file);
    init_logging(&args.log_level, &log_file);

    std::process::exit(run(args).await);
}
