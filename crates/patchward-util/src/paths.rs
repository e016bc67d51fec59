//! Default paths for patchward components
//!
//! All paths can be overridden, either through the environment variables
//! below or through the matching CLI flags. The defaults match where the
//! management agent expects state to live on a managed Mac:
//! - Deferral record: `/var/db/patchward-deferral.json`
//! - Provisioning lock: `/var/run/patchward-provisioning.lock`
//! - Updates cache: `/Library/Updates`
//! - Log file: `/Library/Logs/patchward.log`

use std::path::PathBuf;

/// Environment variable for overriding the deferral record path
pub const DEFER_FILE_ENV: &str = "PATCHWARD_DEFER_FILE";

/// Environment variable for overriding the provisioning lock path
pub const LOCK_FILE_ENV: &str = "PATCHWARD_LOCK_FILE";

/// Environment variable for overriding the updates cache directory
pub const UPDATES_CACHE_ENV: &str = "PATCHWARD_UPDATES_CACHE";

/// Environment variable for overriding the log file path
pub const LOG_FILE_ENV: &str = "PATCHWARD_LOG_FILE";

/// Get the default deferral record path.
///
/// Order of precedence:
/// 1. `$PATCHWARD_DEFER_FILE` environment variable (if set)
/// 2. `/var/db/patchward-deferral.json`
pub fn default_defer_file() -> PathBuf {
    if let Ok(path) = std::env::var(DEFER_FILE_ENV) {
        return PathBuf::from(path);
    }
    PathBuf::from("/var/db/patchward-deferral.json")
}

/// Get the default provisioning lock path.
///
/// While this file exists another privileged bulk install is in flight and
/// the policy must not run.
pub fn default_lock_file() -> PathBuf {
    if let Ok(path) = std::env::var(LOCK_FILE_ENV) {
        return PathBuf::from(path);
    }
    PathBuf::from("/var/run/patchward-provisioning.lock")
}

/// Get the default updates cache directory, where the OS stages downloaded
/// update packages and their distribution manifests.
pub fn default_updates_cache() -> PathBuf {
    if let Ok(path) = std::env::var(UPDATES_CACHE_ENV) {
        return PathBuf::from(path);
    }
    PathBuf::from("/Library/Updates")
}

/// Get the default log file path. The file is truncated at the start of
/// every run.
pub fn default_log_file() -> PathBuf {
    if let Ok(path) = std::env::var(LOG_FILE_ENV) {
        return PathBuf::from(path);
    }
    PathBuf::from("/Library/Logs/patchward.log")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defer_file_has_json_extension() {
        let path = default_defer_file();
        assert!(path.to_string_lossy().contains("patchward"));
        assert!(path.extension().is_some());
    }

    #[test]
    fn lock_file_is_under_var_run_by_default() {
        // Only meaningful when the env override is absent; keep the
        // assertion on the stable part of the name.
        let path = default_lock_file();
        assert!(path.to_string_lossy().contains("patchward"));
    }

    #[test]
    fn log_file_mentions_patchward() {
        let path = default_log_file();
        assert!(path.to_string_lossy().contains("patchward"));
    }
}
