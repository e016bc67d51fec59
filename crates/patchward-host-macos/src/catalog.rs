//! `softwareupdate` catalog adapter
//!
//! Refreshes and reports recommended updates by invoking the system update
//! tool and parsing its listing. The listing grammar changed across OS
//! releases; both spellings are handled in one pure parser below. Restart
//! classification reads the staged distribution manifest, never the
//! listing text.

use async_trait::async_trait;
use patchward_host_api::{CatalogError, CatalogResult, PendingUpdate, UpdateCatalog};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::command::{self, CommandError};
use crate::manifest;

const SOFTWAREUPDATE: &str = "/usr/sbin/softwareupdate";

/// Textual marker the tool prints when the catalog is empty.
const NO_UPDATES_MARKER: &str = "No new software available";

const LIST_TIMEOUT: Duration = Duration::from_secs(180);
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(1800);
const INSTALL_TIMEOUT: Duration = Duration::from_secs(3600);

/// One entry of the update listing, before cache correlation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedListEntry {
    pub label: String,
    pub title: Option<String>,
}

/// Parse the output of `softwareupdate -l -r`.
///
/// Two generations of the format are accepted:
/// - `* Label: macOSUpd10.15.7-10.15.7` followed by an indented
///   `Title: ..., Version: ..., ...` line
/// - `   * macOSUpd10.14.1-10.14.1` followed by an indented
///   `macOS 10.14.1 Update (10.14.1), 199140K [recommended] [restart]` line
pub fn parse_list_output(output: &str) -> Vec<ParsedListEntry> {
    if output.contains(NO_UPDATES_MARKER) {
        return Vec::new();
    }

    let mut entries: Vec<ParsedListEntry> = Vec::new();
    let mut awaiting_detail = false;

    for line in output.lines() {
        let trimmed = line.trim_start();
        if let Some(rest) = trimmed.strip_prefix("* ") {
            let label = rest.strip_prefix("Label: ").unwrap_or(rest).trim();
            if !label.is_empty() {
                entries.push(ParsedListEntry {
                    label: label.to_string(),
                    title: None,
                });
                awaiting_detail = true;
            }
            continue;
        }

        if awaiting_detail && line.starts_with(char::is_whitespace) {
            if let Some(entry) = entries.last_mut() {
                entry.title = parse_detail_line(trimmed);
            }
            awaiting_detail = false;
        }
    }

    entries
}

fn parse_detail_line(line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let title = if let Some(rest) = line.strip_prefix("Title: ") {
        rest.split(", Version:").next().unwrap_or(rest)
    } else {
        line.split(" (").next().unwrap_or(line)
    };
    let title = title.trim().trim_end_matches(',');
    (!title.is_empty()).then(|| title.to_string())
}

/// Split a listing label into identifier and display version. Labels are
/// `Identifier-DisplayVersion`; identifiers may themselves contain dashes,
/// so the split is at the last one.
pub fn split_label(label: &str) -> (String, String) {
    match label.rsplit_once('-') {
        Some((identifier, version)) => (identifier.trim().to_string(), version.trim().to_string()),
        None => (label.to_string(), String::new()),
    }
}

/// Catalog adapter backed by `softwareupdate` and the updates cache.
pub struct SoftwareUpdateCatalog {
    updates_cache: PathBuf,
}

impl SoftwareUpdateCatalog {
    pub fn new(updates_cache: impl Into<PathBuf>) -> Self {
        Self {
            updates_cache: updates_cache.into(),
        }
    }

    /// Locate the staged directory for an update by scanning cached
    /// distribution manifests for its identifier. The cache is keyed by
    /// product key, which the listing does not carry.
    fn find_staged_dir(&self, identifier: &str) -> Option<(String, PathBuf)> {
        let entries = std::fs::read_dir(&self.updates_cache).ok()?;
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let Ok(Some(dist)) = manifest::locate_dist_file(&path) else {
                continue;
            };
            let Ok(content) = std::fs::read_to_string(&dist) else {
                continue;
            };
            if manifest::dist_mentions(&content, identifier) {
                return Some((entry.file_name().to_string_lossy().into_owned(), path));
            }
        }
        None
    }

    fn to_pending_update(&self, entry: ParsedListEntry) -> PendingUpdate {
        let (identifier, display_version) = split_label(&entry.label);
        let staged = self.find_staged_dir(&identifier);

        PendingUpdate {
            // Until the update is staged there is no product directory to
            // name; the label stands in and is replaced on the next run.
            product_key: staged
                .as_ref()
                .map(|(name, _)| name.clone())
                .unwrap_or_else(|| entry.label.clone()),
            display_name: entry.title.unwrap_or_else(|| identifier.clone()),
            display_version,
            identifier,
            is_downloaded: staged.is_some(),
        }
    }
}

fn catalog_err(e: CommandError) -> CatalogError {
    match e {
        CommandError::Timeout { program, timeout } => CatalogError::Timeout {
            command: program,
            timeout,
        },
        CommandError::Failed { .. } => CatalogError::CommandFailed(e.to_string()),
        CommandError::Io { source, .. } => CatalogError::Io(source),
    }
}

#[async_trait]
impl UpdateCatalog for SoftwareUpdateCatalog {
    async fn list_recommended(&self) -> CatalogResult<Vec<PendingUpdate>> {
        info!("Refreshing the update catalog");
        let output = command::run_with_timeout(SOFTWAREUPDATE, &["-l", "-r"], LIST_TIMEOUT)
            .await
            .map_err(catalog_err)?;

        let updates: Vec<PendingUpdate> = parse_list_output(&output)
            .into_iter()
            .map(|entry| self.to_pending_update(entry))
            .collect();
        debug!(count = updates.len(), "Catalog refreshed");
        Ok(updates)
    }

    async fn requires_restart(&self, update: &PendingUpdate) -> CatalogResult<bool> {
        let keyed = self.updates_cache.join(&update.product_key);
        let dir = if keyed.is_dir() {
            keyed
        } else {
            self.find_staged_dir(&update.identifier)
                .map(|(_, path)| path)
                .ok_or_else(|| CatalogError::ManifestUnreadable {
                    product_key: update.product_key.clone(),
                    reason: "update is not staged in the updates cache".into(),
                })?
        };

        let dist = manifest::locate_dist_file(&dir)
            .map_err(|e| CatalogError::ManifestUnreadable {
                product_key: update.product_key.clone(),
                reason: e.to_string(),
            })?
            .ok_or_else(|| CatalogError::ManifestUnreadable {
                product_key: update.product_key.clone(),
                reason: "no distribution file in staged update".into(),
            })?;

        let content =
            std::fs::read_to_string(&dist).map_err(|e| CatalogError::ManifestUnreadable {
                product_key: update.product_key.clone(),
                reason: e.to_string(),
            })?;

        Ok(manifest::dist_requires_restart(&content))
    }

    async fn download(&self, update: &PendingUpdate) -> CatalogResult<()> {
        let name = update.install_name();
        info!(update = %name, "Downloading");
        command::run_with_timeout(SOFTWAREUPDATE, &["-d", &name], DOWNLOAD_TIMEOUT)
            .await
            .map_err(catalog_err)?;
        Ok(())
    }

    async fn install(&self, update: &PendingUpdate) -> CatalogResult<()> {
        let name = update.install_name();
        info!(update = %name, "Installing");
        command::run_with_timeout(SOFTWAREUPDATE, &["-i", &name], INSTALL_TIMEOUT)
            .await
            .map_err(catalog_err)?;
        Ok(())
    }

    async fn install_all_recommended(&self) -> CatalogResult<()> {
        info!("Installing all recommended updates");
        if let Err(e) = command::run_with_timeout(SOFTWAREUPDATE, &["-i", "-r"], INSTALL_TIMEOUT)
            .await
        {
            warn!(error = %e, "Bulk install reported failure");
            return Err(catalog_err(e));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODERN_LISTING: &str = "Software Update Tool\n\n\
Finding available software\n\
Software Update found the following new or recommended updates:\n\
* Label: macOS Catalina 10.15.7 Update-10.15.7\n\
\tTitle: macOS Catalina 10.15.7 Update, Version: 10.15.7, Size: 2500000K, Recommended: YES, Action: restart,\n\
* Label: Safari15.6.1CatalinaAuto-15.6.1\n\
\tTitle: Safari, Version: 15.6.1, Size: 100000K, Recommended: YES,\n";

    const LEGACY_LISTING: &str = "Software Update Tool\n\n\
Software Update found the following new or recommended updates:\n\
   * macOSUpd10.14.1-10.14.1\n\
\tmacOS 10.14.1 Update (10.14.1), 199140K [recommended] [restart]\n";

    const EMPTY_LISTING: &str = "Software Update Tool\n\nNo new software available.\n";

    #[test]
    fn parses_the_modern_listing() {
        let entries = parse_list_output(MODERN_LISTING);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].label, "macOS Catalina 10.15.7 Update-10.15.7");
        assert_eq!(
            entries[0].title.as_deref(),
            Some("macOS Catalina 10.15.7 Update")
        );
        assert_eq!(entries[1].title.as_deref(), Some("Safari"));
    }

    #[test]
    fn parses_the_legacy_listing() {
        let entries = parse_list_output(LEGACY_LISTING);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].label, "macOSUpd10.14.1-10.14.1");
        assert_eq!(entries[0].title.as_deref(), Some("macOS 10.14.1 Update"));
    }

    #[test]
    fn empty_marker_yields_no_entries() {
        assert!(parse_list_output(EMPTY_LISTING).is_empty());
        assert!(parse_list_output("").is_empty());
    }

    #[test]
    fn labels_split_at_the_last_dash() {
        assert_eq!(
            split_label("macOSUpd10.14.1-10.14.1"),
            ("macOSUpd10.14.1".to_string(), "10.14.1".to_string())
        );
        assert_eq!(
            split_label("Security Update 2026-001-1.0"),
            ("Security Update 2026-001".to_string(), "1.0".to_string())
        );
        assert_eq!(split_label("NoVersion"), ("NoVersion".to_string(), String::new()));
    }

    fn stage_update(cache: &std::path::Path, product_key: &str, dist: &str) {
        let dir = cache.join(product_key);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(format!("{product_key}.English.dist")), dist).unwrap();
    }

    fn pending(product_key: &str, identifier: &str) -> PendingUpdate {
        PendingUpdate {
            product_key: product_key.into(),
            display_name: identifier.into(),
            display_version: "1.0".into(),
            identifier: identifier.into(),
            is_downloaded: true,
        }
    }

    #[tokio::test]
    async fn classifies_a_staged_restart_update() {
        let cache = tempfile::tempdir().unwrap();
        stage_update(
            cache.path(),
            "041-88800",
            r#"<pkg-ref id="com.apple.pkg.SecUpd" onConclusion="RequireRestart"/>"#,
        );

        let catalog = SoftwareUpdateCatalog::new(cache.path());
        let update = pending("041-88800", "SecUpd");
        assert!(catalog.requires_restart(&update).await.unwrap());
    }

    #[tokio::test]
    async fn classifies_a_staged_restartless_update() {
        let cache = tempfile::tempdir().unwrap();
        stage_update(
            cache.path(),
            "041-11111",
            r#"<pkg-ref id="com.apple.pkg.Safari" onConclusion="None"/>"#,
        );

        let catalog = SoftwareUpdateCatalog::new(cache.path());
        let update = pending("041-11111", "Safari");
        assert!(!catalog.requires_restart(&update).await.unwrap());
    }

    #[tokio::test]
    async fn falls_back_to_identifier_search_when_key_is_a_placeholder() {
        let cache = tempfile::tempdir().unwrap();
        stage_update(
            cache.path(),
            "041-22222",
            r#"<pkg-ref id="SecUpd2026" onConclusion="RequireRestart"/>"#,
        );

        let catalog = SoftwareUpdateCatalog::new(cache.path());
        // Listing-derived placeholder key, not a cache directory name.
        let update = pending("SecUpd2026-1.0", "SecUpd2026");
        assert!(catalog.requires_restart(&update).await.unwrap());
    }

    #[tokio::test]
    async fn unstaged_update_has_an_unreadable_manifest() {
        let cache = tempfile::tempdir().unwrap();
        let catalog = SoftwareUpdateCatalog::new(cache.path());
        let update = pending("041-99999", "Ghost");

        let err = catalog.requires_restart(&update).await.unwrap_err();
        assert!(matches!(err, CatalogError::ManifestUnreadable { .. }));
    }

    #[tokio::test]
    async fn staged_dir_without_a_dist_file_is_unreadable() {
        let cache = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(cache.path().join("041-33333")).unwrap();

        let catalog = SoftwareUpdateCatalog::new(cache.path());
        let update = pending("041-33333", "Empty");

        let err = catalog.requires_restart(&update).await.unwrap_err();
        assert!(matches!(err, CatalogError::ManifestUnreadable { .. }));
    }
}
