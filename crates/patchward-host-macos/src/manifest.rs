//! Distribution-manifest inspection
//!
//! Whether an update requires a restart is recorded in its packaged
//! distribution file as an `onConclusion="RequireRestart"` attribute on at
//! least one `pkg-ref`. This is the single place that reads those files;
//! an unlocatable or unreadable manifest is surfaced, never guessed.

use std::io;
use std::path::{Path, PathBuf};

/// Find the distribution file inside a staged update directory.
///
/// The manifest is localized (`<name>.<language>.dist`) so any `.dist`
/// file will do. Some catalogs prepend `zzzz` to the file name but stage
/// the content under the canonical name; prefer the canonical file when
/// both spellings exist.
pub fn locate_dist_file(product_dir: &Path) -> io::Result<Option<PathBuf>> {
    for entry in std::fs::read_dir(product_dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !name.ends_with(".dist") {
            continue;
        }

        if let Some(stripped) = name.strip_prefix("zzzz") {
            let canonical = product_dir.join(stripped);
            if canonical.is_file() {
                return Ok(Some(canonical));
            }
        }
        return Ok(Some(entry.path()));
    }
    Ok(None)
}

/// Whether the manifest marks any sub-package as requiring a restart on
/// conclusion.
pub fn dist_requires_restart(content: &str) -> bool {
    attribute_values(content, "onConclusion").any(|value| value == "RequireRestart")
}

/// Whether the manifest text references the given update identifier. Used
/// to match a staged directory back to a catalog entry.
pub fn dist_mentions(content: &str, identifier: &str) -> bool {
    !identifier.is_empty() && content.contains(identifier)
}

/// Iterate the values of every occurrence of an XML attribute, tolerating
/// whitespace around `=` and either quote style. This is deliberately not
/// a full XML parse; the manifests are machine-generated and the attribute
/// grammar is all we depend on.
fn attribute_values<'a>(content: &'a str, attribute: &'a str) -> impl Iterator<Item = &'a str> {
    content.match_indices(attribute).filter_map(move |(at, _)| {
        let rest = content[at + attribute.len()..].trim_start();
        let rest = rest.strip_prefix('=')?.trim_start();
        let quote = rest.chars().next()?;
        if quote != '"' && quote != '\'' {
            return None;
        }
        let rest = &rest[1..];
        rest.split(quote).next()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESTART_DIST: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<installer-gui-script minSpecVersion="1">
    <options customize="never" allow-external-scripts="no"/>
    <choices-outline ui="SoftwareUpdate">
        <line choice="su"/>
    </choices-outline>
    <choice id="su" suDisabledGroupID="SecUpd2026-001">
        <pkg-ref id="com.apple.pkg.update.security" onConclusion="RequireRestart"/>
    </choice>
</installer-gui-script>
"#;

    const NO_RESTART_DIST: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<installer-gui-script minSpecVersion="1">
    <choice id="su" suDisabledGroupID="Safari16">
        <pkg-ref id="com.apple.pkg.Safari" onConclusion="None"/>
    </choice>
</installer-gui-script>
"#;

    #[test]
    fn detects_restart_marker() {
        assert!(dist_requires_restart(RESTART_DIST));
        assert!(!dist_requires_restart(NO_RESTART_DIST));
    }

    #[test]
    fn tolerates_attribute_whitespace_and_single_quotes() {
        assert!(dist_requires_restart(
            "<pkg-ref id='a' onConclusion = 'RequireRestart'/>"
        ));
        assert!(!dist_requires_restart(
            "<pkg-ref id='a' onConclusion = 'None'/>"
        ));
    }

    #[test]
    fn a_single_marked_package_is_enough() {
        let multi = format!("{NO_RESTART_DIST}\n{RESTART_DIST}");
        assert!(dist_requires_restart(&multi));
    }

    #[test]
    fn mention_requires_nonempty_identifier() {
        assert!(dist_mentions(RESTART_DIST, "SecUpd2026-001"));
        assert!(!dist_mentions(RESTART_DIST, "Safari16"));
        assert!(!dist_mentions(RESTART_DIST, ""));
    }

    #[test]
    fn locates_any_dist_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("041-88800.English.dist"), RESTART_DIST).unwrap();
        std::fs::write(dir.path().join("unrelated.pkg"), b"").unwrap();

        let found = locate_dist_file(dir.path()).unwrap().unwrap();
        assert!(found.to_string_lossy().ends_with(".dist"));
    }

    #[test]
    fn prefers_canonical_name_over_zzzz_prefix() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("zzzz041-88800.English.dist"), b"prefixed").unwrap();
        std::fs::write(dir.path().join("041-88800.English.dist"), b"canonical").unwrap();

        let found = locate_dist_file(dir.path()).unwrap().unwrap();
        let content = std::fs::read_to_string(found).unwrap();
        assert_eq!(content, "canonical");
    }

    #[test]
    fn empty_directory_has_no_manifest() {
        let dir = tempfile::tempdir().unwrap();
        assert!(locate_dist_file(dir.path()).unwrap().is_none());
    }
}
