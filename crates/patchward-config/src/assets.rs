//! Dialog asset lookup
//!
//! Icon locations moved between OS releases. The lookup is resolved once at
//! startup into a single `Assets` value passed through to the engine, so no
//! version conditionals appear in the decision logic.

use std::path::PathBuf;
use tracing::warn;

const CAUTION_ICON: &str =
    "/System/Library/CoreServices/CoreTypes.bundle/Contents/Resources/AlertCautionIcon.icns";

const BRANDING_LOGO: &str = "/Library/Application Support/patchward/branding.png";

const UPDATE_ICON_CORESERVICES: &str =
    "/System/Library/CoreServices/Software Update.app/Contents/Resources/SoftwareUpdate.icns";

const UPDATE_ICON_CLT: &str = "/System/Library/CoreServices/Install Command Line Developer \
                               Tools.app/Contents/Resources/SoftwareUpdate.icns";

const UPDATE_ICON_PREFPANE: &str =
    "/System/Library/PreferencePanes/SoftwareUpdate.prefPane/Contents/Resources/SoftwareUpdate.icns";

/// Paths to the images used in user-facing dialogs, resolved for the
/// running OS release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assets {
    pub update_icon: PathBuf,
    pub caution_icon: PathBuf,
    pub branding_logo: PathBuf,
}

impl Assets {
    /// Resolve assets for an OS product version string such as "10.14.6"
    /// or "13.2". Unknown or unparsable versions fall back to the current
    /// layout.
    pub fn for_os_version(version: &str) -> Self {
        let update_icon = match parse_major_minor(version) {
            Some((10, 11)) | Some((10, 12)) => UPDATE_ICON_CORESERVICES,
            Some((10, 13)) => UPDATE_ICON_CLT,
            Some((10, minor)) if minor >= 14 => UPDATE_ICON_PREFPANE,
            Some((major, _)) if major >= 11 => UPDATE_ICON_PREFPANE,
            _ => {
                warn!(version, "Unrecognized OS version, using current icon layout");
                UPDATE_ICON_PREFPANE
            }
        };

        Self {
            update_icon: PathBuf::from(update_icon),
            caution_icon: PathBuf::from(CAUTION_ICON),
            branding_logo: PathBuf::from(BRANDING_LOGO),
        }
    }
}

fn parse_major_minor(version: &str) -> Option<(u32, u32)> {
    let mut parts = version.trim().split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next().unwrap_or("0").parse().ok()?;
    Some((major, minor))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sierra_uses_coreservices_icon() {
        let assets = Assets::for_os_version("10.12.6");
        assert_eq!(assets.update_icon, PathBuf::from(UPDATE_ICON_CORESERVICES));
    }

    #[test]
    fn high_sierra_uses_clt_icon() {
        let assets = Assets::for_os_version("10.13.6");
        assert_eq!(assets.update_icon, PathBuf::from(UPDATE_ICON_CLT));
    }

    #[test]
    fn mojave_and_later_use_prefpane_icon() {
        for version in ["10.14.6", "10.15", "11.7.2", "13.2"] {
            let assets = Assets::for_os_version(version);
            assert_eq!(assets.update_icon, PathBuf::from(UPDATE_ICON_PREFPANE));
        }
    }

    #[test]
    fn garbage_version_falls_back() {
        let assets = Assets::for_os_version("not-a-version");
        assert_eq!(assets.update_icon, PathBuf::from(UPDATE_ICON_PREFPANE));
    }

    #[test]
    fn version_without_minor_parses() {
        assert_eq!(parse_major_minor("11"), Some((11, 0)));
        assert_eq!(parse_major_minor("10.14.6"), Some((10, 14)));
        assert_eq!(parse_major_minor(""), None);
    }
}
