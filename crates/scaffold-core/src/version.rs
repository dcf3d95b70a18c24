//! Engine version checks for generator `requires` fields

use semver::{Version, VersionReq};

/// Engine version generators are checked against
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Compare the engine version against a generator's requirement
/// Returns a warning message if the requirement is not met
pub fn check_compatibility(engine_version: &str, requires: &str, generator: &str) -> Option<String> {
    let engine = match parse_version(engine_version) {
        Some(v) => v,
        None => return None, // Can't compare, skip warning
    };

    let requirement = match VersionReq::parse(requires.trim()) {
        Ok(r) => r,
        Err(e) => {
            return Some(format!(
                "Generator `{}` declares an unreadable version requirement `{}`: {}",
                generator, requires, e
            ))
        }
    };

    if requirement.matches(&engine) {
        None
    } else {
        Some(format!(
            "Generator `{}` requires engine version {}, you are running {}",
            generator, requires, engine_version
        ))
    }
}

/// Parse version string, accepting a leading `v`
pub fn parse_version(version_str: &str) -> Option<Version> {
    let cleaned = version_str.trim();
    let cleaned = cleaned.strip_prefix('v').unwrap_or(cleaned);
    Version::parse(cleaned).ok()
}
