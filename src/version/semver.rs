use semver::Version;

/// Parse a version string into a semver::Version, normalizing partial versions.
///
/// Handles partial versions like "1" or "1.2" by padding with zeros and
/// tolerates a leading `v` or `=` as npm does for installed manifests.
///
/// Examples:
/// - "1" -> Version(1, 0, 0)
/// - "1.2" -> Version(1, 2, 0)
/// - "v1.2.3" -> Version(1, 2, 3)
pub fn parse_version(version: &str) -> Option<Version> {
    let version = version.trim();
    let version = version
        .strip_prefix('v')
        .or_else(|| version.strip_prefix('='))
        .unwrap_or(version);

    let parts: Vec<&str> = version.split('.').collect();
    let normalized = match parts.len() {
        1 => format!("{}.0.0", parts[0]),
        2 => format!("{}.{}.0", parts[0], parts[1]),
        _ => version.to_string(),
    };
    Version::parse(&normalized).ok()
}

/// Turn the keys of a registry `versions` map into the available-versions
/// sequence: strictly valid semver only, ascending, duplicates removed.
///
/// Pre-release versions are dropped unless `include_prerelease` is set.
pub fn available_versions<I, S>(keys: I, include_prerelease: bool) -> Vec<Version>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut versions: Vec<Version> = keys
        .into_iter()
        .filter_map(|key| Version::parse(key.as_ref()).ok())
        .filter(|v| include_prerelease || v.pre.is_empty())
        .collect();

    versions.sort();
    versions.dedup();
    versions
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("1", Some("1.0.0"))]
    #[case("1.2", Some("1.2.0"))]
    #[case("1.2.3", Some("1.2.3"))]
    #[case("v1.2.3", Some("1.2.3"))]
    #[case("=1.2.3", Some("1.2.3"))]
    #[case("0.0.0", Some("0.0.0"))]
    #[case("invalid", None)]
    #[case("", None)]
    fn parse_version_normalizes_partial_versions(
        #[case] input: &str,
        #[case] expected: Option<&str>,
    ) {
        assert_eq!(
            parse_version(input).map(|v| v.to_string()),
            expected.map(|s| s.to_string())
        );
    }

    #[test]
    fn available_versions_sorts_and_drops_prereleases() {
        let keys = ["2.0.0", "1.0.0-beta.1", "1.10.0", "1.2.0", "not-a-version"];

        let versions = available_versions(keys, false);

        assert_eq!(
            versions.iter().map(ToString::to_string).collect::<Vec<_>>(),
            vec!["1.2.0", "1.10.0", "2.0.0"]
        );
    }

    #[test]
    fn available_versions_keeps_prereleases_when_asked() {
        let versions = available_versions(["1.0.0", "1.0.0-rc.1"], true);

        assert_eq!(
            versions.iter().map(ToString::to_string).collect::<Vec<_>>(),
            vec!["1.0.0-rc.1", "1.0.0"]
        );
    }

    #[test]
    fn available_versions_removes_duplicates() {
        let versions = available_versions(["1.5.8", "1.5.8"], false);

        assert_eq!(versions, vec![Version::new(1, 5, 8)]);
    }
}
