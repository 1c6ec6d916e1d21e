//! Version model
//!
//! Versions on disk follow the `{base}-{revision}` convention:
//! - Base version: dotted numbers (e.g., `1.4.2`)
//! - Revision: free-form suffix after the first `-` (e.g., `1.4.2-20240101`)
//!
//! Base versions decompose into `major.minor.patch`. Missing or non-numeric
//! segments count as 0, so `1.x` and `1` both read as `1.0.0`.

use serde::Serialize;
use std::fmt;

/// Numeric view of a base version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub struct BaseVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl BaseVersion {
    /// Parses the base portion of a version string
    ///
    /// Never fails: qualifiers like `1.0-alpha` or `RELEASE` yield zeros
    /// for the segments that are not numbers.
    pub fn parse(text: &str) -> Self {
        let (base, _) = decompose(text);
        let mut segments = base.split('.').map(|s| s.trim().parse::<u64>().unwrap_or(0));

        Self {
            major: segments.next().unwrap_or(0),
            minor: segments.next().unwrap_or(0),
            patch: segments.next().unwrap_or(0),
        }
    }
}

impl fmt::Display for BaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Parses the base portion of a version into `(major, minor, patch)`
pub fn parse_base(text: &str) -> (u64, u64, u64) {
    let base = BaseVersion::parse(text);
    (base.major, base.minor, base.patch)
}

/// Builds the on-disk version string from a base version and a revision
pub fn compose(base: &str, revision: &str) -> String {
    if revision.is_empty() {
        base.to_string()
    } else {
        format!("{}-{}", base, revision)
    }
}

/// Splits a version string into its base and revision (split at the first `-`)
pub fn decompose(version: &str) -> (&str, Option<&str>) {
    match version.split_once('-') {
        Some((base, revision)) => (base, Some(revision)),
        None => (version, None),
    }
}

/// Returns true if both versions share the major component
pub fn same_major(a: &str, b: &str) -> bool {
    BaseVersion::parse(a).major == BaseVersion::parse(b).major
}

/// Returns true if both versions share major and minor components
pub fn same_major_minor(a: &str, b: &str) -> bool {
    let a = BaseVersion::parse(a);
    let b = BaseVersion::parse(b);
    a.major == b.major && a.minor == b.minor
}

/// Returns true if both versions have the same base string
///
/// Compares text, not numbers: `1.0` and `1.0.0` are different bases.
pub fn same_base(a: &str, b: &str) -> bool {
    decompose(a).0 == decompose(b).0
}

/// Returns true if the version refers to a property (e.g., `${project.version}`)
pub fn is_property_reference(version: &str) -> bool {
    version.trim_start().starts_with("${")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parse_full_base() {
        assert_eq!(parse_base("1.2.3"), (1, 2, 3));
        assert_eq!(parse_base("10.20.30-4711"), (10, 20, 30));
    }

    #[test]
    fn missing_segments_default_to_zero() {
        assert_eq!(parse_base("4"), (4, 0, 0));
        assert_eq!(parse_base("4.1"), (4, 1, 0));
        assert_eq!(parse_base(""), (0, 0, 0));
    }

    #[test]
    fn non_numeric_segments_default_to_zero() {
        assert_eq!(parse_base("1.x.3"), (1, 0, 3));
        assert_eq!(parse_base("RELEASE"), (0, 0, 0));
        assert_eq!(parse_base("2.0.0-SNAPSHOT"), (2, 0, 0));
    }

    #[test]
    fn compose_without_revision() {
        assert_eq!(compose("1.1.1", ""), "1.1.1");
    }

    #[test]
    fn compose_with_revision() {
        assert_eq!(compose("1.1.1", "12345"), "1.1.1-12345");
    }

    #[test]
    fn decompose_keeps_rest_of_suffix() {
        assert_eq!(decompose("1.0.0-rc-1"), ("1.0.0", Some("rc-1")));
        assert_eq!(decompose("1.0.0"), ("1.0.0", None));
    }

    #[test]
    fn comparisons() {
        assert!(same_major("2.0.5-123", "2.4.5"));
        assert!(!same_major("1.1.1-123", "5.0.1"));

        assert!(same_major_minor("2.0.5-123", "2.0.11"));
        assert!(!same_major_minor("1.1.1-123", "1.2.2"));

        assert!(same_base("2.0.5-123", "2.0.5"));
        assert!(!same_base("1.1.1-123", "1.1.2"));
        assert!(!same_base("1.0", "1.0.0"));
    }

    #[test]
    fn property_references() {
        assert!(is_property_reference("${project.version}"));
        assert!(!is_property_reference("1.0.0"));
    }

    #[test]
    fn display_base_version() {
        assert_eq!(BaseVersion::parse("3.2").to_string(), "3.2.0");
    }

    proptest! {
        #[test]
        fn compose_then_decompose(
            major in 0u64..10_000,
            minor in 0u64..10_000,
            patch in 0u64..10_000,
            revision in "[0-9A-Za-z]{0,12}",
        ) {
            let base = format!("{}.{}.{}", major, minor, patch);
            let version = compose(&base, &revision);

            let (parsed_base, parsed_revision) = decompose(&version);
            prop_assert_eq!(parse_base(parsed_base), (major, minor, patch));
            prop_assert_eq!(parsed_revision.unwrap_or(""), revision.as_str());
        }
    }
}
