//! Release and catalog types shared by the registry and the mirror loop

use std::fmt;

use pep508_rs::pep440_rs::{Version, VersionSpecifiers};

/// One published, final release of the upstream package
#[derive(Debug, Clone, PartialEq)]
pub struct Release {
    pub version: Version,
    /// Supported Python versions declared by the release's pure build
    pub requires_python: VersionSpecifiers,
}

impl Release {
    pub fn new(version: Version, requires_python: VersionSpecifiers) -> Self {
        Self {
            version,
            requires_python,
        }
    }

    /// Canonical rendering of `requires_python`: specifiers sorted, joined by `,`.
    pub fn requires_python_string(&self) -> String {
        let mut specifiers: Vec<String> = self
            .requires_python
            .iter()
            .map(ToString::to_string)
            .collect();
        specifiers.sort();
        specifiers.join(",")
    }
}

impl fmt::Display for Release {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (requires-python {})", self.version, self.requires_python_string())
    }
}

/// Final releases of a package, strictly ascending by version
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    releases: Vec<Release>,
}

impl Catalog {
    /// Build a catalog from releases in any order.
    ///
    /// Pre-releases are dropped and versions that compare equal are collapsed
    /// to the first one seen.
    pub fn from_releases(releases: impl IntoIterator<Item = Release>) -> Self {
        let mut releases: Vec<Release> = releases
            .into_iter()
            .filter(|r| !r.version.any_prerelease())
            .collect();
        // Stable sort keeps the first of equal versions in front for dedup.
        releases.sort_by(|a, b| a.version.cmp(&b.version));
        releases.dedup_by(|later, earlier| later.version == earlier.version);
        Self { releases }
    }

    pub fn releases(&self) -> &[Release] {
        &self.releases
    }

    pub fn len(&self) -> usize {
        self.releases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.releases.is_empty()
    }
}

/// Releases strictly newer than `current`, in ascending order.
pub fn select<'a>(catalog: &'a Catalog, current: &Version) -> &'a [Release] {
    let releases = catalog.releases();
    let start = releases.partition_point(|r| r.version <= *current);
    &releases[start..]
}
