use std::path::PathBuf;

// =============================================================================
// Mirrored files
// =============================================================================

/// Manifest carrying the exact pin and the `requires-python` field
pub const MANIFEST_FILE: &str = "pyproject.toml";

/// Documentation carrying the `rev:` reference and the badge URL
pub const README_FILE: &str = "README.md";

// =============================================================================
// Upstream defaults
// =============================================================================

/// Package mirrored when none is given on the command line
pub const DEFAULT_PACKAGE: &str = "zizmor";

/// Package index queried when none is given on the command line
pub const DEFAULT_INDEX_URL: &str = "https://pypi.org";

/// Runtime range used when a release declares none for its pure build
pub const DEFAULT_REQUIRES_PYTHON: &str = ">=3.10";

/// `python_version` tag of a pure (universal) wheel
pub const PURE_BUILD_TAG: &str = "py3";

/// Run configuration
#[derive(Debug, Clone, PartialEq)]
pub struct MirrorConfig {
    /// Repository root holding the mirrored files
    pub root: PathBuf,
    /// Upstream package name
    pub package: String,
    /// Base URL of the package index
    pub index_url: String,
    /// Proceed even if the mirrored files have uncommitted changes
    pub allow_dirty: bool,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            package: DEFAULT_PACKAGE.to_string(),
            index_url: DEFAULT_INDEX_URL.to_string(),
            allow_dirty: false,
        }
    }
}

impl MirrorConfig {
    /// Path of the manifest below the repository root.
    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }
}
