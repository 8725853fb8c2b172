//! In-place rewrite of the mirrored files for one release

use std::path::PathBuf;
use std::sync::LazyLock;

use regex::{NoExpand, Regex};
use tracing::debug;

use crate::config::{MANIFEST_FILE, README_FILE};
use crate::mirror::error::MirrorError;
use crate::version::error::ConfigError;
use crate::version::types::Release;

static REQUIRES_PYTHON_FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"requires-python = "[^"]*""#).expect("static regex is valid"));

static REV_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"rev: v\d+\.\d+\.\d+").expect("static regex is valid"));

/// Patterns locating version tokens in the mirrored files
#[derive(Debug, Clone)]
pub struct Patterns {
    package: String,
    pin_name: String,
    pin: Regex,
    badge: Regex,
}

impl Patterns {
    pub fn new(package: &str) -> Self {
        Self::with_pin_name(package, package)
    }

    /// Patterns for `package` whose requirement spells it `pin_name`.
    ///
    /// The pin keeps its quote style, extras and markers; only the version
    /// after `==` is replaced.
    pub fn with_pin_name(package: &str, pin_name: &str) -> Self {
        let pin = format!(
            r#"(?P<open>["'])(?P<head>\s*{}(?:\s*\[[^\]"']*\])?)\s*==\s*[^"'\s;,]*"#,
            regex::escape(pin_name)
        );
        let badge = format!(r"/{}/\d+\.\d+\.\d+\.svg", regex::escape(package));

        Self {
            package: package.to_string(),
            pin_name: pin_name.to_string(),
            pin: Regex::new(&pin).expect("escaped name is a valid pattern"),
            badge: Regex::new(&badge).expect("escaped name is a valid pattern"),
        }
    }

    /// Whether `content` holds a pin this rewrite can update
    pub fn has_pin(&self, content: &str) -> bool {
        self.pin.is_match(content)
    }
}

/// Rewrites one file's content for a release
pub type Rewriter = fn(&Patterns, &str, &Release) -> String;

/// A mirrored file and the rewrite applied to it
#[derive(Debug, Clone, Copy)]
pub struct MirrorTarget {
    /// Path relative to the repository root
    pub path: &'static str,
    rewrite: Rewriter,
}

impl MirrorTarget {
    pub fn rewrite(&self, patterns: &Patterns, content: &str, release: &Release) -> String {
        (self.rewrite)(patterns, content, release)
    }
}

/// Files rewritten for every release, in order
pub const MIRROR_TARGETS: [MirrorTarget; 2] = [
    MirrorTarget {
        path: MANIFEST_FILE,
        rewrite: rewrite_manifest,
    },
    MirrorTarget {
        path: README_FILE,
        rewrite: rewrite_readme,
    },
];

/// Point the exact pin and `requires-python` at the release.
pub fn rewrite_manifest(patterns: &Patterns, content: &str, release: &Release) -> String {
    let pin = format!("${{open}}${{head}}=={}", release.version);
    let requires_python = format!(
        "requires-python = \"{}\"",
        release.requires_python_string()
    );

    let content = patterns.pin.replace_all(content, pin.as_str());
    REQUIRES_PYTHON_FIELD
        .replace_all(&content, NoExpand(&requires_python))
        .into_owned()
}

/// Point the `rev:` reference and the badge URL at the release.
pub fn rewrite_readme(patterns: &Patterns, content: &str, release: &Release) -> String {
    let rev = format!("rev: v{}", release.version);
    let badge = format!("/{}/{}.svg", patterns.package, release.version);

    let content = REV_TAG.replace_all(content, NoExpand(&rev));
    patterns
        .badge
        .replace_all(&content, NoExpand(&badge))
        .into_owned()
}

/// Rewrites the mirrored files below a repository root
#[derive(Debug, Clone)]
pub struct TextMirror {
    root: PathBuf,
    patterns: Patterns,
    targets: Vec<MirrorTarget>,
}

impl TextMirror {
    pub fn new(root: impl Into<PathBuf>, package: &str) -> Self {
        Self {
            root: root.into(),
            patterns: Patterns::new(package),
            targets: MIRROR_TARGETS.to_vec(),
        }
    }

    /// Same files, with the pin matched as `pin_name` is written.
    pub fn for_pin(&self, pin_name: &str) -> Self {
        Self {
            root: self.root.clone(),
            patterns: Patterns::with_pin_name(&self.patterns.package, pin_name),
            targets: self.targets.clone(),
        }
    }

    /// Fail unless the manifest holds a pin the rewrite can update.
    pub async fn ensure_pin(&self) -> Result<(), MirrorError> {
        let path = self.root.join(MANIFEST_FILE);
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| MirrorError::Io {
                path: path.clone(),
                source,
            })?;

        if self.patterns.has_pin(&content) {
            Ok(())
        } else {
            Err(ConfigError::PinNotRewritable {
                package: self.patterns.pin_name.clone(),
                path,
            }
            .into())
        }
    }

    /// Root-relative paths of every mirrored file, in rewrite order.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.targets.iter().map(|t| PathBuf::from(t.path)).collect()
    }

    /// Rewrite every mirrored file for `release`.
    ///
    /// Each file is fully replaced with its rewritten content. Returns the
    /// root-relative paths of all targets whether or not their content changed.
    pub async fn apply(&self, release: &Release) -> Result<Vec<PathBuf>, MirrorError> {
        for target in &self.targets {
            let path = self.root.join(target.path);
            let io_error = |source| MirrorError::Io {
                path: path.clone(),
                source,
            };

            let content = tokio::fs::read_to_string(&path).await.map_err(io_error)?;
            let rewritten = target.rewrite(&self.patterns, &content, release);
            debug!(
                "Rewriting {} for {} (changed: {})",
                target.path,
                release.version,
                rewritten != content
            );
            tokio::fs::write(&path, rewritten).await.map_err(io_error)?;
        }

        Ok(self.paths())
    }
}
