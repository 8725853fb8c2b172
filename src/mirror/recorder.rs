//! Recording mirrored releases in version control

use std::ffi::OsStr;
use std::path::PathBuf;
use std::sync::Arc;

#[cfg(test)]
use mockall::automock;
use tokio::process::Command;
use tracing::{debug, info};

use crate::mirror::error::VersionControlError;
use crate::version::types::Release;

/// Working-tree operations needed to record a release
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait VersionControl: Send + Sync {
    /// Paths among `paths` with pending working-tree changes
    async fn changed_paths(&self, paths: &[PathBuf]) -> Result<Vec<PathBuf>, VersionControlError>;

    /// Stage exactly `paths`
    async fn stage(&self, paths: &[PathBuf]) -> Result<(), VersionControlError>;

    /// Commit the staged changes
    async fn commit(&self, message: &str) -> Result<(), VersionControlError>;

    /// Create a lightweight tag at HEAD
    async fn tag(&self, name: &str) -> Result<(), VersionControlError>;
}

/// `VersionControl` backed by the system `git` binary
pub struct GitCli {
    root: PathBuf,
}

impl GitCli {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    async fn run<I, S>(&self, args: I) -> Result<String, VersionControlError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<S> = args.into_iter().collect();
        let command = std::iter::once("git".to_string())
            .chain(
                args.iter()
                    .map(|a| AsRef::<OsStr>::as_ref(a).to_string_lossy().into_owned()),
            )
            .collect::<Vec<_>>()
            .join(" ");
        debug!("Running: {}", command);

        let output = Command::new("git")
            .current_dir(&self.root)
            .args(&args)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(VersionControlError::CommandFailed { command, stderr });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Paths listed in `git status --short` output
fn parse_short_status(output: &str) -> Vec<PathBuf> {
    output
        .lines()
        .filter(|line| line.len() > 3)
        .map(|line| {
            let path = &line[3..];
            // Renames are reported as `old -> new`
            let path = path.rsplit(" -> ").next().unwrap_or(path);
            PathBuf::from(path.trim_matches('"'))
        })
        .collect()
}

#[async_trait::async_trait]
impl VersionControl for GitCli {
    async fn changed_paths(&self, paths: &[PathBuf]) -> Result<Vec<PathBuf>, VersionControlError> {
        let mut args: Vec<&OsStr> = vec!["status".as_ref(), "--short".as_ref(), "--".as_ref()];
        args.extend(paths.iter().map(|p| p.as_os_str()));
        let output = self.run(args).await?;
        Ok(parse_short_status(&output))
    }

    async fn stage(&self, paths: &[PathBuf]) -> Result<(), VersionControlError> {
        let mut args: Vec<&OsStr> = vec!["add".as_ref(), "--".as_ref()];
        args.extend(paths.iter().map(|p| p.as_os_str()));
        self.run(args).await.map(drop)
    }

    async fn commit(&self, message: &str) -> Result<(), VersionControlError> {
        self.run(["commit", "-m", message]).await.map(drop)
    }

    async fn tag(&self, name: &str) -> Result<(), VersionControlError> {
        self.run(["tag", name]).await.map(drop)
    }
}

/// Terminal outcome of recording one release
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// A commit and tag were created
    Committed,
    /// The rewrite changed nothing, so nothing was recorded
    NoChange,
}

/// Commits and tags rewritten releases
pub struct ChangeRecorder {
    vcs: Arc<dyn VersionControl>,
}

impl ChangeRecorder {
    pub fn new(vcs: Arc<dyn VersionControl>) -> Self {
        Self { vcs }
    }

    /// Fail if any of `paths` already has uncommitted changes.
    pub async fn ensure_clean(&self, paths: &[PathBuf]) -> Result<(), VersionControlError> {
        let changed = self.vcs.changed_paths(paths).await?;
        if changed.is_empty() {
            Ok(())
        } else {
            Err(VersionControlError::DirtyWorkingTree(changed))
        }
    }

    /// Commit `paths` as `Mirror: <version>` and tag `v<version>`, if they changed.
    pub async fn record(
        &self,
        release: &Release,
        paths: &[PathBuf],
    ) -> Result<RecordOutcome, VersionControlError> {
        if self.vcs.changed_paths(paths).await?.is_empty() {
            info!("No change v{}", release.version);
            return Ok(RecordOutcome::NoChange);
        }

        self.vcs.stage(paths).await?;
        self.vcs
            .commit(&format!("Mirror: {}", release.version))
            .await?;
        self.vcs.tag(&format!("v{}", release.version)).await?;
        info!("Mirrored {}", release);

        Ok(RecordOutcome::Committed)
    }
}
