//! Per-release mirror loop
//!
//! Every selected release walks `Pending -> Rewritten -> Committed | Skipped`.
//! There is no rollback: a version-control failure after the rewrite leaves the
//! files modified on disk. The next run re-derives the current version from the
//! rewritten manifest, which is why the run refuses to start on a dirty tree
//! unless told otherwise.

use std::sync::Arc;

use pep508_rs::pep440_rs::Version;
use tracing::info;

use crate::config::MirrorConfig;
use crate::mirror::error::MirrorError;
use crate::mirror::recorder::{ChangeRecorder, GitCli, RecordOutcome, VersionControl};
use crate::mirror::rewrite::TextMirror;
use crate::parser::pyproject_toml::Manifest;
use crate::version::registries::PypiRegistry;
use crate::version::registry::Registry;
use crate::version::types::{Release, select};

/// Progress of one release through the loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseState {
    Pending,
    /// Files rewritten, not yet recorded
    Rewritten,
    Committed,
    /// Rewrite produced no change
    Skipped,
}

impl ReleaseState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ReleaseState::Committed | ReleaseState::Skipped)
    }
}

/// A selected release and where it is in the loop
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseRun {
    pub release: Release,
    pub state: ReleaseState,
}

impl ReleaseRun {
    pub fn new(release: Release) -> Self {
        Self {
            release,
            state: ReleaseState::Pending,
        }
    }

    /// Perform the next transition and return the new state.
    ///
    /// On error the state is left where it was.
    pub async fn advance(
        &mut self,
        text: &TextMirror,
        recorder: &ChangeRecorder,
    ) -> Result<ReleaseState, MirrorError> {
        self.state = match self.state {
            ReleaseState::Pending => {
                text.apply(&self.release).await?;
                ReleaseState::Rewritten
            }
            ReleaseState::Rewritten => {
                match recorder.record(&self.release, &text.paths()).await? {
                    RecordOutcome::Committed => ReleaseState::Committed,
                    RecordOutcome::NoChange => ReleaseState::Skipped,
                }
            }
            terminal => terminal,
        };
        Ok(self.state)
    }
}

/// What one run did
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Version pinned in the manifest when the run started
    pub current: Version,
    /// Selected releases in the order they were processed
    pub releases: Vec<ReleaseRun>,
}

impl RunSummary {
    pub fn committed(&self) -> impl Iterator<Item = &Release> {
        self.with_state(ReleaseState::Committed)
    }

    pub fn skipped(&self) -> impl Iterator<Item = &Release> {
        self.with_state(ReleaseState::Skipped)
    }

    fn with_state(&self, state: ReleaseState) -> impl Iterator<Item = &Release> {
        self.releases
            .iter()
            .filter(move |run| run.state == state)
            .map(|run| &run.release)
    }
}

/// Mirrors new upstream releases into the repository
pub struct Mirror {
    config: MirrorConfig,
    registry: Arc<dyn Registry>,
    text: TextMirror,
    recorder: ChangeRecorder,
}

impl Mirror {
    /// Mirror from the configured PyPI index using the system `git`.
    pub fn new(config: MirrorConfig) -> Self {
        let registry = Arc::new(PypiRegistry::new(config.index_url.clone()));
        let vcs = Arc::new(GitCli::new(config.root.clone()));
        Self::build(config, registry, vcs)
    }

    /// Build a Mirror with a custom registry and version control
    pub fn build(
        config: MirrorConfig,
        registry: Arc<dyn Registry>,
        vcs: Arc<dyn VersionControl>,
    ) -> Self {
        let text = TextMirror::new(config.root.clone(), &config.package);
        Self {
            config,
            registry,
            text,
            recorder: ChangeRecorder::new(vcs),
        }
    }

    /// Mirror every release newer than the manifest's pin, oldest first.
    ///
    /// Stops at the first error; releases before it stay committed.
    pub async fn run(&self) -> Result<RunSummary, MirrorError> {
        if !self.config.allow_dirty {
            self.recorder.ensure_clean(&self.text.paths()).await?;
        }

        let manifest = Manifest::load(&self.config.manifest_path()).await?;
        let catalog = self.registry.fetch_releases(&self.config.package).await?;
        let pin = manifest.current_pin(&self.config.package)?;
        let current = pin.version;

        // The rewrite must find the pin the version was read from
        let text = self.text.for_pin(&pin.name);
        text.ensure_pin().await?;

        let targets = select(&catalog, &current);
        info!(
            "{} is pinned to {}; {} newer release(s) of {} published",
            self.config.package,
            current,
            targets.len(),
            catalog.len()
        );

        let mut releases = Vec::with_capacity(targets.len());
        for release in targets {
            let mut run = ReleaseRun::new(release.clone());
            while !run.state.is_terminal() {
                run.advance(&text, &self.recorder).await?;
            }
            releases.push(run);
        }

        Ok(RunSummary { current, releases })
    }
}
