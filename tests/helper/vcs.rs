//! Version control test utilities

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use pypi_mirror::mirror::error::VersionControlError;
use pypi_mirror::mirror::recorder::VersionControl;

/// In-memory version control over a directory
///
/// A path counts as changed when its content differs from the last commit.
pub struct RecordingVcs {
    root: PathBuf,
    committed: Mutex<HashMap<PathBuf, String>>,
    staged: Mutex<Vec<PathBuf>>,
    commits: Mutex<Vec<String>>,
    tags: Mutex<Vec<String>>,
    fail_on_commit: Option<String>,
}

impl RecordingVcs {
    /// Snapshot the current content of `paths` as the initial commit
    pub fn new(root: &Path, paths: &[&str]) -> Self {
        let committed = paths
            .iter()
            .map(|p| {
                let content = std::fs::read_to_string(root.join(p)).unwrap_or_default();
                (PathBuf::from(p), content)
            })
            .collect();
        Self {
            root: root.to_path_buf(),
            committed: Mutex::new(committed),
            staged: Mutex::new(Vec::new()),
            commits: Mutex::new(Vec::new()),
            tags: Mutex::new(Vec::new()),
            fail_on_commit: None,
        }
    }

    /// Fail the commit whose message equals `message`
    pub fn failing_commit(mut self, message: &str) -> Self {
        self.fail_on_commit = Some(message.to_string());
        self
    }

    pub fn commits(&self) -> Vec<String> {
        self.commits.lock().unwrap().clone()
    }

    pub fn tags(&self) -> Vec<String> {
        self.tags.lock().unwrap().clone()
    }

    fn read(&self, path: &Path) -> String {
        std::fs::read_to_string(self.root.join(path)).unwrap_or_default()
    }
}

#[async_trait]
impl VersionControl for RecordingVcs {
    async fn changed_paths(&self, paths: &[PathBuf]) -> Result<Vec<PathBuf>, VersionControlError> {
        let committed = self.committed.lock().unwrap();
        Ok(paths
            .iter()
            .filter(|p| committed.get(*p) != Some(&self.read(p)))
            .cloned()
            .collect())
    }

    async fn stage(&self, paths: &[PathBuf]) -> Result<(), VersionControlError> {
        self.staged.lock().unwrap().extend_from_slice(paths);
        Ok(())
    }

    async fn commit(&self, message: &str) -> Result<(), VersionControlError> {
        if self.fail_on_commit.as_deref() == Some(message) {
            return Err(VersionControlError::CommandFailed {
                command: format!("git commit -m {message}"),
                stderr: "error: gpg failed to sign the data".to_string(),
            });
        }

        let staged: Vec<PathBuf> = self.staged.lock().unwrap().drain(..).collect();
        let mut committed = self.committed.lock().unwrap();
        for path in staged {
            let content = self.read(&path);
            committed.insert(path, content);
        }
        self.commits.lock().unwrap().push(message.to_string());
        Ok(())
    }

    async fn tag(&self, name: &str) -> Result<(), VersionControlError> {
        self.tags.lock().unwrap().push(name.to_string());
        Ok(())
    }
}

/// Write the mirrored files into `root`
pub fn write_repo(root: &Path, manifest: &str, readme: &str) {
    std::fs::write(root.join("pyproject.toml"), manifest).unwrap();
    std::fs::write(root.join("README.md"), readme).unwrap();
}
