//! Mirror E2E tests against a mock PyPI server

mod helper;

use std::sync::Arc;

use mockito::{Mock, Server, ServerGuard};
use tempfile::TempDir;

use helper::{RecordingVcs, write_repo};
use pypi_mirror::config::MirrorConfig;
use pypi_mirror::mirror::Mirror;
use pypi_mirror::mirror::error::{MirrorError, VersionControlError};
use pypi_mirror::version::error::ConfigError;
use pypi_mirror::version::registries::PypiRegistry;

const MANIFEST: &str = r#"[project]
name = "zizmor-pre-commit"
version = "0.1.0"
requires-python = ">=3.10"
dependencies = [
    "zizmor==1.0.0",
]
"#;

const README: &str = r#"# zizmor-pre-commit

[![PyPI](https://img.shields.io/pypi/v/zizmor/1.0.0.svg)](https://pypi.org/project/zizmor/)

```yaml
- repo: https://github.com/zizmorcore/zizmor-pre-commit
  rev: v1.0.0
  hooks:
    - id: zizmor
```
"#;

const RELEASES: &str = r#"{
    "info": {"version": "1.2.0"},
    "releases": {
        "1.0.0": [
            {"python_version": "source", "requires_python": ">=3.10"},
            {"python_version": "py3", "requires_python": ">=3.10"}
        ],
        "1.1.0": [
            {"python_version": "source", "requires_python": ">=3.9"},
            {"python_version": "py3", "requires_python": ">=3.11"}
        ],
        "2.0.0rc1": [
            {"python_version": "py3", "requires_python": ">=3.13"}
        ],
        "1.2.0": [
            {"python_version": "py3", "requires_python": null}
        ]
    }
}"#;

async fn pypi_server(body: &str) -> (ServerGuard, Mock) {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/pypi/zizmor/json")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body)
        .create_async()
        .await;
    (server, mock)
}

fn mirror(temp_dir: &TempDir, server: &ServerGuard, vcs: Arc<RecordingVcs>) -> Mirror {
    let config = MirrorConfig {
        root: temp_dir.path().to_path_buf(),
        index_url: server.url(),
        ..MirrorConfig::default()
    };
    let registry = Arc::new(PypiRegistry::new(server.url()));
    Mirror::build(config, registry, vcs)
}

fn read(temp_dir: &TempDir, name: &str) -> String {
    std::fs::read_to_string(temp_dir.path().join(name)).unwrap()
}

#[tokio::test]
async fn mirrors_each_new_release_as_its_own_commit() {
    let temp_dir = TempDir::new().unwrap();
    write_repo(temp_dir.path(), MANIFEST, README);
    let vcs = Arc::new(RecordingVcs::new(
        temp_dir.path(),
        &["pyproject.toml", "README.md"],
    ));
    let (server, mock) = pypi_server(RELEASES).await;

    let summary = mirror(&temp_dir, &server, vcs.clone()).run().await.unwrap();

    mock.assert_async().await;
    let committed: Vec<String> = summary
        .committed()
        .map(|r| r.version.to_string())
        .collect();
    assert_eq!(committed, vec!["1.1.0", "1.2.0"]);
    assert_eq!(vcs.commits(), vec!["Mirror: 1.1.0", "Mirror: 1.2.0"]);
    assert_eq!(vcs.tags(), vec!["v1.1.0", "v1.2.0"]);

    let manifest = read(&temp_dir, "pyproject.toml");
    assert!(manifest.contains(r#""zizmor==1.2.0""#));
    assert!(manifest.contains(r#"requires-python = ">=3.10""#));
    let readme = read(&temp_dir, "README.md");
    assert!(readme.contains("rev: v1.2.0"));
    assert!(readme.contains("/zizmor/1.2.0.svg"));
}

#[tokio::test]
async fn mirrors_version_and_requires_python_of_single_release() {
    let temp_dir = TempDir::new().unwrap();
    write_repo(temp_dir.path(), MANIFEST, README);
    let vcs = Arc::new(RecordingVcs::new(
        temp_dir.path(),
        &["pyproject.toml", "README.md"],
    ));
    let (server, _mock) = pypi_server(
        r#"{"releases": {
            "1.0.0": [],
            "1.1.0": [{"python_version": "py3", "requires_python": ">=3.11"}]
        }}"#,
    )
    .await;

    mirror(&temp_dir, &server, vcs.clone()).run().await.unwrap();

    assert_eq!(
        read(&temp_dir, "pyproject.toml"),
        MANIFEST
            .replace("zizmor==1.0.0", "zizmor==1.1.0")
            .replace(r#"requires-python = ">=3.10""#, r#"requires-python = ">=3.11""#)
    );
    assert_eq!(
        read(&temp_dir, "README.md"),
        README
            .replace("rev: v1.0.0", "rev: v1.1.0")
            .replace("/zizmor/1.0.0.svg", "/zizmor/1.1.0.svg")
    );
    assert_eq!(vcs.tags(), vec!["v1.1.0"]);
}

#[tokio::test]
async fn rewrites_pin_with_non_canonical_name_and_settles() {
    let manifest = MANIFEST.replace("zizmor==1.0.0", "Zizmor==1.0.0");
    let temp_dir = TempDir::new().unwrap();
    write_repo(temp_dir.path(), &manifest, README);
    let vcs = Arc::new(RecordingVcs::new(
        temp_dir.path(),
        &["pyproject.toml", "README.md"],
    ));
    let (server, _mock) = pypi_server(RELEASES).await;
    let mirror = mirror(&temp_dir, &server, vcs.clone());

    mirror.run().await.unwrap();

    assert!(read(&temp_dir, "pyproject.toml").contains(r#""Zizmor==1.2.0""#));
    assert_eq!(vcs.tags(), vec!["v1.1.0", "v1.2.0"]);

    let rerun = mirror.run().await.unwrap();

    assert!(rerun.releases.is_empty());
    assert_eq!(vcs.tags(), vec!["v1.1.0", "v1.2.0"]);
}

#[tokio::test]
async fn rewrites_single_quoted_pin_with_marker() {
    let manifest = "[project]\ndependencies = ['zizmor==1.0.0; python_version >= \"3.10\"']\n";
    let temp_dir = TempDir::new().unwrap();
    write_repo(temp_dir.path(), manifest, README);
    let vcs = Arc::new(RecordingVcs::new(
        temp_dir.path(),
        &["pyproject.toml", "README.md"],
    ));
    let (server, _mock) = pypi_server(RELEASES).await;

    let summary = mirror(&temp_dir, &server, vcs.clone()).run().await.unwrap();

    assert_eq!(summary.committed().count(), 2);
    assert_eq!(
        read(&temp_dir, "pyproject.toml"),
        manifest.replace("zizmor==1.0.0", "zizmor==1.2.0")
    );
}

#[tokio::test]
async fn up_to_date_manifest_makes_no_commits() {
    let temp_dir = TempDir::new().unwrap();
    write_repo(
        temp_dir.path(),
        &MANIFEST.replace("zizmor==1.0.0", "zizmor==1.2.0"),
        README,
    );
    let vcs = Arc::new(RecordingVcs::new(
        temp_dir.path(),
        &["pyproject.toml", "README.md"],
    ));
    let (server, _mock) = pypi_server(RELEASES).await;

    let summary = mirror(&temp_dir, &server, vcs.clone()).run().await.unwrap();

    assert!(summary.releases.is_empty());
    assert!(vcs.commits().is_empty());
}

#[tokio::test]
async fn commit_failure_leaves_release_rewritten_but_uncommitted() {
    let temp_dir = TempDir::new().unwrap();
    write_repo(temp_dir.path(), MANIFEST, README);
    let vcs = Arc::new(
        RecordingVcs::new(temp_dir.path(), &["pyproject.toml", "README.md"])
            .failing_commit("Mirror: 1.2.0"),
    );
    let (server, _mock) = pypi_server(RELEASES).await;

    let result = mirror(&temp_dir, &server, vcs.clone()).run().await;

    assert!(matches!(
        result,
        Err(MirrorError::VersionControl(
            VersionControlError::CommandFailed { .. }
        ))
    ));
    assert_eq!(vcs.commits(), vec!["Mirror: 1.1.0"]);
    assert_eq!(vcs.tags(), vec!["v1.1.0"]);
    assert!(read(&temp_dir, "pyproject.toml").contains(r#""zizmor==1.2.0""#));
}

#[tokio::test]
async fn rerun_after_failed_commit_refuses_dirty_tree() {
    let temp_dir = TempDir::new().unwrap();
    write_repo(temp_dir.path(), MANIFEST, README);
    let vcs = Arc::new(
        RecordingVcs::new(temp_dir.path(), &["pyproject.toml", "README.md"])
            .failing_commit("Mirror: 1.2.0"),
    );
    let (server, _mock) = pypi_server(RELEASES).await;
    let mirror = mirror(&temp_dir, &server, vcs.clone());
    assert!(mirror.run().await.is_err());

    let result = mirror.run().await;

    assert!(matches!(
        result,
        Err(MirrorError::VersionControl(
            VersionControlError::DirtyWorkingTree(paths)
        )) if paths.len() == 2
    ));
}

#[tokio::test]
async fn fails_when_manifest_lacks_requirement() {
    let temp_dir = TempDir::new().unwrap();
    write_repo(
        temp_dir.path(),
        "[project]\ndependencies = [\"requests==2.32.0\"]\n",
        README,
    );
    let vcs = Arc::new(RecordingVcs::new(
        temp_dir.path(),
        &["pyproject.toml", "README.md"],
    ));
    let (server, _mock) = pypi_server(RELEASES).await;

    let result = mirror(&temp_dir, &server, vcs.clone()).run().await;

    assert!(matches!(
        result,
        Err(MirrorError::Config(ConfigError::MissingRequirement(_)))
    ));
    assert!(vcs.commits().is_empty());
}

#[tokio::test]
async fn fails_when_index_returns_error_status() {
    let temp_dir = TempDir::new().unwrap();
    write_repo(temp_dir.path(), MANIFEST, README);
    let vcs = Arc::new(RecordingVcs::new(
        temp_dir.path(),
        &["pyproject.toml", "README.md"],
    ));
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/pypi/zizmor/json")
        .with_status(500)
        .create_async()
        .await;

    let result = mirror(&temp_dir, &server, vcs.clone()).run().await;

    assert!(matches!(result, Err(MirrorError::Fetch(_))));
    assert_eq!(read(&temp_dir, "pyproject.toml"), MANIFEST);
}
