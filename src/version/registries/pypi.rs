//! PyPI registry client for fetching Python package releases

use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use pep508_rs::pep440_rs::{Version, VersionSpecifiers};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::{DEFAULT_INDEX_URL, DEFAULT_REQUIRES_PYTHON, PURE_BUILD_TAG};
use crate::version::error::RegistryError;
use crate::version::registry::Registry;
use crate::version::types::{Catalog, Release};

/// PyPI registry client
pub struct PypiRegistry {
    client: Client,
    base_url: String,
}

impl Default for PypiRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_INDEX_URL.to_string())
    }
}

impl PypiRegistry {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

/// PyPI JSON API response structure
#[derive(Debug, Deserialize)]
struct PypiResponse {
    releases: HashMap<String, Vec<PypiFile>>,
}

/// Metadata of one distribution file of a release
#[derive(Debug, Deserialize)]
struct PypiFile {
    #[serde(default)]
    python_version: String,
    #[serde(default)]
    requires_python: Option<String>,
}

/// Runtime range of the first pure build that declares one, or the default.
///
/// A blank or whitespace-only `requires_python` counts as undeclared.
fn requires_python(version: &str, files: &[PypiFile]) -> Result<VersionSpecifiers, RegistryError> {
    let declared = files
        .iter()
        .filter(|f| f.python_version == PURE_BUILD_TAG)
        .find_map(|f| f.requires_python.as_deref().filter(|s| !s.trim().is_empty()));

    let spec = declared.unwrap_or(DEFAULT_REQUIRES_PYTHON);
    VersionSpecifiers::from_str(spec).map_err(|e| {
        RegistryError::InvalidResponse(format!(
            "release {} has invalid requires_python '{}': {}",
            version, spec, e
        ))
    })
}

#[async_trait]
impl Registry for PypiRegistry {
    async fn fetch_releases(&self, package_name: &str) -> Result<Catalog, RegistryError> {
        let url = format!("{}/pypi/{}/json", self.base_url, package_name);
        debug!("Fetching PyPI package: {}", url);

        let response = self.client.get(&url).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(RegistryError::NotFound(package_name.to_string()));
        }

        if response.status() != reqwest::StatusCode::OK {
            return Err(RegistryError::InvalidResponse(format!(
                "PyPI API returned status {}",
                response.status()
            )));
        }

        let pypi_response: PypiResponse = response
            .json()
            .await
            .map_err(|e| RegistryError::InvalidResponse(e.to_string()))?;

        let mut releases = Vec::with_capacity(pypi_response.releases.len());
        for (raw_version, files) in &pypi_response.releases {
            let Ok(version) = Version::from_str(raw_version).inspect_err(|e| {
                warn!("Skipping unparsable version '{}': {}", raw_version, e);
            }) else {
                continue;
            };

            if version.any_prerelease() {
                debug!("Skipping pre-release {}", version);
                continue;
            }

            releases.push(Release::new(version, requires_python(raw_version, files)?));
        }

        let catalog = Catalog::from_releases(releases);
        debug!(
            "Found {} releases for package {}",
            catalog.len(),
            package_name
        );

        Ok(catalog)
    }
}
