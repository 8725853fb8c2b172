//! Registry trait for fetching the published releases of a package

#[cfg(test)]
use mockall::automock;

use crate::version::error::RegistryError;
use crate::version::types::Catalog;

/// Trait for fetching releases from a package index
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait Registry: Send + Sync {
    /// Fetches all final releases for a package
    ///
    /// # Arguments
    /// * `package_name` - The name of the package (e.g., "zizmor")
    ///
    /// # Returns
    /// * `Ok(Catalog)` - Releases without pre-releases, ordered from oldest to newest
    /// * `Err(RegistryError)` - If the fetch fails
    async fn fetch_releases(&self, package_name: &str) -> Result<Catalog, RegistryError>;
}
