//! Version layer: what upstream has published and which releases are new
//!
//! # Modules
//!
//! - [`registry`]: Registry trait for fetching releases from a package index
//! - [`registries`]: Concrete registry implementations (PyPI)
//! - [`types`]: `Release`, `Catalog` and release selection
//! - [`error`]: Error types for registry and manifest operations

pub mod error;
pub mod registries;
pub mod registry;
pub mod types;
