//! Parser layer
//! - pyproject_toml.rs: pyproject.toml reader for the mirrored pin

pub mod pyproject_toml;

pub use pyproject_toml::{Manifest, Pin};
