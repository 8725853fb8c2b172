//! Mirror layer: rewriting the local files and recording each release
//!
//! # Modules
//!
//! - [`rewrite`]: Ordered table of mirrored files and their rewrites
//! - [`recorder`]: Version-control trait, `git` implementation and commit/tag logic
//! - [`pipeline`]: Per-release state machine and the run loop
//! - [`error`]: Error types for version control and the run as a whole

pub mod error;
pub mod pipeline;
pub mod recorder;
pub mod rewrite;

pub use pipeline::{Mirror, ReleaseState, RunSummary};
