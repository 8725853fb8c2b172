pub mod vcs;

pub use vcs::{RecordingVcs, write_repo};
