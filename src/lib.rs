pub mod config;
pub mod mirror;
pub mod parser;
pub mod version;
