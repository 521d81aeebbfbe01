//! CLI subcommand implementations.

pub mod export;
pub mod records;
pub mod stats;
pub mod status;
pub mod timeline;
pub mod timer;
pub mod util;
