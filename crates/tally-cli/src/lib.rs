//! Tally CLI library.
//!
//! This crate provides the command-line UI and export views for the
//! activity timer.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands, ExportFormat};
pub use config::Config;
