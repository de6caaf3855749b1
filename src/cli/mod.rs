//! Command line interface module
//!
//! This module provides the entry point for parsing command-line arguments and running
//! the login and logout commands.

pub mod args;
pub mod config;
pub mod runner;

pub use args::{Args, Command};
pub use config::LoginConfig;
pub use runner::Runner;
