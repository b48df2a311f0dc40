//! vault2pass - One-way migration of a LastPass vault into a pass store
//!
//! This crate provides the core functionality for the `vault2pass` CLI tool.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface using clap
//! - [`config`] - Settings file and run configuration
//! - [`import`] - Export parsing and the import pipeline
//! - [`store`] - Password store backends (`pass`, `gopass`)
//! - [`vault`] - Vault sources (`lpass`, export files)
//! - [`backup`] - Encrypted store backups
//! - [`preflight`] - Required executable checks
//! - [`interrupt`] - Signal handling
//! - [`cleanup`] - Cleanup actions run on a forced exit
//! - [`error`] - Error types and handling

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backup;
pub mod cleanup;
pub mod cli;
pub mod config;
pub mod error;
pub mod import;
pub mod interrupt;
pub mod preflight;
pub mod store;
pub mod vault;

pub use error::{Error, Result};
