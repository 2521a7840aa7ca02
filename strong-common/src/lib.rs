//! # Strong Common Library
//!
//! Shared code for the strong export converter:
//! - Error taxonomy
//! - Configuration resolution (CLI, environment, TOML, defaults)
//! - Output store schema and store opening

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
