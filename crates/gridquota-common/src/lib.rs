//! GridQuota Common - Shared types and utilities
//!
//! This crate provides the error type, configuration structures and the
//! small identifier types used by the quota tree, the document store and
//! the admin CLI.

pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use types::*;
