//! Common utilities for docrepo
//!
//! This crate provides the error type shared by the docrepo crates.

pub mod error;

pub use error::{RepositoryError, Result};
