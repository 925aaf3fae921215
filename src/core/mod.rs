//! Core domain models
//!
//! This module defines the pipeline document, navigation addresses,
//! provenance metadata and the resolution context that ties them together.

pub mod config;
pub mod context;
pub mod metadata;
pub mod path;

pub use config::*;
pub use context::*;
pub use metadata::*;
pub use path::*;
