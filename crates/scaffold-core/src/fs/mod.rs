//! Sandboxed, content-type-aware file access for tasks
//!
//! This module provides:
//! - Content types (json, yaml, text) and their codecs
//! - Path sandboxing under a root directory
//! - `Source` and `Destination` file representations with conflict/missing policies

pub mod content;
pub mod file;
pub mod sandbox;

pub use content::ContentType;
pub use file::{Conflict, Destination, Entry, Missing, Source};

/// Value key holding the generator's own directory (the source sandbox root)
pub const SRC_PATH: &str = "SrcPath";

/// Value key holding the output directory (the destination sandbox root)
pub const DST_PATH: &str = "DstPath";
