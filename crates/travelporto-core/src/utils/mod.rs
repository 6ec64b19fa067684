//! Utility functions for display formatting.

pub mod format;

pub use format::{format_eta, truncate_string};
