//! Utility functions.
//!
//! - [`app_data`] - Application data directory and configuration (XDG-compliant)
//! - [`progress`] - Terminal spinner, no-op without the `progress` feature

pub mod app_data;
pub mod progress;

pub use app_data::*;
