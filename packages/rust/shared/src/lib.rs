//! Shared types, error model, and configuration for docenrich.
//!
//! This crate is the foundation depended on by all other docenrich crates.
//! It provides:
//! - [`EnrichError`] - the unified error type, including the not-found classification
//! - Domain types ([`Document`], [`Patch`], [`SiteDescriptor`], [`ScheduleEntry`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, HttpConfig, SiteEntry, config_dir, config_file_path, init_config,
    load_config, load_config_from,
};
pub use error::{EnrichError, Result};
pub use types::{Document, Patch, ScheduleEntry, SiteDescriptor, format_instant};
