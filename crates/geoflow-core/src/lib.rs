//! GeoFlow Core - Domain models, tool catalog, and configuration
//!
//! This crate contains the domain types and port definitions shared by the
//! dataset registry, job queue, workflow and layer composition crates.

pub mod catalog;
pub mod config;
pub mod error;
pub mod models;
pub mod ports;

pub use catalog::{ExportCatalog, ToolCatalog};
pub use error::{ErrorKind, GeoflowError, Result};
