//! GeoFlow Store - In-memory entity stores and storage adapters
//!
//! This crate provides the dataset registry, the map layer stack, and an
//! in-memory implementation of the upload storage port.

pub mod layers;
pub mod memory;
pub mod registry;

pub use layers::{LayerDefaults, LayerStack};
pub use memory::MemoryUploadStore;
pub use registry::DatasetRegistry;
