//! Home Assistant Registries
//!
//! This crate provides the entity registry, read from versioned JSON files
//! in the `.storage/` directory.

pub mod entity_registry;
pub mod storage;

pub use entity_registry::{DisabledBy, EntityEntry, EntityRegistry, EntityRegistryData, HiddenBy};
pub use storage::{Storable, Storage, StorageError, StorageFile, StorageResult};
