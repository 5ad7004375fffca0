//! Entity Registry
//!
//! Holds the registered entities loaded from `.storage/core.entity_registry`,
//! in file order. Components read it through [`EntityRegistry::iter`], which
//! hands out a snapshot so no lock is held while callers scan it.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::storage::{Storable, Storage, StorageError, StorageResult};

/// Storage key for entity registry
pub const STORAGE_KEY: &str = "core.entity_registry";
/// Current storage version
pub const STORAGE_VERSION: u32 = 1;

/// Reason an entity was disabled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisabledBy {
    ConfigEntry,
    Device,
    Hass,
    Integration,
    User,
}

/// Reason an entity was hidden
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HiddenBy {
    Integration,
    User,
}

/// A registered entity entry
///
/// Fields not modelled here are ignored when reading a storage file written
/// by Python Home Assistant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityEntry {
    /// Internal ID
    pub id: String,
    /// Full entity ID (domain.object_id)
    pub entity_id: String,
    /// Platform-specific unique identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_id: Option<String>,
    /// Component/platform that provides this entity
    pub platform: String,

    /// Parent device ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    /// Assigned area
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_id: Option<String>,

    /// User-set name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Platform default name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_name: Option<String>,

    /// User-set device class (e.g., "door", "motion")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_class: Option<String>,
    /// Platform default device class
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_device_class: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled_by: Option<DisabledBy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden_by: Option<HiddenBy>,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub modified_at: DateTime<Utc>,
}

impl EntityEntry {
    /// Create a new entity entry with minimal required fields
    pub fn new(
        entity_id: impl Into<String>,
        platform: impl Into<String>,
        unique_id: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ulid::Ulid::new().to_string().to_lowercase(),
            entity_id: entity_id.into(),
            unique_id,
            platform: platform.into(),
            device_id: None,
            area_id: None,
            name: None,
            original_name: None,
            device_class: None,
            original_device_class: None,
            disabled_by: None,
            hidden_by: None,
            created_at: now,
            modified_at: now,
        }
    }

    /// Set the user device class
    pub fn with_device_class(mut self, device_class: impl Into<String>) -> Self {
        self.device_class = Some(device_class.into());
        self
    }

    /// Get the domain from entity_id
    pub fn domain(&self) -> &str {
        ha_core::split_entity_id(&self.entity_id)
            .map(|(domain, _)| domain)
            .unwrap_or(&self.entity_id)
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled_by.is_some()
    }
}

/// Entity registry data for storage
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityRegistryData {
    pub entities: Vec<EntityEntry>,
    #[serde(default)]
    pub deleted_entities: Vec<EntityEntry>,
}

impl Storable for EntityRegistryData {
    const KEY: &'static str = STORAGE_KEY;
    const VERSION: u32 = STORAGE_VERSION;
}

/// Entity Registry
///
/// Entries are stored as `Arc<EntityEntry>` so snapshots are cheap.
/// The index is an `IndexMap` to keep registration order, which is the order
/// components see when iterating.
pub struct EntityRegistry {
    storage: Arc<Storage>,

    /// entity_id -> EntityEntry
    by_entity_id: RwLock<IndexMap<String, Arc<EntityEntry>>>,
}

impl EntityRegistry {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self {
            storage,
            by_entity_id: RwLock::new(IndexMap::new()),
        }
    }

    /// Load from storage
    ///
    /// Entries are indexed in file order. A missing storage file leaves the
    /// registry empty.
    pub async fn load(&self) -> StorageResult<()> {
        let Some(storage_file) = self.storage.load::<EntityRegistryData>().await? else {
            return Ok(());
        };

        info!(
            "Loading {} entities from storage (v{}.{})",
            storage_file.data.entities.len(),
            storage_file.version,
            storage_file.minor_version
        );

        let mut idx = self
            .by_entity_id
            .write()
            .map_err(|_| StorageError::LockPoisoned(STORAGE_KEY.to_string()))?;
        for entry in storage_file.data.entities {
            idx.insert(entry.entity_id.clone(), Arc::new(entry));
        }
        debug!("Entity registry holds {} entities", idx.len());
        Ok(())
    }

    /// Get entity by entity_id
    pub fn get(&self, entity_id: &str) -> Option<Arc<EntityEntry>> {
        self.by_entity_id
            .read()
            .ok()
            .and_then(|idx| idx.get(entity_id).cloned())
    }

    /// Insert a fully built entry, replacing any entry with the same entity_id
    ///
    /// A replaced entry keeps its position in iteration order.
    pub fn insert(&self, entry: EntityEntry) -> Arc<EntityEntry> {
        let entry = Arc::new(entry);
        match self.by_entity_id.write() {
            Ok(mut idx) => {
                idx.insert(entry.entity_id.clone(), Arc::clone(&entry));
            }
            Err(_) => warn!("Entity registry lock poisoned, dropping {}", entry.entity_id),
        }
        entry
    }

    /// Snapshot of all entries, in registration order
    pub fn iter(&self) -> Vec<Arc<EntityEntry>> {
        self.by_entity_id
            .read()
            .map(|idx| idx.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.by_entity_id.read().map(|idx| idx.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
