//! Group Component
//!
//! Holds the runtime groups and exposes the `group.set` and `group.remove`
//! services that create, update and delete them.

use std::sync::{Arc, RwLock};

use ha_core::{is_slug, EntityId, ServiceCall};
use ha_service_registry::{ServiceDescription, ServiceError, ServiceRegistry};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, warn};

pub const DOMAIN: &str = "group";
pub const SERVICE_SET: &str = "set";
pub const SERVICE_REMOVE: &str = "remove";

/// A runtime group
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupEntry {
    pub object_id: String,
    pub name: String,
    /// Member entity ids, without duplicates
    pub entities: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Group is "on" only when all members are on
    pub all: bool,
}

impl GroupEntry {
    pub fn entity_id(&self) -> String {
        format!("{}.{}", DOMAIN, self.object_id)
    }
}

/// In-memory store of groups, in creation order
#[derive(Default)]
pub struct GroupStore {
    groups: RwLock<IndexMap<String, GroupEntry>>,
}

impl GroupStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, object_id: &str) -> Option<GroupEntry> {
        self.groups
            .read()
            .ok()
            .and_then(|groups| groups.get(object_id).cloned())
    }

    pub fn all(&self) -> Vec<GroupEntry> {
        self.groups
            .read()
            .map(|groups| groups.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.groups.read().map(|groups| groups.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply a `group.set` call, returning the resulting group
    ///
    /// Unknown groups are created (name defaults to the object_id). For
    /// existing groups only the provided fields change. `entities` replaces
    /// the member list, `add_entities` appends missing members and
    /// `remove_entities` drops members.
    pub fn apply_set(&self, call: &ServiceCall) -> Result<GroupEntry, ServiceError> {
        let object_id: String = call
            .get("object_id")
            .ok_or_else(|| ServiceError::InvalidData("object_id is required".to_string()))?;
        if !is_slug(&object_id) {
            return Err(ServiceError::InvalidData(format!(
                "invalid object_id '{}'",
                object_id
            )));
        }

        let entities = entity_ids(call, "entities")?;
        let add = entity_ids(call, "add_entities")?;
        let remove = entity_ids(call, "remove_entities")?;

        let mut groups = self
            .groups
            .write()
            .map_err(|_| ServiceError::CallFailed("group store poisoned".to_string()))?;

        let group = groups.entry(object_id.clone()).or_insert_with(|| {
            debug!("Creating group {}", object_id);
            GroupEntry {
                object_id: object_id.clone(),
                name: object_id.clone(),
                entities: Vec::new(),
                icon: None,
                all: false,
            }
        });

        if let Some(name) = call.get::<String>("name") {
            group.name = name;
        }
        if let Some(icon) = call.get::<String>("icon") {
            group.icon = Some(icon);
        }
        if let Some(all) = call.get::<bool>("all") {
            group.all = all;
        }

        if let Some(entities) = entities {
            group.entities = dedup(entities);
        }
        if let Some(add) = add {
            for entity_id in add {
                if !group.entities.contains(&entity_id) {
                    group.entities.push(entity_id);
                }
            }
        }
        if let Some(remove) = remove {
            group.entities.retain(|e| !remove.contains(e));
        }

        info!(
            "Set group {} with {} entities",
            group.entity_id(),
            group.entities.len()
        );
        Ok(group.clone())
    }

    /// Remove a group, returning it if it existed
    pub fn remove(&self, object_id: &str) -> Option<GroupEntry> {
        self.groups
            .write()
            .ok()
            .and_then(|mut groups| groups.shift_remove(object_id))
    }
}

/// Read and validate an entity id list; ids are lowercased like the YAML schema does
fn entity_ids(call: &ServiceCall, key: &str) -> Result<Option<Vec<String>>, ServiceError> {
    let Some(raw) = call.entity_list(key) else {
        return Ok(None);
    };

    raw.into_iter()
        .map(|id| {
            let id = id.to_lowercase();
            id.parse::<EntityId>()
                .map(|parsed| parsed.to_string())
                .map_err(|e| ServiceError::InvalidData(format!("{key}: '{id}': {e}")))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

fn dedup(entities: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(entities.len());
    for entity_id in entities {
        if !out.contains(&entity_id) {
            out.push(entity_id);
        }
    }
    out
}

fn set_schema() -> serde_json::Value {
    let entity_list = json!({
        "type": ["string", "array"],
        "items": {"type": "string"}
    });
    json!({
        "type": "object",
        "properties": {
            "object_id": {"type": "string", "pattern": "^[a-z0-9_]+$"},
            "name": {"type": "string"},
            "icon": {"type": "string"},
            "all": {"type": "boolean"},
            "entities": entity_list,
            "add_entities": entity_list,
            "remove_entities": entity_list
        },
        "required": ["object_id"],
        "additionalProperties": false,
        "allOf": [
            {"not": {"required": ["entities", "add_entities"]}},
            {"not": {"required": ["entities", "remove_entities"]}},
            {"not": {"required": ["add_entities", "remove_entities"]}}
        ]
    })
}

fn remove_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "object_id": {"type": "string"}
        },
        "required": ["object_id"],
        "additionalProperties": false
    })
}

/// Register the `group.set` and `group.remove` services
pub fn register_group_services(services: &ServiceRegistry, store: Arc<GroupStore>) {
    let store_clone = store.clone();
    services.register(
        ServiceDescription {
            name: Some("Set".to_string()),
            description: Some("Create or update a group".to_string()),
            schema: Some(set_schema()),
            ..ServiceDescription::new(DOMAIN, SERVICE_SET)
        },
        move |call: ServiceCall| {
            let store = store_clone.clone();
            async move {
                store.apply_set(&call)?;
                Ok(None)
            }
        },
    );

    let store_clone = store;
    services.register(
        ServiceDescription {
            name: Some("Remove".to_string()),
            description: Some("Remove a group".to_string()),
            schema: Some(remove_schema()),
            ..ServiceDescription::new(DOMAIN, SERVICE_REMOVE)
        },
        move |call: ServiceCall| {
            let store = store_clone.clone();
            async move {
                let object_id: String = call.get("object_id").unwrap_or_default();
                if store.remove(&object_id).is_none() {
                    warn!("Group {}.{} not found", DOMAIN, object_id);
                }
                Ok(None)
            }
        },
    );

    info!("Group services registered");
}
