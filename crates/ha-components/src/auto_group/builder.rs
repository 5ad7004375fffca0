//! Group building
//!
//! Pure functions from (group definitions, registry snapshot) to the groups
//! that will be handed to the group service.

use std::sync::Arc;

use ha_registries::EntityEntry;
use serde::Serialize;
use serde_json::json;

use super::config::{GroupDefinition, IncludeFilter};
use super::filter::FilterMatcher;

/// A group ready to be submitted to `group.set`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuiltGroup {
    pub object_id: String,
    pub name: String,
    /// Matched entity ids, in registry order
    pub entities: Vec<String>,
}

impl BuiltGroup {
    /// Service data for a `group.set` call
    pub fn service_data(&self) -> serde_json::Value {
        json!({
            "object_id": self.object_id,
            "name": self.name,
            "entities": self.entities,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// Display name for a group: the explicit name, or the id made readable
///
/// `living_room_lights` becomes `Living Room Lights`.
pub fn resolve_name(group_id: &str, name: Option<&str>) -> String {
    match name {
        Some(name) => name.to_string(),
        None => title_case(&group_id.replace('_', " ")),
    }
}

/// Uppercase every letter that follows a non-letter, lowercase the rest
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_cased = false;

    for c in text.chars() {
        if prev_cased {
            out.extend(c.to_lowercase());
        } else {
            out.extend(c.to_uppercase());
        }
        prev_cased = c.is_lowercase() || c.is_uppercase();
    }
    out
}

/// Entity ids from `entries` that pass `filters`, in snapshot order
pub fn find_matching_entities(entries: &[Arc<EntityEntry>], filters: &IncludeFilter) -> Vec<String> {
    let matcher = FilterMatcher::new(filters);
    entries
        .iter()
        .filter(|entry| matcher.matches(&entry.entity_id, entry))
        .map(|entry| entry.entity_id.clone())
        .collect()
}

pub fn build_group(definition: &GroupDefinition, entries: &[Arc<EntityEntry>]) -> BuiltGroup {
    BuiltGroup {
        object_id: definition.id.clone(),
        name: resolve_name(&definition.id, definition.name.as_deref()),
        entities: find_matching_entities(entries, &definition.include),
    }
}

/// Build every group against the same snapshot, keeping definition order
pub fn build_groups<'a>(
    definitions: impl IntoIterator<Item = &'a GroupDefinition>,
    entries: &[Arc<EntityEntry>],
) -> Vec<BuiltGroup> {
    definitions
        .into_iter()
        .map(|definition| build_group(definition, entries))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> Vec<Arc<EntityEntry>> {
        vec![
            Arc::new(EntityEntry::new("light.living_room_ceiling", "hue", None)),
            Arc::new(EntityEntry::new("switch.coffee", "tplink", None)),
            Arc::new(
                EntityEntry::new("binary_sensor.front_door", "zha", None).with_device_class("door"),
            ),
            Arc::new(EntityEntry::new("light.kitchen", "hue", None)),
            Arc::new(EntityEntry::new("light.living_room_lamp", "hue", None)),
        ]
    }

    #[test]
    fn test_resolve_name() {
        assert_eq!(resolve_name("living_room_lights", None), "Living Room Lights");
        assert_eq!(resolve_name("doors", Some("All the doors")), "All the doors");
        assert_eq!(resolve_name("floor_2b", None), "Floor 2B");
        assert_eq!(resolve_name("x", None), "X");
    }

    #[test]
    fn test_find_matching_keeps_registry_order() {
        let entries = snapshot();
        let lights = IncludeFilter::default().with_domain("light");

        assert_eq!(
            find_matching_entities(&entries, &lights),
            vec![
                "light.living_room_ceiling",
                "light.kitchen",
                "light.living_room_lamp"
            ]
        );
    }

    #[test]
    fn test_build_group() {
        let entries = snapshot();
        let definition = GroupDefinition::new(
            "living_room_lights",
            IncludeFilter::default().with_entity_id("light.living_room_*"),
        );

        let group = build_group(&definition, &entries);

        assert_eq!(group.object_id, "living_room_lights");
        assert_eq!(group.name, "Living Room Lights");
        assert_eq!(
            group.entities,
            vec!["light.living_room_ceiling", "light.living_room_lamp"]
        );
        assert_eq!(
            group.service_data(),
            json!({
                "object_id": "living_room_lights",
                "name": "Living Room Lights",
                "entities": ["light.living_room_ceiling", "light.living_room_lamp"],
            })
        );
    }

    #[test]
    fn test_build_groups_is_independent_per_group() {
        let entries = snapshot();
        let definitions = vec![
            GroupDefinition::new("doors", IncludeFilter::default().with_device_class("door"))
                .with_name("Doors"),
            GroupDefinition::new("nothing", IncludeFilter::default().with_domain("climate")),
            GroupDefinition::new("everything", IncludeFilter::default()),
        ];

        let groups = build_groups(&definitions, &entries);

        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].entities, vec!["binary_sensor.front_door"]);
        assert!(groups[1].is_empty());
        assert_eq!(groups[2].entities.len(), entries.len());
        // Building again from the same inputs gives the same result
        assert_eq!(build_groups(&definitions, &entries), groups);
    }
}
