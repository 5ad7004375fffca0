//! Auto Group Component
//!
//! Creates groups at startup from include filters (domain, entity_id
//! wildcard, device_class) instead of hand-written entity lists. Each
//! configured group is matched against the entity registry once and handed to
//! the group service; nothing is re-evaluated afterwards.

mod builder;
mod config;
mod filter;

pub use builder::{build_group, build_groups, find_matching_entities, resolve_name, BuiltGroup};
pub use config::{AutoGroupConfig, GroupDefinition, IncludeFilter};
pub use filter::{matches, FilterMatcher};

use async_trait::async_trait;
use ha_core::Context;
use ha_registries::EntityRegistry;
use ha_service_registry::{ServiceError, ServiceRegistry};
use tracing::{info, warn};

use crate::group::{DOMAIN as GROUP_DOMAIN, SERVICE_SET};

/// Configuration key and integration domain
pub const DOMAIN: &str = "auto_group";

/// Where built groups are sent
///
/// The production implementation is the service registry (`group.set`);
/// tests substitute a recorder.
#[async_trait]
pub trait GroupService: Send + Sync {
    async fn set_group(&self, group: &BuiltGroup) -> Result<(), ServiceError>;
}

#[async_trait]
impl GroupService for ServiceRegistry {
    async fn set_group(&self, group: &BuiltGroup) -> Result<(), ServiceError> {
        self.call(
            GROUP_DOMAIN,
            SERVICE_SET,
            group.service_data(),
            Context::new(),
            false,
        )
        .await
        .map(|_| ())
    }
}

/// Non-fatal conditions noticed during setup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupWarning {
    /// The `auto_group` section defines no groups
    NoGroupsConfigured,
    /// The group matched no entities and was created empty
    EmptyGroup(String),
}

/// Outcome of [`async_setup`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetupReport {
    /// Groups submitted to the group service, in configuration order
    pub groups: Vec<BuiltGroup>,
    pub warnings: Vec<SetupWarning>,
}

/// Set up the auto_group component
///
/// Takes one snapshot of the registry, then builds and submits every group in
/// configuration order. Empty groups are still submitted. A failing group
/// service call aborts setup with that error.
pub async fn async_setup<S>(
    config: &AutoGroupConfig,
    registry: &EntityRegistry,
    group_service: &S,
) -> Result<SetupReport, ServiceError>
where
    S: GroupService + ?Sized,
{
    let mut report = SetupReport::default();

    if config.is_empty() {
        warn!("No groups defined in auto_group config.");
        report.warnings.push(SetupWarning::NoGroupsConfigured);
        return Ok(report);
    }

    let entries = registry.iter();

    for definition in config.definitions() {
        let group = build_group(definition, &entries);
        info!("Creating group {} with name {}", group.object_id, group.name);

        if group.is_empty() {
            warn!("No entities found matching for group: {}", group.object_id);
            report
                .warnings
                .push(SetupWarning::EmptyGroup(group.object_id.clone()));
        }

        group_service.set_group(&group).await?;

        info!(
            "Group {} created with {} entities.",
            group.object_id,
            group.entities.len()
        );
        report.groups.push(group);
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ha_registries::{EntityEntry, Storage};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct RecordingGroupService {
        calls: Mutex<Vec<BuiltGroup>>,
        fail_on: Option<String>,
    }

    #[async_trait]
    impl GroupService for RecordingGroupService {
        async fn set_group(&self, group: &BuiltGroup) -> Result<(), ServiceError> {
            if self.fail_on.as_deref() == Some(group.object_id.as_str()) {
                return Err(ServiceError::CallFailed("group service down".to_string()));
            }
            self.calls.lock().unwrap().push(group.clone());
            Ok(())
        }
    }

    fn registry() -> EntityRegistry {
        let registry = EntityRegistry::new(Arc::new(Storage::new("/nonexistent")));
        registry.insert(EntityEntry::new("light.kitchen", "hue", None));
        registry.insert(EntityEntry::new("sensor.door", "zha", None).with_device_class("door"));
        registry.insert(EntityEntry::new("light.hallway", "hue", None));
        registry
    }

    #[tokio::test]
    async fn test_no_groups_is_success_with_one_warning() {
        let service = RecordingGroupService::default();

        let report = async_setup(&AutoGroupConfig::default(), &registry(), &service)
            .await
            .unwrap();

        assert_eq!(report.warnings, vec![SetupWarning::NoGroupsConfigured]);
        assert!(report.groups.is_empty());
        assert!(service.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_group_is_created_and_later_groups_continue() {
        let config = AutoGroupConfig::from_definitions([
            GroupDefinition::new("climate", IncludeFilter::default().with_domain("climate")),
            GroupDefinition::new("all_lights", IncludeFilter::default().with_domain("light")),
        ]);
        let service = RecordingGroupService::default();

        let report = async_setup(&config, &registry(), &service).await.unwrap();

        assert_eq!(
            report.warnings,
            vec![SetupWarning::EmptyGroup("climate".to_string())]
        );

        let calls = service.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].object_id, "climate");
        assert!(calls[0].entities.is_empty());
        assert_eq!(calls[1].name, "All Lights");
        assert_eq!(calls[1].entities, vec!["light.kitchen", "light.hallway"]);
        assert_eq!(report.groups, *calls);
    }

    #[tokio::test]
    async fn test_service_failure_propagates() {
        let config = AutoGroupConfig::from_definitions([
            GroupDefinition::new("doors", IncludeFilter::default().with_device_class("door")),
            GroupDefinition::new("lights", IncludeFilter::default().with_domain("light")),
        ]);
        let service = RecordingGroupService {
            fail_on: Some("doors".to_string()),
            ..Default::default()
        };

        let result = async_setup(&config, &registry(), &service).await;

        assert!(matches!(result, Err(ServiceError::CallFailed(_))));
        assert!(service.calls.lock().unwrap().is_empty());
    }
}
