//! auto_group configuration schema
//!
//! ```yaml
//! auto_group:
//!   groups:
//!     living_room_lights:
//!       name: Living Room        # optional
//!       include:                 # required
//!         domain: light
//!         entity_id: light.living_*
//!         device_class: door
//! ```
//!
//! Validation happens here, before the builder ever sees the data, so the
//! builder and matcher can treat their inputs as well formed.

use ha_config::{ConfigError, ConfigResult, Value};
use ha_core::{is_slug, slugify};
use indexmap::IndexMap;
use tracing::warn;

use super::DOMAIN;

const CONF_GROUPS: &str = "groups";
const CONF_NAME: &str = "name";
const CONF_INCLUDE: &str = "include";

const FILTER_DOMAIN: &str = "domain";
const FILTER_ENTITY_ID: &str = "entity_id";
const FILTER_DEVICE_CLASS: &str = "device_class";

/// Include filters for one group
///
/// Every field that is set must match (logical AND). An unset field imposes
/// no constraint, so the default filter matches every entity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncludeFilter {
    /// Entity domain, matched against the `<domain>.` prefix of the entity id
    pub domain: Option<String>,
    /// Shell-style wildcard pattern matched against the full entity id
    pub entity_id: Option<String>,
    /// Exact device class
    pub device_class: Option<String>,
}

impl IncludeFilter {
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_entity_id(mut self, pattern: impl Into<String>) -> Self {
        self.entity_id = Some(pattern.into());
        self
    }

    pub fn with_device_class(mut self, device_class: impl Into<String>) -> Self {
        self.device_class = Some(device_class.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.domain.is_none() && self.entity_id.is_none() && self.device_class.is_none()
    }
}

/// One configured group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupDefinition {
    /// Slug used as the group's object_id
    pub id: String,
    /// Explicit display name, if configured
    pub name: Option<String>,
    pub include: IncludeFilter,
}

impl GroupDefinition {
    pub fn new(id: impl Into<String>, include: IncludeFilter) -> Self {
        Self {
            id: id.into(),
            name: None,
            include,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Validated `auto_group` section, groups in declaration order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AutoGroupConfig {
    pub groups: IndexMap<String, GroupDefinition>,
}

impl AutoGroupConfig {
    /// Build a config from already validated definitions
    pub fn from_definitions(definitions: impl IntoIterator<Item = GroupDefinition>) -> Self {
        Self {
            groups: definitions
                .into_iter()
                .map(|def| (def.id.clone(), def))
                .collect(),
        }
    }

    /// Extract and validate the `auto_group` section of a full configuration
    ///
    /// A missing or empty section is valid and yields no groups.
    pub fn from_config(config: &Value) -> ConfigResult<Self> {
        Self::from_section(ha_config::section(config, DOMAIN))
    }

    /// Validate the value found under the `auto_group` key
    pub fn from_section(section: Option<&Value>) -> ConfigResult<Self> {
        let Some(section) = section else {
            return Ok(Self::default());
        };
        let section = expect_mapping(section, DOMAIN)?;

        for key in section.keys() {
            let key = key_string(key, DOMAIN)?;
            if key != CONF_GROUPS {
                return Err(ConfigError::invalid(
                    format!("{DOMAIN}.{key}"),
                    "extra keys not allowed",
                ));
            }
        }

        let mut groups = IndexMap::new();
        let path = format!("{DOMAIN}.{CONF_GROUPS}");
        let Some(groups_value) = section.get(CONF_GROUPS).filter(|v| !v.is_null()) else {
            return Ok(Self { groups });
        };

        for (key, value) in expect_mapping(groups_value, &path)? {
            let id = key_string(key, &path)?;
            if !is_slug(&id) {
                return Err(ConfigError::invalid(
                    &path,
                    format!("invalid slug {id} (try {})", slugify(&id)),
                ));
            }
            let definition = parse_group(&id, value, &format!("{path}.{id}"))?;
            groups.insert(id, definition);
        }

        Ok(Self { groups })
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn definitions(&self) -> impl Iterator<Item = &GroupDefinition> {
        self.groups.values()
    }
}

fn parse_group(id: &str, value: &Value, path: &str) -> ConfigResult<GroupDefinition> {
    let group = expect_mapping(value, path)?;

    let mut name = None;
    let mut include = None;

    for (key, value) in group {
        let key = key_string(key, path)?;
        match key.as_str() {
            CONF_NAME => {
                name = Some(scalar_string(value).ok_or_else(|| {
                    ConfigError::invalid(format!("{path}.{CONF_NAME}"), "expected str")
                })?);
            }
            CONF_INCLUDE => {
                include = Some(parse_include(value, &format!("{path}.{CONF_INCLUDE}"))?);
            }
            other => {
                return Err(ConfigError::invalid(
                    format!("{path}.{other}"),
                    "extra keys not allowed",
                ))
            }
        }
    }

    let include = include.ok_or_else(|| {
        ConfigError::invalid(format!("{path}.{CONF_INCLUDE}"), "required key not provided")
    })?;

    Ok(GroupDefinition {
        id: id.to_string(),
        name,
        include,
    })
}

fn parse_include(value: &Value, path: &str) -> ConfigResult<IncludeFilter> {
    let mut filter = IncludeFilter::default();

    for (key, value) in expect_mapping(value, path)? {
        let key = key_string(key, path)?;
        let slot = match key.as_str() {
            FILTER_DOMAIN => &mut filter.domain,
            FILTER_ENTITY_ID => &mut filter.entity_id,
            FILTER_DEVICE_CLASS => &mut filter.device_class,
            other => {
                warn!("Ignoring unknown include filter '{}' in {}", other, path);
                continue;
            }
        };

        // Entity attributes are strings, so other scalars could never match
        let text = match value {
            Value::Null => continue,
            Value::String(text) => text,
            _ => return Err(ConfigError::invalid(format!("{path}.{key}"), "expected str")),
        };
        // An empty filter value constrains nothing
        if !text.is_empty() {
            *slot = Some(text.clone());
        }
    }

    Ok(filter)
}

fn expect_mapping<'a>(value: &'a Value, path: &str) -> ConfigResult<&'a ha_config::Mapping> {
    value
        .as_mapping()
        .ok_or_else(|| ConfigError::invalid(path, "expected a dictionary"))
}

fn key_string(key: &Value, path: &str) -> ConfigResult<String> {
    match key {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(ConfigError::invalid(path, "keys must be strings")),
    }
}

/// Coerce a YAML scalar into a string; null and collections yield `None`
fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
