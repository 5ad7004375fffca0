//! Include-filter matching
//!
//! Checks run in a fixed order (domain, entity_id pattern, device_class) and
//! stop at the first failure.

use glob::{MatchOptions, Pattern};
use ha_registries::EntityEntry;

use super::config::IncludeFilter;

/// Shell-style matching over the whole entity id: `*` crosses `.`,
/// no special handling of leading dots, case-sensitive.
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// Check whether an entity satisfies every filter that is set
pub fn matches(entity_id: &str, entry: &EntityEntry, filters: &IncludeFilter) -> bool {
    FilterMatcher::new(filters).matches(entity_id, entry)
}

/// An [`IncludeFilter`] with its wildcard pattern compiled once
///
/// Used by the builder so a group scan compiles the pattern a single time.
pub struct FilterMatcher<'a> {
    filters: &'a IncludeFilter,
    pattern: Option<EntityPattern>,
}

enum EntityPattern {
    Glob(Pattern),
    /// Patterns the glob compiler rejects (e.g. an unclosed `[`) compare literally
    Literal(String),
}

impl<'a> FilterMatcher<'a> {
    pub fn new(filters: &'a IncludeFilter) -> Self {
        let pattern = filters.entity_id.as_deref().map(compile_pattern);
        Self { filters, pattern }
    }

    pub fn matches(&self, entity_id: &str, entry: &EntityEntry) -> bool {
        if let Some(domain) = &self.filters.domain {
            let prefix_ok = entity_id
                .strip_prefix(domain.as_str())
                .is_some_and(|rest| rest.starts_with('.'));
            if !prefix_ok {
                return false;
            }
        }

        match &self.pattern {
            Some(EntityPattern::Glob(pattern)) if !pattern.matches_with(entity_id, MATCH_OPTIONS) => {
                return false;
            }
            Some(EntityPattern::Literal(literal)) if literal != entity_id => return false,
            _ => {}
        }

        if let Some(device_class) = &self.filters.device_class {
            if entry.device_class.as_deref() != Some(device_class.as_str()) {
                return false;
            }
        }

        true
    }
}

fn compile_pattern(raw: &str) -> EntityPattern {
    match Pattern::new(&normalize_pattern(raw)) {
        Ok(pattern) => EntityPattern::Glob(pattern),
        Err(_) => EntityPattern::Literal(raw.to_string()),
    }
}

/// Rewrite a shell-style pattern into the glob crate's dialect
///
/// Runs of `*` collapse to one `*`, since the glob crate reserves `**` for
/// whole path components. A `[` with no closing `]` becomes `[[]` so it
/// matches itself while the rest of the pattern keeps its wildcards.
fn normalize_pattern(raw: &str) -> String {
    let chars: Vec<char> = raw.chars().collect();
    let mut out = String::with_capacity(raw.len());
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '*' => {
                if !out.ends_with('*') {
                    out.push('*');
                }
                i += 1;
            }
            '[' => match class_end(&chars, i) {
                Some(end) => {
                    out.extend(&chars[i..=end]);
                    i = end + 1;
                }
                None => {
                    out.push_str("[[]");
                    i += 1;
                }
            },
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    out
}

/// Index of the `]` closing the class opened at `start`
///
/// A `]` right after `[` or `[!` is part of the class.
fn class_end(chars: &[char], start: usize) -> Option<usize> {
    let mut j = start + 1;
    if chars.get(j) == Some(&'!') {
        j += 1;
    }
    if chars.get(j) == Some(&']') {
        j += 1;
    }
    chars[j.min(chars.len())..]
        .iter()
        .position(|&c| c == ']')
        .map(|offset| j + offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(entity_id: &str) -> EntityEntry {
        EntityEntry::new(entity_id, "demo", None)
    }

    fn entry_with_class(entity_id: &str, device_class: &str) -> EntityEntry {
        entry(entity_id).with_device_class(device_class)
    }

    fn check(entity: &EntityEntry, filters: &IncludeFilter) -> bool {
        matches(&entity.entity_id, entity, filters)
    }

    #[test]
    fn test_domain_filter() {
        let kitchen = entry("light.kitchen");

        assert!(check(&kitchen, &IncludeFilter::default().with_domain("light")));
        assert!(!check(&kitchen, &IncludeFilter::default().with_domain("switch")));
        // Prefix must end at the separator
        assert!(!check(&kitchen, &IncludeFilter::default().with_domain("lig")));
        assert!(!check(
            &entry("light_group.kitchen"),
            &IncludeFilter::default().with_domain("light")
        ));
    }

    #[test]
    fn test_entity_id_pattern() {
        let star = IncludeFilter::default().with_entity_id("sensor.temp_*");
        let question = IncludeFilter::default().with_entity_id("sensor.temp_?");

        assert!(check(&entry("sensor.temp_1"), &star));
        assert!(check(&entry("sensor.temp_10"), &star));
        assert!(check(&entry("sensor.temp_1"), &question));
        assert!(!check(&entry("sensor.temp_10"), &question));
        assert!(!check(&entry("sensor.humidity"), &star));
    }

    #[test]
    fn test_entity_id_pattern_edge_cases() {
        // Case-sensitive
        assert!(!check(
            &entry("sensor.temp_1"),
            &IncludeFilter::default().with_entity_id("Sensor.*")
        ));
        // Whole-string match, `*` crosses the dot
        assert!(check(
            &entry("binary_sensor.front_door"),
            &IncludeFilter::default().with_entity_id("*door")
        ));
        assert!(!check(
            &entry("binary_sensor.front_door"),
            &IncludeFilter::default().with_entity_id("front")
        ));
        // Character classes
        assert!(check(
            &entry("light.room_2"),
            &IncludeFilter::default().with_entity_id("light.room_[0-9]")
        ));
        assert!(!check(
            &entry("light.room_a"),
            &IncludeFilter::default().with_entity_id("light.room_[!a-z]")
        ));
        // Doubled stars behave like a single one
        assert!(check(
            &entry("light.kitchen"),
            &IncludeFilter::default().with_entity_id("light.**")
        ));
    }

    #[test]
    fn test_unclosed_bracket_is_literal() {
        assert!(check(
            &entry("light.[kitchen"),
            &IncludeFilter::default().with_entity_id("light.[kitchen")
        ));
        // Wildcards elsewhere in the pattern still apply
        assert!(check(
            &entry("light.[kitchen"),
            &IncludeFilter::default().with_entity_id("light.[kit*")
        ));
        assert!(check(
            &entry("sensor.a[1"),
            &IncludeFilter::default().with_entity_id("sensor.?[1")
        ));
        assert!(!check(
            &entry("sensor.a1"),
            &IncludeFilter::default().with_entity_id("sensor.?[1")
        ));
    }

    #[test]
    fn test_normalize_pattern() {
        assert_eq!(normalize_pattern("light.***"), "light.*");
        assert_eq!(normalize_pattern("a[bc]d"), "a[bc]d");
        assert_eq!(normalize_pattern("a[]]"), "a[]]");
        assert_eq!(normalize_pattern("a[!]x]"), "a[!]x]");
        assert_eq!(normalize_pattern("a[b"), "a[[]b");
        assert_eq!(normalize_pattern("a[!]"), "a[[]!]");
    }

    #[test]
    fn test_device_class_filter() {
        let door = IncludeFilter::default().with_device_class("door");

        assert!(check(&entry_with_class("sensor.door", "door"), &door));
        assert!(!check(&entry("sensor.door"), &door));
        assert!(!check(&entry_with_class("sensor.door", "window"), &door));
    }

    #[test]
    fn test_device_class_ignores_original_device_class() {
        let mut entity = entry("binary_sensor.front");
        entity.original_device_class = Some("door".to_string());

        assert!(!check(
            &entity,
            &IncludeFilter::default().with_device_class("door")
        ));
    }

    #[test]
    fn test_empty_filter_matches_all() {
        let all = IncludeFilter::default();
        assert!(check(&entry("light.kitchen"), &all));
        assert!(check(&entry_with_class("sensor.door", "door"), &all));
    }

    #[test]
    fn test_and_semantics() {
        let door = entry_with_class("binary_sensor.front_door", "door");

        // One key
        assert!(check(&door, &IncludeFilter::default().with_domain("binary_sensor")));

        // Two keys: both must hold
        let two = IncludeFilter::default()
            .with_domain("binary_sensor")
            .with_device_class("door");
        assert!(check(&door, &two));
        assert!(!check(&entry("binary_sensor.front_door"), &two));
        assert!(!check(&entry_with_class("sensor.front_door", "door"), &two));

        // Three keys
        let three = two.clone().with_entity_id("*front*");
        assert!(check(&door, &three));
        assert!(!check(
            &entry_with_class("binary_sensor.back_door", "door"),
            &three
        ));
    }

    #[test]
    fn test_matcher_reuse() {
        let filters = IncludeFilter::default().with_entity_id("light.*");
        let matcher = FilterMatcher::new(&filters);

        assert!(matcher.matches("light.a", &entry("light.a")));
        assert!(!matcher.matches("switch.a", &entry("switch.a")));
        assert!(matcher.matches("light.b", &entry("light.b")));
    }
}
