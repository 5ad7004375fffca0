//! Slug helpers
//!
//! A slug is the normalized identifier form used for config keys and
//! object_ids: lowercase ASCII alphanumerics separated by single underscores.

/// Convert text into a slug
///
/// Runs of characters that are not ASCII alphanumerics collapse into a
/// single `_`, leading and trailing separators are dropped, and apostrophes
/// are removed outright. Text with nothing left becomes `"unknown"`.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_sep = false;

    for c in text.chars() {
        if c == '\'' || c == '"' {
            continue;
        }
        if c.is_ascii_alphanumeric() {
            if pending_sep && !slug.is_empty() {
                slug.push('_');
            }
            pending_sep = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_sep = true;
        }
    }

    if slug.is_empty() {
        return "unknown".to_string();
    }
    slug
}

/// Check that `value` is already in slug form
pub fn is_slug(value: &str) -> bool {
    !value.is_empty() && slugify(value) == value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Living Room Lights"), "living_room_lights");
        assert_eq!(slugify("  Kitchen -- Main "), "kitchen_main");
        assert_eq!(slugify("Bob's lamp"), "bobs_lamp");
        assert_eq!(slugify("__"), "unknown");
    }

    #[test]
    fn test_is_slug() {
        assert!(is_slug("living_room_lights"));
        assert!(is_slug("floor2"));
        assert!(!is_slug("Living_Room"));
        assert!(!is_slug("living__room"));
        assert!(!is_slug("_hidden"));
        assert!(!is_slug("with-dash"));
        assert!(!is_slug(""));
    }
}
