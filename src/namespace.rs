use std::path::Path;
use tracing::debug;

use crate::profile::LanguageProfile;
use crate::syntax;

/// `qualified_name` is `namespace` itself or lives under it on a dot boundary.
///
/// `Foo.ServicesHelper.X` is not inside `Foo.Services`.
pub fn matches(qualified_name: &str, namespace: &str) -> bool {
    if namespace.is_empty() {
        return false;
    }
    match qualified_name.strip_prefix(namespace) {
        Some("") => true,
        Some(rest) => rest.starts_with('.'),
        None => false,
    }
}

/// Namespace/package declared by a buffer.
///
/// Syntax tree first (top-level declaration nodes only); the line-pattern scan
/// covers files the grammar cannot parse or languages built without one.
pub fn detect_declaration(buffer_text: &str, file: &Path, profile: &dyn LanguageProfile) -> Option<String> {
    if let Some(name) = syntax::declaration_near(buffer_text, file, profile) {
        return Some(name);
    }
    let found = scan_declaration_lines(buffer_text, profile);
    if found.is_none() {
        debug!(file = %file.display(), language = profile.name(), "No namespace declaration found");
    }
    found
}

/// Regex fallback over the first `declaration_scan_lines()` lines.
pub fn scan_declaration_lines(buffer_text: &str, profile: &dyn LanguageProfile) -> Option<String> {
    let patterns = profile.declaration_patterns();
    if patterns.is_empty() {
        return None;
    }

    buffer_text
        .lines()
        .take(profile.declaration_scan_lines())
        .find_map(|line| {
            patterns
                .iter()
                .find_map(|re| re.captures(line))
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().to_string())
        })
}
