//! Metric and label name normalization.
//!
//! Normalization is deterministic: equal input under equal settings always gives equal
//! output, which is what deduplication by full name relies on.

const REPLACED: [char; 4] = ['.', '-', '#', ' '];

/// Replace `.`, `-`, `#` and spaces with `_`, then lowercase unless `case_sensitive`.
#[must_use]
pub fn normalize_name(name: &str, case_sensitive: bool) -> String {
    let replaced = name.replace(REPLACED, "_");
    if case_sensitive { replaced } else { replaced.to_lowercase() }
}

/// Namespace prefixes are always lowercased, whatever the case policy for metric names.
#[must_use]
pub fn normalize_prefix(prefix: &str) -> String {
    normalize_name(prefix, false)
}

/// Join a normalized prefix and a normalized metric name.
///
/// The separator is inserted unless the prefix is empty or already ends with it.
#[must_use]
pub fn full_name(prefix: &str, separator: &str, normalized_name: &str) -> String {
    if prefix.is_empty() || prefix.ends_with(separator) {
        format!("{prefix}{normalized_name}")
    } else {
        format!("{prefix}{separator}{normalized_name}")
    }
}
