/// Returns true when `name` matches the glob `pattern` (`*` and `?` wildcards).
///
/// # Examples
///
/// ```
/// use monwatch_common::pattern::series_matches;
///
/// assert!(series_matches("*", "cpu"));
/// assert!(series_matches("jvm.heap.*", "jvm.heap.used"));
/// assert!(!series_matches("jvm.heap.*", "cpu"));
/// ```
pub fn series_matches(pattern: &str, name: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    glob_match::glob_match(pattern, name)
}

/// True when the pattern names exactly one series.
pub fn is_literal(pattern: &str) -> bool {
    !pattern.contains(['*', '?', '[', '{'])
}
