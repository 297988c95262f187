//! Memory controller entries.
//!
//! Manages `memory.limit_in_bytes` on the v1 `memory` hierarchy.

/// File holding the hard memory limit.
pub const MEMORY_LIMIT: &str = "memory.limit_in_bytes";

/// Returns the limit entries for the `memory` controller.
///
/// The limit is passed through verbatim so the kernel interprets unit
/// suffixes such as `512m`.
#[must_use]
pub fn limit_entries(limit: Option<&str>) -> Vec<(String, String)> {
    match limit {
        Some(limit) if !limit.is_empty() => {
            tracing::debug!(limit, "memory limit requested");
            vec![(MEMORY_LIMIT.to_string(), limit.to_string())]
        }
        _ => Vec::new(),
    }
}
