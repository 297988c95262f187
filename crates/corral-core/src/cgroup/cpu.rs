//! CPU controller entries.
//!
//! Manages `cpu.shares` on the v1 `cpu` hierarchy.

/// File holding the relative CPU weight.
pub const CPU_SHARES: &str = "cpu.shares";

/// Returns the limit entries for the `cpu` controller.
///
/// `cpu.shares` is only written when `shares > 0`; zero keeps the kernel
/// default weight.
#[must_use]
pub fn limit_entries(shares: u64) -> Vec<(String, String)> {
    if shares == 0 {
        return Vec::new();
    }
    tracing::debug!(shares, "CPU shares requested");
    vec![(CPU_SHARES.to_string(), shares.to_string())]
}
