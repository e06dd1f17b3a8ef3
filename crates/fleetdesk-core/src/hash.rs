//! ContentHasher trait for computing structural hashes.
//!
//! Defined in fleetdesk-core so pricing can fingerprint rate contexts without
//! coupling to a specific hashing algorithm. The `Sha256ContentHasher`
//! adapter lives in fleetdesk-infra.

/// Abstraction over content hashing.
///
/// Used by the pricing engine to hash `RateContext::canonical_form()` so
/// priced lines can record which context they were priced against.
pub trait ContentHasher: Send + Sync {
    /// Compute a hex-encoded hash of the given content.
    fn compute_hash(&self, content: &str) -> String;
}
