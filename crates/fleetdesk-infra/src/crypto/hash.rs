//! SHA-256 fingerprints of rate contexts.
//!
//! Implements the `ContentHasher` port from `fleetdesk-core` with the `sha2`
//! crate. The digest of `RateContext::canonical_form()` is what a priced line
//! stores as `rate_context_hash_at_pricing`.

use sha2::{Digest, Sha256};

use fleetdesk_core::hash::ContentHasher;

/// Lowercase hex SHA-256 digests.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256ContentHasher;

impl ContentHasher for Sha256ContentHasher {
    fn compute_hash(&self, content: &str) -> String {
        format!("{:x}", Sha256::digest(content.as_bytes()))
    }
}
