//! Section fingerprinting for dirty tracking.
//!
//! A controller records the fingerprint of its section whenever the section is
//! known to match the device or the plan file; any later difference marks it dirty.

use serde::Serialize;
use sha2::{Digest, Sha256};

/// Hasher for computing section fingerprints.
#[derive(Debug, Default, Clone, Copy)]
pub struct SectionHasher;

impl SectionHasher {
    /// Creates a new section hasher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes the fingerprint of a serializable section.
    ///
    /// Struct fields serialize in declaration order, so equal sections always
    /// produce equal fingerprints.
    #[must_use]
    pub fn fingerprint<S: Serialize>(&self, section: &S) -> String {
        let bytes = serde_json::to_vec(section).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        hex::encode(hasher.finalize())
    }

    /// Returns a short form of a fingerprint for display.
    #[must_use]
    pub fn short(fingerprint: &str) -> &str {
        fingerprint.get(..8).unwrap_or(fingerprint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::section::{MissionItem, RouteSection};

    #[test]
    fn test_fingerprint_deterministic() {
        let hasher = SectionHasher::new();
        let route = RouteSection::default();

        assert_eq!(hasher.fingerprint(&route), hasher.fingerprint(&route.clone()));
        assert_eq!(hasher.fingerprint(&route).len(), 64);
    }

    #[test]
    fn test_fingerprint_changes_with_content() {
        let hasher = SectionHasher::new();
        let empty = RouteSection::default();
        let mut edited = empty.clone();
        edited
            .items
            .push(MissionItem::positional(16, 3, 47.39, 8.54, 50.0));

        assert_ne!(hasher.fingerprint(&empty), hasher.fingerprint(&edited));
    }

    #[test]
    fn test_short() {
        assert_eq!(SectionHasher::short("0123456789abcdef"), "01234567");
        assert_eq!(SectionHasher::short("abc"), "abc");
    }
}
