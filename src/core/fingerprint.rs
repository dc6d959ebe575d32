//! Content fingerprints for sections and whole configurations.
//!
//! Fingerprints are computed bottom-up once a parse has finished:
//!
//! 1. A section digests `"<key>:<value>"` for every entry, keys in sorted
//!    order and entries of a key in parse order.
//! 2. A configuration digests `"<section>:<section fingerprint>"` for every
//!    section in sorted order.
//!
//! Only normalized names and values reach the digest, so whitespace,
//! comments, blank lines, and the physical order of sections or keys do not
//! affect the result. Reordering the entries of a repeated key does.

use crate::core::section::ConfigSection;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Fingerprint of a single section.
pub fn section_fingerprint(section: &ConfigSection) -> String {
    let mut hasher = Sha256::new();
    for (key, values) in section.entries() {
        for value in values {
            hasher.update(format!("{}:{}", key, value).as_bytes());
        }
    }
    format!("{:x}", hasher.finalize())
}

/// Fingerprint of a set of sections whose own fingerprints are current.
pub fn tree_fingerprint(sections: &BTreeMap<String, ConfigSection>) -> String {
    let mut hasher = Sha256::new();
    for (name, section) in sections {
        hasher.update(format!("{}:{}", name, section.fingerprint()).as_bytes());
    }
    format!("{:x}", hasher.finalize())
}
