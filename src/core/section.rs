//! Named groups of values within a configuration file.

use crate::core::fingerprint;
use crate::core::clean_token;
use crate::core::value::ConfigValue;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

static VOID_SECTION: LazyLock<ConfigSection> = LazyLock::new(ConfigSection::default);

/// A `[section]` of a configuration file.
///
/// Repeated headers with the same normalized name are coalesced into one
/// section; their entries are appended in file order. Keys are kept in
/// sorted order so iteration and fingerprints are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigSection {
    name: String,
    values: BTreeMap<String, Vec<ConfigValue>>,
    fingerprint: String,
}

impl ConfigSection {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: clean_token(name),
            values: BTreeMap::new(),
            fingerprint: String::new(),
        }
    }

    /// The shared empty section returned by failed lookups.
    pub fn void() -> &'static ConfigSection {
        &VOID_SECTION
    }

    /// Whether this is the shared empty section.
    pub fn is_void(&self) -> bool {
        std::ptr::eq(self, Self::void())
    }

    /// Append a `key = raw` entry after any existing entries for the key.
    pub(crate) fn add_value(&mut self, key: &str, raw: &str) {
        let value = ConfigValue::new(key, raw);
        self.values
            .entry(value.name().to_string())
            .or_default()
            .push(value);
    }

    /// Recompute this section's fingerprint from its current entries.
    pub(crate) fn compute_fingerprint(&mut self) {
        self.fingerprint = fingerprint::section_fingerprint(self);
    }

    /// Normalized section name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Content fingerprint; empty for the void section.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Key names in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// `(key, entries)` pairs in sorted key order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &[ConfigValue])> {
        self.values
            .iter()
            .map(|(key, values)| (key.as_str(), values.as_slice()))
    }

    /// Whether any entry exists for `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(&clean_token(key))
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the section holds no keys.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// First entry for `key`, or the void value.
    pub fn first_value(&self, key: &str) -> &ConfigValue {
        self.values(key).first().unwrap_or(ConfigValue::void())
    }

    /// All entries for `key` in parse order; empty when the key is absent.
    pub fn values(&self, key: &str) -> &[ConfigValue] {
        self.values
            .get(&clean_token(key))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

impl fmt::Display for ConfigSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Section :: {} ({})", self.name, self.fingerprint)?;
        for (_, values) in self.entries() {
            for value in values {
                writeln!(f, "{}", value)?;
            }
        }
        Ok(())
    }
}
