//! Line-oriented parser for section/key/value configuration files.
//!
//! ```text
//! # comments start with '#' or ';'
//! [Server]
//! port  = 8080
//! hosts = a.example, b.example   # inline comments are dropped
//! ```

use crate::core::{ConfigSection, TreeState, clean_token};
use crate::error::Result;
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

static SECTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\[(.*)\]\s*$").expect("section pattern is valid"));

static KEYVAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(.*?)\s*=\s*(.*?)\s*$").expect("key/value pattern is valid"));

/// Parser producing a fully fingerprinted [`TreeState`].
///
/// # Examples
///
/// ```rust
/// use hotswap_ini::sources::IniParser;
///
/// let state = IniParser::parse_str("[Section_1]\nkey1 = value1, value2   # comment\n");
/// let value = state.section("section_1").first_value("key1");
/// assert_eq!(value.values(), ["value1", "value2"]);
/// ```
pub struct IniParser;

impl IniParser {
    /// Stat and read `path`, then parse its contents.
    ///
    /// The returned state carries the file's modification time.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be stat'ed or read. Malformed
    /// lines are never an error; they are skipped.
    pub fn parse_path(path: &Path) -> Result<TreeState> {
        let modified = fs::metadata(path)?.modified()?;
        let bytes = fs::read(path)?;
        let text = String::from_utf8_lossy(&bytes);

        let (raw, sections) = Self::parse_lines(&text);
        Ok(TreeState::from_parts(Some(modified), raw, sections))
    }

    /// Parse in-memory text. The resulting state has no modification time.
    pub fn parse_str(text: &str) -> TreeState {
        let (raw, sections) = Self::parse_lines(text);
        TreeState::from_parts(None, raw, sections)
    }

    fn parse_lines(text: &str) -> (String, BTreeMap<String, ConfigSection>) {
        let mut raw = String::with_capacity(text.len());
        let mut sections: BTreeMap<String, ConfigSection> = BTreeMap::new();
        let mut current: Option<String> = None;

        for line in text.lines() {
            let line = line.trim();
            raw.push_str(line);
            raw.push('\n');

            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if let Some(caps) = SECTION_RE.captures(line) {
                let name = clean_token(&caps[1]);
                sections
                    .entry(name.clone())
                    .or_insert_with(|| ConfigSection::new(&name));
                current = Some(name);
                continue;
            }

            // orphaned lines before the first header
            let Some(section) = current.as_ref().and_then(|name| sections.get_mut(name)) else {
                continue;
            };

            if let Some(caps) = KEYVAL_RE.captures(line) {
                section.add_value(&caps[1], &caps[2]);
            }
        }

        (raw, sections)
    }
}
