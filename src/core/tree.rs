//! The configuration handle providing lock-free access to parsed state.

use crate::core::fingerprint;
use crate::core::{ConfigSection, clean_token};
use crate::error::Result;
use crate::sources::IniParser;
use arc_swap::ArcSwap;
use chrono::{DateTime, Local};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use std::time::SystemTime;

static VOID_STATE: LazyLock<Arc<TreeState>> = LazyLock::new(|| Arc::new(TreeState::default()));

static VOID_TREE: LazyLock<ConfigTree> = LazyLock::new(|| ConfigTree {
    name: String::new(),
    path: PathBuf::new(),
    state: ArcSwap::new(Arc::clone(&VOID_STATE)),
});

/// One immutable, fully fingerprinted parse of a configuration file.
///
/// A new `TreeState` is built for every parse and published as a whole, so
/// a reader holding one never observes a partially built structure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeState {
    modified: Option<SystemTime>,
    raw: String,
    sections: BTreeMap<String, ConfigSection>,
    fingerprint: String,
}

impl TreeState {
    /// Assemble a state from parsed sections and compute all fingerprints.
    pub(crate) fn from_parts(
        modified: Option<SystemTime>,
        raw: String,
        mut sections: BTreeMap<String, ConfigSection>,
    ) -> Self {
        for section in sections.values_mut() {
            section.compute_fingerprint();
        }
        let fingerprint = fingerprint::tree_fingerprint(&sections);

        Self {
            modified,
            raw,
            sections,
            fingerprint,
        }
    }

    /// The shared empty state. It has no sections and an empty fingerprint,
    /// unlike a tree whose file was empty or missing.
    pub fn void() -> Arc<TreeState> {
        Arc::clone(&VOID_STATE)
    }

    /// Modification time of the file this state was parsed from.
    pub fn modified(&self) -> Option<SystemTime> {
        self.modified
    }

    /// Source text as read, one trimmed line per line.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Content fingerprint over all sections.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Section by (unnormalized) name, or the void section.
    pub fn section(&self, name: &str) -> &ConfigSection {
        self.sections
            .get(&clean_token(name))
            .unwrap_or(ConfigSection::void())
    }

    /// Section names in sorted order.
    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    /// Sections in sorted name order.
    pub fn sections(&self) -> impl Iterator<Item = &ConfigSection> {
        self.sections.values()
    }

    /// Whether a section with this name exists.
    pub fn has_section(&self, name: &str) -> bool {
        self.sections.contains_key(&clean_token(name))
    }
}

/// A configuration file and its most recent successful parse.
///
/// Reads go through [`ConfigTree::get`], which returns the current
/// [`TreeState`] without locking. [`ConfigTree::reparse`] builds a complete
/// replacement state before swapping it in.
///
/// # Examples
///
/// ```rust,no_run
/// use hotswap_ini::core::ConfigTree;
///
/// let tree = ConfigTree::open("config/app.ini");
/// let state = tree.get();
/// let port = state.section("server").first_value("port").get_u32(0, 8080);
/// println!("{} ({}) port {}", tree.name(), state.fingerprint(), port);
/// ```
pub struct ConfigTree {
    name: String,
    path: PathBuf,
    state: ArcSwap<TreeState>,
}

impl ConfigTree {
    /// Open and parse the file at `path`.
    ///
    /// This never fails. If the file cannot be read the tree starts out empty
    /// and is filled in by a later [`reparse`](Self::reparse) once the file
    /// becomes readable.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();

        let tree = Self {
            name,
            path,
            state: ArcSwap::new(Arc::new(TreeState::from_parts(
                None,
                String::new(),
                BTreeMap::new(),
            ))),
        };

        if let Err(e) = tree.reparse() {
            tracing::warn!(path = %tree.path.display(), error = %e, "initial parse failed");
        }

        tree
    }

    /// The shared empty tree.
    pub fn void() -> &'static ConfigTree {
        &VOID_TREE
    }

    /// Re-read the file and publish a freshly built state.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be stat'ed or read. The previous
    /// state stays visible in that case.
    pub fn reparse(&self) -> Result<()> {
        let state = IniParser::parse_path(&self.path)?;
        tracing::debug!(
            path = %self.path.display(),
            fingerprint = %state.fingerprint(),
            sections = state.sections.len(),
            "parsed configuration"
        );
        self.state.store(Arc::new(state));
        Ok(())
    }

    /// Current state. Cheap; never blocks writers or other readers.
    pub fn get(&self) -> Arc<TreeState> {
        self.state.load_full()
    }

    /// Logical name: the file name without its extension.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Fingerprint of the current state.
    pub fn fingerprint(&self) -> String {
        self.state.load().fingerprint.clone()
    }

    /// Modification time recorded by the last successful parse.
    pub fn modified(&self) -> Option<SystemTime> {
        self.state.load().modified
    }

    /// Whether `on_disk` is strictly newer than the recorded modification
    /// time. Equal or older times are not a change.
    pub fn is_modified_since(&self, on_disk: SystemTime) -> bool {
        match self.modified() {
            Some(recorded) => on_disk > recorded,
            None => true,
        }
    }

    /// Header, then the source text exactly as read.
    pub fn raw_string(&self) -> String {
        let state = self.get();
        let mut out = self.header(&state);
        out.push_str("====================================================================\n\n");
        out.push_str(&state.raw);
        out
    }

    fn header(&self, state: &TreeState) -> String {
        let modified = state
            .modified
            .map(|time| DateTime::<Local>::from(time).to_rfc3339())
            .unwrap_or_else(|| "never".to_string());

        format!(
            "Config: {} ({})\nLastWriteTime: {}\n",
            self.name, state.fingerprint, modified
        )
    }
}

impl fmt::Display for ConfigTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.get();
        f.write_str(&self.header(&state))?;
        for section in state.sections() {
            write!(f, "{}", section)?;
        }
        Ok(())
    }
}

impl fmt::Debug for ConfigTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigTree")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("fingerprint", &self.fingerprint())
            .finish()
    }
}
