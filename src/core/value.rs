//! A single key/value entry within a section.

use crate::core::clean_token;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static VOID_VALUE: LazyLock<ConfigValue> = LazyLock::new(ConfigValue::default);

/// One `key = value` line from a configuration file.
///
/// The value side is split on `,` and each part is trimmed, so
/// `hosts = a, b , c` holds three values. A key may appear several times in
/// a section; each occurrence becomes its own `ConfigValue`.
///
/// All typed accessors are total: an out-of-range offset or a value that
/// does not parse yields the caller's default.
///
/// # Examples
///
/// ```rust
/// use hotswap_ini::core::ConfigValue;
///
/// let value = ConfigValue::new("Ports", "8080, 8081 # fallback");
/// assert_eq!(value.name(), "ports");
/// assert_eq!(value.get_u32(1, 0), 8081);
/// assert_eq!(value.get_u32(5, 9000), 9000);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigValue {
    name: String,
    values: Vec<String>,
}

impl ConfigValue {
    /// Build a value from a raw key and the raw text right of the `=`.
    pub fn new(key: &str, raw: &str) -> Self {
        let values = strip_eol_comment(raw)
            .split(',')
            .map(|part| part.trim().to_string())
            .collect();

        Self {
            name: clean_token(key),
            values,
        }
    }

    /// The shared empty value returned by failed lookups.
    pub fn void() -> &'static ConfigValue {
        &VOID_VALUE
    }

    /// Whether this is the shared empty value.
    pub fn is_void(&self) -> bool {
        std::ptr::eq(self, Self::void())
    }

    /// Normalized key name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All scalar values in declaration order.
    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// Number of scalar values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether there are no scalar values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at `offset`, or `default` when it is missing or empty.
    pub fn get_str<'a>(&'a self, offset: usize, default: &'a str) -> &'a str {
        match self.values.get(offset) {
            Some(value) if !value.is_empty() => value.as_str(),
            _ => default,
        }
    }

    /// Value at `offset` parsed as a boolean.
    ///
    /// Accepts `1`, `t`, `T`, `TRUE`, `true`, `True` and their false
    /// counterparts.
    pub fn get_bool(&self, offset: usize, default: bool) -> bool {
        self.values
            .get(offset)
            .and_then(|value| parse_bool(value))
            .unwrap_or(default)
    }

    /// Value at `offset` parsed as an `i32`.
    pub fn get_i32(&self, offset: usize, default: i32) -> i32 {
        self.get_parsed(offset, default)
    }

    /// Value at `offset` parsed as an `i64`.
    pub fn get_i64(&self, offset: usize, default: i64) -> i64 {
        self.get_parsed(offset, default)
    }

    /// Value at `offset` parsed as a `u32`.
    pub fn get_u32(&self, offset: usize, default: u32) -> u32 {
        self.get_parsed(offset, default)
    }

    /// Value at `offset` parsed as a `u64`.
    pub fn get_u64(&self, offset: usize, default: u64) -> u64 {
        self.get_parsed(offset, default)
    }

    /// Value at `offset` parsed as an `f32`.
    pub fn get_f32(&self, offset: usize, default: f32) -> f32 {
        self.get_parsed(offset, default)
    }

    /// Value at `offset` parsed as an `f64`.
    pub fn get_f64(&self, offset: usize, default: f64) -> f64 {
        self.get_parsed(offset, default)
    }

    /// Value at `offset` parsed with [`FromStr`], falling back to `default`.
    pub fn get_parsed<T: FromStr>(&self, offset: usize, default: T) -> T {
        self.values
            .get(offset)
            .and_then(|value| value.parse().ok())
            .unwrap_or(default)
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[Key: {}", self.name)?;
        for (i, value) in self.values.iter().enumerate() {
            write!(f, " | Val({}): {}", i, value)?;
        }
        write!(f, "]")
    }
}

/// Drop everything from the first `#` on.
fn strip_eol_comment(raw: &str) -> &str {
    match raw.find('#') {
        Some(idx) => raw[..idx].trim(),
        None => raw.trim(),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}
