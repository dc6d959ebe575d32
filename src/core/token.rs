//! Name normalization for sections and keys.

/// Normalize a section or key name.
///
/// Trims enclosing whitespace, lower-cases, and converts interior spaces to
/// underscores, so `" Max Connections "` and `"max_connections"` address the
/// same entry. Applying it twice yields the same result as applying it once.
pub fn clean_token(token: &str) -> String {
    token.trim().to_lowercase().replace(' ', "_")
}
