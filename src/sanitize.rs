//! Identifier sanitization for target-safe column names.

use unicode_normalization::UnicodeNormalization;

/// Normalize a raw column name into a PostgreSQL-safe identifier.
///
/// Rules, in order: internal spaces become `_`, a literal `%` becomes the
/// word `percent`, and after Unicode canonical decomposition every
/// non-ASCII character is dropped. Total and deterministic; unencodable
/// characters disappear silently.
///
/// Uniqueness is not guaranteed: two distinct source names can sanitize to
/// the same identifier, and the resulting duplicate columns make the
/// downstream DDL invalid.
pub fn sanitize_ident(raw: &str) -> String {
    raw.replace(' ', "_")
        .replace('%', "percent")
        .nfd()
        .filter(|c| c.is_ascii())
        .collect()
}
