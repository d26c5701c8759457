//! Column schema types.

use serde::{Deserialize, Serialize};

/// Column metadata, ordered by the source's ordinal column position.
///
/// This order is authoritative for both DDL column order and DML value
/// order; every transformation (projection, serialization) must keep rows
/// positionally aligned with it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSchema {
    /// Column name (sanitized for the target before leaving the introspector).
    pub name: String,

    /// Underlying type name (e.g., "varchar", "int4").
    pub udt_name: String,

    /// Normalized data type name (e.g., "character varying", "integer").
    pub data_type: String,

    /// Whether the column allows NULL.
    pub is_nullable: bool,

    /// Maximum length for character types.
    pub char_max_length: Option<i32>,

    /// Numeric precision.
    pub numeric_precision: Option<i32>,

    /// Numeric scale.
    pub numeric_scale: Option<i32>,

    /// Ordinal position (1-based).
    pub ordinal_pos: i32,
}

/// Keep only the columns whose (sanitized) name is in `select`, preserving
/// catalog order rather than the caller-supplied order.
pub fn filter_columns(columns: Vec<ColumnSchema>, select: Option<&[String]>) -> Vec<ColumnSchema> {
    match select {
        None => columns,
        Some(names) => columns
            .into_iter()
            .filter(|c| names.iter().any(|n| n == &c.name))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(name: &str, data_type: &str, pos: i32) -> ColumnSchema {
        ColumnSchema {
            name: name.to_string(),
            udt_name: data_type.to_string(),
            data_type: data_type.to_string(),
            is_nullable: true,
            char_max_length: None,
            numeric_precision: None,
            numeric_scale: None,
            ordinal_pos: pos,
        }
    }

    #[test]
    fn test_filter_none_keeps_all() {
        let cols = vec![column("a", "integer", 1), column("b", "date", 2)];
        let filtered = filter_columns(cols, None);
        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn test_filter_preserves_catalog_order() {
        let cols = vec![
            column("a", "integer", 1),
            column("b", "date", 2),
            column("c", "text", 3),
        ];
        // Caller order is c, a; catalog order must win.
        let select = vec!["c".to_string(), "a".to_string()];
        let filtered = filter_columns(cols, Some(&select));
        let names: Vec<&str> = filtered.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["a", "c"]);
    }

    #[test]
    fn test_filter_unknown_names_drop_to_empty() {
        let cols = vec![column("a", "integer", 1)];
        let select = vec!["missing".to_string()];
        assert!(filter_columns(cols, Some(&select)).is_empty());
    }
}
