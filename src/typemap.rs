//! Type mapping between Redshift and PostgreSQL.

/// Map a Redshift data type to its PostgreSQL declaration.
///
/// Variable-length character types collapse to `text`; every other type
/// name passes through unchanged on the assumption that the dialects agree
/// on it. `numeric` picks up `(precision,scale)` from the source column;
/// the parameters are not validated, so an absent precision or scale
/// renders as malformed SQL text.
pub fn redshift_to_postgres(
    data_type: &str,
    precision: Option<i32>,
    scale: Option<i32>,
) -> String {
    let pg_type = match data_type {
        "character varying" | "character" => "text",
        other => other,
    };

    if pg_type == "numeric" {
        return format!(
            "numeric({},{})",
            fmt_numeric_param(precision),
            fmt_numeric_param(scale)
        );
    }

    pg_type.to_string()
}

fn fmt_numeric_param(param: Option<i32>) -> String {
    param.map(|p| p.to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_character_types_collapse_to_text() {
        assert_eq!(redshift_to_postgres("character varying", None, None), "text");
        assert_eq!(redshift_to_postgres("character", None, None), "text");
    }

    #[test]
    fn test_unmapped_types_pass_through() {
        assert_eq!(redshift_to_postgres("integer", None, None), "integer");
        assert_eq!(redshift_to_postgres("bigint", None, None), "bigint");
        assert_eq!(redshift_to_postgres("date", None, None), "date");
        assert_eq!(
            redshift_to_postgres("timestamp without time zone", None, None),
            "timestamp without time zone"
        );
        assert_eq!(
            redshift_to_postgres("double precision", None, None),
            "double precision"
        );
    }

    #[test]
    fn test_numeric_gets_precision_and_scale() {
        assert_eq!(
            redshift_to_postgres("numeric", Some(18), Some(2)),
            "numeric(18,2)"
        );
    }

    #[test]
    fn test_numeric_missing_params_render_malformed() {
        // Documented gap: the caller owns precision/scale presence.
        assert_eq!(redshift_to_postgres("numeric", None, None), "numeric(,)");
        assert_eq!(redshift_to_postgres("numeric", Some(10), None), "numeric(10,)");
    }

    #[test]
    fn test_deterministic() {
        let a = redshift_to_postgres("numeric", Some(12), Some(4));
        let b = redshift_to_postgres("numeric", Some(12), Some(4));
        assert_eq!(a, b);
    }
}
