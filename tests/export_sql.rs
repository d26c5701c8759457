//! End-to-end assembly tests over the SQL generation API.

use chrono::NaiveDate;
use redshift_pg_export::export::{render_ddl, DmlWriter};
use redshift_pg_export::sanitize::sanitize_ident;
use redshift_pg_export::source::build_data_query;
use redshift_pg_export::{ColumnSchema, ReadOptions, SqlValue};

fn column(name: &str, data_type: &str, pos: i32) -> ColumnSchema {
    ColumnSchema {
        name: sanitize_ident(name),
        udt_name: data_type.to_string(),
        data_type: data_type.to_string(),
        is_nullable: true,
        char_max_length: None,
        numeric_precision: None,
        numeric_scale: None,
        ordinal_pos: pos,
    }
}

/// The reference scenario: `public.users (id integer, name character
/// varying, created date)` with rows `(1,'Alice','2020-01-01')` and
/// `(2, '', NULL)`.
#[test]
fn users_table_exports_expected_sql() {
    let columns = vec![
        column("id", "integer", 1),
        column("name", "character varying", 2),
        column("created", "date", 3),
    ];

    let ddl = render_ddl("public", "users", &columns);
    assert!(ddl.starts_with("-- TABLE public.users\n"));
    assert!(ddl.contains("DROP TABLE IF EXISTS public.users;\n"));
    assert!(ddl.contains("id bigserial PRIMARY KEY,\n"));
    assert!(ddl.contains("name text,\n"));
    assert!(ddl.contains("created date\n"));

    let rows = vec![
        vec![
            SqlValue::I32(1),
            SqlValue::Text("Alice".to_string()),
            SqlValue::Date(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()),
        ],
        vec![
            SqlValue::I32(2),
            SqlValue::Text(String::new()),
            SqlValue::Null,
        ],
    ];

    let mut writer = DmlWriter::new(columns, "public.users".to_string(), false);
    let mut fragments = Vec::new();
    for (idx, row) in rows.iter().enumerate() {
        fragments.push(writer.row_fragment(row, idx, rows.len()).unwrap());
    }
    fragments.push(DmlWriter::TERMINATOR.to_string());

    let statement = fragments.join("\n");
    assert_eq!(
        statement,
        "INSERT INTO public.users (id, name, created) VALUES \n\n\
         (1,'Alice','2020-01-01'),\n\
         (2,NULL,NULL)\n\
         \n;"
    );
}

#[test]
fn project_and_window_build_the_documented_query() {
    let opts = ReadOptions {
        schema: "public".to_string(),
        table: "users".to_string(),
        columns: Some(vec!["id".to_string(), "created".to_string()]),
        where_clause: Some("created >= '2020-01-01'".to_string()),
        ..ReadOptions::default()
    };

    // offset=0, limit=1 on a 3-row table must fetch exactly that window.
    assert_eq!(
        build_data_query(&opts, Some((0, 1))),
        "SELECT id, created FROM public.users WHERE created >= '2020-01-01' OFFSET 0 LIMIT 1"
    );
}

#[test]
fn awkward_source_names_sanitize_into_valid_ddl() {
    let columns = vec![
        column("growth %", "numeric", 1),
        column("café spend", "double precision", 2),
    ];
    let columns = {
        let mut cols = columns;
        cols[0].numeric_precision = Some(10);
        cols[0].numeric_scale = Some(4);
        cols
    };

    let ddl = render_ddl("metrics", "kpi-daily", &columns);
    assert!(ddl.contains("CREATE TABLE metrics.kpi_daily ("));
    assert!(ddl.contains("growth_percent numeric(10,4),\n"));
    assert!(ddl.contains("cafe_spend double precision\n"));
}
