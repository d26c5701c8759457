//! DDL and streamed DML generation.

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::config::ExportConfig;
use crate::error::{ExportError, Result};
use crate::sanitize::sanitize_ident;
use crate::schema::{filter_columns, ColumnSchema};
use crate::source::{ReadOptions, WarehousePool};
use crate::typemap::redshift_to_postgres;
use crate::value::{literal, SqlValue};

/// Options shared by DDL and DML generation.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Target schema override; defaults to the source schema.
    pub target_schema: Option<String>,
    /// Column subset, matched against sanitized names.
    pub columns: Option<Vec<String>>,
    /// Row window offset. Only honored together with `limit`.
    pub offset: Option<i64>,
    /// Row window size. Only honored together with `offset`.
    pub limit: Option<i64>,
    /// Raw filter predicate, passed through verbatim (caller-trusted).
    pub where_clause: Option<String>,
    /// Emit an explicit value for the synthesized `id` column per row.
    pub with_pk: bool,
    /// Rows per fetch page when no explicit window is given.
    pub fetch_size: usize,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            target_schema: None,
            columns: None,
            offset: None,
            limit: None,
            where_clause: None,
            with_pk: false,
            fetch_size: 10_000,
        }
    }
}

impl From<&ExportConfig> for ExportOptions {
    /// Lift the configured export behavior into per-call options. Column
    /// projection, windowing, and filtering stay per-call and start unset.
    fn from(config: &ExportConfig) -> Self {
        Self {
            target_schema: config.target_schema.clone(),
            with_pk: config.with_pk,
            fetch_size: config.fetch_size,
            ..Self::default()
        }
    }
}

/// Monotonically increasing identity values for synthesized primary keys.
///
/// Constructed fresh inside each generation call, so the sequence always
/// restarts at 1 and is never shared between exports.
#[derive(Debug)]
pub struct PkCounter(i64);

impl PkCounter {
    /// Start a new sequence at 1.
    pub fn new() -> Self {
        Self(1)
    }

    /// Take the next value.
    pub fn next(&mut self) -> i64 {
        let v = self.0;
        self.0 += 1;
        v
    }
}

impl Default for PkCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// Render the complete DDL text for a table's column schema.
///
/// Emits the comment header, an idempotent `DROP TABLE IF EXISTS`, and a
/// `CREATE TABLE` with the synthesized auto-increment primary key
/// prepended, then one declaration per column in catalog order. Hyphens in
/// the target name become underscores (illegal in unquoted identifiers).
pub fn render_ddl(target_schema: &str, table: &str, columns: &[ColumnSchema]) -> String {
    let display = format!("{}.{}", target_schema, table);
    let target = display.replace('-', "_");

    let mut sql = format!("-- TABLE {}\n", display);
    sql.push_str(&format!("DROP TABLE IF EXISTS {};\n", target));
    sql.push_str(&format!("CREATE TABLE {} (\n", target));

    // Synthesized primary key always comes first.
    sql.push_str("    id bigserial PRIMARY KEY,\n");

    for (idx, column) in columns.iter().enumerate() {
        let pg_type = redshift_to_postgres(
            &column.data_type,
            column.numeric_precision,
            column.numeric_scale,
        );
        sql.push_str("    ");
        sql.push_str(&column.name);
        sql.push(' ');
        sql.push_str(&pg_type);
        if idx + 1 < columns.len() {
            sql.push(',');
        }
        sql.push('\n');
    }

    sql.push_str(");\n\n");
    sql
}

/// Incremental assembly of one `INSERT` statement, one fragment per row.
///
/// The first fragment carries the `INSERT INTO ... VALUES` preamble; after
/// the row stream ends the caller appends [`DmlWriter::TERMINATOR`].
/// Fragments joined with `\n` form the complete statement.
#[derive(Debug)]
pub struct DmlWriter {
    columns: Vec<ColumnSchema>,
    insert_target: String,
    with_pk: bool,
    counter: PkCounter,
    first: bool,
}

impl DmlWriter {
    /// The closing fragment yielded after the last row.
    pub const TERMINATOR: &'static str = "\n;";

    /// Create a writer for one table export. The counter starts at 1.
    pub fn new(columns: Vec<ColumnSchema>, insert_target: String, with_pk: bool) -> Self {
        Self {
            columns,
            insert_target,
            with_pk,
            counter: PkCounter::new(),
            first: true,
        }
    }

    /// Assemble the fragment for one row.
    ///
    /// `row_idx` is the row's index within its page and `page_rows` the
    /// page's reported row count; the trailing comma is omitted for the
    /// last row of each page. For multi-page streams that omission can land
    /// mid-statement (see the module tests), which is preserved behavior.
    pub fn row_fragment(
        &mut self,
        row: &[SqlValue],
        row_idx: usize,
        page_rows: usize,
    ) -> Result<String> {
        let mut sql = String::new();

        if self.first {
            self.first = false;
            sql.push_str(&self.preamble());
        }

        let mut values = Vec::with_capacity(row.len() + 1);
        if self.with_pk {
            values.push(self.counter.next().to_string());
        }
        for (column, value) in self.columns.iter().zip(row) {
            values.push(literal(value, column)?);
        }

        sql.push('(');
        sql.push_str(&values.join(","));
        sql.push(')');
        if row_idx + 1 < page_rows {
            sql.push(',');
        }

        Ok(sql)
    }

    fn preamble(&self) -> String {
        let mut names: Vec<&str> = Vec::with_capacity(self.columns.len() + 1);
        if self.with_pk {
            names.push("id");
        }
        names.extend(self.columns.iter().map(|c| c.name.as_str()));
        format!(
            "INSERT INTO {} ({}) VALUES \n\n",
            self.insert_target,
            names.join(", ")
        )
    }
}

/// Reject an empty catalog result as a missing table.
fn require_columns(
    schema: &str,
    table: &str,
    columns: Vec<ColumnSchema>,
) -> Result<Vec<ColumnSchema>> {
    if columns.is_empty() {
        return Err(ExportError::not_found(schema, table));
    }
    Ok(columns)
}

/// Generates loadable SQL for warehouse tables.
///
/// Methods taking `schema: Option<&str>` fall back to the exporter's
/// default schema when passed `None`.
#[derive(Clone)]
pub struct Exporter {
    pool: WarehousePool,
    default_schema: String,
}

impl Exporter {
    /// Create an exporter over an open warehouse pool, defaulting to the
    /// `public` schema.
    pub fn new(pool: WarehousePool) -> Self {
        Self::with_default_schema(pool, "public")
    }

    /// Create an exporter that defaults to the given schema, typically the
    /// configured source schema.
    pub fn with_default_schema(pool: WarehousePool, schema: impl Into<String>) -> Self {
        Self {
            pool,
            default_schema: schema.into(),
        }
    }

    fn schema_or_default<'a>(&'a self, schema: Option<&'a str>) -> &'a str {
        schema.unwrap_or(&self.default_schema)
    }

    /// Tear down the underlying pool. Never errors.
    pub fn close(&self) {
        self.pool.close();
    }

    /// List the distinct table names in a schema.
    pub async fn list_tables(&self, schema: Option<&str>) -> Result<Vec<String>> {
        self.pool.list_tables(self.schema_or_default(schema)).await
    }

    /// Count the rows in a table, optionally under a raw filter predicate.
    pub async fn row_count(
        &self,
        schema: Option<&str>,
        table: &str,
        where_clause: Option<&str>,
    ) -> Result<i64> {
        self.pool
            .row_count(self.schema_or_default(schema), table, where_clause)
            .await
    }

    /// Fetch the table's column schema with sanitized names, optionally
    /// filtered to a column subset (matched on sanitized names, catalog
    /// order preserved). Fetched fresh on every call, never cached.
    pub async fn table_schema(
        &self,
        schema: Option<&str>,
        table: &str,
        select_columns: Option<&[String]>,
    ) -> Result<Vec<ColumnSchema>> {
        let schema = self.schema_or_default(schema);
        let mut columns = self.pool.fetch_columns(schema, table).await?;
        for column in &mut columns {
            column.name = sanitize_ident(&column.name);
        }
        Ok(filter_columns(columns, select_columns))
    }

    /// Generate the complete DDL text for a table.
    ///
    /// Fails with a not-found error when the catalog has no columns for the
    /// table.
    pub async fn create_table_sql(
        &self,
        schema: Option<&str>,
        table: &str,
        opts: &ExportOptions,
    ) -> Result<String> {
        let schema = self.schema_or_default(schema);
        let columns = self
            .table_schema(Some(schema), table, opts.columns.as_deref())
            .await?;
        let columns = require_columns(schema, table, columns)?;

        let target_schema = opts.target_schema.as_deref().unwrap_or(schema);
        info!("Generating DDL for {}.{}", target_schema, table);
        Ok(render_ddl(target_schema, table, &columns))
    }

    /// Stream the DML text for a table, one fragment per row plus the
    /// terminator, without materializing the full statement.
    ///
    /// The receiver yields `Err` and then closes if introspection fails,
    /// a fetch fails, or a value has no serialization rule.
    pub fn dump_table_sql(
        &self,
        schema: Option<&str>,
        table: &str,
        opts: &ExportOptions,
    ) -> mpsc::Receiver<Result<String>> {
        let (tx, rx) = mpsc::channel(16);
        let this = self.clone();
        let schema = self.schema_or_default(schema).to_string();
        let table = table.to_string();
        let opts = opts.clone();

        tokio::spawn(async move {
            if let Err(e) = this.dump_table_inner(&schema, &table, &opts, tx.clone()).await {
                let _ = tx.send(Err(e)).await;
            }
        });

        rx
    }

    async fn dump_table_inner(
        &self,
        schema: &str,
        table: &str,
        opts: &ExportOptions,
        tx: mpsc::Sender<Result<String>>,
    ) -> Result<()> {
        let columns = self
            .table_schema(Some(schema), table, opts.columns.as_deref())
            .await?;
        let columns = require_columns(schema, table, columns)?;

        let target_schema = opts.target_schema.as_deref().unwrap_or(schema);
        let insert_target = format!("{}.{}", target_schema, table);

        let read_opts = ReadOptions {
            schema: schema.to_string(),
            table: table.to_string(),
            columns: opts
                .columns
                .is_some()
                .then(|| columns.iter().map(|c| c.name.clone()).collect()),
            col_types: columns.iter().map(|c| c.data_type.clone()).collect(),
            offset: opts.offset,
            limit: opts.limit,
            where_clause: opts.where_clause.clone(),
            fetch_size: opts.fetch_size,
        };

        let mut writer = DmlWriter::new(columns, insert_target, opts.with_pk);
        let mut pages = self.pool.read_table(read_opts);
        let mut total_rows = 0u64;

        while let Some(page) = pages.recv().await {
            let page = page?;
            for (row_idx, row) in page.rows.iter().enumerate() {
                let fragment = writer.row_fragment(row, row_idx, page.row_count)?;
                total_rows += 1;
                if tx.send(Ok(fragment)).await.is_err() {
                    // Consumer hung up; stop quietly.
                    return Ok(());
                }
            }
        }

        debug!("Streamed {} rows for {}.{}", total_rows, schema, table);
        let _ = tx.send(Ok(DmlWriter::TERMINATOR.to_string())).await;
        Ok(())
    }
}
