//! Warehouse access: connection pool, catalog queries, and paged row streaming.

use deadpool_postgres::{Manager, ManagerConfig, Object, Pool, RecyclingMethod};
use rustls::ClientConfig;
use tokio::sync::mpsc;
use tokio_postgres::Config as PgConfig;
use tokio_postgres_rustls::MakeRustlsConnect;
use tracing::{debug, info, warn};

use crate::config::SourceConfig;
use crate::error::{ExportError, Result};
use crate::schema::ColumnSchema;
use crate::value::{RowPage, SqlValue};

/// Exports run sequentially; the pool only has to cover metadata lookups
/// overlapping an in-flight row stream.
const POOL_SIZE: usize = 4;

/// Options for streaming rows from a table.
#[derive(Debug, Clone)]
pub struct ReadOptions {
    /// Schema name.
    pub schema: String,
    /// Table name.
    pub table: String,
    /// Column projection; `None` selects `*`.
    pub columns: Option<Vec<String>>,
    /// Data type names, positionally aligned with the selected columns.
    pub col_types: Vec<String>,
    /// Row window offset. Only honored together with `limit`.
    pub offset: Option<i64>,
    /// Row window size. Only honored together with `offset`.
    pub limit: Option<i64>,
    /// Raw filter predicate, interpolated verbatim into the query.
    /// The caller is trusted not to smuggle SQL through it.
    pub where_clause: Option<String>,
    /// Rows per page when no explicit window is given.
    pub fetch_size: usize,
}

impl ReadOptions {
    /// The explicit fetch window, honored only when `offset` and `limit`
    /// are both present. A partial pair counts as no window and the reader
    /// pages through the whole table instead.
    pub fn explicit_window(&self) -> Option<(i64, i64)> {
        self.offset.zip(self.limit)
    }
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            schema: String::new(),
            table: String::new(),
            columns: None,
            col_types: Vec::new(),
            offset: None,
            limit: None,
            where_clause: None,
            fetch_size: 10_000,
        }
    }
}

/// Connection pool over the warehouse's PostgreSQL wire protocol.
#[derive(Clone)]
pub struct WarehousePool {
    pool: Pool,
}

impl WarehousePool {
    /// Open a pool against the warehouse and verify it with `SELECT 1`.
    ///
    /// A failed attempt surfaces immediately; there is no retry or backoff.
    pub async fn connect(config: &SourceConfig) -> Result<Self> {
        let mut pg_config = PgConfig::new();
        pg_config.host(&config.host);
        pg_config.port(config.port);
        pg_config.dbname(&config.database);
        pg_config.user(&config.user);
        pg_config.password(&config.password);

        let mgr_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };

        let pool = match config.ssl_mode.as_str() {
            "disable" => {
                warn!("Warehouse TLS is disabled. Credentials will be transmitted in plaintext.");
                let mgr = Manager::from_config(pg_config, tokio_postgres::NoTls, mgr_config);
                Pool::builder(mgr)
                    .max_size(POOL_SIZE)
                    .build()
                    .map_err(|e| ExportError::pool(e, "creating warehouse pool"))?
            }
            mode => {
                info!("ssl_mode={}: certificate verification enabled", mode);
                let tls_connector = MakeRustlsConnect::new(build_tls_config());
                let mgr = Manager::from_config(pg_config, tls_connector, mgr_config);
                Pool::builder(mgr)
                    .max_size(POOL_SIZE)
                    .build()
                    .map_err(|e| ExportError::pool(e, "creating warehouse pool"))?
            }
        };

        // Test connection
        let client = pool
            .get()
            .await
            .map_err(|e| ExportError::pool(e, "testing warehouse connection"))?;
        client.simple_query("SELECT 1").await?;

        info!(
            "Connected to warehouse: {}:{}/{}",
            config.host, config.port, config.database
        );

        Ok(Self { pool })
    }

    /// Tear the pool down. Never errors, even if connections are already dead.
    pub fn close(&self) {
        self.pool.close();
    }

    /// List the distinct table names in a schema.
    pub async fn list_tables(&self, schema: &str) -> Result<Vec<String>> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| ExportError::pool(e, "getting connection for list_tables"))?;

        let rows = client
            .query(
                "SELECT DISTINCT tablename FROM pg_table_def WHERE schemaname = $1",
                &[&schema],
            )
            .await?;

        Ok(rows.iter().map(|r| r.get::<_, String>(0)).collect())
    }

    /// Count the rows in a table, optionally under a raw filter predicate.
    pub async fn row_count(
        &self,
        schema: &str,
        table: &str,
        where_clause: Option<&str>,
    ) -> Result<i64> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| ExportError::pool(e, "getting connection for row_count"))?;

        let mut query = format!("SELECT COUNT(*) FROM {}.{}", schema, table);
        if let Some(filter) = where_clause.filter(|f| !f.is_empty()) {
            query.push_str(&format!(" WHERE {}", filter));
        }
        debug!("Row count query: {}", query);

        let row = client.query_one(&query, &[]).await?;
        Ok(row.get::<_, i64>(0))
    }

    /// Fetch the raw column schema for a table, ordered by ordinal position.
    ///
    /// Returns an empty sequence when the table does not exist; the caller
    /// turns that into a not-found failure.
    pub async fn fetch_columns(&self, schema: &str, table: &str) -> Result<Vec<ColumnSchema>> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| ExportError::pool(e, "getting connection for fetch_columns"))?;

        let query = r#"
            SELECT
                c.column_name,
                c.udt_name,
                c.data_type,
                CASE WHEN c.is_nullable = 'YES' THEN true ELSE false END,
                c.character_maximum_length::int4,
                c.numeric_precision::int4,
                c.numeric_scale::int4,
                c.ordinal_position::int4
            FROM pg_catalog.pg_statio_all_tables st
            INNER JOIN pg_catalog.pg_description pgd ON pgd.objoid = st.relid
            RIGHT OUTER JOIN information_schema.columns c
                ON pgd.objsubid = c.ordinal_position
               AND c.table_schema = st.schemaname
               AND c.table_name = st.relname
            WHERE c.table_schema = $1 AND c.table_name = $2
            ORDER BY c.ordinal_position
        "#;

        let rows = client.query(query, &[&schema, &table]).await?;

        let columns: Vec<ColumnSchema> = rows
            .iter()
            .map(|row| ColumnSchema {
                name: row.get::<_, String>(0),
                udt_name: row.get::<_, String>(1),
                data_type: row.get::<_, String>(2),
                is_nullable: row.get::<_, bool>(3),
                char_max_length: row.get::<_, Option<i32>>(4),
                numeric_precision: row.get::<_, Option<i32>>(5),
                numeric_scale: row.get::<_, Option<i32>>(6),
                ordinal_pos: row.get::<_, i32>(7),
            })
            .collect();

        debug!("Loaded {} columns for {}.{}", columns.len(), schema, table);
        Ok(columns)
    }

    /// Pool over a placeholder address. Connections are opened lazily, so
    /// tests that never touch the wire can use it.
    #[cfg(test)]
    pub(crate) fn detached() -> Self {
        let mut pg_config = PgConfig::new();
        pg_config.host("localhost");
        pg_config.dbname("test");
        pg_config.user("test");
        let mgr = Manager::from_config(
            pg_config,
            tokio_postgres::NoTls,
            ManagerConfig {
                recycling_method: RecyclingMethod::Fast,
            },
        );
        let pool = Pool::builder(mgr).max_size(1).build().unwrap();
        Self { pool }
    }

    /// Start streaming rows from a table.
    ///
    /// Returns a channel receiver that yields one [`RowPage`] per underlying
    /// fetch. With an explicit offset+limit window there is exactly one
    /// fetch; otherwise the reader task pages through the table in
    /// `fetch_size` steps until a short page. Each call opens a fresh fetch;
    /// the stream is not restartable.
    pub fn read_table(&self, opts: ReadOptions) -> mpsc::Receiver<Result<RowPage>> {
        let (tx, rx) = mpsc::channel(16);
        let pool = self.pool.clone();

        tokio::spawn(async move {
            if let Err(e) = read_table_inner(pool, opts, tx.clone()).await {
                let _ = tx.send(Err(e)).await;
            }
        });

        rx
    }
}

/// Internal paging loop feeding the row channel.
async fn read_table_inner(
    pool: Pool,
    opts: ReadOptions,
    tx: mpsc::Sender<Result<RowPage>>,
) -> Result<()> {
    let client = pool
        .get()
        .await
        .map_err(|e| ExportError::pool(e, "getting connection for read_table"))?;

    match opts.explicit_window() {
        Some((offset, limit)) => {
            let page = fetch_page(&client, &opts, offset, limit).await?;
            if !page.is_empty() {
                let _ = tx.send(Ok(page)).await;
            }
        }
        None => {
            let limit = opts.fetch_size as i64;
            let mut offset = 0i64;
            loop {
                let page = fetch_page(&client, &opts, offset, limit).await?;
                let fetched = page.len() as i64;
                if fetched == 0 {
                    break;
                }
                if tx.send(Ok(page)).await.is_err() {
                    // Consumer hung up; stop quietly.
                    return Ok(());
                }
                if fetched < limit {
                    break;
                }
                offset += limit;
            }
        }
    }

    Ok(())
}

/// Run one windowed fetch and decode it into a page.
async fn fetch_page(
    client: &Object,
    opts: &ReadOptions,
    offset: i64,
    limit: i64,
) -> Result<RowPage> {
    let query = build_data_query(opts, Some((offset, limit)));
    debug!("Data query: {}", query);

    let rows = client.query(&query, &[]).await?;

    let mut page_rows = Vec::with_capacity(rows.len());
    for row in &rows {
        let mut values = Vec::with_capacity(opts.col_types.len());
        for (idx, data_type) in opts.col_types.iter().enumerate() {
            values.push(decode_row_value(row, idx, data_type));
        }
        page_rows.push(values);
    }

    Ok(RowPage::new(page_rows))
}

/// Build the data query text for one fetch window.
pub fn build_data_query(opts: &ReadOptions, window: Option<(i64, i64)>) -> String {
    let cols = match &opts.columns {
        Some(cols) if !cols.is_empty() => cols.join(", "),
        _ => "*".to_string(),
    };

    let mut sql = format!("SELECT {} FROM {}.{}", cols, opts.schema, opts.table);

    if let Some(filter) = opts.where_clause.as_deref().filter(|f| !f.is_empty()) {
        sql.push_str(&format!(" WHERE {}", filter));
    }

    if let Some((offset, limit)) = window {
        sql.push_str(&format!(" OFFSET {} LIMIT {}", offset, limit));
    }

    sql
}

/// Decode one wire value into a [`SqlValue`] based on its column type.
fn decode_row_value(row: &tokio_postgres::Row, idx: usize, data_type: &str) -> SqlValue {
    match data_type {
        "boolean" | "bool" => row
            .try_get::<_, bool>(idx)
            .ok()
            .map(SqlValue::Bool)
            .unwrap_or(SqlValue::Null),
        "smallint" | "int2" => row
            .try_get::<_, i16>(idx)
            .ok()
            .map(SqlValue::I16)
            .unwrap_or(SqlValue::Null),
        "integer" | "int" | "int4" => row
            .try_get::<_, i32>(idx)
            .ok()
            .map(SqlValue::I32)
            .unwrap_or(SqlValue::Null),
        "bigint" | "int8" => row
            .try_get::<_, i64>(idx)
            .ok()
            .map(SqlValue::I64)
            .unwrap_or(SqlValue::Null),
        "real" | "float4" => row
            .try_get::<_, f32>(idx)
            .ok()
            .map(SqlValue::F32)
            .unwrap_or(SqlValue::Null),
        "double precision" | "float8" => row
            .try_get::<_, f64>(idx)
            .ok()
            .map(SqlValue::F64)
            .unwrap_or(SqlValue::Null),
        "numeric" | "decimal" => row
            .try_get::<_, rust_decimal::Decimal>(idx)
            .ok()
            .map(SqlValue::Decimal)
            .unwrap_or(SqlValue::Null),
        "date" => row
            .try_get::<_, chrono::NaiveDate>(idx)
            .ok()
            .map(SqlValue::Date)
            .unwrap_or(SqlValue::Null),
        "timestamp without time zone" | "timestamp" => row
            .try_get::<_, chrono::NaiveDateTime>(idx)
            .ok()
            .map(SqlValue::DateTime)
            .unwrap_or(SqlValue::Null),
        "timestamp with time zone" | "timestamptz" => row
            .try_get::<_, chrono::DateTime<chrono::FixedOffset>>(idx)
            .ok()
            .map(SqlValue::DateTimeOffset)
            .unwrap_or(SqlValue::Null),
        "uuid" => row
            .try_get::<_, uuid::Uuid>(idx)
            .ok()
            .map(SqlValue::Uuid)
            .unwrap_or(SqlValue::Null),
        "bytea" => row
            .try_get::<_, Vec<u8>>(idx)
            .ok()
            .map(SqlValue::Bytes)
            .unwrap_or(SqlValue::Null),
        _ => row
            .try_get::<_, String>(idx)
            .ok()
            .map(SqlValue::Text)
            .unwrap_or(SqlValue::Null),
    }
}

/// Build a TLS configuration with certificate verification against the
/// webpki root store.
fn build_tls_config() -> ClientConfig {
    let mut root_store = rustls::RootCertStore::empty();
    root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> ReadOptions {
        ReadOptions {
            schema: "public".to_string(),
            table: "users".to_string(),
            ..ReadOptions::default()
        }
    }

    #[test]
    fn test_query_selects_star_without_projection() {
        assert_eq!(
            build_data_query(&opts(), None),
            "SELECT * FROM public.users"
        );
    }

    #[test]
    fn test_query_with_projection_keeps_column_order() {
        let mut o = opts();
        o.columns = Some(vec!["id".to_string(), "name".to_string()]);
        assert_eq!(
            build_data_query(&o, None),
            "SELECT id, name FROM public.users"
        );
    }

    #[test]
    fn test_query_with_filter_and_window() {
        let mut o = opts();
        o.where_clause = Some("created >= '2020-01-01'".to_string());
        assert_eq!(
            build_data_query(&o, Some((0, 1))),
            "SELECT * FROM public.users WHERE created >= '2020-01-01' OFFSET 0 LIMIT 1"
        );
    }

    #[test]
    fn test_empty_filter_is_ignored() {
        let mut o = opts();
        o.where_clause = Some(String::new());
        assert_eq!(build_data_query(&o, None), "SELECT * FROM public.users");
    }

    #[test]
    fn test_partial_window_is_treated_as_absent() {
        let mut o = opts();
        o.offset = Some(0);
        assert!(o.explicit_window().is_none(), "offset alone is no window");

        let mut o = opts();
        o.limit = Some(50);
        assert!(o.explicit_window().is_none(), "limit alone is no window");

        let mut o = opts();
        o.offset = Some(10);
        o.limit = Some(5);
        assert_eq!(o.explicit_window(), Some((10, 5)));

        assert!(opts().explicit_window().is_none());
    }

    #[test]
    fn test_read_options_default() {
        let o = ReadOptions::default();
        assert_eq!(o.fetch_size, 10_000);
        assert!(o.columns.is_none());
        assert!(o.offset.is_none() && o.limit.is_none());
    }
}
