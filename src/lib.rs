//! # redshift-pg-export
//!
//! Export table definitions and row data from a Redshift warehouse as SQL
//! statements loadable into PostgreSQL.
//!
//! The crate discovers a table's column schema from the catalog, maps
//! Redshift types to PostgreSQL types, streams rows page by page without
//! buffering the full table, and assembles idempotent DDL plus streamed
//! `INSERT` text with a synthesized auto-increment primary key. Partial
//! exports are supported through row windows (offset/limit), column
//! projection, and a raw row filter.
//!
//! ## Example
//!
//! ```rust,no_run
//! use redshift_pg_export::{Config, ExportOptions, Exporter, WarehousePool};
//!
//! #[tokio::main]
//! async fn main() -> redshift_pg_export::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let pool = WarehousePool::connect(&config.source).await?;
//!     let exporter = Exporter::with_default_schema(pool, &config.source.schema);
//!     let opts = ExportOptions::from(&config.export);
//!
//!     let ddl = exporter.create_table_sql(None, "users", &opts).await?;
//!     print!("{ddl}");
//!
//!     let mut fragments = exporter.dump_table_sql(None, "users", &opts);
//!     while let Some(fragment) = fragments.recv().await {
//!         println!("{}", fragment?);
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod export;
pub mod sanitize;
pub mod schema;
pub mod source;
pub mod typemap;
pub mod value;

// Re-exports for convenient access
pub use config::{Config, ExportConfig, SourceConfig};
pub use error::{ExportError, Result};
pub use export::{DmlWriter, ExportOptions, Exporter, PkCounter};
pub use schema::ColumnSchema;
pub use source::{ReadOptions, WarehousePool};
pub use value::{RowPage, SqlValue};
