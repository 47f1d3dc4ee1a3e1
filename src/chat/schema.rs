use crate::chat::{ChatError, SchemaSource};
use crate::db::DuckDbConnectionManager;
use async_trait::async_trait;
use r2d2::Pool;
use std::fmt::Write;

/// One (table, column, type) triple from the store's column catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaColumn {
    pub table: String,
    pub column: String,
    pub data_type: String,
}

/// Snapshot of the catalog, ordered by table then column position. Captured
/// fresh per request and never cached.
#[derive(Debug, Clone, Default)]
pub struct SchemaDescriptor {
    pub columns: Vec<SchemaColumn>,
}

impl SchemaDescriptor {
    pub fn new(columns: Vec<SchemaColumn>) -> Self {
        Self { columns }
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Prompt-friendly rendering, one line per table:
    ///
    /// ```text
    /// Table "Invoice": "id" INTEGER, "amount" DOUBLE
    /// ```
    pub fn render(&self) -> String {
        let mut out = String::new();
        let mut current_table: Option<&str> = None;

        for col in &self.columns {
            if current_table != Some(col.table.as_str()) {
                if current_table.is_some() {
                    out.push('\n');
                }
                let _ = write!(out, "Table \"{}\":", col.table);
                current_table = Some(col.table.as_str());
            } else {
                out.push(',');
            }
            let _ = write!(out, " \"{}\" {}", col.column, col.data_type);
        }

        out
    }
}

/// Reads `information_schema.columns` for the application tables on a pooled
/// connection. Unreachable store propagates as `StoreUnavailable`; no retry.
pub struct CatalogSchemaSource {
    pool: Pool<DuckDbConnectionManager>,
}

impl CatalogSchemaSource {
    pub fn new(pool: Pool<DuckDbConnectionManager>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SchemaSource for CatalogSchemaSource {
    async fn describe(&self) -> Result<SchemaDescriptor, ChatError> {
        let pool = self.pool.clone();

        tokio::task::spawn_blocking(move || {
            let conn = pool
                .get()
                .map_err(|e| ChatError::StoreUnavailable(e.to_string()))?;

            let mut stmt = conn
                .prepare(
                    "SELECT table_name, column_name, data_type \
                     FROM information_schema.columns \
                     WHERE table_schema = 'main' \
                     ORDER BY table_name, ordinal_position",
                )
                .map_err(|e| ChatError::StoreUnavailable(e.to_string()))?;

            let columns = stmt
                .query_map([], |row| {
                    Ok(SchemaColumn {
                        table: row.get(0)?,
                        column: row.get(1)?,
                        data_type: row.get(2)?,
                    })
                })
                .map_err(|e| ChatError::StoreUnavailable(e.to_string()))?
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| ChatError::StoreUnavailable(e.to_string()))?;

            Ok(SchemaDescriptor::new(columns))
        })
        .await
        .map_err(|e| ChatError::StoreUnavailable(format!("catalog task failed: {}", e)))?
    }
}
