//! Catalog introspection: the statements that list tables and columns, the
//! shapes decoded from their results, and a TTL cache for column lists.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde_json::Value;

use crate::column_types::{is_tag_table, ColumnType};
use crate::config::SchemaCacheConfig;
use crate::error::{NeoQueryError, Result};
use crate::executor::{QueryExecutor, QueryResult};
use crate::models::{Aggregation, FilterClause, QuerySpec, ValueMode};

pub const HEALTH_CHECK_SQL: &str = "SELECT count(*) FROM V$TABLES";

pub fn list_tables_sql() -> String {
    "SELECT NAME, TYPE FROM M$SYS_TABLES ORDER BY NAME".to_string()
}

pub fn list_columns_sql(table: &str) -> String {
    format!(
        "SELECT NAME, TYPE, LENGTH FROM M$SYS_COLUMNS WHERE TABLE_ID = \
         (SELECT ID FROM M$SYS_TABLES WHERE NAME = '{}') ORDER BY ID",
        table.to_ascii_uppercase().replace('\'', "''")
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableInfo {
    pub name: String,
    pub table_type: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub type_code: i32,
    pub length: i32,
}

impl ColumnInfo {
    pub fn column_type(&self) -> Option<ColumnType> {
        ColumnType::from_code(self.type_code)
    }

    pub fn is_numeric(&self) -> bool {
        self.column_type().is_some_and(|t| t.is_numeric())
    }

    fn is(&self, kind: ColumnType) -> bool {
        self.column_type() == Some(kind)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub table: TableInfo,
    pub columns: Vec<ColumnInfo>,
}

fn required_column(result: &QueryResult, name: &str) -> Result<usize> {
    result
        .column_index(name)
        .ok_or_else(|| NeoQueryError::Schema(format!("catalog result has no {name} column")))
}

fn cell_str(row: &[Value], idx: usize) -> String {
    match row.get(idx) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn cell_i32(row: &[Value], idx: usize) -> i32 {
    match row.get(idx) {
        Some(Value::Number(n)) => n.as_f64().map_or(-1, |f| f as i32),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(-1),
        _ => -1,
    }
}

/// Decode the result of [`list_tables_sql`].
pub fn tables_from_result(result: &QueryResult) -> Result<Vec<TableInfo>> {
    let name = required_column(result, "NAME")?;
    let kind = required_column(result, "TYPE")?;
    Ok(result
        .rows
        .iter()
        .map(|row| TableInfo {
            name: cell_str(row, name),
            table_type: cell_i32(row, kind),
        })
        .collect())
}

impl TableSchema {
    /// Decode the result of [`list_columns_sql`] for `table`.
    pub fn from_result(table: TableInfo, result: &QueryResult) -> Result<Self> {
        let name = required_column(result, "NAME")?;
        let kind = required_column(result, "TYPE")?;
        let length = result.column_index("LENGTH");
        let columns = result
            .rows
            .iter()
            .map(|row| ColumnInfo {
                name: cell_str(row, name),
                type_code: cell_i32(row, kind),
                length: length.map_or(0, |idx| cell_i32(row, idx)),
            })
            .collect();
        Ok(Self { table, columns })
    }

    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn first_numeric_column(&self) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.is_numeric())
    }

    pub fn first_datetime_column(&self) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.is(ColumnType::Datetime))
    }

    pub fn first_varchar_column(&self) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.is(ColumnType::Varchar))
    }

    pub fn is_tag_table(&self) -> bool {
        is_tag_table(self.table.table_type)
    }

    /// Starting target for a freshly selected table: average of the first
    /// numeric column bucketed on the first datetime column, rollups on for tag
    /// tables, and on tag tables an empty filter row keyed by the first
    /// VARCHAR column (the tag name).
    pub fn default_query_spec(&self) -> QuerySpec {
        let tag = self.is_tag_table();
        let mut filter = FilterClause::default();
        if tag {
            if let Some(name) = self.first_varchar_column() {
                filter.column_key = name.name.clone();
                filter.column_type_code = name.type_code.to_string();
            }
        }
        QuerySpec {
            table_name: self.table.name.clone(),
            table_type: self.table.table_type,
            value_field: self
                .first_numeric_column()
                .map(|c| c.name.clone())
                .unwrap_or_default(),
            value_mode: ValueMode::Aggregated,
            aggregation: Some(Aggregation::Avg),
            time_field: self
                .first_datetime_column()
                .map(|c| c.name.clone())
                .unwrap_or_default(),
            rollup_requested: tag,
            filters: vec![filter],
            ..QuerySpec::default()
        }
    }
}

/// Run the catalog queries for one table.
pub async fn fetch_schema(executor: &dyn QueryExecutor, table: TableInfo) -> Result<TableSchema> {
    let sql = list_columns_sql(&table.name);
    tracing::debug!(table = %table.name, "fetching column list");
    let result = executor.query(&sql).await?;
    TableSchema::from_result(table, &result)
}

pub async fn fetch_tables(executor: &dyn QueryExecutor) -> Result<Vec<TableInfo>> {
    let result = executor.query(&list_tables_sql()).await?;
    tables_from_result(&result)
}

/// Cache entry with timestamp for TTL tracking.
#[derive(Debug, Clone)]
struct CacheEntry {
    schema: TableSchema,
    inserted_at: Instant,
}

/// Column-list cache with TTL and size limits, keyed by upper-cased table name.
#[derive(Debug)]
pub struct SchemaCache {
    schemas: HashMap<String, CacheEntry>,
    ttl: Duration,
    max_size: usize,
}

impl Default for SchemaCache {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::with_config(&SchemaCacheConfig::default())
    }

    /// Create a schema cache with configuration.
    pub fn with_config(config: &SchemaCacheConfig) -> Self {
        Self {
            schemas: HashMap::new(),
            ttl: Duration::from_secs(config.ttl_secs),
            max_size: config.max_size,
        }
    }

    pub fn insert(&mut self, schema: TableSchema) {
        if self.max_size == 0 {
            return;
        }
        let key = schema.table.name.to_ascii_uppercase();
        if !self.schemas.contains_key(&key) && self.schemas.len() >= self.max_size {
            self.evict_oldest();
        }
        self.schemas.insert(
            key,
            CacheEntry {
                schema,
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn get(&self, table: &str) -> Option<&TableSchema> {
        self.schemas
            .get(&table.to_ascii_uppercase())
            .filter(|entry| entry.inserted_at.elapsed() < self.ttl)
            .map(|entry| &entry.schema)
    }

    pub fn invalidate(&mut self, table: &str) {
        self.schemas.remove(&table.to_ascii_uppercase());
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .schemas
            .iter()
            .min_by_key(|(_, entry)| entry.inserted_at)
            .map(|(key, _)| key.clone());
        if let Some(key) = oldest {
            tracing::debug!(table = %key, "evicting cached schema");
            self.schemas.remove(&key);
        }
    }

    /// Cached schema, or fetch and cache it.
    pub async fn get_or_fetch(
        &mut self,
        executor: &dyn QueryExecutor,
        table: TableInfo,
    ) -> Result<TableSchema> {
        if let Some(schema) = self.get(&table.name) {
            return Ok(schema.clone());
        }
        let schema = fetch_schema(executor, table).await?;
        self.insert(schema.clone());
        Ok(schema)
    }
}
