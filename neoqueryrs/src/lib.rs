//! Compiles Grafana-style panel targets into Machbase SQL.
//!
//! The compiler is pure: [`QueryCompiler`] turns a [`QuerySpec`] and a
//! [`models::TimeRange`] into a statement string. Running statements, caching
//! table schemas, and decoding results are layered on top through the
//! [`QueryExecutor`] trait.

pub mod column_types;
pub mod config;
pub mod dialect;
pub mod error;
pub mod executor;
pub mod expr_utils;
pub mod interval;
pub mod models;
pub mod query_builder;
pub mod runtime;
pub mod schema_cache;
pub mod sql_ast;
pub mod template;

pub use config::{init_tracing, CompilerConfig, NeoQueryConfig};
pub use dialect::{Dialect, MachbaseDialect};
pub use error::{NeoQueryError, Result};
pub use executor::{Frame, QueryExecutor, QueryResult};
pub use interval::{parse_interval_str, Interval, IntervalUnit};
pub use models::{Aggregation, CompiledQuery, FilterClause, FilterOp, QueryRequest, QuerySpec, TimeRange};
pub use query_builder::{compile_filters, QueryCompiler};
pub use runtime::{check_health, run_queries, TargetResult};
pub use schema_cache::{SchemaCache, TableSchema};
pub use template::{NoSubstitution, ScopedVars, TemplateSubstitution, VariableInterpolator};
