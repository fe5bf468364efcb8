//! SQL dialect abstractions.
//!
//! The query compiler builds a dialect-neutral [`SelectQuery`](crate::sql_ast::SelectQuery);
//! a dialect maps the store-specific pieces (time buckets, timestamp
//! conversion, aggregate spelling) to SQL fragments.

use crate::models::Aggregation;
use crate::sql_ast::TimeBucket;

/// Dialects render identifiers and primitive expression pieces.
/// Expression tree walking lives in the renderer; the dialect
/// only maps logical constructs to SQL fragments.
pub trait Dialect: Send + Sync {
    fn quote_ident(&self, ident: &str) -> String;
    fn quote_string(&self, value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }
    fn supports_rollup(&self) -> bool {
        false
    }
    fn render_aggregation(&self, agg: &Aggregation, args: &[String]) -> String {
        let args = args.join(", ");
        match agg {
            Aggregation::CountAll => "COUNT(*)".to_string(),
            Aggregation::Custom(name) => format!("{name}({args})"),
            other => format!("{}({args})", other.key().to_ascii_uppercase()),
        }
    }
    fn render_timestamp(&self, nanos: i64) -> String;
    fn render_time_bucket(&self, expr: &str, bucket: &TimeBucket) -> String;
}

mod machbase;
pub use machbase::MachbaseDialect;
