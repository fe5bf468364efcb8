//! Machbase dialect implementation.

use crate::sql_ast::TimeBucket;

use super::Dialect;

#[derive(Debug, Default, Clone, Copy)]
pub struct MachbaseDialect;

impl Dialect for MachbaseDialect {
    // Column names come straight from the catalog or from user-typed
    // expressions, so they are emitted untouched.
    fn quote_ident(&self, ident: &str) -> String {
        ident.to_string()
    }

    fn supports_rollup(&self) -> bool {
        true
    }

    fn render_timestamp(&self, nanos: i64) -> String {
        format!("FROM_TIMESTAMP({nanos})")
    }

    fn render_time_bucket(&self, expr: &str, bucket: &TimeBucket) -> String {
        match bucket {
            TimeBucket::Rollup(interval) => format!("{expr} ROLLUP {interval}"),
            TimeBucket::DateTrunc(interval) => format!(
                "DATE_TRUNC('{}', {expr}, {})",
                interval.unit, interval.magnitude
            ),
            // Integer arithmetic on the nanosecond value; the division truncates.
            TimeBucket::NanoDivision(nanos) => format!("{expr} / {nanos} * {nanos}"),
        }
    }
}
