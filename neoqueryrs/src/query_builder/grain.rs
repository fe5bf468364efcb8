//! Time-bucket selection.
//!
//! Decides whether a target buckets through a server-side rollup, a date
//! truncation, or integer division on raw nanoseconds, and builds the matching
//! `TIME` expression.

use crate::config::CompilerConfig;
use crate::interval::{Interval, IntervalUnit};
use crate::models::{TimeRange, NANOS_PER_MILLI};
use crate::sql_ast::{SqlExpr, TimeBucket};

/// Bucketing decisions for one target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Grain {
    pub interval: Interval,
    pub sub_query: bool,
    pub rollup: bool,
    pub grouped: bool,
}

impl Grain {
    pub fn resolve(
        range: &TimeRange,
        config: &CompilerConfig,
        rollup_requested: bool,
        grouped: bool,
    ) -> Self {
        let interval = Interval::from_millis(range.resolution_ms);
        let sub_query = range.resolution_ms >= config.sub_query_threshold_ms;
        // Rollups only exist for bucketed aggregates at one-second granularity or coarser.
        let rollup = rollup_requested && grouped && interval.unit != IntervalUnit::Msec;
        Self {
            interval,
            sub_query,
            rollup,
            grouped,
        }
    }

    /// Width of the nanosecond buckets used by sub-queries.
    pub fn nano_bucket(range: &TimeRange) -> u64 {
        range.resolution_ms.saturating_mul(NANOS_PER_MILLI as u64)
    }

    /// Expression selected as `TIME` by the innermost query.
    pub fn time_expr(&self, time_field: &str, range: &TimeRange, config: &CompilerConfig) -> SqlExpr {
        let column = Box::new(SqlExpr::column(time_field.to_string()));
        if !self.grouped {
            return *column;
        }
        let bucket = match (self.rollup, self.sub_query) {
            (true, true) => TimeBucket::Rollup(config.sub_query_rollup_interval.clone()),
            (true, false) => TimeBucket::Rollup(self.interval.to_string()),
            (false, true) => TimeBucket::NanoDivision(Self::nano_bucket(range)),
            (false, false) => TimeBucket::DateTrunc(self.interval),
        };
        SqlExpr::TimeBucket {
            expr: column,
            bucket,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY_MS: u64 = 86_400_000;

    fn range(resolution_ms: u64) -> TimeRange {
        TimeRange {
            from_nanos: 0,
            to_nanos: 1,
            resolution_ms,
            max_data_points: 100,
        }
    }

    #[test]
    fn sub_query_starts_at_one_day() {
        let cfg = CompilerConfig::default();
        assert!(!Grain::resolve(&range(DAY_MS - 1), &cfg, false, true).sub_query);
        assert!(Grain::resolve(&range(DAY_MS), &cfg, false, true).sub_query);
    }

    #[test]
    fn rollup_is_suppressed_below_one_second() {
        let cfg = CompilerConfig::default();
        assert!(!Grain::resolve(&range(500), &cfg, true, true).rollup);
        assert!(Grain::resolve(&range(1_000), &cfg, true, true).rollup);
    }

    #[test]
    fn rollup_requires_grouping() {
        let cfg = CompilerConfig::default();
        assert!(!Grain::resolve(&range(10_000), &cfg, true, false).rollup);
    }

    #[test]
    fn picks_bucket_per_mode() {
        let cfg = CompilerConfig::default();

        let r = range(10_000);
        let g = Grain::resolve(&r, &cfg, true, true);
        assert_eq!(
            g.time_expr("TIME", &r, &cfg),
            SqlExpr::TimeBucket {
                expr: Box::new(SqlExpr::column("TIME")),
                bucket: TimeBucket::Rollup("10 sec".to_string()),
            }
        );

        let g = Grain::resolve(&r, &cfg, false, true);
        assert_eq!(
            g.time_expr("TIME", &r, &cfg),
            SqlExpr::TimeBucket {
                expr: Box::new(SqlExpr::column("TIME")),
                bucket: TimeBucket::DateTrunc(Interval::new(10, IntervalUnit::Sec)),
            }
        );

        let r = range(2 * DAY_MS);
        let g = Grain::resolve(&r, &cfg, true, true);
        assert_eq!(
            g.time_expr("TIME", &r, &cfg),
            SqlExpr::TimeBucket {
                expr: Box::new(SqlExpr::column("TIME")),
                bucket: TimeBucket::Rollup("1 hour".to_string()),
            }
        );

        let g = Grain::resolve(&r, &cfg, false, true);
        assert_eq!(
            g.time_expr("TIME", &r, &cfg),
            SqlExpr::TimeBucket {
                expr: Box::new(SqlExpr::column("TIME")),
                bucket: TimeBucket::NanoDivision(172_800_000_000_000),
            }
        );
    }

    #[test]
    fn ungrouped_time_is_not_bucketed() {
        let cfg = CompilerConfig::default();
        let r = range(10_000);
        let g = Grain::resolve(&r, &cfg, false, false);
        assert_eq!(g.time_expr("TS", &r, &cfg), SqlExpr::column("TS"));
    }
}
