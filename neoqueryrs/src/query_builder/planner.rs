//! Statement planning for a single target.
//!
//! Produces the [`SelectQuery`] tree for a target: the base query over the
//! table, optionally wrapped by an outer query that renames or re-aggregates
//! its buckets.

use crate::column_types::is_tag_table;
use crate::config::CompilerConfig;
use crate::models::{Aggregation, QuerySpec, TimeRange, ValueMode};
use crate::sql_ast::{Alias, SelectItem, SelectQuery, SqlExpr, TableRef, TimeBucket};

use super::components::{
    average_with_components, value_select, COUNT_ALIAS, SUM_ALIAS, TIME_ALIAS, VALUE_ALIAS,
};
use super::filters::filter_predicates;
use super::grain::Grain;

/// Why a target produced no statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Hidden,
    MissingTimeField,
}

pub(crate) fn skip_reason(spec: &QuerySpec) -> Option<SkipReason> {
    if spec.hidden {
        Some(SkipReason::Hidden)
    } else if spec.time_field.is_empty() {
        Some(SkipReason::MissingTimeField)
    } else {
        None
    }
}

pub(crate) fn build_query(
    spec: &QuerySpec,
    range: &TimeRange,
    config: &CompilerConfig,
    supports_rollup: bool,
) -> Option<SelectQuery> {
    if let Some(reason) = skip_reason(spec) {
        tracing::debug!(ref_id = ?spec.ref_id, ?reason, "skipping target");
        return None;
    }

    let mut values = value_select(spec);
    let grain = Grain::resolve(
        range,
        config,
        spec.rollup_requested && supports_rollup,
        values.grouped,
    );
    let averaged = spec
        .aggregation
        .as_ref()
        .is_some_and(|agg| agg.normalized() == Aggregation::Avg);
    if grain.rollup && grain.sub_query && averaged {
        values.items = average_with_components(&spec.value_field);
    }
    tracing::trace!(
        ref_id = ?spec.ref_id,
        table = %spec.table_name,
        interval = %grain.interval,
        sub_query = grain.sub_query,
        rollup = grain.rollup,
        grouped = grain.grouped,
        "resolved time grain"
    );

    let mut select = vec![SelectItem {
        expr: grain.time_expr(&spec.time_field, range, config),
        alias: Some(time_alias()),
    }];
    select.extend(values.items);

    let mut filters = vec![SqlExpr::Between {
        expr: Box::new(SqlExpr::column(spec.time_field.clone())),
        low: Box::new(SqlExpr::Timestamp(range.from_nanos)),
        high: Box::new(SqlExpr::Timestamp(range.to_nanos)),
    }];
    filters.extend(filter_predicates(&spec.filters));

    let group_by = if grain.grouped {
        vec![time_column()]
    } else {
        Vec::new()
    };

    let mut base = SelectQuery {
        select,
        from: TableRef::table(spec.table_name.clone()),
        filters,
        group_by,
        order_by: Vec::new(),
        limit: None,
    };
    let limit = row_limit(grain.grouped, range, config);

    let query = match spec.value_mode {
        ValueMode::Literal => {
            base.order_by = order_by_time();
            base.limit = Some(limit);
            base
        }
        ValueMode::Aggregated => {
            let title = output_title(spec);
            let outer_value = if grain.rollup && grain.sub_query {
                spec
                    .aggregation
                    .as_ref()
                    .and_then(|agg| reaggregate(&agg.normalized()))
            } else {
                None
            };
            match outer_value {
                Some(value) => SelectQuery {
                    select: vec![
                        SelectItem {
                            expr: SqlExpr::TimeBucket {
                                expr: Box::new(time_column()),
                                bucket: TimeBucket::NanoDivision(Grain::nano_bucket(range)),
                            },
                            alias: Some(time_alias()),
                        },
                        SelectItem {
                            expr: value,
                            alias: Some(title),
                        },
                    ],
                    from: TableRef::subquery(base),
                    filters: Vec::new(),
                    group_by: vec![time_column()],
                    order_by: order_by_time(),
                    limit: Some(limit),
                },
                None => SelectQuery {
                    select: vec![
                        SelectItem {
                            expr: time_column(),
                            alias: Some(time_alias()),
                        },
                        SelectItem {
                            expr: SqlExpr::column(VALUE_ALIAS),
                            alias: Some(title),
                        },
                    ],
                    from: TableRef::subquery(base),
                    filters: Vec::new(),
                    group_by: Vec::new(),
                    order_by: order_by_time(),
                    limit: Some(limit),
                },
            }
        }
    };
    Some(query)
}

fn time_column() -> SqlExpr {
    SqlExpr::column(TIME_ALIAS)
}

fn time_alias() -> Alias {
    Alias::Ident(TIME_ALIAS.to_string())
}

fn order_by_time() -> Vec<SqlExpr> {
    vec![time_column()]
}

/// Unbucketed queries and panels without a point budget get the fixed default;
/// bucketed queries get headroom over the point budget for downsampling.
pub(crate) fn row_limit(grouped: bool, range: &TimeRange, config: &CompilerConfig) -> u64 {
    if !grouped || range.max_data_points == 0 {
        config.default_limit
    } else {
        range.max_data_points.saturating_mul(config.limit_headroom)
    }
}

/// Outer aggregate that folds hourly rollup buckets into the requested
/// resolution. `None` when the aggregation cannot be recombined.
pub(crate) fn reaggregate(agg: &Aggregation) -> Option<SqlExpr> {
    let value = || vec![SqlExpr::column(VALUE_ALIAS)];
    match agg {
        Aggregation::Sum | Aggregation::Sumsq | Aggregation::Count | Aggregation::CountAll => {
            Some(SqlExpr::aggregate(Aggregation::Sum, value()))
        }
        Aggregation::Min | Aggregation::Max => Some(SqlExpr::aggregate(agg.clone(), value())),
        Aggregation::Avg => Some(SqlExpr::Divide {
            left: Box::new(SqlExpr::aggregate(
                Aggregation::Sum,
                vec![SqlExpr::column(SUM_ALIAS)],
            )),
            right: Box::new(SqlExpr::aggregate(
                Aggregation::Sum,
                vec![SqlExpr::column(COUNT_ALIAS)],
            )),
        }),
        _ => None,
    }
}

/// Display name of the value series, in increasing precedence: the
/// aggregation over the value field, the bare value field when nothing is
/// aggregated, the first tag filter value on tag tables, the explicit title.
pub(crate) fn output_title(spec: &QuerySpec) -> Alias {
    if let Some(title) = spec.title() {
        return Alias::Literal(title.to_string());
    }
    let Some(agg) = &spec.aggregation else {
        return Alias::Literal(spec.value_field.clone());
    };
    if is_tag_table(spec.table_type) {
        if let Some(first) = spec.filters.first() {
            if !first.is_raw && !first.is_placeholder() {
                return Alias::Quoted(format!("{}({})", first.value, agg.key()));
            }
        }
    }
    Alias::Literal(format!("{}({})", agg.key(), spec.value_field))
}
