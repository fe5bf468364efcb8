//! Select-list construction for a single target.

use crate::expr_utils::looks_like_call_expression;
use crate::models::{Aggregation, QuerySpec, ValueMode};
use crate::sql_ast::{Alias, SelectItem, SqlExpr};

pub(crate) const TIME_ALIAS: &str = "TIME";
pub(crate) const VALUE_ALIAS: &str = "VALUE";
pub(crate) const SUM_ALIAS: &str = "SUMVAL";
pub(crate) const COUNT_ALIAS: &str = "CNTVAL";

/// Value columns of the innermost query and whether they aggregate per bucket.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ValueSelect {
    pub items: Vec<SelectItem>,
    pub grouped: bool,
}

/// Alias given to the value column of the innermost query.
///
/// Aggregated targets are re-selected by an outer query, so their value must be
/// addressable as `VALUE`; literal targets carry the user title, if any.
pub(crate) fn inner_alias(spec: &QuerySpec) -> Option<Alias> {
    match spec.value_mode {
        ValueMode::Aggregated => Some(Alias::Ident(VALUE_ALIAS.to_string())),
        ValueMode::Literal => spec.title().map(|t| Alias::Literal(t.to_string())),
    }
}

fn value_alias() -> Option<Alias> {
    Some(Alias::Ident(VALUE_ALIAS.to_string()))
}

pub(crate) fn value_select(spec: &QuerySpec) -> ValueSelect {
    let alias = inner_alias(spec);

    if spec.value_mode == ValueMode::Literal && looks_like_call_expression(&spec.value_field) {
        return ValueSelect {
            items: vec![SelectItem {
                expr: SqlExpr::raw(spec.value_field.clone()),
                alias,
            }],
            grouped: true,
        };
    }

    match &spec.aggregation {
        Some(agg) => {
            let item = match agg.normalized() {
                Aggregation::CountAll => SelectItem {
                    // Emitted as spelled; a custom spelling already carries its `(*)`.
                    expr: match agg {
                        Aggregation::CountAll => SqlExpr::aggregate(Aggregation::CountAll, Vec::new()),
                        _ => SqlExpr::raw(agg.key()),
                    },
                    alias: value_alias(),
                },
                Aggregation::First | Aggregation::Last => SelectItem {
                    expr: SqlExpr::aggregate(
                        agg.clone(),
                        vec![
                            SqlExpr::column(spec.time_field.clone()),
                            SqlExpr::column(spec.value_field.clone()),
                        ],
                    ),
                    alias: value_alias(),
                },
                _ => SelectItem {
                    expr: SqlExpr::aggregate(
                        agg.clone(),
                        vec![SqlExpr::column(spec.value_field.clone())],
                    ),
                    alias,
                },
            };
            ValueSelect {
                items: vec![item],
                grouped: true,
            }
        }
        None => ValueSelect {
            items: vec![SelectItem {
                expr: SqlExpr::column(spec.value_field.clone()),
                alias,
            }],
            grouped: false,
        },
    }
}

/// Average plus its sum and count, so an outer query can rebuild the exact
/// average over coarser buckets.
pub(crate) fn average_with_components(value_field: &str) -> Vec<SelectItem> {
    let value = || vec![SqlExpr::column(value_field.to_string())];
    vec![
        SelectItem {
            expr: SqlExpr::aggregate(Aggregation::Avg, value()),
            alias: value_alias(),
        },
        SelectItem {
            expr: SqlExpr::aggregate(Aggregation::Sum, value()),
            alias: Some(Alias::Ident(SUM_ALIAS.to_string())),
        },
        SelectItem {
            expr: SqlExpr::aggregate(Aggregation::Count, value()),
            alias: Some(Alias::Ident(COUNT_ALIAS.to_string())),
        },
    ]
}
