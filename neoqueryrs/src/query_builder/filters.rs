use crate::column_types::is_numeric_str;
use crate::dialect::{Dialect, MachbaseDialect};
use crate::expr_utils::{is_single_quoted, quote_if_needed};
use crate::models::{FilterClause, FilterOp};
use crate::sql_ast::{SqlExpr, SqlRenderer};

/// Predicate for one filter row, or `None` for a placeholder row.
pub(crate) fn filter_predicate(clause: &FilterClause) -> Option<SqlExpr> {
    if clause.is_placeholder() {
        return None;
    }
    if clause.is_raw {
        return Some(SqlExpr::raw(clause.raw_condition.clone()));
    }

    let column = Box::new(SqlExpr::column(clause.column_key.clone()));
    let predicate = match clause.operator {
        FilterOp::In => SqlExpr::InList {
            expr: column,
            list: clause
                .value
                .split(',')
                .map(|token| SqlExpr::raw(quote_if_needed(token.trim())))
                .collect(),
        },
        _ => {
            let value = if !is_numeric_str(&clause.column_type_code)
                && !is_single_quoted(&clause.value)
            {
                format!("'{}'", clause.value)
            } else {
                clause.value.clone()
            };
            SqlExpr::Compare {
                left: column,
                op: clause.operator.clone(),
                right: Box::new(SqlExpr::raw(value)),
            }
        }
    };
    Some(predicate)
}

/// Predicates for every non-placeholder row, in row order.
pub fn filter_predicates(clauses: &[FilterClause]) -> Vec<SqlExpr> {
    clauses.iter().filter_map(filter_predicate).collect()
}

/// Render the filter rows as an ` AND ` chain suitable for appending to a
/// WHERE clause. Each fragment carries its own leading and trailing space.
pub fn render_filters(clauses: &[FilterClause], dialect: &dyn Dialect) -> String {
    let renderer = SqlRenderer::new(dialect);
    filter_predicates(clauses)
        .iter()
        .map(|predicate| format!(" AND {} ", renderer.render_expr(predicate)))
        .collect()
}

/// [`render_filters`] with the Machbase dialect.
pub fn compile_filters(clauses: &[FilterClause]) -> String {
    render_filters(clauses, &MachbaseDialect)
}
