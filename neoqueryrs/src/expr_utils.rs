//! Expression utility functions.
//!
//! Helpers for classifying user-typed value expressions.

/// Whether a value expression is a raw function call such as `avg(temp)` rather
/// than a bare column reference.
///
/// Only checks that both parentheses are present; nesting and balance are not
/// validated.
pub fn looks_like_call_expression(expr: &str) -> bool {
    expr.contains('(') && expr.contains(')')
}

/// Whether a literal already carries an opening single quote.
pub fn is_single_quoted(value: &str) -> bool {
    value.starts_with('\'')
}

/// Wrap a literal in single quotes unless it already starts with one.
pub fn quote_if_needed(value: &str) -> String {
    if is_single_quoted(value) {
        value.to_string()
    } else {
        format!("'{value}'")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_call_expressions() {
        assert!(looks_like_call_expression("avg(value)"));
        assert!(looks_like_call_expression("sum(a) / count(b)"));
        assert!(looks_like_call_expression(")("));
    }

    #[test]
    fn bare_columns_are_not_calls() {
        assert!(!looks_like_call_expression("VALUE"));
        assert!(!looks_like_call_expression("avg(value"));
        assert!(!looks_like_call_expression(""));
    }

    #[test]
    fn quotes_only_unquoted_values() {
        assert_eq!(quote_if_needed("abc"), "'abc'");
        assert_eq!(quote_if_needed("'abc'"), "'abc'");
        assert_eq!(quote_if_needed(""), "''");
    }
}
