//! Integration tests for target compilation.
//!
//! These tests exercise the public API: QueryCompiler, QuerySpec, QueryRequest.

use neoquery::models::{Aggregation, FilterClause, FilterOp, QueryRequest, QuerySpec, TimeRange, ValueMode};
use neoquery::template::{ScopedVars, VariableInterpolator, VariableValue};
use neoquery::{CompilerConfig, NoSubstitution, QueryCompiler};

// ============================================================================
// Test fixtures
// ============================================================================

mod fixtures {
    use super::*;

    pub const FROM_MS: i64 = 1_700_000_000_000;
    pub const TO_MS: i64 = 1_700_003_600_000;

    pub fn range(resolution_ms: u64, max_data_points: u64) -> TimeRange {
        TimeRange::from_millis(FROM_MS, TO_MS, resolution_ms, max_data_points)
    }

    pub fn sensor_avg() -> QuerySpec {
        QuerySpec {
            ref_id: Some("A".to_string()),
            table_name: "SENSOR".to_string(),
            table_type: 6,
            value_field: "TEMP".to_string(),
            value_mode: ValueMode::Aggregated,
            aggregation: Some(Aggregation::Avg),
            time_field: "TIME".to_string(),
            rollup_requested: true,
            filters: vec![FilterClause::compare("NAME", 5, FilterOp::Eq, "sensor-1")],
            ..QuerySpec::default()
        }
    }

    pub fn log_literal() -> QuerySpec {
        QuerySpec {
            table_name: "LOGS".to_string(),
            table_type: 0,
            value_field: "VALUE".to_string(),
            value_mode: ValueMode::Literal,
            time_field: "TIME".to_string(),
            ..QuerySpec::default()
        }
    }
}

use fixtures::*;

// ============================================================================
// Aggregated targets
// ============================================================================

#[test]
fn tag_table_average_with_rollup() {
    let compiler = QueryCompiler::default();
    let sql = compiler.compile(&sensor_avg(), &range(10_000, 500)).unwrap();

    assert_eq!(
        sql,
        "SELECT TIME AS TIME, VALUE AS \"sensor-1(avg)\" FROM (\
         SELECT TIME ROLLUP 10 sec AS TIME, AVG(TEMP) AS VALUE FROM SENSOR \
         WHERE TIME BETWEEN FROM_TIMESTAMP(1700000000000000000) AND FROM_TIMESTAMP(1700003600000000000) \
         AND NAME='sensor-1' GROUP BY TIME) ORDER BY TIME ASC LIMIT 1000"
    );
}

#[test]
fn long_ranges_reaggregate_hourly_rollups() {
    let compiler = QueryCompiler::default();
    let sql = compiler
        .compile(&sensor_avg(), &range(2 * 86_400_000, 300))
        .unwrap();

    assert!(sql.starts_with(
        "SELECT TIME / 172800000000000 * 172800000000000 AS TIME, SUM(SUMVAL) / SUM(CNTVAL) AS \"sensor-1(avg)\" FROM ("
    ));
    assert!(sql.contains(
        "SELECT TIME ROLLUP 1 hour AS TIME, AVG(TEMP) AS VALUE, SUM(TEMP) AS SUMVAL, COUNT(TEMP) AS CNTVAL FROM SENSOR"
    ));
    assert!(sql.ends_with("GROUP BY TIME) GROUP BY TIME ORDER BY TIME ASC LIMIT 600"));
}

fn day_rollup(aggr_func: &str) -> String {
    let mut spec = sensor_avg();
    spec.table_type = 0;
    spec.filters.clear();
    spec.aggregation = Aggregation::parse(aggr_func);
    QueryCompiler::default()
        .compile(&spec, &range(86_400_000, 100))
        .unwrap()
}

#[test]
fn long_range_rollups_reaggregate_per_function() {
    let cases = [
        ("sum", "SUM(VALUE)", "SUM(TEMP) AS VALUE"),
        ("sumsq", "SUM(VALUE)", "SUMSQ(TEMP) AS VALUE"),
        ("count", "SUM(VALUE)", "COUNT(TEMP) AS VALUE"),
        ("count(*)", "SUM(VALUE)", "COUNT(*) AS VALUE"),
        ("min", "MIN(VALUE)", "MIN(TEMP) AS VALUE"),
        ("max", "MAX(VALUE)", "MAX(TEMP) AS VALUE"),
    ];
    for (aggr_func, outer, inner) in cases {
        let sql = day_rollup(aggr_func);
        assert!(
            sql.starts_with(&format!(
                "SELECT TIME / 86400000000000 * 86400000000000 AS TIME, {outer} AS '{aggr_func}(TEMP)' \
                 FROM (SELECT TIME ROLLUP 1 hour AS TIME, {inner} FROM SENSOR WHERE "
            )),
            "{aggr_func}: {sql}"
        );
        assert!(
            sql.ends_with("GROUP BY TIME) GROUP BY TIME ORDER BY TIME ASC LIMIT 200"),
            "{aggr_func}: {sql}"
        );
    }
}

#[test]
fn long_range_rollup_of_first_keeps_plain_wrapper() {
    assert_eq!(
        day_rollup("first"),
        "SELECT TIME AS TIME, VALUE AS 'first(TEMP)' FROM (\
         SELECT TIME ROLLUP 1 hour AS TIME, FIRST(TIME, TEMP) AS VALUE FROM SENSOR \
         WHERE TIME BETWEEN FROM_TIMESTAMP(1700000000000000000) AND FROM_TIMESTAMP(1700003600000000000) \
         GROUP BY TIME) ORDER BY TIME ASC LIMIT 200"
    );
}

#[test]
fn upper_case_average_reaggregates_and_keeps_its_title() {
    let sql = day_rollup("AVG");
    assert!(sql.starts_with(
        "SELECT TIME / 86400000000000 * 86400000000000 AS TIME, SUM(SUMVAL) / SUM(CNTVAL) AS 'AVG(TEMP)' FROM ("
    ));
    assert!(sql.contains("AVG(TEMP) AS VALUE, SUM(TEMP) AS SUMVAL, COUNT(TEMP) AS CNTVAL"));
}

#[test]
fn long_ranges_without_rollup_bucket_raw_nanoseconds() {
    let compiler = QueryCompiler::default();
    let mut spec = sensor_avg();
    spec.rollup_requested = false;
    let sql = compiler.compile(&spec, &range(86_400_000, 100)).unwrap();

    assert!(sql.contains("SELECT TIME / 86400000000000 * 86400000000000 AS TIME, AVG(TEMP) AS VALUE"));
    assert!(sql.ends_with("ORDER BY TIME ASC LIMIT 200"));
}

#[test]
fn short_ranges_without_rollup_use_date_trunc() {
    let compiler = QueryCompiler::default();
    let mut spec = sensor_avg();
    spec.rollup_requested = false;
    spec.table_type = 0;
    spec.filters.clear();
    let sql = compiler.compile(&spec, &range(300_000, 100)).unwrap();

    assert!(sql.contains("DATE_TRUNC('min', TIME, 5) AS TIME"));
    assert!(sql.contains("VALUE AS 'avg(TEMP)'"));
}

#[test]
fn sub_second_resolution_disables_rollup() {
    let compiler = QueryCompiler::default();
    let sql = compiler.compile(&sensor_avg(), &range(200, 100)).unwrap();

    assert!(!sql.contains("ROLLUP"));
    assert!(sql.contains("DATE_TRUNC('msec', TIME, 200) AS TIME"));
}

#[test]
fn count_star_and_first_value() {
    let compiler = QueryCompiler::default();
    let mut spec = sensor_avg();
    spec.aggregation = Some(Aggregation::CountAll);
    let sql = compiler.compile(&spec, &range(10_000, 100)).unwrap();
    assert!(sql.contains("COUNT(*) AS VALUE"));

    spec.aggregation = Some(Aggregation::First);
    let sql = compiler.compile(&spec, &range(10_000, 100)).unwrap();
    assert!(sql.contains("FIRST(TIME, TEMP) AS VALUE"));
}

#[test]
fn explicit_title_names_the_series() {
    let compiler = QueryCompiler::default();
    let mut spec = sensor_avg();
    spec.title = Some("Boiler's temp".to_string());
    let sql = compiler.compile(&spec, &range(10_000, 100)).unwrap();

    assert!(sql.starts_with("SELECT TIME AS TIME, VALUE AS 'Boiler''s temp' FROM ("));
}

// ============================================================================
// Literal targets
// ============================================================================

#[test]
fn literal_column_is_not_grouped() {
    let compiler = QueryCompiler::default();
    let range = TimeRange::from_millis(0, 1_000, 1_000, 100);
    let sql = compiler.compile(&log_literal(), &range).unwrap();

    assert_eq!(
        sql,
        "SELECT TIME AS TIME, VALUE FROM LOGS \
         WHERE TIME BETWEEN FROM_TIMESTAMP(0) AND FROM_TIMESTAMP(1000000000) \
         ORDER BY TIME ASC LIMIT 5000"
    );
}

#[test]
fn literal_expression_is_grouped_by_bucket() {
    let compiler = QueryCompiler::default();
    let mut spec = log_literal();
    spec.value_field = "max(VALUE) - min(VALUE)".to_string();
    spec.title = Some("spread".to_string());
    let sql = compiler.compile(&spec, &range(60_000, 50)).unwrap();

    assert!(sql.starts_with(
        "SELECT DATE_TRUNC('min', TIME, 1) AS TIME, max(VALUE) - min(VALUE) AS 'spread' FROM LOGS"
    ));
    assert!(sql.ends_with("GROUP BY TIME ORDER BY TIME ASC LIMIT 100"));
}

// ============================================================================
// Skips and request handling
// ============================================================================

#[test]
fn hidden_and_timeless_targets_compile_to_nothing() {
    let compiler = QueryCompiler::default();
    let mut hidden = sensor_avg();
    hidden.hidden = true;
    assert!(compiler.compile(&hidden, &range(10_000, 100)).is_none());

    let mut timeless = sensor_avg();
    timeless.time_field.clear();
    assert!(compiler.compile(&timeless, &range(10_000, 100)).is_none());
}

#[test]
fn compilation_is_deterministic() {
    let compiler = QueryCompiler::default();
    let spec = sensor_avg();
    let r = range(10_000, 100);
    assert_eq!(compiler.compile(&spec, &r), compiler.compile(&spec, &r));
}

#[test]
fn compile_all_keeps_order_and_drops_skipped() {
    let compiler = QueryCompiler::default();
    let mut targets = Vec::new();
    for (id, hide, time) in [("A", false, "TIME"), ("B", true, "TIME"), ("C", false, ""), ("D", false, "TIME")] {
        let mut spec = sensor_avg();
        spec.ref_id = Some(id.to_string());
        spec.hidden = hide;
        spec.time_field = time.to_string();
        targets.push(spec);
    }
    let request = QueryRequest {
        range: neoquery::models::RequestRange {
            from: FROM_MS,
            to: TO_MS,
        },
        interval_ms: 10_000,
        max_data_points: 100,
        targets,
        scoped_vars: ScopedVars::new(),
    };

    let compiled = compiler.compile_all(&request, &NoSubstitution);
    let ids: Vec<_> = compiled
        .iter()
        .map(|c| c.spec.ref_id.as_deref().unwrap_or_default())
        .collect();
    assert_eq!(ids, vec!["A", "D"]);
    assert!(compiled[0].sql.contains("ROLLUP 10 sec"));
}

#[test]
fn request_json_round_trips_through_compile_all() {
    let request: QueryRequest = serde_json::from_value(serde_json::json!({
        "range": {"from": FROM_MS, "to": TO_MS},
        "intervalMs": 10000,
        "maxDataPoints": 500,
        "scopedVars": {"host": "db1"},
        "targets": [{
            "refId": "A",
            "tableName": "LOGS",
            "tableType": 0,
            "valueField": "LATENCY",
            "valueType": "select",
            "aggrFunc": "max",
            "timeField": "TS",
            "filters": [{"key": "none", "isStr": true, "condition": "HOST = $host"}]
        }]
    }))
    .unwrap();

    let interpolator = VariableInterpolator::new().with_variable("host", "fallback");
    let compiled = QueryCompiler::default().compile_all(&request, &interpolator);
    assert_eq!(compiled.len(), 1);
    let sql = &compiled[0].sql;
    assert!(sql.contains("MAX(LATENCY) AS VALUE"));
    assert!(sql.contains(" AND HOST = 'db1' GROUP BY TIME"));
    assert!(sql.contains("VALUE AS 'max(LATENCY)'"));

    let out = serde_json::to_value(&compiled[0]).unwrap();
    assert_eq!(out["refId"], "A");
    assert_eq!(out["queryText"], serde_json::Value::String(sql.clone()));
}

#[test]
fn multi_value_variables_expand_into_lists() {
    let compiler = QueryCompiler::default();
    let mut spec = sensor_avg();
    spec.filters = vec![FilterClause::raw("NAME in ($names)")];
    let mut vars = ScopedVars::new();
    vars.insert(
        "names".to_string(),
        VariableValue::Multi(vec!["s-1".to_string(), "s-2".to_string()]),
    );

    let sql = compiler
        .compile_with(&spec, &range(10_000, 100), &VariableInterpolator::new(), &vars)
        .unwrap();
    assert!(sql.contains("NAME in ('s-1','s-2')"));
}

#[test]
fn configured_limits_apply() {
    let compiler = QueryCompiler::new(CompilerConfig {
        default_limit: 42,
        limit_headroom: 3,
        ..CompilerConfig::default()
    });
    let sql = compiler.compile(&sensor_avg(), &range(10_000, 100)).unwrap();
    assert!(sql.ends_with("LIMIT 300"));

    let sql = compiler
        .compile(&log_literal(), &TimeRange::from_millis(0, 1, 1_000, 100))
        .unwrap();
    assert!(sql.ends_with("LIMIT 42"));
}
