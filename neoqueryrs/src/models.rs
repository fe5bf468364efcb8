use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::template::ScopedVars;

/// How the value column of a target is chosen in the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ValueMode {
    /// Column picked from the table plus an aggregation.
    #[default]
    #[serde(rename = "select")]
    Aggregated,
    /// Value expression typed in directly.
    #[serde(rename = "input")]
    Literal,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Aggregation {
    Sum,
    Count,
    /// `count(*)`, rendered literally.
    CountAll,
    Min,
    Max,
    Avg,
    Sumsq,
    First,
    Last,
    Stddev,
    StddevPop,
    Variance,
    VarPop,
    /// Any other function name; passed through to the backend unchanged.
    Custom(String),
}

impl Aggregation {
    /// Parse an editor aggregation key. `none` and the empty string mean no
    /// aggregation. Keys are matched exactly so the user's spelling survives
    /// into titles; see [`Aggregation::normalized`].
    pub fn parse(key: &str) -> Option<Self> {
        let key = key.trim();
        if key.is_empty() || key.eq_ignore_ascii_case("none") {
            return None;
        }
        Some(Self::builtin(key).unwrap_or_else(|| Aggregation::Custom(key.to_string())))
    }

    fn builtin(key: &str) -> Option<Self> {
        let agg = match key {
            "sum" => Aggregation::Sum,
            "count" => Aggregation::Count,
            "count(*)" => Aggregation::CountAll,
            "min" => Aggregation::Min,
            "max" => Aggregation::Max,
            "avg" => Aggregation::Avg,
            "sumsq" => Aggregation::Sumsq,
            "first" => Aggregation::First,
            "last" => Aggregation::Last,
            "stddev" => Aggregation::Stddev,
            "stddev_pop" => Aggregation::StddevPop,
            "variance" => Aggregation::Variance,
            "var_pop" => Aggregation::VarPop,
            _ => return None,
        };
        Some(agg)
    }

    /// The built-in function a key names regardless of case (`AVG` is
    /// [`Aggregation::Avg`]); truly unknown names stay custom.
    pub fn normalized(&self) -> Aggregation {
        match self {
            Aggregation::Custom(name) => Self::builtin(&name.to_ascii_lowercase())
                .unwrap_or_else(|| self.clone()),
            other => other.clone(),
        }
    }

    pub fn key(&self) -> &str {
        match self {
            Aggregation::Sum => "sum",
            Aggregation::Count => "count",
            Aggregation::CountAll => "count(*)",
            Aggregation::Min => "min",
            Aggregation::Max => "max",
            Aggregation::Avg => "avg",
            Aggregation::Sumsq => "sumsq",
            Aggregation::First => "first",
            Aggregation::Last => "last",
            Aggregation::Stddev => "stddev",
            Aggregation::StddevPop => "stddev_pop",
            Aggregation::Variance => "variance",
            Aggregation::VarPop => "var_pop",
            Aggregation::Custom(name) => name,
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

mod aggregation_key {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::Aggregation;

    pub fn serialize<S: Serializer>(agg: &Option<Aggregation>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(agg.as_ref().map_or("none", |a| a.key()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Aggregation>, D::Error> {
        let key = Option::<String>::deserialize(d)?;
        Ok(key.as_deref().and_then(Aggregation::parse))
    }
}

fn null_as_empty<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(d)?.unwrap_or_default())
}

fn string_or_number<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Num(serde_json::Number),
        Null,
    }
    Ok(match Raw::deserialize(d)? {
        Raw::Str(s) => s,
        Raw::Num(n) => n.to_string(),
        Raw::Null => String::new(),
    })
}

/// One panel target as sent by the editor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuerySpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub table_name: String,
    #[serde(default = "unknown_table_type")]
    pub table_type: i32,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub value_field: String,
    #[serde(rename = "valueType", default)]
    pub value_mode: ValueMode,
    #[serde(rename = "aggrFunc", default, with = "aggregation_key")]
    pub aggregation: Option<Aggregation>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub time_field: String,
    #[serde(rename = "rollupTable", default)]
    pub rollup_requested: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub filters: Vec<FilterClause>,
    #[serde(rename = "hide", default)]
    pub hidden: bool,
}

fn unknown_table_type() -> i32 {
    -1
}

impl Default for QuerySpec {
    fn default() -> Self {
        Self {
            ref_id: None,
            table_name: String::new(),
            table_type: unknown_table_type(),
            value_field: String::new(),
            value_mode: ValueMode::Aggregated,
            aggregation: None,
            time_field: String::new(),
            rollup_requested: false,
            title: None,
            filters: Vec::new(),
            hidden: false,
        }
    }
}

impl QuerySpec {
    /// Explicit title override; an empty string counts as unset.
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref().filter(|t| !t.is_empty())
    }
}

/// Comparison operator of a structured filter clause.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FilterOp {
    #[default]
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    /// Unrecognised operator text, emitted verbatim.
    Other(String),
}

impl FilterOp {
    pub fn as_str(&self) -> &str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::Neq => "<>",
            FilterOp::Gt => ">",
            FilterOp::Gte => ">=",
            FilterOp::Lt => "<",
            FilterOp::Lte => "<=",
            FilterOp::In => "in",
            FilterOp::Other(op) => op,
        }
    }
}

impl From<String> for FilterOp {
    fn from(op: String) -> Self {
        let known = match op.trim() {
            "=" => Some(FilterOp::Eq),
            "<>" | "!=" => Some(FilterOp::Neq),
            ">" => Some(FilterOp::Gt),
            ">=" => Some(FilterOp::Gte),
            "<" => Some(FilterOp::Lt),
            "<=" => Some(FilterOp::Lte),
            o if o.eq_ignore_ascii_case("in") => Some(FilterOp::In),
            _ => None,
        };
        known.unwrap_or(FilterOp::Other(op))
    }
}

impl From<FilterOp> for String {
    fn from(op: FilterOp) -> Self {
        op.as_str().to_string()
    }
}

pub const UNSET_COLUMN: &str = "none";

/// One row of the editor's filter list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterClause {
    #[serde(rename = "key", default = "unset_column")]
    pub column_key: String,
    #[serde(rename = "type", default, deserialize_with = "string_or_number")]
    pub column_type_code: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub value: String,
    #[serde(rename = "op", default)]
    pub operator: FilterOp,
    #[serde(rename = "condition", default, deserialize_with = "null_as_empty")]
    pub raw_condition: String,
    #[serde(rename = "isStr", default)]
    pub is_raw: bool,
}

fn unset_column() -> String {
    UNSET_COLUMN.to_string()
}

impl Default for FilterClause {
    fn default() -> Self {
        Self {
            column_key: unset_column(),
            column_type_code: String::new(),
            value: String::new(),
            operator: FilterOp::Eq,
            raw_condition: String::new(),
            is_raw: false,
        }
    }
}

impl FilterClause {
    pub fn compare(column: &str, type_code: i32, op: FilterOp, value: &str) -> Self {
        Self {
            column_key: column.to_string(),
            column_type_code: type_code.to_string(),
            value: value.to_string(),
            operator: op,
            ..Self::default()
        }
    }

    pub fn raw(condition: &str) -> Self {
        Self {
            raw_condition: condition.to_string(),
            is_raw: true,
            ..Self::default()
        }
    }

    /// Placeholder rows contribute nothing to the compiled filter chain.
    pub fn is_placeholder(&self) -> bool {
        if self.is_raw {
            self.raw_condition.is_empty()
        } else {
            self.column_key == UNSET_COLUMN || self.value.is_empty()
        }
    }
}

/// Requested time window in store-native nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeRange {
    pub from_nanos: i64,
    pub to_nanos: i64,
    pub resolution_ms: u64,
    /// 0 means no downsampling limit override.
    pub max_data_points: u64,
}

pub const NANOS_PER_MILLI: i64 = 1_000_000;

impl TimeRange {
    pub fn from_millis(from_ms: i64, to_ms: i64, resolution_ms: u64, max_data_points: u64) -> Self {
        Self {
            from_nanos: from_ms.saturating_mul(NANOS_PER_MILLI),
            to_nanos: to_ms.saturating_mul(NANOS_PER_MILLI),
            resolution_ms,
            max_data_points,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RequestRange {
    /// Epoch milliseconds.
    pub from: i64,
    /// Epoch milliseconds.
    pub to: i64,
}

/// A panel refresh: the time window plus every target to compile.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub range: RequestRange,
    pub interval_ms: u64,
    #[serde(default)]
    pub max_data_points: u64,
    #[serde(default)]
    pub targets: Vec<QuerySpec>,
    #[serde(default)]
    pub scoped_vars: ScopedVars,
}

impl QueryRequest {
    pub fn time_range(&self) -> TimeRange {
        TimeRange::from_millis(
            self.range.from,
            self.range.to,
            self.interval_ms,
            self.max_data_points,
        )
    }
}

/// A target together with the SQL compiled for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompiledQuery {
    #[serde(flatten)]
    pub spec: QuerySpec,
    #[serde(rename = "queryText")]
    pub sql: String,
}
