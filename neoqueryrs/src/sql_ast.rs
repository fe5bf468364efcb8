use crate::dialect::Dialect;
use crate::interval::Interval;
use crate::models::{Aggregation, FilterOp};

#[derive(Debug, Clone, PartialEq)]
pub enum SqlExpr {
    Column(String),
    /// Text emitted verbatim (user-typed expressions, raw filter conditions).
    Raw(String),
    Aggregate {
        agg: Aggregation,
        args: Vec<SqlExpr>,
    },
    /// `left / right` over aggregates, rendered unparenthesised.
    Divide {
        left: Box<SqlExpr>,
        right: Box<SqlExpr>,
    },
    /// Filter comparison; rendered without padding (`NAME='a'`).
    Compare {
        left: Box<SqlExpr>,
        op: FilterOp,
        right: Box<SqlExpr>,
    },
    InList {
        expr: Box<SqlExpr>,
        list: Vec<SqlExpr>,
    },
    Between {
        expr: Box<SqlExpr>,
        low: Box<SqlExpr>,
        high: Box<SqlExpr>,
    },
    /// Store-native nanosecond epoch converted to a timestamp.
    Timestamp(i64),
    TimeBucket {
        expr: Box<SqlExpr>,
        bucket: TimeBucket,
    },
}

impl SqlExpr {
    pub fn column(name: impl Into<String>) -> Self {
        SqlExpr::Column(name.into())
    }

    pub fn raw(text: impl Into<String>) -> Self {
        SqlExpr::Raw(text.into())
    }

    pub fn aggregate(agg: Aggregation, args: Vec<SqlExpr>) -> Self {
        SqlExpr::Aggregate { agg, args }
    }
}

/// How a time column is folded into buckets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeBucket {
    /// Server-side rollup at the given interval text (`10 sec`, `1 hour`).
    Rollup(String),
    /// Truncation to a multiple of the interval.
    DateTrunc(Interval),
    /// Integer division on the raw nanosecond value.
    NanoDivision(u64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Alias {
    /// Bare identifier (`AS VALUE`).
    Ident(String),
    /// Single-quoted display name (`AS 'avg(TEMP)'`).
    Literal(String),
    /// Double-quoted display name (`AS "sensor-1(avg)"`).
    Quoted(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectItem {
    pub expr: SqlExpr,
    pub alias: Option<Alias>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableRef {
    pub name: String,
    pub subquery: Option<Box<SelectQuery>>,
}

impl TableRef {
    pub fn table(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn subquery(query: SelectQuery) -> Self {
        Self {
            subquery: Some(Box::new(query)),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectQuery {
    pub select: Vec<SelectItem>,
    pub from: TableRef,
    pub filters: Vec<SqlExpr>,
    pub group_by: Vec<SqlExpr>,
    /// Ascending sort keys.
    pub order_by: Vec<SqlExpr>,
    pub limit: Option<u64>,
}

pub struct SqlRenderer<'d> {
    dialect: &'d dyn Dialect,
}

impl<'d> SqlRenderer<'d> {
    pub fn new(dialect: &'d dyn Dialect) -> Self {
        Self { dialect }
    }

    pub fn render_select(&self, query: &SelectQuery) -> String {
        let select_items: Vec<String> = query
            .select
            .iter()
            .map(|item| {
                let expr_sql = self.render_expr(&item.expr);
                match &item.alias {
                    Some(alias) => format!("{expr_sql} AS {}", self.render_alias(alias)),
                    None => expr_sql,
                }
            })
            .collect();

        let mut sql = format!(
            "SELECT {} FROM {}",
            select_items.join(", "),
            self.render_table_ref(&query.from)
        );

        if !query.filters.is_empty() {
            let filters: Vec<String> = query.filters.iter().map(|f| self.render_expr(f)).collect();
            sql.push_str(&format!(" WHERE {}", filters.join(" AND ")));
        }

        if !query.group_by.is_empty() {
            let groups: Vec<String> = query.group_by.iter().map(|g| self.render_expr(g)).collect();
            sql.push_str(&format!(" GROUP BY {}", groups.join(", ")));
        }

        if !query.order_by.is_empty() {
            let orders: Vec<String> = query
                .order_by
                .iter()
                .map(|o| format!("{} ASC", self.render_expr(o)))
                .collect();
            sql.push_str(&format!(" ORDER BY {}", orders.join(", ")));
        }

        if let Some(limit) = query.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        sql
    }

    fn render_alias(&self, alias: &Alias) -> String {
        match alias {
            Alias::Ident(name) => self.dialect.quote_ident(name),
            Alias::Literal(name) => self.dialect.quote_string(name),
            Alias::Quoted(name) => format!("\"{}\"", name.replace('"', "\"\"")),
        }
    }

    fn render_table_ref(&self, table: &TableRef) -> String {
        match &table.subquery {
            Some(inner) => format!("({})", self.render_select(inner)),
            None => self.dialect.quote_ident(&table.name),
        }
    }

    pub fn render_expr(&self, expr: &SqlExpr) -> String {
        match expr {
            SqlExpr::Column(name) => self.dialect.quote_ident(name),
            SqlExpr::Raw(text) => text.clone(),
            SqlExpr::Aggregate { agg, args } => {
                let rendered: Vec<String> = args.iter().map(|a| self.render_expr(a)).collect();
                self.dialect.render_aggregation(agg, &rendered)
            }
            SqlExpr::Divide { left, right } => format!(
                "{} / {}",
                self.render_expr(left),
                self.render_expr(right)
            ),
            SqlExpr::Compare { left, op, right } => format!(
                "{}{}{}",
                self.render_expr(left),
                op.as_str(),
                self.render_expr(right)
            ),
            SqlExpr::InList { expr, list } => {
                let rendered: Vec<String> = list.iter().map(|v| self.render_expr(v)).collect();
                format!("{} in ({})", self.render_expr(expr), rendered.join(","))
            }
            SqlExpr::Between { expr, low, high } => format!(
                "{} BETWEEN {} AND {}",
                self.render_expr(expr),
                self.render_expr(low),
                self.render_expr(high)
            ),
            SqlExpr::Timestamp(nanos) => self.dialect.render_timestamp(*nanos),
            SqlExpr::TimeBucket { expr, bucket } => self
                .dialect
                .render_time_bucket(&self.render_expr(expr), bucket),
        }
    }
}
