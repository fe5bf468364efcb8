use std::sync::Arc;

use crate::config::CompilerConfig;
use crate::dialect::{Dialect, MachbaseDialect};
use crate::models::{CompiledQuery, QueryRequest, QuerySpec, TimeRange};
use crate::sql_ast::{SelectQuery, SqlRenderer};
use crate::template::{NoSubstitution, ScopedVars, TemplateSubstitution, VariableFormat};

mod components;
mod filters;
mod grain;
mod planner;

pub use filters::{compile_filters, filter_predicates, render_filters};
pub use planner::SkipReason;

/// Compiles panel targets into SQL statements.
///
/// Holds only read-only settings; a single compiler can be shared across
/// threads and used for any number of requests.
#[derive(Clone)]
pub struct QueryCompiler {
    config: CompilerConfig,
    dialect: Arc<dyn Dialect>,
}

impl Default for QueryCompiler {
    fn default() -> Self {
        Self::new(CompilerConfig::default())
    }
}

impl QueryCompiler {
    pub fn new(config: CompilerConfig) -> Self {
        Self::with_dialect(config, Arc::new(MachbaseDialect))
    }

    /// Build a compiler for a specific dialect (useful for tests).
    pub fn with_dialect(config: CompilerConfig, dialect: Arc<dyn Dialect>) -> Self {
        Self { config, dialect }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Statement tree for a target, or `None` when the target is skipped.
    pub fn plan(&self, spec: &QuerySpec, range: &TimeRange) -> Option<SelectQuery> {
        planner::build_query(spec, range, &self.config, self.dialect.supports_rollup())
    }

    pub fn render(&self, query: &SelectQuery) -> String {
        SqlRenderer::new(self.dialect.as_ref()).render_select(query)
    }

    /// SQL for a target without variable substitution.
    pub fn compile(&self, spec: &QuerySpec, range: &TimeRange) -> Option<String> {
        self.compile_with(spec, range, &NoSubstitution, &ScopedVars::new())
    }

    /// SQL for a target, with dashboard variables resolved by `substitution`
    /// using SQL string quoting.
    pub fn compile_with(
        &self,
        spec: &QuerySpec,
        range: &TimeRange,
        substitution: &dyn TemplateSubstitution,
        scoped_vars: &ScopedVars,
    ) -> Option<String> {
        let query = self.plan(spec, range)?;
        let sql = self.render(&query);
        let sql = substitution.substitute(&sql, scoped_vars, VariableFormat::SqlString);
        tracing::trace!(ref_id = ?spec.ref_id, sql = %sql, "compiled target");
        Some(sql)
    }

    /// Compile every target of a request, keeping request order and dropping
    /// skipped targets.
    pub fn compile_all(
        &self,
        request: &QueryRequest,
        substitution: &dyn TemplateSubstitution,
    ) -> Vec<CompiledQuery> {
        let range = request.time_range();
        let compiled: Vec<CompiledQuery> = request
            .targets
            .iter()
            .filter_map(|spec| {
                self.compile_with(spec, &range, substitution, &request.scoped_vars)
                    .map(|sql| CompiledQuery {
                        spec: spec.clone(),
                        sql,
                    })
            })
            .collect();
        tracing::debug!(
            targets = request.targets.len(),
            compiled = compiled.len(),
            interval_ms = request.interval_ms,
            "compiled request"
        );
        compiled
    }
}

pub fn skip_reason(spec: &QuerySpec) -> Option<SkipReason> {
    planner::skip_reason(spec)
}
