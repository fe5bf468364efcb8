use futures::future::join_all;

use crate::error::{NeoQueryError, Result};
use crate::executor::{Frame, QueryExecutor};
use crate::models::QueryRequest;
use crate::query_builder::QueryCompiler;
use crate::schema_cache::HEALTH_CHECK_SQL;
use crate::template::TemplateSubstitution;

/// Outcome of one compiled target. Failures are kept per target so one bad
/// query does not fail the whole panel.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetResult {
    pub ref_id: Option<String>,
    pub sql: String,
    pub outcome: std::result::Result<Frame, String>,
}

impl TargetResult {
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Compile every visible target of `request` and run the statements
/// concurrently. Results follow request order; skipped targets are absent.
pub async fn run_queries(
    compiler: &QueryCompiler,
    request: &QueryRequest,
    substitution: &dyn TemplateSubstitution,
    executor: &dyn QueryExecutor,
) -> Vec<TargetResult> {
    let compiled = compiler.compile_all(request, substitution);
    let pending = compiled.into_iter().map(|query| async move {
        let ref_id = query.spec.ref_id.clone();
        let name = ref_id.clone().unwrap_or_default();
        let outcome = match executor.query(&query.sql).await {
            Ok(result) => result.into_frame(name),
            Err(err) => Err(err),
        };
        let outcome = outcome.map_err(|err| {
            tracing::warn!(ref_id = ?ref_id, error = %err, "target query failed");
            err.to_string()
        });
        TargetResult {
            ref_id,
            sql: query.sql,
            outcome,
        }
    });
    join_all(pending).await
}

/// Run the health probe and return the table count it reports.
pub async fn check_health(executor: &dyn QueryExecutor) -> Result<u64> {
    let result = executor.query(HEALTH_CHECK_SQL).await?;
    let count = result
        .rows
        .first()
        .and_then(|row| row.first())
        .and_then(|cell| {
            cell.as_u64()
                .or_else(|| cell.as_str().and_then(|s| s.trim().parse().ok()))
        })
        .ok_or_else(|| {
            NeoQueryError::Execution("health check returned no row count".to_string())
        })?;
    tracing::info!(tables = count, "health check passed");
    Ok(count)
}
