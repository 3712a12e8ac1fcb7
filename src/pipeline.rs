// src/pipeline.rs
use std::time::Duration;
use tracing::{debug, debug_span, error, instrument, trace, warn};

use crate::awk::AwkInterpreter;
use crate::compute::{self, Compute};
use crate::connector::ConnectorStore;
use crate::table::SourceTable;

/// Everything a pipeline may read besides its own table. Borrowed, so the
/// same store and interpreter serve every concurrent pipeline.
#[derive(Clone, Copy)]
pub struct ComputeContext<'a> {
    pub connector_id: &'a str,
    pub source_key: &'a str,
    pub hostname: &'a str,
    pub store: &'a dyn ConnectorStore,
    pub awk: &'a dyn AwkInterpreter,
    pub awk_timeout: Duration,
}

impl ComputeContext<'_> {
    /// `<sourceKey>.compute(<index>)`, the name log lines use for a step.
    pub fn compute_key(&self, index: usize) -> String {
        format!("{}.compute({})", self.source_key, index)
    }
}

/// Outcome counts of one pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineReport {
    pub applied: usize,
    pub skipped: usize,
}

/// An ordered directive list.
#[derive(Debug, Clone, Default)]
pub struct ComputePipeline {
    computes: Vec<Compute>,
}

impl From<Vec<Compute>> for ComputePipeline {
    fn from(computes: Vec<Compute>) -> Self {
        Self { computes }
    }
}

impl ComputePipeline {
    pub fn new(computes: Vec<Compute>) -> Self {
        Self { computes }
    }

    /// Run every directive in order against `table`. A failing directive is
    /// logged and skipped; it never stops the ones after it.
    #[instrument(
        level = "info",
        skip(self, table, ctx),
        fields(connector = %ctx.connector_id, source = %ctx.source_key, host = %ctx.hostname)
    )]
    pub fn run(&self, table: &mut SourceTable, ctx: &ComputeContext) -> PipelineReport {
        let mut report = PipelineReport::default();

        for (index, compute) in self.computes.iter().enumerate() {
            let compute_key = ctx.compute_key(index);
            let _span = debug_span!("compute", key = %compute_key, kind = compute.kind()).entered();
            debug!("run: applying {}", compute.kind());

            match compute::apply(compute, table, ctx, &compute_key) {
                Ok(()) => report.applied += 1,
                Err(e) if compute.parses_documents() => {
                    report.skipped += 1;
                    error!(
                        "Hostname {} - {} {} failed for connector {}: {:#}",
                        ctx.hostname,
                        compute_key,
                        compute.kind(),
                        ctx.connector_id,
                        e
                    );
                    debug!("run: error chain: {:?}", e);
                }
                Err(e) => {
                    report.skipped += 1;
                    warn!(
                        "Hostname {} - {} {} left the table unchanged: {:#}",
                        ctx.hostname,
                        compute_key,
                        compute.kind(),
                        e
                    );
                }
            }
            trace!("run: table after {}: {:?}", compute_key, table);
        }

        debug!(
            "run: {} directive(s) applied, {} skipped, {} row(s)",
            report.applied,
            report.skipped,
            table.table.len()
        );
        report
    }
}
