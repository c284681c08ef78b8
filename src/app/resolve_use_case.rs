use anyhow::{Context, Result};
use std::collections::BTreeMap;
use tracing::info;

use crate::app::ports::ResolutionOutputPort;
use crate::pipeline::ingestion::BatchResolver;
use crate::pipeline::processing::extract::extract_record;
use crate::types::{CanonicalRecord, RawLookupResult};

/// Use case for resolving raw queries into canonical records
pub struct ResolveUseCase {
    resolver: BatchResolver,
    output: Box<dyn ResolutionOutputPort>,
}

/// Records produced by a resolution run, handed to qualification by value
pub struct ResolutionOutcome {
    pub records: Vec<CanonicalRecord>,
    pub summary: ResolutionSummary,
}

impl ResolveUseCase {
    pub fn new(resolver: BatchResolver, output: Box<dyn ResolutionOutputPort>) -> Self {
        Self { resolver, output }
    }

    /// Resolve every query, extract one record per result and write the
    /// resolution checkpoint.
    pub async fn execute(&self, queries: Vec<String>) -> Result<ResolutionOutcome> {
        let results = self.resolver.resolve_all(queries).await;
        let summary = ResolutionSummary::from_results(&results);

        let records: Vec<CanonicalRecord> = results.iter().cloned().map(extract_record).collect();

        self.output
            .write_resolution(&results, &records)
            .context("failed to write resolution outputs")?;

        info!(
            total = summary.total,
            found = summary.found,
            failed = summary.failed(),
            "Resolution complete"
        );
        Ok(ResolutionOutcome { records, summary })
    }
}

/// Counts for a resolution batch
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ResolutionSummary {
    pub total: usize,
    pub found: usize,
    /// Failures keyed by short error label
    pub errors: BTreeMap<String, usize>,
}

impl ResolutionSummary {
    pub fn from_results(results: &[RawLookupResult]) -> Self {
        let mut summary = ResolutionSummary::default();
        for result in results {
            summary.total += 1;
            if result.is_found() {
                summary.found += 1;
            }
            if let Some(error) = &result.error {
                *summary.errors.entry(error.kind()).or_insert(0) += 1;
            }
        }
        summary
    }

    pub fn failed(&self) -> usize {
        self.errors.values().sum()
    }
}
