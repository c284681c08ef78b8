//! Metrics for the CNPJ lead pipeline
//!
//! Recorded through the `metrics` facade; nothing is exported unless the
//! binary installs a recorder.

use std::fmt;
use std::time::Duration;

/// Enum representing all metric names used in the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Resolver metrics
    ResolverLookups,
    ResolverRetries,
    ResolverLookupDuration,
    ResolverBatchSize,

    // Qualification metrics
    QualifyCompleteness,
    QualifyStructuralValid,
    QualifyStructuralInvalid,
    QualifyClassified,
    QualifyBusinessValid,
    QualifyDuplicatesDropped,
}

impl MetricName {
    /// Get the metric name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::ResolverLookups => "cnpj_resolver_lookups_total",
            MetricName::ResolverRetries => "cnpj_resolver_retries_total",
            MetricName::ResolverLookupDuration => "cnpj_resolver_lookup_duration_seconds",
            MetricName::ResolverBatchSize => "cnpj_resolver_batch_size",

            MetricName::QualifyCompleteness => "cnpj_qualify_completeness_score",
            MetricName::QualifyStructuralValid => "cnpj_qualify_structural_valid_total",
            MetricName::QualifyStructuralInvalid => "cnpj_qualify_structural_invalid_total",
            MetricName::QualifyClassified => "cnpj_qualify_classified_total",
            MetricName::QualifyBusinessValid => "cnpj_qualify_business_valid_total",
            MetricName::QualifyDuplicatesDropped => "cnpj_qualify_duplicates_dropped_total",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

pub mod resolver {
    use super::{Duration, MetricName};

    /// Record the outcome of one logical lookup (`ok` or an error kind)
    pub fn lookup_completed(outcome: &str, elapsed: Duration) {
        ::metrics::counter!(MetricName::ResolverLookups.as_str(), "outcome" => outcome.to_string())
            .increment(1);
        ::metrics::histogram!(MetricName::ResolverLookupDuration.as_str())
            .record(elapsed.as_secs_f64());
    }

    pub fn lookup_retried(reason: &str) {
        ::metrics::counter!(MetricName::ResolverRetries.as_str(), "reason" => reason.to_string())
            .increment(1);
    }

    pub fn batch_started(size: usize) {
        ::metrics::histogram!(MetricName::ResolverBatchSize.as_str()).record(size as f64);
    }
}

pub mod qualify {
    use super::MetricName;

    pub fn record_assessed(completeness: f64, structurally_valid: bool) {
        ::metrics::histogram!(MetricName::QualifyCompleteness.as_str()).record(completeness);
        let name = if structurally_valid {
            MetricName::QualifyStructuralValid
        } else {
            MetricName::QualifyStructuralInvalid
        };
        ::metrics::counter!(name.as_str()).increment(1);
    }

    pub fn record_classified(label: &'static str) {
        ::metrics::counter!(MetricName::QualifyClassified.as_str(), "class" => label).increment(1);
    }

    pub fn record_business_valid() {
        ::metrics::counter!(MetricName::QualifyBusinessValid.as_str()).increment(1);
    }

    pub fn duplicates_dropped(count: usize) {
        ::metrics::counter!(MetricName::QualifyDuplicatesDropped.as_str()).increment(count as u64);
    }
}
