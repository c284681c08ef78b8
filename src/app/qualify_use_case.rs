use anyhow::{Context, Result};
use std::collections::BTreeMap;
use tracing::info;

use crate::app::ports::{EnrichmentPort, QualificationOutputPort};
use crate::observability::metrics;
use crate::pipeline::processing::classify::LeadClassification;
use crate::pipeline::processing::dedup::dedup_by_key;
use crate::pipeline::processing::enrich::enrich_record;
use crate::pipeline::processing::lead::{qualify_record, QualifiedLead};
use crate::pipeline::processing::quality_gate::{QualityReport, StructuralGate};
use crate::types::CanonicalRecord;

/// How many missing fields the quality report lists
const TOP_MISSING_FIELDS: usize = 5;

/// Use case for qualifying canonical records into scored, gated leads
pub struct QualifyUseCase {
    gate: StructuralGate,
    enrichment: Option<Box<dyn EnrichmentPort>>,
    output: Box<dyn QualificationOutputPort>,
}

/// Everything a qualification run produced
pub struct QualificationOutcome {
    pub leads: Vec<QualifiedLead>,
    pub report: QualityReport,
    pub summary: QualificationSummary,
}

impl QualifyUseCase {
    pub fn new(
        gate: StructuralGate,
        enrichment: Option<Box<dyn EnrichmentPort>>,
        output: Box<dyn QualificationOutputPort>,
    ) -> Self {
        Self {
            gate,
            enrichment,
            output,
        }
    }

    /// Create a use case with the default structural rules
    pub fn with_default_gate(
        enrichment: Option<Box<dyn EnrichmentPort>>,
        output: Box<dyn QualificationOutputPort>,
    ) -> Self {
        Self::new(StructuralGate::new(), enrichment, output)
    }

    /// Enrich, validate, score, classify and gate every record, then write
    /// each partition.
    pub fn execute(&self, records: Vec<CanonicalRecord>) -> Result<QualificationOutcome> {
        let leads: Vec<QualifiedLead> = records
            .into_iter()
            .map(|record| match &self.enrichment {
                Some(table) => enrich_record(record, table.as_ref()),
                None => record,
            })
            .map(|record| qualify_record(&self.gate, record))
            .collect();

        self.output
            .write_scored(&leads)
            .context("failed to write scored leads")?;

        let (valid, invalid): (Vec<&QualifiedLead>, Vec<&QualifiedLead>) =
            leads.iter().partition(|lead| lead.validation.is_valid_structural);
        self.output
            .write_structural_split(&valid, &invalid)
            .context("failed to write structural partitions")?;

        let business_valid: Vec<&QualifiedLead> =
            leads.iter().filter(|lead| lead.is_valid_business).collect();
        self.output
            .write_business_valid(&business_valid)
            .context("failed to write business-valid leads")?;

        let business_count = business_valid.len();
        let final_leads = dedup_by_key(business_valid, |lead| {
            (!lead.record.cnpj.is_empty()).then(|| lead.record.cnpj.clone())
        });
        metrics::qualify::duplicates_dropped(business_count - final_leads.len());
        self.output
            .write_final(&final_leads)
            .context("failed to write final leads")?;

        let report = QualityReport::from_validations(leads.iter().map(|l| &l.validation), TOP_MISSING_FIELDS);
        let summary = QualificationSummary::from_leads(&leads, business_count, final_leads.len());

        info!(
            total = report.total,
            structural_valid = report.valid,
            business_valid = summary.business_valid,
            final_leads = summary.final_leads,
            "Qualification complete"
        );
        Ok(QualificationOutcome {
            leads,
            report,
            summary,
        })
    }
}

/// Counts for a qualification batch
#[derive(Debug, Default, Clone, PartialEq)]
pub struct QualificationSummary {
    pub by_class: BTreeMap<LeadClassification, usize>,
    pub business_valid: usize,
    pub final_leads: usize,
}

impl QualificationSummary {
    fn from_leads(leads: &[QualifiedLead], business_valid: usize, final_leads: usize) -> Self {
        let mut by_class = BTreeMap::new();
        for lead in leads {
            *by_class.entry(lead.classification).or_insert(0) += 1;
        }
        Self {
            by_class,
            business_valid,
            final_leads,
        }
    }
}
