use serde::Serialize;

use crate::observability::metrics;
use crate::pipeline::processing::business_rules::is_business_valid;
use crate::pipeline::processing::classify::{classify, LeadClassification};
use crate::pipeline::processing::quality_gate::{structural_score, StructuralGate, StructuralValidation};
use crate::types::CanonicalRecord;

/// A canonical record carried through every qualification stage.
///
/// Each derived attribute is written by exactly one stage, in field order.
#[derive(Debug, Clone, Serialize)]
pub struct QualifiedLead {
    pub record: CanonicalRecord,
    pub validation: StructuralValidation,
    pub structural_score: u32,
    pub classification: LeadClassification,
    pub is_valid_business: bool,
}

/// Run the scoring chain over one record: structural gate, score, class,
/// business rules.
pub fn qualify_record(gate: &StructuralGate, record: CanonicalRecord) -> QualifiedLead {
    let validation = gate.assess(&record);
    metrics::qualify::record_assessed(validation.completeness_score, validation.is_valid_structural);

    let structural_score = structural_score(validation.completeness_score);
    let classification = classify(structural_score);
    metrics::qualify::record_classified(classification.as_str());

    let is_valid_business = is_business_valid(&record);
    if is_valid_business {
        metrics::qualify::record_business_valid();
    }

    QualifiedLead {
        record,
        validation,
        structural_score,
        classification,
        is_valid_business,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sparse_active_record() {
        let record = CanonicalRecord {
            cnpj: "11444777000161".into(),
            situacao: Some("ATIVA".into()),
            email: Some("a@b.com".into()),
            ..Default::default()
        };
        let lead = qualify_record(&StructuralGate::new(), record);

        assert_eq!(lead.validation.completeness_score, 0.27);
        assert!(!lead.validation.is_valid_structural);
        assert_eq!(lead.structural_score, 20);
        assert_eq!(lead.classification, LeadClassification::Discard);
        assert!(lead.is_valid_business);
    }

    #[test]
    fn test_unresolved_record_is_discarded() {
        let record = CanonicalRecord {
            query: "garbage".into(),
            error: Some("invalid_format".into()),
            ..Default::default()
        };
        let lead = qualify_record(&StructuralGate::new(), record);

        assert_eq!(lead.validation.completeness_score, 0.0);
        assert_eq!(lead.classification, LeadClassification::Discard);
        assert!(!lead.is_valid_business);
    }
}
