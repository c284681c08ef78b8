use serde::Serialize;
use std::collections::HashMap;

use crate::constants::*;
use crate::types::{is_present, CanonicalRecord};

/// Structural validation result for one record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructuralValidation {
    /// Required fields that are absent or blank, in required-field order
    pub missing_fields: Vec<&'static str>,
    /// Share of required fields present, rounded to two decimals (0.0 to 1.0)
    pub completeness_score: f64,
    /// Whether completeness reaches the validity threshold
    pub is_valid_structural: bool,
}

impl StructuralValidation {
    /// Human-readable list of missing fields, or "OK" when none are missing
    pub fn validation_errors(&self) -> String {
        if self.missing_fields.is_empty() {
            VALIDATION_OK.to_string()
        } else {
            self.missing_fields.join(", ")
        }
    }
}

/// Rules used by the structural gate
#[derive(Debug, Clone)]
pub struct StructuralRules {
    pub required_fields: &'static [&'static str],
    pub validity_threshold: f64,
}

impl Default for StructuralRules {
    fn default() -> Self {
        Self {
            required_fields: &REQUIRED_FIELDS,
            validity_threshold: STRUCTURAL_VALIDITY_THRESHOLD,
        }
    }
}

/// Structural completeness checkpoint
#[derive(Debug, Clone, Default)]
pub struct StructuralGate {
    pub rules: StructuralRules,
}

impl StructuralGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rules(rules: StructuralRules) -> Self {
        Self { rules }
    }

    pub fn assess(&self, record: &CanonicalRecord) -> StructuralValidation {
        let missing_fields: Vec<&'static str> = self
            .rules
            .required_fields
            .iter()
            .copied()
            .filter(|field| !is_present(record.field(field)))
            .collect();

        let total = self.rules.required_fields.len();
        let completeness_score = completeness(total, missing_fields.len());

        StructuralValidation {
            is_valid_structural: completeness_score >= self.rules.validity_threshold,
            missing_fields,
            completeness_score,
        }
    }
}

/// `(total - missing) / total`, rounded to two decimals
pub fn completeness(total: usize, missing: usize) -> f64 {
    if total == 0 {
        return 1.0;
    }
    let present = total.saturating_sub(missing) as f64;
    round2(present / total as f64)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Bucket a completeness ratio into the coarse structural score.
/// Lower bounds are inclusive.
pub fn structural_score(completeness: f64) -> u32 {
    if completeness >= PRIORITY_THRESHOLD {
        SCORE_PRIORITY
    } else if completeness >= GOOD_THRESHOLD {
        SCORE_GOOD
    } else if completeness >= MEDIUM_THRESHOLD {
        SCORE_MEDIUM
    } else {
        SCORE_DISCARD
    }
}

/// Aggregate structural quality over a batch
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QualityReport {
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
    /// Most frequently missing fields, most frequent first
    pub top_missing: Vec<(String, usize)>,
}

impl QualityReport {
    pub fn from_validations<'a>(
        validations: impl IntoIterator<Item = &'a StructuralValidation>,
        top: usize,
    ) -> Self {
        let mut report = QualityReport::default();
        let mut missing: HashMap<&'static str, usize> = HashMap::new();

        for validation in validations {
            report.total += 1;
            if validation.is_valid_structural {
                report.valid += 1;
            } else {
                report.invalid += 1;
            }
            for field in &validation.missing_fields {
                *missing.entry(*field).or_insert(0) += 1;
            }
        }

        let mut ranked: Vec<(String, usize)> =
            missing.into_iter().map(|(f, c)| (f.to_string(), c)).collect();
        // Ties broken by name so the report is stable
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(top);
        report.top_missing = ranked;
        report
    }

    pub fn valid_pct(&self) -> f64 {
        percentage(self.valid, self.total)
    }

    pub fn invalid_pct(&self) -> f64 {
        percentage(self.invalid, self.total)
    }
}

fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        round2(part as f64 / total as f64 * 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_record() -> CanonicalRecord {
        CanonicalRecord {
            cnpj: "11444777000161".into(),
            razao_social: Some("ACME LTDA".into()),
            municipio: Some("Florianopolis".into()),
            uf: Some("SC".into()),
            telefone: Some("4833334444".into()),
            email: Some("contato@acme.com".into()),
            cnae_fiscal: Some("4781400".into()),
            situacao: Some("ATIVA".into()),
            porte_empresa: Some("ME".into()),
            data_inicio_atividade: Some("2005-03-10".into()),
            natureza_juridica: Some("2062".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_complete_record_is_ok() {
        let validation = StructuralGate::new().assess(&complete_record());
        assert!(validation.missing_fields.is_empty());
        assert_eq!(validation.completeness_score, 1.0);
        assert!(validation.is_valid_structural);
        assert_eq!(validation.validation_errors(), "OK");
        assert_eq!(structural_score(validation.completeness_score), 100);
    }

    #[test]
    fn test_missing_three_of_eleven() {
        let mut record = complete_record();
        record.telefone = None;
        record.email = Some("   ".into());
        record.porte_empresa = Some(String::new());

        let validation = StructuralGate::new().assess(&record);
        assert_eq!(validation.missing_fields, vec!["telefone", "email", "porte_empresa"]);
        assert_eq!(validation.completeness_score, 0.73);
        assert!(validation.is_valid_structural);
        assert_eq!(validation.validation_errors(), "telefone, email, porte_empresa");
        assert_eq!(structural_score(validation.completeness_score), 60);
    }

    #[test]
    fn test_missing_four_of_eleven() {
        let mut record = complete_record();
        record.telefone = None;
        record.email = None;
        record.porte_empresa = None;
        record.natureza_juridica = None;

        let validation = StructuralGate::new().assess(&record);
        assert_eq!(validation.completeness_score, 0.64);
        assert!(!validation.is_valid_structural);
        assert_eq!(structural_score(validation.completeness_score), 60);
    }

    #[test]
    fn test_empty_record_is_invalid() {
        let validation = StructuralGate::new().assess(&CanonicalRecord::default());
        assert_eq!(validation.missing_fields.len(), 11);
        assert_eq!(validation.completeness_score, 0.0);
        assert!(!validation.is_valid_structural);
        assert_eq!(structural_score(validation.completeness_score), 20);
    }

    #[test]
    fn test_score_boundaries_are_inclusive() {
        assert_eq!(structural_score(1.0), 100);
        assert_eq!(structural_score(0.90), 100);
        assert_eq!(structural_score(0.89), 80);
        assert_eq!(structural_score(0.75), 80);
        assert_eq!(structural_score(0.74), 60);
        assert_eq!(structural_score(0.60), 60);
        assert_eq!(structural_score(0.59), 20);
        assert_eq!(structural_score(0.0), 20);
    }

    #[test]
    fn test_completeness_rounding() {
        assert_eq!(completeness(11, 0), 1.0);
        assert_eq!(completeness(11, 1), 0.91);
        assert_eq!(completeness(11, 2), 0.82);
        assert_eq!(completeness(11, 3), 0.73);
        assert_eq!(completeness(11, 4), 0.64);
        assert_eq!(completeness(11, 11), 0.0);
    }

    #[test]
    fn test_quality_report_ranks_missing_fields() {
        let gate = StructuralGate::new();
        let mut partial = complete_record();
        partial.email = None;
        partial.telefone = None;
        let mut sparse = complete_record();
        sparse.email = None;

        let validations = vec![
            gate.assess(&complete_record()),
            gate.assess(&partial),
            gate.assess(&sparse),
            gate.assess(&CanonicalRecord::default()),
        ];
        let report = QualityReport::from_validations(&validations, 2);

        assert_eq!(report.total, 4);
        assert_eq!(report.valid, 3);
        assert_eq!(report.invalid, 1);
        assert_eq!(report.valid_pct(), 75.0);
        assert_eq!(
            report.top_missing,
            vec![("email".to_string(), 3), ("telefone".to_string(), 2)]
        );
    }
}
