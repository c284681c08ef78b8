use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::app::ports::EnrichmentPort;
use crate::constants::*;
use crate::types::{is_present, CanonicalRecord};

/// Attributes an external registry table can contribute to a record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentAttributes {
    #[serde(alias = "status")]
    pub situacao: Option<String>,
    #[serde(alias = "size_category", alias = "porte")]
    pub porte_empresa: Option<String>,
    #[serde(alias = "legal_nature")]
    pub natureza_juridica: Option<String>,
    #[serde(alias = "activity_start")]
    pub data_inicio_atividade: Option<String>,
}

impl EnrichmentAttributes {
    fn pairs(&self) -> [(&'static str, Option<&str>); 4] {
        [
            (FIELD_STATUS, self.situacao.as_deref()),
            (FIELD_SIZE_CATEGORY, self.porte_empresa.as_deref()),
            (FIELD_LEGAL_NATURE, self.natureza_juridica.as_deref()),
            (FIELD_ACTIVITY_START, self.data_inicio_atividade.as_deref()),
        ]
    }
}

/// Left-join a record against the enrichment table on its normalized identifier.
///
/// Only blank fields are filled; values the registry returned are kept.
/// Unmatched identifiers pass through untouched.
pub fn enrich_record(mut record: CanonicalRecord, table: &dyn EnrichmentPort) -> CanonicalRecord {
    if record.cnpj.is_empty() {
        return record;
    }
    let Some(attributes) = table.lookup(&record.cnpj) else {
        return record;
    };

    let mut filled = 0;
    for (field, value) in attributes.pairs() {
        if !is_present(value) {
            continue;
        }
        if let Some(slot) = record.field_slot(field) {
            if !is_present(slot.as_deref()) {
                *slot = value.map(|v| v.trim().to_string());
                filled += 1;
            }
        }
    }
    debug!(cnpj = %record.cnpj, filled, "Record enriched");
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MapTable(HashMap<String, EnrichmentAttributes>);

    impl EnrichmentPort for MapTable {
        fn lookup(&self, cnpj: &str) -> Option<&EnrichmentAttributes> {
            self.0.get(cnpj)
        }
    }

    fn table() -> MapTable {
        let mut map = HashMap::new();
        map.insert(
            "11444777000161".to_string(),
            EnrichmentAttributes {
                situacao: Some("ATIVA".into()),
                porte_empresa: Some("ME".into()),
                natureza_juridica: Some("2062".into()),
                data_inicio_atividade: None,
            },
        );
        MapTable(map)
    }

    #[test]
    fn test_fills_blank_fields() {
        let record = CanonicalRecord {
            cnpj: "11444777000161".into(),
            situacao: Some("  ".into()),
            ..Default::default()
        };
        let enriched = enrich_record(record, &table());

        assert_eq!(enriched.situacao.as_deref(), Some("ATIVA"));
        assert_eq!(enriched.porte_empresa.as_deref(), Some("ME"));
        assert_eq!(enriched.natureza_juridica.as_deref(), Some("2062"));
        assert!(enriched.data_inicio_atividade.is_none());
    }

    #[test]
    fn test_registry_values_take_precedence() {
        let record = CanonicalRecord {
            cnpj: "11444777000161".into(),
            situacao: Some("BAIXADA".into()),
            ..Default::default()
        };
        let enriched = enrich_record(record, &table());
        assert_eq!(enriched.situacao.as_deref(), Some("BAIXADA"));
        assert_eq!(enriched.porte_empresa.as_deref(), Some("ME"));
    }

    #[test]
    fn test_unmatched_identifier_passes_through() {
        let record = CanonicalRecord {
            cnpj: "27865757000102".into(),
            ..Default::default()
        };
        let enriched = enrich_record(record.clone(), &table());
        assert_eq!(enriched, record);
    }
}
