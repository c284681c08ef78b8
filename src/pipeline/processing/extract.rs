//! Maps heterogeneous registry payloads onto the canonical record.
//!
//! Each canonical field has an ordered list of candidate keys. The top level
//! of the payload is probed first; only when it yields nothing are the known
//! sub-objects probed, in `NESTED_OBJECTS` order, with the same key order.

use serde_json::{Map, Value};
use tracing::debug;

use crate::constants::*;
use crate::types::{CanonicalRecord, RawLookupResult, RawPayload};

/// How one canonical field is located in a payload
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub field: &'static str,
    /// Candidate keys, first non-empty wins
    pub keys: &'static [&'static str],
    /// Keys tried, in order, when the matched value is itself an object
    pub object_keys: &'static [&'static str],
}

const NAME_KEYS: &[&str] = &["sigla", "nome", "descricao"];

pub const FIELD_RULES: &[FieldRule] = &[
    FieldRule {
        field: FIELD_LEGAL_NAME,
        keys: &["razao_social", "nome", "nome_empresa", "nome_razao"],
        object_keys: NAME_KEYS,
    },
    FieldRule {
        field: FIELD_TRADE_NAME,
        keys: &["nome_fantasia", "fantasia"],
        object_keys: NAME_KEYS,
    },
    FieldRule {
        field: FIELD_MUNICIPALITY,
        keys: &["municipio", "cidade"],
        object_keys: &["nome", "descricao"],
    },
    FieldRule {
        field: FIELD_STATE,
        keys: &["uf", "estado"],
        object_keys: &["sigla", "nome"],
    },
    FieldRule {
        field: FIELD_NEIGHBORHOOD,
        keys: &["bairro"],
        object_keys: NAME_KEYS,
    },
    FieldRule {
        field: FIELD_STREET,
        keys: &["logradouro", "rua"],
        object_keys: NAME_KEYS,
    },
    FieldRule {
        field: FIELD_NUMBER,
        keys: &["numero", "nro"],
        object_keys: NAME_KEYS,
    },
    FieldRule {
        field: FIELD_POSTAL_CODE,
        keys: &["cep"],
        object_keys: NAME_KEYS,
    },
    FieldRule {
        field: FIELD_PHONE,
        keys: &["telefone", "telefone1", "telefone_principal", "ddd_telefone_1"],
        object_keys: &["numero"],
    },
    FieldRule {
        field: FIELD_EMAIL,
        keys: &["email"],
        object_keys: &["endereco", "email"],
    },
    FieldRule {
        field: FIELD_STATUS,
        keys: &["situacao", "situacao_cadastral", "descricao_situacao_cadastral", "status"],
        object_keys: &["descricao", "nome"],
    },
    FieldRule {
        field: FIELD_ACTIVITY_CODE,
        keys: &["cnae_fiscal", "atividade_principal"],
        object_keys: &["id", "subclasse", "codigo", "code"],
    },
    FieldRule {
        field: FIELD_SIZE_CATEGORY,
        keys: &["porte_empresa", "porte"],
        object_keys: &["descricao", "nome"],
    },
    FieldRule {
        field: FIELD_ACTIVITY_START,
        keys: &["data_inicio_atividade", "abertura"],
        object_keys: NAME_KEYS,
    },
    FieldRule {
        field: FIELD_LEGAL_NATURE,
        keys: &["natureza_juridica"],
        object_keys: &["id", "codigo", "descricao"],
    },
];

/// Turn one lookup result into a canonical record.
///
/// Total: a missing or erroneous payload yields a record with every
/// extracted field unknown, still carrying the lookup error.
pub fn extract_record(result: RawLookupResult) -> CanonicalRecord {
    let mut record = CanonicalRecord {
        query: result.query,
        cnpj: result.identifier,
        valid_format: result.format_valid,
        error: result.error.map(|e| e.to_string()),
        ..Default::default()
    };

    if let Some(payload) = result.payload {
        for rule in FIELD_RULES {
            let value = find_value(&payload, rule);
            if let Some(slot) = record.field_slot(rule.field) {
                *slot = value;
            }
        }
        record.telefone = record.telefone.as_deref().and_then(clean_phone);
        record.raw_json = serde_json::to_string(&payload).ok();
    }

    debug!(cnpj = %record.cnpj, found = record.raw_json.is_some(), "Record extracted");
    record
}

/// Probe the payload for a field: top level first, then the nested sub-objects.
pub fn find_value(payload: &RawPayload, rule: &FieldRule) -> Option<String> {
    let top = payload.as_object()?;

    if let Some(value) = probe(top, rule) {
        return Some(value);
    }

    NESTED_OBJECTS
        .iter()
        .filter_map(|name| top.get(*name).and_then(Value::as_object))
        .find_map(|nested| probe(nested, rule))
}

fn probe(object: &Map<String, Value>, rule: &FieldRule) -> Option<String> {
    rule.keys
        .iter()
        .filter_map(|key| object.get(*key))
        .find_map(|value| render(value, rule.object_keys))
}

/// Render a JSON value as a field string. Objects are flattened through
/// `object_keys` and fall back to their compact JSON; arrays use their first element.
fn render(value: &Value, object_keys: &[&str]) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => items.first().and_then(|first| render(first, object_keys)),
        Value::Object(map) => {
            if map.is_empty() {
                return None;
            }
            object_keys
                .iter()
                .filter_map(|key| map.get(*key))
                .find_map(|inner| match inner {
                    Value::Object(_) | Value::Array(_) => None,
                    other => render(other, &[]),
                })
                .or_else(|| serde_json::to_string(value).ok())
        }
    }
}

/// Keep only the digits of a phone number
pub fn clean_phone(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    (!digits.is_empty()).then_some(digits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LookupError;
    use serde_json::json;

    fn found(payload: Value) -> RawLookupResult {
        RawLookupResult::success("q".into(), "11444777000161".into(), payload)
    }

    #[test]
    fn test_flat_payload() {
        let record = extract_record(found(json!({
            "razao_social": "ACME LTDA",
            "nome_fantasia": "ACME",
            "municipio": "FLORIANOPOLIS",
            "uf": "SC",
            "telefone": "(48) 3333-4444",
            "email": "contato@acme.com.br",
            "situacao": "ATIVA",
            "cnae_fiscal": 4781400
        })));

        assert_eq!(record.razao_social.as_deref(), Some("ACME LTDA"));
        assert_eq!(record.nome_fantasia.as_deref(), Some("ACME"));
        assert_eq!(record.municipio.as_deref(), Some("FLORIANOPOLIS"));
        assert_eq!(record.uf.as_deref(), Some("SC"));
        assert_eq!(record.telefone.as_deref(), Some("4833334444"));
        assert_eq!(record.situacao.as_deref(), Some("ATIVA"));
        assert_eq!(record.cnae_fiscal.as_deref(), Some("4781400"));
        assert!(record.error.is_none());
    }

    #[test]
    fn test_candidate_order_first_non_empty_wins() {
        let record = extract_record(found(json!({
            "razao_social": "",
            "nome": null,
            "nome_empresa": "SECOND CHOICE",
            "nome_razao": "THIRD CHOICE"
        })));
        assert_eq!(record.razao_social.as_deref(), Some("SECOND CHOICE"));
    }

    #[test]
    fn test_top_level_preferred_over_nested() {
        let record = extract_record(found(json!({
            "email": "top@acme.com",
            "estabelecimento": { "email": "nested@acme.com" }
        })));
        assert_eq!(record.email.as_deref(), Some("top@acme.com"));
    }

    #[test]
    fn test_nested_objects_probed_in_order() {
        let record = extract_record(found(json!({
            "razao_social": "ACME",
            "porte": { "id": "01", "descricao": "Micro Empresa" },
            "natureza_juridica": { "id": "2062", "descricao": "Sociedade Empresaria Limitada" },
            "empresa": { "email": "empresa@acme.com" },
            "estabelecimento": {
                "nome_fantasia": "ACME STORE",
                "situacao_cadastral": "Ativa",
                "data_inicio_atividade": "2005-03-10",
                "telefone1": "3333-4444",
                "email": "estab@acme.com",
                "cidade": { "id": 4205, "nome": "Florianopolis" },
                "estado": { "id": 24, "sigla": "SC", "nome": "Santa Catarina" },
                "atividade_principal": { "id": "4781400", "descricao": "Comercio varejista" }
            }
        })));

        assert_eq!(record.nome_fantasia.as_deref(), Some("ACME STORE"));
        assert_eq!(record.email.as_deref(), Some("estab@acme.com"));
        assert_eq!(record.municipio.as_deref(), Some("Florianopolis"));
        assert_eq!(record.uf.as_deref(), Some("SC"));
        assert_eq!(record.situacao.as_deref(), Some("Ativa"));
        assert_eq!(record.cnae_fiscal.as_deref(), Some("4781400"));
        assert_eq!(record.porte_empresa.as_deref(), Some("Micro Empresa"));
        assert_eq!(record.natureza_juridica.as_deref(), Some("2062"));
        assert_eq!(record.data_inicio_atividade.as_deref(), Some("2005-03-10"));
        assert_eq!(record.telefone.as_deref(), Some("33334444"));
    }

    #[test]
    fn test_array_values_use_first_element() {
        let record = extract_record(found(json!({
            "atividade_principal": [{ "code": "47.81-4-00", "text": "Comercio" }]
        })));
        assert_eq!(record.cnae_fiscal.as_deref(), Some("47.81-4-00"));
    }

    #[test]
    fn test_raw_json_preserved_even_when_nothing_matches() {
        let payload = json!({ "unexpected": { "shape": true } });
        let record = extract_record(found(payload.clone()));

        assert!(record.razao_social.is_none());
        assert!(record.email.is_none());
        let raw: Value = serde_json::from_str(record.raw_json.as_deref().unwrap()).unwrap();
        assert_eq!(raw, payload);
    }

    #[test]
    fn test_failed_lookup_yields_unknown_fields() {
        let result = RawLookupResult::failure("abc".into(), String::new(), false, LookupError::InvalidFormat);
        let record = extract_record(result);

        assert_eq!(record.query, "abc");
        assert_eq!(record.cnpj, "");
        assert!(!record.valid_format);
        assert_eq!(record.error.as_deref(), Some("invalid_format"));
        assert!(record.raw_json.is_none());
        assert!(record.razao_social.is_none());
    }

    #[test]
    fn test_non_object_payload_is_tolerated() {
        let record = extract_record(found(json!(["not", "an", "object"])));
        assert!(record.razao_social.is_none());
        assert!(record.raw_json.is_some());
    }

    #[test]
    fn test_clean_phone() {
        assert_eq!(clean_phone("(11) 9 8765-4321").as_deref(), Some("11987654321"));
        assert_eq!(clean_phone("n/a"), None);
    }
}
