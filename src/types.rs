use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raw registry payload as returned by the external directory
pub type RawPayload = serde_json::Value;

/// Why a single identifier lookup did not yield a payload.
///
/// These never abort a batch; they travel on the result as data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("invalid_format")]
    InvalidFormat,

    #[error("not_found")]
    NotFound,

    #[error("json_error:{0}")]
    Json(String),

    #[error("http_{0}")]
    Http(u16),

    #[error("transport:{0}")]
    Transport(String),

    #[error("retries_exhausted:{attempts}:{last}")]
    RetriesExhausted { attempts: u32, last: String },

    #[error("task_failed:{0}")]
    TaskFailed(String),
}

impl LookupError {
    /// Short label used when counting outcomes; drops the free-text detail.
    pub fn kind(&self) -> String {
        match self {
            LookupError::InvalidFormat => "invalid_format".to_string(),
            LookupError::NotFound => "not_found".to_string(),
            LookupError::Json(_) => "json_error".to_string(),
            LookupError::Http(status) => format!("http_{status}"),
            LookupError::Transport(_) => "transport".to_string(),
            LookupError::RetriesExhausted { .. } => "retries_exhausted".to_string(),
            LookupError::TaskFailed(_) => "task_failed".to_string(),
        }
    }
}

/// The outcome of one resolution attempt for one input line
#[derive(Debug, Clone)]
pub struct RawLookupResult {
    /// Original (cleaned) input text
    pub query: String,
    /// Normalized identifier, empty when nothing usable was found
    pub identifier: String,
    pub format_valid: bool,
    pub payload: Option<RawPayload>,
    pub error: Option<LookupError>,
    pub resolved_at: DateTime<Utc>,
}

impl RawLookupResult {
    pub fn success(query: String, identifier: String, payload: RawPayload) -> Self {
        Self {
            query,
            identifier,
            format_valid: true,
            payload: Some(payload),
            error: None,
            resolved_at: Utc::now(),
        }
    }

    pub fn failure(query: String, identifier: String, format_valid: bool, error: LookupError) -> Self {
        Self {
            query,
            identifier,
            format_valid,
            payload: None,
            error: Some(error),
            resolved_at: Utc::now(),
        }
    }

    /// A lookup counts as found only when a payload came back.
    pub fn is_found(&self) -> bool {
        self.payload.is_some()
    }
}

/// Normalized business record, one per lookup result.
///
/// Flat on purpose: it is also the row type of the full audited export and
/// is read back from it by the qualification stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanonicalRecord {
    pub query: String,
    pub cnpj: String,
    pub valid_format: bool,
    pub error: Option<String>,
    pub razao_social: Option<String>,
    pub nome_fantasia: Option<String>,
    pub municipio: Option<String>,
    pub uf: Option<String>,
    pub bairro: Option<String>,
    pub logradouro: Option<String>,
    pub numero: Option<String>,
    pub cep: Option<String>,
    pub telefone: Option<String>,
    pub email: Option<String>,
    pub situacao: Option<String>,
    pub cnae_fiscal: Option<String>,
    pub porte_empresa: Option<String>,
    pub data_inicio_atividade: Option<String>,
    pub natureza_juridica: Option<String>,
    /// Serialized original payload, kept for audit
    pub raw_json: Option<String>,
}

impl CanonicalRecord {
    /// Look up a canonical field by its column name.
    ///
    /// Unknown names return `None`, which downstream stages treat as missing.
    pub fn field(&self, name: &str) -> Option<&str> {
        use crate::constants::*;
        let value = match name {
            FIELD_CNPJ => return Some(self.cnpj.as_str()),
            FIELD_LEGAL_NAME => &self.razao_social,
            FIELD_TRADE_NAME => &self.nome_fantasia,
            FIELD_MUNICIPALITY => &self.municipio,
            FIELD_STATE => &self.uf,
            FIELD_NEIGHBORHOOD => &self.bairro,
            FIELD_STREET => &self.logradouro,
            FIELD_NUMBER => &self.numero,
            FIELD_POSTAL_CODE => &self.cep,
            FIELD_PHONE => &self.telefone,
            FIELD_EMAIL => &self.email,
            FIELD_STATUS => &self.situacao,
            FIELD_ACTIVITY_CODE => &self.cnae_fiscal,
            FIELD_SIZE_CATEGORY => &self.porte_empresa,
            FIELD_ACTIVITY_START => &self.data_inicio_atividade,
            FIELD_LEGAL_NATURE => &self.natureza_juridica,
            _ => return None,
        };
        value.as_deref()
    }

    /// Mutable slot for an optional canonical field, used by the extractor
    /// and the enrichment join.
    pub fn field_slot(&mut self, name: &str) -> Option<&mut Option<String>> {
        use crate::constants::*;
        let slot = match name {
            FIELD_LEGAL_NAME => &mut self.razao_social,
            FIELD_TRADE_NAME => &mut self.nome_fantasia,
            FIELD_MUNICIPALITY => &mut self.municipio,
            FIELD_STATE => &mut self.uf,
            FIELD_NEIGHBORHOOD => &mut self.bairro,
            FIELD_STREET => &mut self.logradouro,
            FIELD_NUMBER => &mut self.numero,
            FIELD_POSTAL_CODE => &mut self.cep,
            FIELD_PHONE => &mut self.telefone,
            FIELD_EMAIL => &mut self.email,
            FIELD_STATUS => &mut self.situacao,
            FIELD_ACTIVITY_CODE => &mut self.cnae_fiscal,
            FIELD_SIZE_CATEGORY => &mut self.porte_empresa,
            FIELD_ACTIVITY_START => &mut self.data_inicio_atividade,
            FIELD_LEGAL_NATURE => &mut self.natureza_juridica,
            _ => return None,
        };
        Some(slot)
    }
}

/// Returns true when the value is present and not blank after trimming
pub fn is_present(value: Option<&str>) -> bool {
    value.map(|v| !v.trim().is_empty()).unwrap_or(false)
}
