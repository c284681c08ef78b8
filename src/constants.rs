/// Business constants shared across the pipeline.
/// Thresholds come from the lead qualification rules and are kept here so
/// no stage inlines them.

// Identifier shape
pub const CNPJ_LENGTH: usize = 14;
pub const FIRST_CHECK_WEIGHTS: [u32; 12] = [5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];
pub const SECOND_CHECK_WEIGHTS: [u32; 13] = [6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];

// Registry defaults
pub const DEFAULT_REGISTRY_URL: &str = "https://publica.cnpj.ws/cnpj/{}";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 8;
pub const DEFAULT_WORKERS: usize = 6;
pub const DEFAULT_DELAY_MS: u64 = 50;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 500;
pub const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 10_000;
pub const DEFAULT_RETRY_MULTIPLIER: f64 = 2.0;
pub const DEFAULT_OUTPUT_DIR: &str = "data_processed";

// Structural validation
pub const STRUCTURAL_VALIDITY_THRESHOLD: f64 = 0.70;
pub const VALIDATION_OK: &str = "OK";

// Structural score tiers (lower bound inclusive)
pub const PRIORITY_THRESHOLD: f64 = 0.90;
pub const GOOD_THRESHOLD: f64 = 0.75;
pub const MEDIUM_THRESHOLD: f64 = 0.60;

pub const SCORE_PRIORITY: u32 = 100;
pub const SCORE_GOOD: u32 = 80;
pub const SCORE_MEDIUM: u32 = 60;
pub const SCORE_DISCARD: u32 = 20;

/// Status values (compared case-insensitively) that count as an active company
pub const ACTIVE_STATUSES: [&str; 2] = ["ativa", "active"];

// Canonical field names, also used as CSV column headers
pub const FIELD_CNPJ: &str = "cnpj";
pub const FIELD_LEGAL_NAME: &str = "razao_social";
pub const FIELD_TRADE_NAME: &str = "nome_fantasia";
pub const FIELD_MUNICIPALITY: &str = "municipio";
pub const FIELD_STATE: &str = "uf";
pub const FIELD_NEIGHBORHOOD: &str = "bairro";
pub const FIELD_STREET: &str = "logradouro";
pub const FIELD_NUMBER: &str = "numero";
pub const FIELD_POSTAL_CODE: &str = "cep";
pub const FIELD_PHONE: &str = "telefone";
pub const FIELD_EMAIL: &str = "email";
pub const FIELD_STATUS: &str = "situacao";
pub const FIELD_ACTIVITY_CODE: &str = "cnae_fiscal";
pub const FIELD_SIZE_CATEGORY: &str = "porte_empresa";
pub const FIELD_ACTIVITY_START: &str = "data_inicio_atividade";
pub const FIELD_LEGAL_NATURE: &str = "natureza_juridica";

/// Fields every qualified lead must carry, in reporting order
pub const REQUIRED_FIELDS: [&str; 11] = [
    FIELD_CNPJ,
    FIELD_LEGAL_NAME,
    FIELD_MUNICIPALITY,
    FIELD_STATE,
    FIELD_PHONE,
    FIELD_EMAIL,
    FIELD_ACTIVITY_CODE,
    FIELD_STATUS,
    FIELD_SIZE_CATEGORY,
    FIELD_ACTIVITY_START,
    FIELD_LEGAL_NATURE,
];

/// Sub-objects probed when a field is not found at the payload's top level
pub const NESTED_OBJECTS: [&str; 3] = ["estabelecimento", "empresa", "data"];

// Output partitions
pub const RECORDS_FULL_FILE: &str = "records_full.csv";
pub const RECORDS_LEAN_FILE: &str = "records_lean.csv";
pub const RECORDS_FULL_DEDUP_FILE: &str = "records_full_dedup.csv";
pub const RECORDS_LEAN_DEDUP_FILE: &str = "records_lean_dedup.csv";
pub const RECORDS_RAW_FILE: &str = "records_raw.jsonl";
pub const LEADS_SCORED_FILE: &str = "leads_scored.csv";
pub const STRUCTURAL_VALID_FILE: &str = "structural_valid.csv";
pub const STRUCTURAL_INVALID_FILE: &str = "structural_invalid.csv";
pub const BUSINESS_VALID_FILE: &str = "business_valid.csv";
pub const LEADS_FINAL_FILE: &str = "leads_final.csv";
