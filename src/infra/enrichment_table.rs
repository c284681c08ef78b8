use csv::ReaderBuilder;
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

use crate::app::ports::EnrichmentPort;
use crate::constants::FIELD_CNPJ;
use crate::error::{PipelineError, Result};
use crate::identifier;
use crate::pipeline::processing::enrich::EnrichmentAttributes;

/// In-memory enrichment table keyed by normalized identifier
#[derive(Debug, Default)]
pub struct EnrichmentTable {
    rows: HashMap<String, EnrichmentAttributes>,
}

impl EnrichmentTable {
    /// Load a CSV with an identifier column plus any of the attribute
    /// columns. Identifiers are normalized so zero-stripped or punctuated
    /// keys still join; the first row per identifier wins.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(PipelineError::Input(format!("enrichment table not found: {}", path.display())));
        }
        let mut reader = ReaderBuilder::new().from_path(path)?;
        let headers = reader.headers()?.clone();
        let key_index = headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(FIELD_CNPJ))
            .ok_or_else(|| PipelineError::Input(format!("enrichment table has no '{FIELD_CNPJ}' column")))?;

        let mut table = EnrichmentTable::default();
        let mut skipped = 0;
        for row in reader.records() {
            let row = row?;
            let cnpj = identifier::normalize(row.get(key_index).unwrap_or(""));
            if cnpj.is_empty() {
                skipped += 1;
                continue;
            }
            let attributes: EnrichmentAttributes = row.deserialize(Some(&headers))?;
            table.rows.entry(cnpj).or_insert(attributes);
        }

        if skipped > 0 {
            warn!(skipped, "Enrichment rows without identifier skipped");
        }
        info!(path = %path.display(), rows = table.len(), "Loaded enrichment table");
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl EnrichmentPort for EnrichmentTable {
    fn lookup(&self, cnpj: &str) -> Option<&EnrichmentAttributes> {
        self.rows.get(cnpj)
    }
}
