use async_trait::async_trait;

use crate::pipeline::processing::lead::QualifiedLead;
use crate::pipeline::processing::enrich::EnrichmentAttributes;
use crate::types::{CanonicalRecord, RawLookupResult};

// Ingest-side ports
#[async_trait]
pub trait HttpClientPort: Send + Sync {
    /// Issue a GET. `Err` carries a transport failure (timeout, connection, body read).
    async fn get(&self, url: &str) -> Result<HttpGetResult, String>;
}

#[derive(Clone, Debug)]
pub struct HttpGetResult {
    pub status: u16,
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Keyed enrichment table, consumed as a left join on normalized identifier
pub trait EnrichmentPort: Send + Sync {
    fn lookup(&self, cnpj: &str) -> Option<&EnrichmentAttributes>;
}

/// Checkpoint writer for the resolution stage
pub trait ResolutionOutputPort: Send + Sync {
    fn write_resolution(
        &self,
        results: &[RawLookupResult],
        records: &[CanonicalRecord],
    ) -> anyhow::Result<()>;
}

/// Checkpoint writer for the qualification stage
pub trait QualificationOutputPort: Send + Sync {
    fn write_scored(&self, leads: &[QualifiedLead]) -> anyhow::Result<()>;
    fn write_structural_split(&self, valid: &[&QualifiedLead], invalid: &[&QualifiedLead]) -> anyhow::Result<()>;
    fn write_business_valid(&self, leads: &[&QualifiedLead]) -> anyhow::Result<()>;
    fn write_final(&self, leads: &[&QualifiedLead]) -> anyhow::Result<()>;
}
