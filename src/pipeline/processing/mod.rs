// Pipeline processing: record extraction, enrichment, scoring and gating

pub mod business_rules;
pub mod classify;
pub mod dedup;
pub mod enrich;
pub mod extract;
pub mod filter;
pub mod lead;
pub mod quality_gate;
