// Data pipeline: ingestion (read, resolve) and processing (extract, qualify)

pub mod ingestion;
pub mod processing;
