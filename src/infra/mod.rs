// Adapters behind the application ports

pub mod csv_output_adapter;
pub mod enrichment_table;
pub mod http_client;

pub use csv_output_adapter::CsvOutputAdapter;
pub use enrichment_table::EnrichmentTable;
pub use http_client::ReqwestHttp;
