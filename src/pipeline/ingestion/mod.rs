// Pipeline ingestion: input reading, registry lookups, retry and batching

pub mod batch;
pub mod reader;
pub mod resolver;
pub mod retry;

#[cfg(test)]
pub(crate) mod test_support;

pub use batch::BatchResolver;
pub use resolver::ResolutionClient;
pub use retry::RetryPolicy;
