pub mod config;
pub mod constants;
pub mod error;
pub mod identifier;
pub mod logging;
pub mod pipeline;
pub mod types;

// Layered boundaries for application and infrastructure
pub mod app;
pub mod infra;

pub mod observability;
