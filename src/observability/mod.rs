// Observability: metrics recording for the resolution and qualification stages

pub mod metrics;
