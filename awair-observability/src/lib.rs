pub mod metrics;
pub mod prometheus_exporter;

pub use metrics::ClimateMetrics;
