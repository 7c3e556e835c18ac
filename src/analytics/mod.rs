//! Analytics modules for grouping, logging and report generation

pub mod grouping;
pub mod logger;
pub mod metrics;
pub mod report;

pub use grouping::{group_by, group_means, unique_count, GroupKey, GroupSummary, Record};
pub use logger::SimulationLogger;
pub use metrics::MetricsCalculator;
pub use report::generate_report;
