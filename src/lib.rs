//! Hierarchical Sample Simulation Framework
//!
//! Generates nested mountain / genus / species measurement data where
//! weight depends linearly on elevation, with random intercepts and slopes
//! at every level, then summarizes and charts the result.

pub mod analytics;
pub mod config;
pub mod error;
pub mod simulation;
pub mod utils;

pub use analytics::report::generate_report;
pub use config::SimulationConfig;
pub use error::SimulationError;
pub use simulation::generator::{generate, HierarchicalGenerator};
