//! Error types for configuration validation and generation

use thiserror::Error;

/// Errors raised when a simulation cannot be generated from its configuration
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimulationError {
    #[error("number of mountains must be at least 1")]
    NoMountains,

    #[error("number of genera must be at least 1")]
    NoGenera,

    #[error("invalid {name} range: min {min} is greater than max {max}")]
    InvalidRange { name: &'static str, min: u32, max: u32 },

    #[error("species per genus must be at least 1 (got min {0})")]
    EmptyGenus(u32),

    #[error("standard deviation for {name} must be finite and non-negative (got {value})")]
    InvalidStdDev { name: String, value: f64 },

    #[error("fixed {name} must be finite (got {value})")]
    NonFiniteFixedEffect { name: &'static str, value: f64 },

    #[error("configuration produces no observations")]
    NoObservations,
}

pub type Result<T> = std::result::Result<T, SimulationError>;
