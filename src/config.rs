//! Simulation configuration

use crate::error::{Result, SimulationError};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Inclusive integer range that counts are drawn from uniformly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountRange {
    pub min: u32,
    pub max: u32,
}

impl CountRange {
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    /// A range that always yields `value`
    pub const fn fixed(value: u32) -> Self {
        Self { min: value, max: value }
    }

    fn validate(&self, name: &'static str) -> Result<()> {
        if self.min > self.max {
            return Err(SimulationError::InvalidRange {
                name,
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}

/// Standard deviations of the intercept and slope offsets for one grouping level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelSd {
    pub intercept: f64,
    pub slope: f64,
}

impl LevelSd {
    pub const fn new(intercept: f64, slope: f64) -> Self {
        Self { intercept, slope }
    }

    /// No variation at this level
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0)
    }

    fn validate(&self, level: &str) -> Result<()> {
        for (param, value) in [("intercept", self.intercept), ("slope", self.slope)] {
            if !value.is_finite() || value < 0.0 {
                return Err(SimulationError::InvalidStdDev {
                    name: format!("{} {}", level, param),
                    value,
                });
            }
        }
        Ok(())
    }
}

/// Per-level random effect standard deviations
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EffectSds {
    pub species: LevelSd,
    pub genus: LevelSd,
    pub mountain: LevelSd,
}

impl Default for EffectSds {
    fn default() -> Self {
        Self {
            species: LevelSd::new(3.0, 0.5),
            genus: LevelSd::new(5.0, 0.8),
            mountain: LevelSd::new(4.0, 1.0),
        }
    }
}

/// How genus and species labels are assigned to observations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum NestingMode {
    /// Species drawn uniformly, genus taken from the species' owning genus
    #[default]
    Nested,
    /// Genus and species drawn independently with replacement
    Independent,
}

/// Main simulation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of mountains (top grouping level)
    pub num_mountains: u32,

    /// Number of genera
    pub num_genera: u32,

    /// Range that each mountain's observation count is drawn from
    pub obs_per_mountain: CountRange,

    /// Range that each genus' species count is drawn from
    pub species_per_genus: CountRange,

    /// Population-level intercept (weight at elevation 0)
    pub fixed_intercept: f64,

    /// Population-level slope of weight on elevation
    pub fixed_slope: f64,

    /// Random effect standard deviations per level
    pub sds: EffectSds,

    /// Label assignment scheme for genus and species
    pub nesting: NestingMode,

    /// RNG seed; drawn from entropy and recorded when absent
    pub seed: Option<u64>,

    /// Output directory for logs and reports
    pub output_dir: String,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            num_mountains: 10,
            num_genera: 5,
            obs_per_mountain: CountRange::new(100, 300),
            species_per_genus: CountRange::new(2, 8),
            fixed_intercept: 30.0,
            fixed_slope: -2.0,
            sds: EffectSds::default(),
            nesting: NestingMode::Nested,
            seed: None,
            output_dir: "output".to_string(),
        }
    }
}

impl SimulationConfig {
    /// Create config for a quick, reproducible test run
    pub fn quick_test() -> Self {
        Self {
            num_mountains: 3,
            num_genera: 3,
            obs_per_mountain: CountRange::new(20, 40),
            species_per_genus: CountRange::new(1, 4),
            seed: Some(42),
            ..Default::default()
        }
    }

    /// Load a configuration from a JSON file; missing fields take defaults
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        serde_json::from_str(&contents).context("Failed to parse config file")
    }

    /// Check that the configuration describes a non-empty, well-formed design
    pub fn validate(&self) -> Result<()> {
        if self.num_mountains == 0 {
            return Err(SimulationError::NoMountains);
        }
        if self.num_genera == 0 {
            return Err(SimulationError::NoGenera);
        }

        self.obs_per_mountain.validate("observations per mountain")?;
        self.species_per_genus.validate("species per genus")?;

        if self.species_per_genus.min == 0 {
            return Err(SimulationError::EmptyGenus(self.species_per_genus.min));
        }
        if self.obs_per_mountain.max == 0 {
            return Err(SimulationError::NoObservations);
        }

        for (name, value) in [
            ("intercept", self.fixed_intercept),
            ("slope", self.fixed_slope),
        ] {
            if !value.is_finite() {
                return Err(SimulationError::NonFiniteFixedEffect { name, value });
            }
        }

        self.sds.species.validate("species")?;
        self.sds.genus.validate("genus")?;
        self.sds.mountain.validate("mountain")?;

        Ok(())
    }
}
