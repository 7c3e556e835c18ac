//! Simulation modules

pub mod effects;
pub mod generator;
pub mod table;

pub use effects::{FixedEffects, LevelEffects, RandomEffects};
pub use generator::{generate, GroupDesign, HierarchicalGenerator, SimulationResults, SimulationSummary};
pub use table::{Observation, SampleTable};
