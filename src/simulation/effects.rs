//! Random effects
//!
//! Intercept and slope offsets for every group at every nesting level,
//! and the additive formula that turns them into a weight.

use crate::config::LevelSd;
use crate::simulation::table::Observation;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// Offsets for one grouping level, indexed by `label - 1`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelEffects {
    pub intercepts: Vec<f64>,
    pub slopes: Vec<f64>,
}

impl LevelEffects {
    /// Draw `groups` intercept and slope offsets from zero-mean normals
    pub fn sample<R: Rng + ?Sized>(groups: usize, sd: LevelSd, rng: &mut R) -> Self {
        Self {
            intercepts: draw_offsets(groups, sd.intercept, rng),
            slopes: draw_offsets(groups, sd.slope, rng),
        }
    }

    pub fn len(&self) -> usize {
        self.intercepts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intercepts.is_empty()
    }

    /// Intercept offset for a 1-based label
    pub fn intercept(&self, label: u32) -> f64 {
        self.intercepts[label as usize - 1]
    }

    /// Slope offset for a 1-based label
    pub fn slope(&self, label: u32) -> f64 {
        self.slopes[label as usize - 1]
    }

    /// Intercept offset for a 1-based label, `None` when out of range
    pub fn get_intercept(&self, label: u32) -> Option<f64> {
        self.intercepts.get((label as usize).checked_sub(1)?).copied()
    }

    /// Slope offset for a 1-based label, `None` when out of range
    pub fn get_slope(&self, label: u32) -> Option<f64> {
        self.slopes.get((label as usize).checked_sub(1)?).copied()
    }
}

fn draw_offsets<R: Rng + ?Sized>(groups: usize, sd: f64, rng: &mut R) -> Vec<f64> {
    // Normal::new only fails for a non-finite sd, which validation rules out.
    match Normal::new(0.0, sd) {
        Ok(normal) if sd > 0.0 => (0..groups).map(|_| normal.sample(rng)).collect(),
        _ => vec![0.0; groups],
    }
}

/// Population-level parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FixedEffects {
    pub intercept: f64,
    pub slope: f64,
}

/// All random effects of a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RandomEffects {
    pub species: LevelEffects,
    pub genus: LevelEffects,
    pub mountain: LevelEffects,
}

impl RandomEffects {
    /// Total intercept for a (species, genus, mountain) cell
    pub fn intercept(&self, fixed: &FixedEffects, species: u32, genus: u32, mountain: u32) -> f64 {
        fixed.intercept
            + self.species.intercept(species)
            + self.genus.intercept(genus)
            + self.mountain.intercept(mountain)
    }

    /// Total slope for a (species, genus, mountain) cell
    pub fn slope(&self, fixed: &FixedEffects, species: u32, genus: u32, mountain: u32) -> f64 {
        fixed.slope
            + self.species.slope(species)
            + self.genus.slope(genus)
            + self.mountain.slope(mountain)
    }

    /// Weight implied by the model for the given labels and elevation
    pub fn weight(
        &self,
        fixed: &FixedEffects,
        species: u32,
        genus: u32,
        mountain: u32,
        elevation: f64,
    ) -> f64 {
        self.intercept(fixed, species, genus, mountain)
            + self.slope(fixed, species, genus, mountain) * elevation
    }

    /// Recompute an observation's weight from its labels and elevation
    pub fn predict(&self, fixed: &FixedEffects, obs: &Observation) -> f64 {
        self.weight(fixed, obs.species, obs.genus, obs.mountain, obs.elevation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_zero_sd_gives_zero_offsets() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let effects = LevelEffects::sample(4, LevelSd::zero(), &mut rng);

        assert_eq!(effects.len(), 4);
        assert!(effects.intercepts.iter().all(|&v| v == 0.0));
        assert!(effects.slopes.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_checked_lookup() {
        let effects = LevelEffects { intercepts: vec![1.5], slopes: vec![-0.5] };

        assert_eq!(effects.get_intercept(1), Some(1.5));
        assert_eq!(effects.get_slope(1), Some(-0.5));
        assert_eq!(effects.get_intercept(0), None);
        assert_eq!(effects.get_slope(2), None);
    }

    #[test]
    fn test_weight_formula() {
        let fixed = FixedEffects { intercept: 10.0, slope: 2.0 };
        let effects = RandomEffects {
            species: LevelEffects { intercepts: vec![1.0, 2.0], slopes: vec![0.1, 0.2] },
            genus: LevelEffects { intercepts: vec![-3.0], slopes: vec![0.5] },
            mountain: LevelEffects { intercepts: vec![0.0, 4.0], slopes: vec![-1.0, 1.0] },
        };

        // (10 + 2 - 3 + 4) + (2 + 0.2 + 0.5 + 1.0) * 0.5
        let w = effects.weight(&fixed, 2, 1, 2, 0.5);
        assert!((w - (13.0 + 3.7 * 0.5)).abs() < 1e-12);
    }
}
