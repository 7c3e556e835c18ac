//! Hierarchical Sample Generator
//!
//! Builds the nested mountain / genus / species design, draws the random
//! effects for every level and produces the observation table in one pass.

use crate::analytics::metrics::{mean, sample_sd};
use crate::config::{NestingMode, SimulationConfig};
use crate::error::{Result, SimulationError};
use crate::simulation::effects::{FixedEffects, LevelEffects, RandomEffects};
use crate::simulation::table::{Observation, SampleTable};
use crate::utils::hash::table_digest_hex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// The sampled group structure of a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupDesign {
    /// Observation count per mountain, index `mountain - 1`
    pub obs_per_mountain: Vec<u32>,
    /// Species count per genus, index `genus - 1`
    pub species_per_genus: Vec<u32>,
    /// Owning genus of each species, index `species - 1`
    pub species_genus: Vec<u32>,
}

impl GroupDesign {
    /// Lay out species IDs in contiguous blocks, one block per genus
    pub fn new(obs_per_mountain: Vec<u32>, species_per_genus: Vec<u32>) -> Self {
        let species_genus = species_per_genus
            .iter()
            .enumerate()
            .flat_map(|(idx, &count)| std::iter::repeat(idx as u32 + 1).take(count as usize))
            .collect();

        Self {
            obs_per_mountain,
            species_per_genus,
            species_genus,
        }
    }

    pub fn num_mountains(&self) -> u32 {
        self.obs_per_mountain.len() as u32
    }

    pub fn num_genera(&self) -> u32 {
        self.species_per_genus.len() as u32
    }

    pub fn total_observations(&self) -> u32 {
        self.obs_per_mountain.iter().sum()
    }

    pub fn total_species(&self) -> u32 {
        self.species_per_genus.iter().sum()
    }

    /// Genus that owns a species in the declared mapping
    pub fn genus_of(&self, species: u32) -> Option<u32> {
        let idx = (species as usize).checked_sub(1)?;
        self.species_genus.get(idx).copied()
    }

    /// Mountain labels in table order: each index repeated by its count
    pub fn mountain_labels(&self) -> impl Iterator<Item = u32> + '_ {
        self.obs_per_mountain
            .iter()
            .enumerate()
            .flat_map(|(idx, &count)| std::iter::repeat(idx as u32 + 1).take(count as usize))
    }
}

/// Summary statistics of a generated table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationSummary {
    pub total_observations: u32,
    pub total_species: u32,
    pub num_mountains: u32,
    pub num_genera: u32,
    pub mean_elevation: f64,
    pub mean_weight: f64,
    pub sd_weight: f64,
    pub min_weight: f64,
    pub max_weight: f64,
    /// Rows whose genus differs from the declared owner of their species
    pub nesting_violations: u32,
    /// SHA-256 of the table contents
    pub digest: String,
}

/// Everything produced by one generator run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResults {
    /// Configuration used, with the effective seed filled in
    pub config: SimulationConfig,
    pub design: GroupDesign,
    pub fixed: FixedEffects,
    pub effects: RandomEffects,
    pub table: SampleTable,
    pub summary: SimulationSummary,
    pub generated_at: chrono::DateTime<chrono::Utc>,
}

impl SimulationResults {
    /// Seed the run was generated with
    pub fn seed(&self) -> Option<u64> {
        self.config.seed
    }

    /// Recompute a row's weight from its labels and the recorded effects
    pub fn predicted_weight(&self, obs: &Observation) -> f64 {
        self.effects.predict(&self.fixed, obs)
    }
}

/// Generator for nested random-effects samples
pub struct HierarchicalGenerator {
    config: SimulationConfig,
    seed: u64,
    rng: ChaCha8Rng,
}

impl HierarchicalGenerator {
    /// Validate the configuration and set up the RNG
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;

        let seed = config.seed.unwrap_or_else(|| rand::thread_rng().gen());
        debug!("Generator seed: {}", seed);

        Ok(Self {
            config,
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
        })
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Run the complete generation; every call replays from the recorded seed
    pub fn generate(&mut self) -> Result<SimulationResults> {
        self.rng = ChaCha8Rng::seed_from_u64(self.seed);

        info!("Generating hierarchical sample...");
        info!(
            "Mountains: {}, genera: {}, nesting: {:?}",
            self.config.num_mountains, self.config.num_genera, self.config.nesting
        );

        let design = self.sample_design();
        let total_obs = design.total_observations();
        if total_obs == 0 {
            return Err(SimulationError::NoObservations);
        }
        info!(
            "Design: {} observations, {} species",
            total_obs,
            design.total_species()
        );

        let labels = self.sample_labels(&design);
        let effects = self.sample_effects(&design);
        let fixed = FixedEffects {
            intercept: self.config.fixed_intercept,
            slope: self.config.fixed_slope,
        };

        let rows: Vec<Observation> = design
            .mountain_labels()
            .zip(labels)
            .map(|(mountain, (genus, species))| {
                let elevation: f64 = self.rng.sample(StandardNormal);
                let weight = effects.weight(&fixed, species, genus, mountain, elevation);
                Observation {
                    mountain,
                    genus,
                    species,
                    elevation,
                    weight,
                }
            })
            .collect();

        let table = SampleTable::new(rows);
        let summary = summarize(&design, &table);

        if summary.nesting_violations > 0 {
            warn!(
                "{} of {} rows carry a genus other than their species' owner",
                summary.nesting_violations, summary.total_observations
            );
        }

        info!("Generation complete!");
        info!(
            "Mean weight: {:.3} (sd {:.3}), digest {}",
            summary.mean_weight,
            summary.sd_weight,
            &summary.digest[..12]
        );

        Ok(SimulationResults {
            config: SimulationConfig {
                seed: Some(self.seed),
                ..self.config.clone()
            },
            design,
            fixed,
            effects,
            table,
            summary,
            generated_at: chrono::Utc::now(),
        })
    }

    /// Steps 1-2: observation counts per mountain, species counts per genus
    fn sample_design(&mut self) -> GroupDesign {
        let obs = self.config.obs_per_mountain;
        let obs_per_mountain = (0..self.config.num_mountains)
            .map(|_| self.rng.gen_range(obs.min..=obs.max))
            .collect();

        let species = self.config.species_per_genus;
        let species_per_genus = (0..self.config.num_genera)
            .map(|_| self.rng.gen_range(species.min..=species.max))
            .collect();

        GroupDesign::new(obs_per_mountain, species_per_genus)
    }

    /// Step 4: (genus, species) label for every observation
    fn sample_labels(&mut self, design: &GroupDesign) -> Vec<(u32, u32)> {
        let n = design.total_observations() as usize;
        let num_genera = design.num_genera();
        let num_species = design.total_species();

        match self.config.nesting {
            NestingMode::Nested => (0..n)
                .map(|_| {
                    let species = self.rng.gen_range(1..=num_species);
                    // Every species in 1..=S has an owner by construction.
                    let genus = design.genus_of(species).unwrap_or(1);
                    (genus, species)
                })
                .collect(),
            NestingMode::Independent => {
                let genera: Vec<u32> =
                    (0..n).map(|_| self.rng.gen_range(1..=num_genera)).collect();
                let species: Vec<u32> =
                    (0..n).map(|_| self.rng.gen_range(1..=num_species)).collect();
                genera.into_iter().zip(species).collect()
            }
        }
    }

    /// Step 5: offsets per species, genus and mountain
    fn sample_effects(&mut self, design: &GroupDesign) -> RandomEffects {
        let sds = self.config.sds;
        RandomEffects {
            species: LevelEffects::sample(design.total_species() as usize, sds.species, &mut self.rng),
            genus: LevelEffects::sample(design.num_genera() as usize, sds.genus, &mut self.rng),
            mountain: LevelEffects::sample(design.num_mountains() as usize, sds.mountain, &mut self.rng),
        }
    }
}

fn summarize(design: &GroupDesign, table: &SampleTable) -> SimulationSummary {
    let weights = table.weights();
    let nesting_violations = table
        .iter()
        .filter(|o| design.genus_of(o.species) != Some(o.genus))
        .count() as u32;

    SimulationSummary {
        total_observations: table.len() as u32,
        total_species: design.total_species(),
        num_mountains: design.num_mountains(),
        num_genera: design.num_genera(),
        mean_elevation: mean(&table.elevations()).unwrap_or(0.0),
        mean_weight: mean(&weights).unwrap_or(0.0),
        sd_weight: sample_sd(&weights).unwrap_or(0.0),
        min_weight: weights.iter().copied().fold(f64::INFINITY, f64::min),
        max_weight: weights.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        nesting_violations,
        digest: table_digest_hex(table),
    }
}

/// Validate `config` and generate one table
pub fn generate(config: SimulationConfig) -> Result<SimulationResults> {
    HierarchicalGenerator::new(config)?.generate()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CountRange;

    #[test]
    fn test_quick_run() {
        let results = generate(SimulationConfig::quick_test()).unwrap();

        assert_eq!(results.table.len() as u32, results.design.total_observations());
        assert_eq!(results.summary.num_mountains, 3);
        assert_eq!(results.seed(), Some(42));
        assert_eq!(results.summary.nesting_violations, 0);
    }

    #[test]
    fn test_design_layout() {
        let design = GroupDesign::new(vec![2, 1], vec![2, 3]);

        assert_eq!(design.total_observations(), 3);
        assert_eq!(design.total_species(), 5);
        assert_eq!(design.species_genus, vec![1, 1, 2, 2, 2]);
        assert_eq!(design.genus_of(3), Some(2));
        assert_eq!(design.genus_of(0), None);
        assert_eq!(design.genus_of(6), None);
        assert_eq!(design.mountain_labels().collect::<Vec<_>>(), vec![1, 1, 2]);
    }

    #[test]
    fn test_entropy_seed_is_recorded() {
        let config = SimulationConfig {
            seed: None,
            ..SimulationConfig::quick_test()
        };
        let first = generate(config).unwrap();

        let replay = generate(first.config.clone()).unwrap();
        assert_eq!(first.table, replay.table);
    }

    #[test]
    fn test_repeated_generate_replays_seed() {
        let mut generator = HierarchicalGenerator::new(SimulationConfig::quick_test()).unwrap();
        let first = generator.generate().unwrap();
        let second = generator.generate().unwrap();

        assert_eq!(first.table, second.table);

        let replay = generate(second.config.clone()).unwrap();
        assert_eq!(replay.summary.digest, second.summary.digest);
    }

    #[test]
    fn test_fixed_counts() {
        let config = SimulationConfig {
            num_mountains: 4,
            num_genera: 2,
            obs_per_mountain: CountRange::fixed(25),
            species_per_genus: CountRange::fixed(3),
            seed: Some(1),
            ..Default::default()
        };
        let results = generate(config).unwrap();

        assert_eq!(results.table.len(), 100);
        assert_eq!(results.summary.total_species, 6);
        assert_eq!(results.effects.species.len(), 6);
        assert_eq!(results.effects.genus.len(), 2);
        assert_eq!(results.effects.mountain.len(), 4);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = SimulationConfig {
            num_genera: 0,
            ..SimulationConfig::quick_test()
        };
        assert!(matches!(
            HierarchicalGenerator::new(config),
            Err(SimulationError::NoGenera)
        ));
    }

    #[test]
    fn test_all_zero_counts_rejected() {
        let config = SimulationConfig {
            obs_per_mountain: CountRange::new(0, 1),
            num_mountains: 1,
            ..SimulationConfig::quick_test()
        };
        // Either 0 or 1 observation; both outcomes must be handled.
        match generate(config) {
            Ok(results) => assert_eq!(results.table.len(), 1),
            Err(err) => assert_eq!(err, SimulationError::NoObservations),
        }
    }
}
